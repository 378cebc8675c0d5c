//! Error types
//!
//! Connection failures never reach consumers of the frame cache; they
//! terminate the affected connection, are logged, and the public API keeps
//! answering with `None` until a fresh connection produces a frame.

/// Convenience result type for crate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error for a stream connection
#[derive(Debug)]
pub enum Error {
    /// Socket-level failure (connect, read, write, or EOF)
    Transport(std::io::Error),
    /// The multipart stream violated the expected framing
    Protocol(ProtocolError),
}

/// Error raised by the multipart frame parser
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// No decimal digits in the header line following `Content-Length:`
    LengthNotFound {
        /// The offending header line, lossily decoded for logging
        header: String,
    },
    /// The advertised length does not fit in `usize`
    LengthOverflow {
        /// The offending header line, lossily decoded for logging
        header: String,
    },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Transport(e) => write!(f, "transport error: {}", e),
            Error::Protocol(e) => write!(f, "protocol error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Transport(e) => Some(e),
            Error::Protocol(e) => Some(e),
        }
    }
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolError::LengthNotFound { header } => {
                write!(f, "could not find content length in header line {:?}", header)
            }
            ProtocolError::LengthOverflow { header } => {
                write!(f, "content length too large in header line {:?}", header)
            }
        }
    }
}

impl std::error::Error for ProtocolError {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Transport(e)
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Error::Protocol(e)
    }
}
