//! Multipart frame parser
//!
//! A push-based state machine: feed it byte chunks as they arrive from the
//! socket, collect complete frame payloads as they fall out. The machine
//! cycles forever for the life of a connection:
//!
//! ```text
//!   SeekLengthHeader ──"Content-Length:"──► SeekHeaderEnd
//!         ▲                                      │ "\r\n\r\n"
//!         │                                      ▼
//!       (emit) ◄────── N payload bytes ────── ReadBody
//! ```
//!
//! Everything before the `Content-Length:` marker is discarded, so multipart
//! boundaries and other headers never need parsing. The payload is opaque:
//! no JPEG magic is checked. A parse failure is terminal; the connection is
//! torn down and a fresh parser is built with its replacement.

use bytes::{Buf, Bytes, BytesMut};

use crate::error::ProtocolError;

/// Literal scanned for in the multipart header block
const LENGTH_MARKER: &[u8] = b"Content-Length:";

/// Blank-line terminator ending the header block
const HEADER_END: &[u8] = b"\r\n\r\n";

/// Parser state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseState {
    /// Scanning for the `Content-Length:` marker
    SeekLengthHeader,
    /// Accumulating the header line up to the blank-line terminator
    SeekHeaderEnd,
    /// Reading exactly `remaining` payload bytes
    ReadBody {
        /// Payload bytes still owed
        remaining: usize,
    },
    /// A previous feed failed with this error; the parser is unusable
    Failed(ProtocolError),
}

/// Push-based MJPEG multipart frame parser
#[derive(Debug)]
pub struct FrameParser {
    state: ParseState,
    buf: BytesMut,
}

impl FrameParser {
    /// Create a parser at the start of a stream
    pub fn new() -> Self {
        Self {
            state: ParseState::SeekLengthHeader,
            buf: BytesMut::new(),
        }
    }

    /// Current state, for diagnostics
    pub fn state(&self) -> &ParseState {
        &self.state
    }

    /// Feed a chunk of bytes, returning every frame completed by it.
    ///
    /// Chunk boundaries are arbitrary; a marker or payload may straddle any
    /// number of chunks. After an error the parser stays failed and every
    /// further call returns the original error.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<Bytes>, ProtocolError> {
        self.buf.extend_from_slice(chunk);

        let mut frames = Vec::new();
        loop {
            match self.state {
                ParseState::SeekLengthHeader => {
                    match find(&self.buf, LENGTH_MARKER) {
                        Some(pos) => {
                            self.buf.advance(pos + LENGTH_MARKER.len());
                            self.state = ParseState::SeekHeaderEnd;
                        }
                        None => {
                            // Keep only a marker-length tail in case the
                            // marker straddles this chunk and the next.
                            let keep = LENGTH_MARKER.len() - 1;
                            if self.buf.len() > keep {
                                let cut = self.buf.len() - keep;
                                self.buf.advance(cut);
                            }
                            break;
                        }
                    }
                }
                ParseState::SeekHeaderEnd => match find(&self.buf, HEADER_END) {
                    Some(pos) => {
                        let line = self.buf.split_to(pos);
                        self.buf.advance(HEADER_END.len());

                        match parse_length(&line) {
                            Ok(len) => self.state = ParseState::ReadBody { remaining: len },
                            Err(e) => {
                                self.state = ParseState::Failed(e.clone());
                                return Err(e);
                            }
                        }
                    }
                    None => break,
                },
                ParseState::ReadBody { remaining } => {
                    if self.buf.len() < remaining {
                        break;
                    }
                    frames.push(self.buf.split_to(remaining).freeze());
                    self.state = ParseState::SeekLengthHeader;
                }
                ParseState::Failed(ref e) => return Err(e.clone()),
            }
        }

        Ok(frames)
    }
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Find the first occurrence of `needle` in `haystack`
fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Extract the first run of decimal digits from the header line
fn parse_length(line: &[u8]) -> Result<usize, ProtocolError> {
    let start = match line.iter().position(u8::is_ascii_digit) {
        Some(start) => start,
        None => {
            return Err(ProtocolError::LengthNotFound {
                header: String::from_utf8_lossy(line).into_owned(),
            })
        }
    };
    let digits = line[start..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();

    // Digits only, so parsing can only fail by overflowing usize
    std::str::from_utf8(&line[start..start + digits])
        .expect("ASCII digits are valid UTF-8")
        .parse::<usize>()
        .map_err(|_| ProtocolError::LengthOverflow {
            header: String::from_utf8_lossy(line).into_owned(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(payload: &[u8]) -> Vec<u8> {
        let mut bytes = format!(
            "--boundary\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
            payload.len()
        )
        .into_bytes();
        bytes.extend_from_slice(payload);
        bytes.extend_from_slice(b"\r\n");
        bytes
    }

    #[test]
    fn test_single_frame() {
        let mut parser = FrameParser::new();
        let frames = parser.feed(&part(b"\xff\xd8jpeg-bytes\xff\xd9")).unwrap();

        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..], b"\xff\xd8jpeg-bytes\xff\xd9");
        assert_eq!(parser.state(), &ParseState::SeekLengthHeader);
    }

    #[test]
    fn test_multiple_frames_one_chunk() {
        let mut stream = part(b"frame-one");
        stream.extend_from_slice(&part(b"frame-two"));
        stream.extend_from_slice(&part(b"frame-three"));

        let mut parser = FrameParser::new();
        let frames = parser.feed(&stream).unwrap();

        assert_eq!(frames.len(), 3);
        assert_eq!(&frames[2][..], b"frame-three");
    }

    #[test]
    fn test_byte_at_a_time() {
        let mut stream = part(b"first");
        stream.extend_from_slice(&part(b"second payload"));

        let mut parser = FrameParser::new();
        let mut frames = Vec::new();
        for byte in stream {
            frames.extend(parser.feed(&[byte]).unwrap());
        }

        assert_eq!(frames.len(), 2);
        assert_eq!(&frames[0][..], b"first");
        assert_eq!(&frames[1][..], b"second payload");
    }

    #[test]
    fn test_marker_straddles_chunks() {
        let stream = part(b"split");
        let (a, b) = stream.split_at(20); // mid-header split

        let mut parser = FrameParser::new();
        assert!(parser.feed(a).unwrap().is_empty());
        let frames = parser.feed(b).unwrap();

        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..], b"split");
    }

    #[test]
    fn test_leading_garbage_discarded() {
        let mut stream = b"HTTP/1.0 200 OK\r\nServer: motion\r\n\r\n".to_vec();
        stream.extend_from_slice(&part(b"payload"));

        let mut parser = FrameParser::new();
        let frames = parser.feed(&stream).unwrap();

        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..], b"payload");
    }

    #[test]
    fn test_trailing_headers_in_length_line() {
        // Digits first, then another header before the blank line; the first
        // digit run wins.
        let mut parser = FrameParser::new();
        let frames = parser
            .feed(b"Content-Length: 4\r\nX-Timestamp: 99\r\n\r\nabcd")
            .unwrap();

        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..], b"abcd");
    }

    #[test]
    fn test_length_without_digits_fails() {
        let mut parser = FrameParser::new();
        let err = parser.feed(b"junk Content-Length: none\r\n\r\n").unwrap_err();

        assert!(matches!(err, ProtocolError::LengthNotFound { .. }));
        assert!(matches!(parser.state(), ParseState::Failed(_)));

        // Failed parser stays failed
        assert!(parser.feed(&part(b"payload")).is_err());
    }

    #[test]
    fn test_failed_parser_reports_original_error() {
        let mut parser = FrameParser::new();
        let first = parser
            .feed(b"Content-Length: 99999999999999999999999999\r\n\r\n")
            .unwrap_err();
        assert!(matches!(first, ProtocolError::LengthOverflow { .. }));

        // Further feeds repeat the failure that killed the parser, header
        // text included, rather than inventing a different one.
        let again = parser.feed(&part(b"payload")).unwrap_err();
        assert_eq!(again, first);
    }

    #[test]
    fn test_length_overflow_fails() {
        let mut parser = FrameParser::new();
        let err = parser
            .feed(b"Content-Length: 99999999999999999999999999\r\n\r\n")
            .unwrap_err();

        assert!(matches!(err, ProtocolError::LengthOverflow { .. }));
    }

    #[test]
    fn test_empty_payload() {
        let mut parser = FrameParser::new();
        let frames = parser.feed(b"Content-Length: 0\r\n\r\n").unwrap();

        assert_eq!(frames.len(), 1);
        assert!(frames[0].is_empty());
    }

    #[test]
    fn test_partial_body_waits() {
        let mut parser = FrameParser::new();
        assert!(parser.feed(b"Content-Length: 8\r\n\r\nabc").unwrap().is_empty());
        assert_eq!(parser.state(), &ParseState::ReadBody { remaining: 8 });

        let frames = parser.feed(b"defgh").unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..], b"abcdefgh");
    }
}
