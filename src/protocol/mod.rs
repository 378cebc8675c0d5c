//! MJPEG multipart stream protocol
//!
//! The upstream daemon answers a bare `GET / HTTP/1.0` request with an
//! unbounded `multipart/x-mixed-replace` byte stream. Nothing of HTTP beyond
//! the repeated `Content-Length:` header lines is parsed; boundaries, status
//! line, and any other headers are treated as noise between frames.

pub mod parser;

pub use parser::{FrameParser, ParseState};
