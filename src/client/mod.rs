//! MJPEG pull client
//!
//! One connection task per source pulls the multipart stream and pushes
//! frames into the registry; [`MjpegPool`] is the public entry point used by
//! snapshot and streaming handlers.

pub(crate) mod connection;
pub mod pool;

pub use pool::MjpegPool;
