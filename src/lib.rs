//! Client-side MJPEG frame puller with a latest-frame cache.
//!
//! Maintains one persistent connection per video source to a local
//! MJPEG-over-HTTP endpoint, continuously extracts JPEG frames from the
//! multipart stream, and caches the most recent frame per source so
//! unrelated consumers (snapshot handlers, stream handlers) can fetch it
//! synchronously at any rate.
//!
//! # Architecture
//!
//! ```text
//!  consumer ──get_frame──► MjpegPool ──────► FrameRegistry
//!                             │                ▲  frames / last_access
//!                             │ first access   │
//!                             ▼                │ store_frame
//!                       connection task ── FrameParser
//!                             │
//!                       localhost:port (GET / HTTP/1.0)
//! ```
//!
//! Connections are created lazily on first access, closed by the reaper
//! once no consumer has asked for the source within the idle timeout, and
//! torn down in bulk on shutdown via [`MjpegPool::close_all`]. Upstream
//! failures never surface to consumers; the affected connection is closed
//! and the next access opens a fresh one.
//!
//! Frame payloads are opaque bytes: nothing here decodes or validates JPEG
//! content.

pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod source;

pub use client::MjpegPool;
pub use config::PoolConfig;
pub use error::{Error, ProtocolError, Result};
pub use protocol::FrameParser;
pub use registry::FrameRegistry;
pub use source::{DaemonMonitor, ProtocolKind, SourceId, SourceInfo, SourceStore};
