//! Source identity and configuration collaborators
//!
//! The pool does not own camera configuration or daemon supervision; it
//! consults them through the [`SourceStore`] and [`DaemonMonitor`] traits.
//! Implementations typically wrap a configuration file reader and a process
//! monitor for the upstream streaming daemon.

/// Identifier of a configured video source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(pub u32);

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SourceId {
    fn from(id: u32) -> Self {
        SourceId(id)
    }
}

/// How a source's video is captured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolKind {
    /// Captured by the local streaming daemon; exposes an MJPEG port on
    /// localhost. Only these sources are eligible for pulling.
    LocalCapture,
    /// Served by a remote device; not reachable through the local daemon
    Remote,
}

/// Configuration attributes of a single source
#[derive(Debug, Clone, Copy)]
pub struct SourceInfo {
    /// Whether the source is enabled
    pub enabled: bool,
    /// Capture protocol
    pub kind: ProtocolKind,
    /// Local port of the source's MJPEG endpoint
    pub port: u16,
}

impl SourceInfo {
    /// True when a connection may be opened for this source
    pub fn streamable(&self) -> bool {
        self.enabled && self.kind == ProtocolKind::LocalCapture
    }
}

/// Lookup of per-source configuration
pub trait SourceStore: Send + Sync {
    /// Get the configuration for a source, if it exists
    fn get_source(&self, id: SourceId) -> Option<SourceInfo>;
}

/// Liveness check for the upstream streaming daemon
pub trait DaemonMonitor: Send + Sync {
    /// Whether the daemon that serves the MJPEG endpoints is currently running
    fn is_running(&self) -> bool;
}
