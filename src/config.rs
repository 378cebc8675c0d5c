//! Pool configuration

use std::time::Duration;

/// Configuration for an [`MjpegPool`](crate::client::MjpegPool)
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Idle timeout for pulled connections.
    ///
    /// A connection untouched by `get_frame` for longer than this is closed
    /// by the reaper. The same duration is used as the reaper's run period,
    /// so a single constant governs both the check interval and the
    /// staleness threshold.
    pub idle_timeout: Duration,

    /// Size of the socket read buffer, in bytes
    pub read_buffer_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(10),
            read_buffer_size: 16 * 1024, // 16KB
        }
    }
}

impl PoolConfig {
    /// Set the idle timeout (and reaper period)
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the socket read buffer size
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }
}
