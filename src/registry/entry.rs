//! Registry entry for a live connection

use tokio::task::JoinHandle;

/// Handle to one source's pull connection
///
/// Owned exclusively by the registry's connection table; removing the entry
/// and calling [`shutdown`](ConnectionHandle::shutdown) is the only way a
/// connection dies from the outside. The `conn_id` is process-unique so a
/// task that outlived its registry entry can never deregister a replacement
/// connection for the same source.
#[derive(Debug)]
pub struct ConnectionHandle {
    conn_id: u64,
    port: u16,
    task: JoinHandle<()>,
}

impl ConnectionHandle {
    /// Wrap a spawned connection task
    pub fn new(conn_id: u64, port: u16, task: JoinHandle<()>) -> Self {
        Self {
            conn_id,
            port,
            task,
        }
    }

    /// Process-unique id of this connection
    pub fn conn_id(&self) -> u64 {
        self.conn_id
    }

    /// Destination port on localhost
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Abort the connection task.
    ///
    /// Takes effect at the task's next await point; safe to call on a task
    /// that already finished.
    pub fn shutdown(&self) {
        self.task.abort();
    }
}
