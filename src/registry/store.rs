//! Frame registry implementation
//!
//! Central registry owning the connection, frame, and last-access tables.
//! All lifecycle transitions (register, deregister, close, reap) go through
//! here so the "at most one live connection per source" invariant holds in
//! one place.

use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::entry::ConnectionHandle;
use crate::source::SourceId;

/// Registry of pull connections and their cached frames
///
/// Thread-safe via `RwLock`; cache reads on the `get_frame` hot path take
/// only read locks on the frame table.
pub struct FrameRegistry {
    /// One live connection per source, inserted before connect completes
    connections: RwLock<HashMap<SourceId, ConnectionHandle>>,

    /// Most recent complete frame per source; overwritten, never appended
    frames: RwLock<HashMap<SourceId, Bytes>>,

    /// Moment of the most recent consumer request per source
    last_access: RwLock<HashMap<SourceId, Instant>>,
}

impl FrameRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            frames: RwLock::new(HashMap::new()),
            last_access: RwLock::new(HashMap::new()),
        }
    }

    /// Register a connection for a source unless one already exists.
    ///
    /// The check and the insert happen under one write lock, so rapid
    /// repeated calls for the same source produce exactly one connection.
    /// `make` is only invoked when the slot is vacant. Returns whether a
    /// connection was created.
    pub async fn register_connection<F>(&self, id: SourceId, make: F) -> bool
    where
        F: FnOnce() -> ConnectionHandle,
    {
        let mut connections = self.connections.write().await;

        if connections.contains_key(&id) {
            return false;
        }

        let handle = make();
        tracing::debug!(
            source = %id,
            port = handle.port(),
            conn_id = handle.conn_id(),
            "mjpeg connection registered"
        );
        connections.insert(id, handle);
        true
    }

    /// Remove a connection entry if it still belongs to `conn_id`.
    ///
    /// Called by a connection task on its own failure. Idempotent: a second
    /// call, or a call after the entry was replaced by a newer connection,
    /// is a no-op. Returns whether an entry was removed.
    pub async fn deregister(&self, id: SourceId, conn_id: u64) -> bool {
        let mut connections = self.connections.write().await;

        match connections.get(&id) {
            Some(handle) if handle.conn_id() == conn_id => {
                connections.remove(&id);
                tracing::debug!(source = %id, conn_id, "mjpeg connection removed");
                true
            }
            _ => false,
        }
    }

    /// Close a source's connection, if any. Idempotent.
    pub async fn close(&self, id: SourceId) -> bool {
        let mut connections = self.connections.write().await;

        if let Some(handle) = connections.remove(&id) {
            handle.shutdown();
            tracing::debug!(source = %id, "mjpeg connection closed");
            true
        } else {
            false
        }
    }

    /// Close every registered connection.
    ///
    /// Frame and access tables are left intact; cached frames remain
    /// readable until the process ends.
    pub async fn close_all(&self) {
        let mut connections = self.connections.write().await;
        let count = connections.len();

        for (id, handle) in connections.drain() {
            handle.shutdown();
            tracing::debug!(source = %id, "mjpeg connection closed");
        }

        if count > 0 {
            tracing::info!(count, "all mjpeg connections closed");
        }
    }

    /// Close every connection idle for longer than `timeout`.
    ///
    /// Idleness is measured against consumer activity (last access), not
    /// frame freshness. Connections never touched by a consumer are skipped.
    /// Returns the number of connections closed.
    pub async fn reap_idle(&self, timeout: Duration) -> usize {
        let now = Instant::now();

        let mut connections = self.connections.write().await;
        let last_access = self.last_access.read().await;

        let expired: Vec<SourceId> = connections
            .keys()
            .filter(|id| match last_access.get(id) {
                Some(at) => now.duration_since(*at) > timeout,
                None => false,
            })
            .copied()
            .collect();

        for id in &expired {
            if let Some(handle) = connections.remove(id) {
                handle.shutdown();
                tracing::debug!(source = %id, "mjpeg connection timed out");
            }
        }

        expired.len()
    }

    /// Store the latest frame for a source, replacing any previous one
    pub async fn store_frame(&self, id: SourceId, frame: Bytes) {
        self.frames.write().await.insert(id, frame);
    }

    /// Most recent frame for a source, if any has arrived yet.
    ///
    /// Absent means "no frame received yet", which is distinct from (and
    /// indistinguishable at this API from) "no connection".
    pub async fn latest_frame(&self, id: SourceId) -> Option<Bytes> {
        self.frames.read().await.get(&id).cloned()
    }

    /// Record a consumer request for a source at the current instant
    pub async fn touch(&self, id: SourceId) {
        self.last_access.write().await.insert(id, Instant::now());
    }

    /// Moment of the most recent consumer request, if any
    pub async fn last_access(&self, id: SourceId) -> Option<Instant> {
        self.last_access.read().await.get(&id).copied()
    }

    /// Whether a connection is registered (live or still connecting)
    pub async fn has_connection(&self, id: SourceId) -> bool {
        self.connections.read().await.contains_key(&id)
    }

    /// Number of registered connections
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

impl Default for FrameRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_handle(conn_id: u64, port: u16) -> ConnectionHandle {
        ConnectionHandle::new(conn_id, port, tokio::spawn(std::future::pending()))
    }

    #[tokio::test]
    async fn test_register_once() {
        let registry = FrameRegistry::new();
        let id = SourceId(1);

        assert!(registry.register_connection(id, || dummy_handle(1, 8081)).await);
        assert!(!registry.register_connection(id, || dummy_handle(2, 8081)).await);
        assert_eq!(registry.connection_count().await, 1);
    }

    #[tokio::test]
    async fn test_deregister_checks_generation() {
        let registry = FrameRegistry::new();
        let id = SourceId(1);

        registry.register_connection(id, || dummy_handle(7, 8081)).await;

        // Wrong conn_id: entry belongs to a different connection
        assert!(!registry.deregister(id, 6).await);
        assert!(registry.has_connection(id).await);

        assert!(registry.deregister(id, 7).await);
        assert!(!registry.has_connection(id).await);

        // Second deregister is a no-op
        assert!(!registry.deregister(id, 7).await);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let registry = FrameRegistry::new();
        let id = SourceId(1);

        registry.register_connection(id, || dummy_handle(1, 8081)).await;

        assert!(registry.close(id).await);
        assert!(!registry.close(id).await);
    }

    #[tokio::test]
    async fn test_latest_frame_wins() {
        let registry = FrameRegistry::new();
        let id = SourceId(3);

        assert!(registry.latest_frame(id).await.is_none());

        registry.store_frame(id, Bytes::from_static(b"one")).await;
        registry.store_frame(id, Bytes::from_static(b"two")).await;

        assert_eq!(registry.latest_frame(id).await.unwrap(), &b"two"[..]);
    }

    #[tokio::test]
    async fn test_frame_survives_close() {
        let registry = FrameRegistry::new();
        let id = SourceId(1);

        registry.register_connection(id, || dummy_handle(1, 8081)).await;
        registry.store_frame(id, Bytes::from_static(b"kept")).await;
        registry.close(id).await;

        assert_eq!(registry.latest_frame(id).await.unwrap(), &b"kept"[..]);
    }

    #[tokio::test]
    async fn test_close_all() {
        let registry = FrameRegistry::new();

        for n in 0..3 {
            registry
                .register_connection(SourceId(n), || dummy_handle(n as u64, 8081))
                .await;
        }
        assert_eq!(registry.connection_count().await, 3);

        registry.close_all().await;
        assert_eq!(registry.connection_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reap_idle_connection() {
        let timeout = Duration::from_secs(60);
        let registry = FrameRegistry::new();
        let id = SourceId(1);

        registry.register_connection(id, || dummy_handle(1, 8081)).await;
        registry.touch(id).await;

        tokio::time::advance(Duration::from_secs(61)).await;

        assert_eq!(registry.reap_idle(timeout).await, 1);
        assert!(!registry.has_connection(id).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recently_touched_survives_reap() {
        let timeout = Duration::from_secs(60);
        let registry = FrameRegistry::new();
        let id = SourceId(1);

        registry.register_connection(id, || dummy_handle(1, 8081)).await;
        registry.touch(id).await;

        tokio::time::advance(Duration::from_secs(30)).await;
        registry.touch(id).await;
        tokio::time::advance(Duration::from_secs(45)).await;

        // 45s since last touch, under the 60s threshold
        assert_eq!(registry.reap_idle(timeout).await, 0);
        assert!(registry.has_connection(id).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_accessed_is_not_reaped() {
        let timeout = Duration::from_secs(60);
        let registry = FrameRegistry::new();
        let id = SourceId(1);

        registry.register_connection(id, || dummy_handle(1, 8081)).await;

        tokio::time::advance(Duration::from_secs(3600)).await;

        assert_eq!(registry.reap_idle(timeout).await, 0);
        assert!(registry.has_connection(id).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_frame_survives_reap() {
        let timeout = Duration::from_secs(60);
        let registry = FrameRegistry::new();
        let id = SourceId(1);

        registry.register_connection(id, || dummy_handle(1, 8081)).await;
        registry.touch(id).await;
        registry.store_frame(id, Bytes::from_static(b"p1")).await;

        tokio::time::advance(Duration::from_secs(61)).await;
        registry.reap_idle(timeout).await;

        assert!(!registry.has_connection(id).await);
        assert_eq!(registry.latest_frame(id).await.unwrap(), &b"p1"[..]);
    }
}
