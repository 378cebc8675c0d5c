//! Pull-connection pool
//!
//! Public entry points for frame consumers. `get_frame` is the pull side of
//! a push-to-cache model: connections push frames into the registry on their
//! own schedule, and consumers read whatever is latest. Calling it at any
//! rate is safe; it never blocks on upstream I/O.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::task::JoinHandle;

use super::connection;
use crate::config::PoolConfig;
use crate::registry::{ConnectionHandle, FrameRegistry};
use crate::source::{DaemonMonitor, SourceId, SourceStore};

/// Pool of MJPEG pull connections with a latest-frame cache
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use mjpeg_cache::{MjpegPool, SourceId};
/// # use mjpeg_cache::{DaemonMonitor, SourceStore, SourceInfo};
/// # struct Store;
/// # impl SourceStore for Store {
/// #     fn get_source(&self, _: SourceId) -> Option<SourceInfo> { None }
/// # }
/// # struct Monitor;
/// # impl DaemonMonitor for Monitor {
/// #     fn is_running(&self) -> bool { true }
/// # }
///
/// # async fn example() {
/// let pool = Arc::new(MjpegPool::new(Arc::new(Store), Arc::new(Monitor)));
/// let _reaper = pool.spawn_reaper_task();
///
/// // In a snapshot handler:
/// match pool.get_frame(SourceId(1)).await {
///     Some(jpeg) => { /* serve the frame */ }
///     None => { /* no frame available yet */ }
/// }
/// # }
/// ```
pub struct MjpegPool {
    config: PoolConfig,
    registry: Arc<FrameRegistry>,
    sources: Arc<dyn SourceStore>,
    monitor: Arc<dyn DaemonMonitor>,
    next_conn_id: AtomicU64,
}

impl MjpegPool {
    /// Create a pool with default configuration
    pub fn new(sources: Arc<dyn SourceStore>, monitor: Arc<dyn DaemonMonitor>) -> Self {
        Self::with_config(PoolConfig::default(), sources, monitor)
    }

    /// Create a pool with custom configuration
    pub fn with_config(
        config: PoolConfig,
        sources: Arc<dyn SourceStore>,
        monitor: Arc<dyn DaemonMonitor>,
    ) -> Self {
        Self {
            config,
            registry: Arc::new(FrameRegistry::new()),
            sources,
            monitor,
            next_conn_id: AtomicU64::new(1),
        }
    }

    /// Pool configuration
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// The underlying registry
    pub fn registry(&self) -> &Arc<FrameRegistry> {
        &self.registry
    }

    /// Latest frame for a source, opening a pull connection on first access.
    ///
    /// Returns `None` when the streaming daemon is down, the source is
    /// unknown, disabled, or not locally captured, or simply when no frame
    /// has arrived yet. Callers cannot distinguish these cases and must not
    /// treat `None` as a permanent failure.
    pub async fn get_frame(&self, id: SourceId) -> Option<Bytes> {
        if !self.monitor.is_running() {
            return None;
        }

        if !self.registry.has_connection(id).await {
            let info = match self.sources.get_source(id) {
                Some(info) => info,
                None => {
                    tracing::error!(source = %id, "cannot start mjpeg client: unknown source");
                    return None;
                }
            };

            if !info.streamable() {
                tracing::error!(
                    source = %id,
                    "cannot start mjpeg client: source disabled or not local"
                );
                return None;
            }

            tracing::debug!(source = %id, "creating mjpeg client");
            self.registry
                .register_connection(id, || {
                    let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
                    let task = connection::spawn(
                        Arc::clone(&self.registry),
                        id,
                        info.port,
                        conn_id,
                        self.config.read_buffer_size,
                    );
                    ConnectionHandle::new(conn_id, info.port, task)
                })
                .await;
        }

        // Signal intent to use even before the first frame arrives; the
        // reaper measures consumer activity, not frame freshness.
        self.registry.touch(id).await;

        self.registry.latest_frame(id).await
    }

    /// Close every pull connection.
    ///
    /// Cached frames stay readable; a later `get_frame` opens a fresh
    /// connection on demand.
    pub async fn close_all(&self) {
        self.registry.close_all().await;
    }

    /// Spawn the idle-connection reaper.
    ///
    /// Runs once immediately, then once per idle-timeout period; each run
    /// closes connections whose last consumer access is older than that same
    /// period. Returns a handle that can be used to abort the task.
    pub fn spawn_reaper_task(self: &Arc<Self>) -> JoinHandle<()> {
        let pool = Arc::clone(self);
        let period = pool.config.idle_timeout;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                tracing::debug!("running reaper for mjpeg clients");
                let reaped = pool.registry.reap_idle(period).await;
                if reaped > 0 {
                    tracing::info!(count = reaped, "idle mjpeg connections closed");
                }
            }
        })
    }
}
