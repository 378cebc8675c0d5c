//! Connection registry and frame cache
//!
//! Process-wide shared state for the pool, held as three sibling tables all
//! keyed by [`SourceId`](crate::source::SourceId):
//!
//! ```text
//!                  Arc<FrameRegistry>
//!        ┌─────────────────────────────────────┐
//!        │ connections: SourceId → handle      │  one live connection max
//!        │ frames:      SourceId → Bytes       │  latest frame wins
//!        │ last_access: SourceId → Instant     │  consumer activity
//!        └─────────────────────────────────────┘
//! ```
//!
//! The tables are siblings rather than fields of the connection, so a cached
//! frame outlives the connection that produced it: a consumer can still read
//! the last frame after an idle connection was reaped.

pub mod entry;
pub mod store;

pub use entry::ConnectionHandle;
pub use store::FrameRegistry;
