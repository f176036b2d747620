//! Policy snapshot and the process-local cache that owns it.
//!
//! The snapshot is server-owned and replace-only: nothing in this crate
//! mutates a snapshot field after it has been decoded. The cache pairs the
//! snapshot with the local sync state and is written only by the sync client.

mod snapshot;
mod state;

pub use snapshot::{DailyBudget, PolicySnapshot};
pub use state::{PolicyCache, SharedCache, SyncState};
