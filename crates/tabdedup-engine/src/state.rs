//! Shared coordinator tables.

use std::sync::Arc;

use tokio::sync::Mutex;

use tabdedup_core::lock::LockTable;
use tabdedup_core::tracker::TabTracker;

use crate::config::EngineConfig;

/// The mutable tables every decision reads and writes: the recency tracker
/// and the per-resource lock table. One instance lives behind one async
/// mutex; on a multi-threaded host that mutex is what serializes access.
#[derive(Debug)]
pub struct CoordState {
    pub tracker: TabTracker,
    pub locks: LockTable,
}

impl CoordState {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            tracker: TabTracker::with_window(config.recent_window()),
            locks: LockTable::with_failsafe(config.failsafe_delta()),
        }
    }
}

pub type SharedState = Arc<Mutex<CoordState>>;

pub fn shared(config: &EngineConfig) -> SharedState {
    Arc::new(Mutex::new(CoordState::new(config)))
}
