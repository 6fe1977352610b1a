//! tabdedup-core: pure decision logic for the tab-reuse coordinator.
//!
//! URL classification, recency-windowed tab tracking, per-resource locking,
//! candidate selection, and the hand-off state machine vocabulary. No IO and
//! no clock access: every time-dependent operation takes `now` as a
//! parameter, so everything here is deterministic and unit-testable.

pub mod classify;
pub mod handoff;
pub mod lock;
pub mod select;
pub mod tracker;
pub mod types;

pub use classify::{Classification, canonical_url, classify, ticket_route};
pub use handoff::{AbortReason, HandoffOutcome, HandoffState};
pub use lock::{LOCK_FAILSAFE_SECS, LockTable};
pub use select::select_target;
pub use tracker::{RECENT_WINDOW_SECS, TabTracker};
pub use types::{CandidateTab, ResourceKey, TabId, TabOrigin, TrackedTab, WindowId};
