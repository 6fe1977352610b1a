//! Per-resource mutual exclusion with failsafe expiry, plus the single
//! global reuse-in-progress flag.
//!
//! A hand-off chains several asynchronous browser calls, any of which may
//! never resolve (a tab can vanish mid-operation), so a lock that outlives
//! the failsafe duration is treated as free on the next read — a wedged
//! hand-off can never permanently block its resource. A second acquisition
//! attempt while a lock is live is dropped, not queued: duplicate
//! navigation events for the same resource are redundant, not separate
//! requests.

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};

use crate::types::ResourceKey;

// ─── Constants ────────────────────────────────────────────────────

/// Failsafe lock expiry (seconds). Strictly longer than any expected
/// end-to-end hand-off.
pub const LOCK_FAILSAFE_SECS: i64 = 30;

// ─── Lock Table ───────────────────────────────────────────────────

/// Per-resource lock table plus the global busy flag.
#[derive(Debug, Clone)]
pub struct LockTable {
    locks: HashMap<ResourceKey, DateTime<Utc>>,
    failsafe: TimeDelta,
    global_busy: bool,
}

impl LockTable {
    /// Table with the default failsafe duration.
    pub fn new() -> Self {
        Self::with_failsafe(TimeDelta::seconds(LOCK_FAILSAFE_SECS))
    }

    /// Table with an explicit failsafe duration (fixed for its lifetime).
    pub fn with_failsafe(failsafe: TimeDelta) -> Self {
        Self {
            locks: HashMap::new(),
            failsafe,
            global_busy: false,
        }
    }

    /// Try to acquire the lock for a resource. Returns `false` while a
    /// live lock exists; an expired lock is reclaimed in place.
    pub fn try_acquire(&mut self, key: &ResourceKey, now: DateTime<Utc>) -> bool {
        if let Some(&acquired_at) = self.locks.get(key) {
            if now.signed_duration_since(acquired_at) < self.failsafe {
                return false;
            }
        }
        self.locks.insert(key.clone(), now);
        true
    }

    /// Release a lock. Idempotent: releasing an unheld or already expired
    /// lock is a no-op.
    pub fn release(&mut self, key: &ResourceKey) {
        self.locks.remove(key);
    }

    /// Whether a live (unexpired) lock exists for this resource.
    pub fn is_held(&self, key: &ResourceKey, now: DateTime<Utc>) -> bool {
        self.locks
            .get(key)
            .is_some_and(|&at| now.signed_duration_since(at) < self.failsafe)
    }

    /// Toggle the global reuse-in-progress flag.
    pub fn set_global_busy(&mut self, busy: bool) {
        self.global_busy = busy;
    }

    /// True while any hand-off is running. Suppresses default tracking of
    /// navigation-target tabs so a hand-off's own focus/update calls cannot
    /// spawn a second candidate that re-enters the pipeline.
    pub fn is_global_busy(&self) -> bool {
        self.global_busy
    }

    /// Number of live locks at `now`.
    pub fn live_locks(&self, now: DateTime<Utc>) -> usize {
        self.locks
            .values()
            .filter(|&&at| now.signed_duration_since(at) < self.failsafe)
            .count()
    }
}

impl Default for LockTable {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ────────────────────────────────────────────────────────
