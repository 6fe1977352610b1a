//! Recency-windowed tracking of freshly created tabs.
//!
//! Only a *new* tab may trigger a reuse hand-off; a long-open tab the user
//! revisits must never self-close. `UserCreated` entries are recent for a
//! fixed window (long enough to absorb redirect chains, short enough that
//! revisited old tabs don't qualify). `NavigationTarget` entries are recent
//! until forgotten: the browser created those tabs specifically to host a
//! navigation, so they cannot be pre-existing.

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};

use crate::types::{TabId, TabOrigin, TrackedTab};

// ─── Constants ────────────────────────────────────────────────────

/// Recency window for `UserCreated` tabs (seconds).
pub const RECENT_WINDOW_SECS: i64 = 15;

// ─── Tracker ──────────────────────────────────────────────────────

/// In-memory, TTL-bounded table of recently created tabs.
///
/// One entry per tab id; re-marking overwrites. All state is volatile by
/// design — a host restart simply re-derives it from the next events.
#[derive(Debug, Clone)]
pub struct TabTracker {
    entries: HashMap<TabId, TrackedTab>,
    window: TimeDelta,
}

impl TabTracker {
    /// Tracker with the default recency window.
    pub fn new() -> Self {
        Self::with_window(TimeDelta::seconds(RECENT_WINDOW_SECS))
    }

    /// Tracker with an explicit recency window (fixed for its lifetime).
    pub fn with_window(window: TimeDelta) -> Self {
        Self {
            entries: HashMap::new(),
            window,
        }
    }

    /// Register a tab the user opened directly.
    pub fn mark_created(&mut self, tab_id: TabId, now: DateTime<Utc>) {
        self.entries.insert(
            tab_id,
            TrackedTab {
                tab_id,
                origin: TabOrigin::UserCreated,
                first_seen_at: now,
            },
        );
    }

    /// Register a tab the browser spawned to host a navigation.
    pub fn mark_navigation_target(&mut self, tab_id: TabId, now: DateTime<Utc>) {
        self.entries.insert(
            tab_id,
            TrackedTab {
                tab_id,
                origin: TabOrigin::NavigationTarget,
                first_seen_at: now,
            },
        );
    }

    /// Whether this tab counts as "new" for reuse purposes.
    ///
    /// Side effect: an expired `UserCreated` entry is evicted on read.
    pub fn is_recent(&mut self, tab_id: TabId, now: DateTime<Utc>) -> bool {
        let Some(entry) = self.entries.get(&tab_id) else {
            return false;
        };
        match entry.origin {
            TabOrigin::NavigationTarget => true,
            TabOrigin::UserCreated => {
                if now.signed_duration_since(entry.first_seen_at) <= self.window {
                    true
                } else {
                    self.entries.remove(&tab_id);
                    false
                }
            }
        }
    }

    /// Drop the entry for a tab (hand-off completed, or the tab closed).
    pub fn forget(&mut self, tab_id: TabId) {
        self.entries.remove(&tab_id);
    }

    /// Evict everything older than twice the window, guarding against
    /// unbounded growth when a hand-off or removal path was skipped.
    /// Returns the evicted tab ids (sorted, for stable logging).
    pub fn sweep(&mut self, now: DateTime<Utc>) -> Vec<TabId> {
        let horizon = self.window * 2;
        let mut evicted: Vec<TabId> = self
            .entries
            .values()
            .filter(|e| now.signed_duration_since(e.first_seen_at) > horizon)
            .map(|e| e.tab_id)
            .collect();
        evicted.sort();
        for id in &evicted {
            self.entries.remove(id);
        }
        evicted
    }

    /// Snapshot of tracked navigation-target tabs (sorted). The caller
    /// probes each against the live registry and forgets the dead ones —
    /// existence checks are IO and stay out of this crate.
    pub fn navigation_target_ids(&self) -> Vec<TabId> {
        let mut ids: Vec<TabId> = self
            .entries
            .values()
            .filter(|e| e.origin == TabOrigin::NavigationTarget)
            .map(|e| e.tab_id)
            .collect();
        ids.sort();
        ids
    }

    /// Current entry for a tab, if tracked.
    pub fn get(&self, tab_id: TabId) -> Option<&TrackedTab> {
        self.entries.get(&tab_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for TabTracker {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ────────────────────────────────────────────────────────
