use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ─── Identifiers ──────────────────────────────────────────────────

/// Host tab identifier. Browsers hand these out as integers; the host's
/// "no tab" sentinel (-1) never enters the coordinator's tables.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TabId(pub i64);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Host window identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct WindowId(pub i64);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ─── Resource Key ─────────────────────────────────────────────────

/// One logical ticket resource: account subdomain + numeric ticket id.
/// Two URLs with the same key represent the same ticket tab regardless of
/// exact URL shape (plain route vs hash route).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    pub subdomain: String,
    pub ticket_id: u64,
}

impl ResourceKey {
    pub fn new(subdomain: impl Into<String>, ticket_id: u64) -> Self {
        Self {
            subdomain: subdomain.into(),
            ticket_id,
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.subdomain, self.ticket_id)
    }
}

// ─── Tracked Tab ──────────────────────────────────────────────────

/// How a tracked tab came into existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TabOrigin {
    /// Opened directly by the user; recency is time-boxed.
    UserCreated,
    /// Spawned by the browser to host a navigation (link with a new-tab
    /// target). By construction never a pre-existing tab, so recent until
    /// forgotten regardless of elapsed time.
    NavigationTarget,
}

impl TabOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UserCreated => "user_created",
            Self::NavigationTarget => "navigation_target",
        }
    }
}

impl fmt::Display for TabOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recency-tracking record for one tab. A tab id maps to at most one of
/// these at a time; re-marking overwrites in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedTab {
    pub tab_id: TabId,
    pub origin: TabOrigin,
    pub first_seen_at: DateTime<Utc>,
}

// ─── Candidate Tab ────────────────────────────────────────────────

/// A reuse candidate, built fresh from a live registry query for each
/// hand-off. Never cached: a stale snapshot could point the hand-off at a
/// closed or repurposed tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateTab {
    pub tab_id: TabId,
    pub url: String,
    pub window_id: WindowId,
    /// Last time the host reports the tab was foregrounded. Some hosts
    /// report none; the selector then falls back to a stable tie-break.
    pub last_accessed_at: Option<DateTime<Utc>>,
}

// ─── Tests ────────────────────────────────────────────────────────
