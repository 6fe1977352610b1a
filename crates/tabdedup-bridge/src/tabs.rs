//! Tab snapshots and updates exchanged with the host's tab registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tabdedup_core::types::{CandidateTab, TabId, WindowId};

/// Live tab snapshot as reported by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabInfo {
    pub id: TabId,
    pub url: String,
    pub window_id: WindowId,
    #[serde(default)]
    pub active: bool,
    /// Some hosts don't report this; the selector has a stable fallback.
    #[serde(default)]
    pub last_accessed_at: Option<DateTime<Utc>>,
}

impl TabInfo {
    pub fn to_candidate(&self) -> CandidateTab {
        CandidateTab {
            tab_id: self.id,
            url: self.url.clone(),
            window_id: self.window_id,
            last_accessed_at: self.last_accessed_at,
        }
    }
}

/// Partial update applied to a tab. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TabUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

impl TabUpdate {
    /// Repoint the tab at a new URL.
    pub fn navigate(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Bring the tab to the foreground of its window.
    pub fn activate() -> Self {
        Self {
            active: Some(true),
            ..Self::default()
        }
    }
}
