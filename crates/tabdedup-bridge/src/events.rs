//! Inbound browser events, as framed by the extension side.

use serde::{Deserialize, Serialize};

use tabdedup_core::types::TabId;

/// The four event streams the coordinator consumes. `frame_id == 0` marks
/// a top-level navigation; anything else is a sub-frame and is ignored by
/// the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BrowserEvent {
    /// The user opened a tab directly.
    TabCreated { tab: TabId },
    /// The browser spawned a tab specifically to host a navigation
    /// (e.g. a link honoring a new-tab target).
    NavigationTargetCreated {
        source_tab: TabId,
        tab: TabId,
        url: String,
    },
    /// A top-level or sub-frame navigation finished committing.
    NavigationCommitted {
        tab: TabId,
        url: String,
        frame_id: i64,
    },
    /// The page rewrote its history state (SPA route change).
    HistoryStateUpdated {
        tab: TabId,
        url: String,
        frame_id: i64,
    },
    /// A tab closed, for any reason.
    TabRemoved { tab: TabId },
}

impl BrowserEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TabCreated { .. } => "tab_created",
            Self::NavigationTargetCreated { .. } => "navigation_target_created",
            Self::NavigationCommitted { .. } => "navigation_committed",
            Self::HistoryStateUpdated { .. } => "history_state_updated",
            Self::TabRemoved { .. } => "tab_removed",
        }
    }
}
