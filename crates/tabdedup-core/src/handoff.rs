//! Hand-off state machine vocabulary: states, abort reasons, outcomes,
//! navigation techniques, and the transition legality table.
//!
//! The async driver lives in the engine crate; this module pins down what
//! transitions are legal so the driver can assert them and every trace
//! line names a real state.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::TabId;

// ─── States ───────────────────────────────────────────────────────

/// States of one hand-off execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoffState {
    Idle,
    Locking,
    Selecting,
    Focusing,
    Navigating,
    ClosingOrigin,
    Done,
    Aborted,
}

impl HandoffState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Locking => "locking",
            Self::Selecting => "selecting",
            Self::Focusing => "focusing",
            Self::Navigating => "navigating",
            Self::ClosingOrigin => "closing_origin",
            Self::Done => "done",
            Self::Aborted => "aborted",
        }
    }

    /// Terminal states admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }

    /// Transition legality. The happy path is linear; `Navigating` may be
    /// skipped when the target already shows the resource; `Aborted` is
    /// reachable from every non-terminal state.
    pub fn can_advance_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == Self::Aborted {
            return true;
        }
        matches!(
            (self, next),
            (Self::Idle, Self::Locking)
                | (Self::Locking, Self::Selecting)
                | (Self::Selecting, Self::Focusing)
                | (Self::Focusing, Self::Navigating)
                | (Self::Focusing, Self::ClosingOrigin)
                | (Self::Navigating, Self::ClosingOrigin)
                | (Self::ClosingOrigin, Self::Done)
        )
    }
}

impl fmt::Display for HandoffState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Abort Reasons ────────────────────────────────────────────────

/// Why a hand-off stopped short of `Done`. None of these are fatal to the
/// host; all funnel through the same cleanup path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    /// Another hand-off holds this resource; this one is debounced.
    LockHeld,
    /// No existing tab qualified for reuse.
    NoCandidate,
    /// The target or origin tab vanished mid-operation.
    TabGone,
    /// A browser call failed for a non-tab-gone reason.
    HostFailure,
    /// The failsafe bound elapsed before the hand-off finished.
    Failsafe,
}

impl AbortReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LockHeld => "lock_held",
            Self::NoCandidate => "no_candidate",
            Self::TabGone => "tab_gone",
            Self::HostFailure => "host_failure",
            Self::Failsafe => "failsafe",
        }
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Outcome ──────────────────────────────────────────────────────

/// Final result of one hand-off execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoffOutcome {
    /// The target tab now shows the resource and is focused.
    Completed {
        target: TabId,
        /// False when the origin tab was already gone at close time.
        origin_closed: bool,
    },
    Aborted(AbortReason),
}

impl HandoffOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

impl fmt::Display for HandoffOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed {
                target,
                origin_closed,
            } => write!(f, "completed(target={target}, origin_closed={origin_closed})"),
            Self::Aborted(reason) => write!(f, "aborted({reason})"),
        }
    }
}

// ─── Navigation Techniques ────────────────────────────────────────

/// How the target tab can be brought onto the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationMethod {
    /// Invoke the page's own client-side router.
    SpaRouter,
    /// Push a history entry and fire synthetic routing events.
    HistoryPush,
    /// Click a matching in-page link (never a new-tab link).
    LinkClick,
    /// Direct URL replacement on the tab — the guaranteed fallback.
    UrlReplace,
}

impl NavigationMethod {
    /// In-place techniques tried in order before the full-reload fallback.
    pub const IN_PLACE_CHAIN: [Self; 3] = [Self::SpaRouter, Self::HistoryPush, Self::LinkClick];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SpaRouter => "spa_router",
            Self::HistoryPush => "history_push",
            Self::LinkClick => "link_click",
            Self::UrlReplace => "url_replace",
        }
    }
}

impl fmt::Display for NavigationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Tests ────────────────────────────────────────────────────────
