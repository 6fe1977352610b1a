//! In-page script injection capability, used only by the in-place
//! navigation attempt. Fallible and possibly unsupported by design.

use serde::{Deserialize, Serialize};

use tabdedup_core::types::TabId;

use crate::error::BridgeError;

/// The small scripts the coordinator may run inside a target tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "technique", rename_all = "snake_case")]
pub enum InPageScript {
    /// Ask the page's client-side router to navigate, if reachable.
    SpaRouter { path: String },
    /// Push a history entry and fire synthetic routing events.
    HistoryPush { path: String },
    /// Click a matching in-page ticket link, provided it is not an
    /// explicit new-tab link.
    ClickTicketLink { ticket_id: u64 },
}

/// Script execution in a tab. Implementations must treat this as
/// best-effort: [`BridgeError::Unsupported`] is an expected outcome.
pub trait ScriptRunner: Send + Sync {
    async fn run_in_tab(
        &self,
        tab: TabId,
        script: InPageScript,
    ) -> Result<serde_json::Value, BridgeError>;
}

/// Conservative success check for a script result: only a document that is
/// exactly `{"ok": true}` at the top level counts. Any other shape —
/// missing field, wrong type, partial output — is a failure, and the caller
/// falls through to the next technique.
pub fn script_succeeded(result: &serde_json::Value) -> bool {
    result
        .get("ok")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false)
}
