//! Host tab registry capability.

use tabdedup_core::types::{TabId, WindowId};

use crate::error::BridgeError;
use crate::tabs::{TabInfo, TabUpdate};

/// Tab registry the host exposes. Vanished tabs are a normal outcome:
/// `get_tab` reports them as `Ok(None)` and mutators surface
/// [`BridgeError::TabGone`], which callers treat as a clean abort.
///
/// Trait-shaped so tests can inject an in-memory registry.
pub trait TabRegistry: Send + Sync {
    /// All tabs whose URL matches the given pattern (trailing `*` is the
    /// usual wildcard).
    async fn query_tabs(&self, url_pattern: &str) -> Result<Vec<TabInfo>, BridgeError>;

    /// Snapshot of one tab; `Ok(None)` when it no longer exists.
    async fn get_tab(&self, id: TabId) -> Result<Option<TabInfo>, BridgeError>;

    /// Apply a partial update (URL and/or activation) to a tab.
    async fn update_tab(&self, id: TabId, update: TabUpdate) -> Result<(), BridgeError>;

    /// Close a tab.
    async fn remove_tab(&self, id: TabId) -> Result<(), BridgeError>;

    /// Bring a window to the foreground.
    async fn focus_window(&self, id: WindowId) -> Result<(), BridgeError>;
}
