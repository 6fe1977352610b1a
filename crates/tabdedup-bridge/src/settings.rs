//! Settings store capability. The store, its schema, and its persistence
//! belong to the extension; the coordinator only reads two values.

use crate::error::BridgeError;

/// Whether in-place (no full reload) navigation is preferred.
pub const PREFER_IN_PLACE_KEY: &str = "prefer_in_place_navigation";

/// Resource-hosting domain suffix (e.g. `zendesk.com`).
pub const HOST_SUFFIX_KEY: &str = "ticket_host_suffix";

/// Read-only view of the externally owned settings store.
pub trait SettingsStore: Send + Sync {
    /// `Ok(None)` when the key is unset.
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, BridgeError>;
}
