//! Error types for the browser bridge.

use thiserror::Error;

use tabdedup_core::types::{TabId, WindowId};

/// Bridge failure taxonomy. `TabGone`/`WindowGone` are normal, recoverable
/// outcomes — tabs can close at any time — and callers are expected to
/// treat them as a clean abort, not a fault.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("tab {0} is gone")]
    TabGone(TabId),

    #[error("window {0} is gone")]
    WindowGone(WindowId),

    #[error("script injection unsupported: {0}")]
    Unsupported(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("host channel closed")]
    Closed,

    #[error("bridge io error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Transient "the thing I was pointing at vanished" errors.
    pub fn is_tab_gone(&self) -> bool {
        matches!(self, Self::TabGone(_) | Self::WindowGone(_))
    }
}
