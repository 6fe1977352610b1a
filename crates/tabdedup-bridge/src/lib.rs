//! tabdedup-bridge: browser-host IO boundary.
//!
//! Capability traits for the tab registry, script injection, and settings;
//! wire event types; and the native-messaging stdio transport. No business
//! logic — the engine only ever sees the traits.

#![allow(async_fn_in_trait)]

pub mod error;
pub mod events;
pub mod host;
pub mod registry;
pub mod script;
pub mod settings;
pub mod tabs;

pub use error::BridgeError;
pub use events::BrowserEvent;
pub use host::{NativeMessagingHost, stdio_host};
pub use registry::TabRegistry;
pub use script::{InPageScript, ScriptRunner, script_succeeded};
pub use settings::{HOST_SUFFIX_KEY, PREFER_IN_PLACE_KEY, SettingsStore};
pub use tabs::{TabInfo, TabUpdate};
