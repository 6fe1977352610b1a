//! Coordinator configuration: two values read from the externally owned
//! settings store, plus fixed durations with CLI-overridable defaults.

use chrono::TimeDelta;
use std::time::Duration;

use tabdedup_bridge::settings::{HOST_SUFFIX_KEY, PREFER_IN_PLACE_KEY, SettingsStore};
use tabdedup_core::classify::DEFAULT_HOST_SUFFIX;
use tabdedup_core::lock::LOCK_FAILSAFE_SECS;
use tabdedup_core::tracker::RECENT_WINDOW_SECS;

/// Grace delay before closing the origin tab (milliseconds). Long enough
/// for the user to see the hand-off land, short enough not to linger.
pub const CLOSE_GRACE_MS: u64 = 400;

/// Runtime configuration. Durations are fixed once the coordinator starts.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Resource-hosting domain suffix (lowercased).
    pub host_suffix: String,
    /// Attempt in-place navigation before falling back to a full reload.
    pub prefer_in_place: bool,
    pub recent_window_secs: i64,
    pub failsafe_secs: i64,
    pub close_grace_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            host_suffix: DEFAULT_HOST_SUFFIX.to_string(),
            prefer_in_place: true,
            recent_window_secs: RECENT_WINDOW_SECS,
            failsafe_secs: LOCK_FAILSAFE_SECS,
            close_grace_ms: CLOSE_GRACE_MS,
        }
    }
}

impl EngineConfig {
    /// Seed a config from the settings store. Missing keys, wrong types,
    /// and read failures all fall back to the defaults — the store is not
    /// ours and may be mid-migration.
    pub async fn load<S: SettingsStore>(store: &S) -> Self {
        let mut config = Self::default();

        match store.get(PREFER_IN_PLACE_KEY).await {
            Ok(Some(value)) => match value.as_bool() {
                Some(flag) => config.prefer_in_place = flag,
                None => tracing::warn!("{PREFER_IN_PLACE_KEY} is not a boolean, using default"),
            },
            Ok(None) => {}
            Err(e) => tracing::warn!("settings read failed for {PREFER_IN_PLACE_KEY}: {e}"),
        }

        match store.get(HOST_SUFFIX_KEY).await {
            Ok(Some(value)) => match value.as_str() {
                Some(suffix) if !suffix.is_empty() => {
                    config.host_suffix = suffix.to_ascii_lowercase();
                }
                _ => tracing::warn!("{HOST_SUFFIX_KEY} is not a usable string, using default"),
            },
            Ok(None) => {}
            Err(e) => tracing::warn!("settings read failed for {HOST_SUFFIX_KEY}: {e}"),
        }

        config
    }

    pub fn recent_window(&self) -> TimeDelta {
        TimeDelta::seconds(self.recent_window_secs)
    }

    pub fn failsafe_delta(&self) -> TimeDelta {
        TimeDelta::seconds(self.failsafe_secs)
    }

    pub fn failsafe(&self) -> Duration {
        Duration::from_secs(self.failsafe_secs.max(0) as u64)
    }

    pub fn close_grace(&self) -> Duration {
        Duration::from_millis(self.close_grace_ms)
    }
}

// ─── Tests ────────────────────────────────────────────────────────
