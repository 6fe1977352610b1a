//! Event dispatcher: routes the four inbound event streams into tracking
//! updates, hand-off requests, and the global-busy loop-breaker.
//!
//! The decision itself is a pure function over the shared tables — no IO —
//! so the runtime can compute it under the state mutex and apply the
//! resulting action afterwards.

use chrono::{DateTime, Utc};

use tabdedup_bridge::error::BridgeError;
use tabdedup_bridge::events::BrowserEvent;
use tabdedup_bridge::registry::TabRegistry;
use tabdedup_bridge::tabs::TabUpdate;
use tabdedup_core::classify::{Classification, classify};
use tabdedup_core::types::TabId;

use crate::config::EngineConfig;
use crate::executor::HandoffRequest;
use crate::state::CoordState;

/// Top-level frame id; anything else is a sub-frame navigation.
const TOP_FRAME: i64 = 0;

/// What the runtime must do after a dispatch decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchAction {
    /// Tracked, ignored, or otherwise uninteresting.
    None,
    /// Start a hand-off for this resource.
    Handoff(HandoffRequest),
    /// Loop-breaker: a hand-off is already running, so instead of tracking
    /// the freshly spawned navigation-target tab, re-point its source tab
    /// and drop the new one.
    Divert {
        source_tab: TabId,
        new_tab: TabId,
        url: String,
    },
}

/// Route one browser event. Mutates the tracker/lock tables, performs no IO.
pub fn dispatch(
    state: &mut CoordState,
    config: &EngineConfig,
    event: &BrowserEvent,
    now: DateTime<Utc>,
) -> DispatchAction {
    match event {
        BrowserEvent::TabCreated { tab } => {
            state.tracker.mark_created(*tab, now);
            DispatchAction::None
        }

        BrowserEvent::NavigationTargetCreated {
            source_tab,
            tab,
            url,
        } => {
            let is_resource = matches!(
                classify(url, &config.host_suffix),
                Classification::Resource(_)
            );
            if state.locks.is_global_busy() && is_resource {
                tracing::debug!(
                    source_tab = %source_tab,
                    new_tab = %tab,
                    "reuse in progress, diverting navigation target"
                );
                DispatchAction::Divert {
                    source_tab: *source_tab,
                    new_tab: *tab,
                    url: url.clone(),
                }
            } else {
                state.tracker.mark_navigation_target(*tab, now);
                DispatchAction::None
            }
        }

        BrowserEvent::NavigationCommitted { tab, url, frame_id }
        | BrowserEvent::HistoryStateUpdated { tab, url, frame_id } => {
            if *frame_id != TOP_FRAME {
                return DispatchAction::None;
            }
            match classify(url, &config.host_suffix) {
                Classification::Restricted => {
                    tracing::debug!(tab = %tab, "restricted view, leaving alone");
                    DispatchAction::None
                }
                Classification::Unrelated => DispatchAction::None,
                Classification::Resource(key) => {
                    if state.tracker.is_recent(*tab, now) {
                        DispatchAction::Handoff(HandoffRequest {
                            key,
                            origin_tab: *tab,
                        })
                    } else {
                        // Revisits of a long-open tab must not self-close.
                        tracing::debug!(tab = %tab, key = %key, "tab is not new, ignoring");
                        DispatchAction::None
                    }
                }
            }
        }

        BrowserEvent::TabRemoved { tab } => {
            state.tracker.forget(*tab);
            DispatchAction::None
        }
    }
}

/// Apply the loop-breaker: navigate the source tab in place, then close
/// the newly spawned tab. Vanished tabs are the expected race here and are
/// tolerated at both steps.
pub async fn apply_divert<R: TabRegistry>(
    registry: &R,
    source_tab: TabId,
    new_tab: TabId,
    url: &str,
) -> Result<(), BridgeError> {
    match registry.update_tab(source_tab, TabUpdate::navigate(url)).await {
        Ok(()) => {}
        Err(e) if e.is_tab_gone() => {
            tracing::debug!(source_tab = %source_tab, "divert source tab vanished")
        }
        Err(e) => return Err(e),
    }
    match registry.remove_tab(new_tab).await {
        Ok(()) => {}
        Err(e) if e.is_tab_gone() => {
            tracing::debug!(new_tab = %new_tab, "diverted tab already closed")
        }
        Err(e) => return Err(e),
    }
    Ok(())
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use tabdedup_core::tracker::RECENT_WINDOW_SECS;
    use tabdedup_core::types::{ResourceKey, TabOrigin};

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .expect("valid RFC3339")
            .with_timezone(&Utc)
    }

    fn t0() -> DateTime<Utc> {
        ts("2026-03-01T09:00:00Z")
    }

    fn setup() -> (CoordState, EngineConfig) {
        let config = EngineConfig::default();
        (CoordState::new(&config), config)
    }

    fn committed(tab: i64, url: &str, frame_id: i64) -> BrowserEvent {
        BrowserEvent::NavigationCommitted {
            tab: TabId(tab),
            url: url.to_string(),
            frame_id,
        }
    }

    const TICKET_URL: &str = "https://acme.zendesk.com/agent/tickets/500";

    // ── 1. Tab lifecycle events update the tracker ──────────────

    #[test]
    fn tab_created_marks_user_created() {
        let (mut state, config) = setup();
        let action = dispatch(
            &mut state,
            &config,
            &BrowserEvent::TabCreated { tab: TabId(1) },
            t0(),
        );
        assert_eq!(action, DispatchAction::None);
        assert_eq!(
            state.tracker.get(TabId(1)).expect("tracked").origin,
            TabOrigin::UserCreated
        );
    }

    #[test]
    fn navigation_target_marks_when_not_busy() {
        let (mut state, config) = setup();
        let action = dispatch(
            &mut state,
            &config,
            &BrowserEvent::NavigationTargetCreated {
                source_tab: TabId(1),
                tab: TabId(2),
                url: TICKET_URL.to_string(),
            },
            t0(),
        );
        assert_eq!(action, DispatchAction::None);
        assert_eq!(
            state.tracker.get(TabId(2)).expect("tracked").origin,
            TabOrigin::NavigationTarget
        );
    }

    #[test]
    fn tab_removed_forgets() {
        let (mut state, config) = setup();
        dispatch(
            &mut state,
            &config,
            &BrowserEvent::TabCreated { tab: TabId(1) },
            t0(),
        );
        dispatch(
            &mut state,
            &config,
            &BrowserEvent::TabRemoved { tab: TabId(1) },
            t0(),
        );
        assert!(state.tracker.is_empty());
    }

    // ── 2. Loop-breaker under the global flag ───────────────────

    #[test]
    fn busy_resource_target_is_diverted_not_tracked() {
        let (mut state, config) = setup();
        state.locks.set_global_busy(true);
        let action = dispatch(
            &mut state,
            &config,
            &BrowserEvent::NavigationTargetCreated {
                source_tab: TabId(1),
                tab: TabId(2),
                url: TICKET_URL.to_string(),
            },
            t0(),
        );
        assert_eq!(
            action,
            DispatchAction::Divert {
                source_tab: TabId(1),
                new_tab: TabId(2),
                url: TICKET_URL.to_string(),
            }
        );
        assert!(state.tracker.is_empty());
    }

    #[test]
    fn busy_unrelated_target_is_tracked_normally() {
        let (mut state, config) = setup();
        state.locks.set_global_busy(true);
        let action = dispatch(
            &mut state,
            &config,
            &BrowserEvent::NavigationTargetCreated {
                source_tab: TabId(1),
                tab: TabId(2),
                url: "https://example.org/".to_string(),
            },
            t0(),
        );
        assert_eq!(action, DispatchAction::None);
        assert!(state.tracker.get(TabId(2)).is_some());
    }

    // ── 3. Navigation events gate on frame, shape, and recency ──

    #[test]
    fn subframe_navigation_ignored() {
        let (mut state, config) = setup();
        dispatch(
            &mut state,
            &config,
            &BrowserEvent::TabCreated { tab: TabId(1) },
            t0(),
        );
        let action = dispatch(&mut state, &config, &committed(1, TICKET_URL, 7), t0());
        assert_eq!(action, DispatchAction::None);
    }

    #[test]
    fn restricted_view_never_starts_handoff() {
        let (mut state, config) = setup();
        dispatch(
            &mut state,
            &config,
            &BrowserEvent::TabCreated { tab: TabId(1) },
            t0(),
        );
        let action = dispatch(
            &mut state,
            &config,
            &committed(1, "https://acme.zendesk.com/chat/session/2", 0),
            t0(),
        );
        assert_eq!(action, DispatchAction::None);
    }

    #[test]
    fn unrelated_url_ignored() {
        let (mut state, config) = setup();
        let action = dispatch(
            &mut state,
            &config,
            &committed(1, "https://example.org/agent/tickets/5", 0),
            t0(),
        );
        assert_eq!(action, DispatchAction::None);
    }

    #[test]
    fn recent_tab_on_ticket_requests_handoff() {
        let (mut state, config) = setup();
        dispatch(
            &mut state,
            &config,
            &BrowserEvent::TabCreated { tab: TabId(1) },
            t0(),
        );
        let action = dispatch(
            &mut state,
            &config,
            &committed(1, TICKET_URL, 0),
            t0() + TimeDelta::seconds(2),
        );
        assert_eq!(
            action,
            DispatchAction::Handoff(HandoffRequest {
                key: ResourceKey::new("acme", 500),
                origin_tab: TabId(1),
            })
        );
    }

    #[test]
    fn stale_tab_on_ticket_is_ignored() {
        let (mut state, config) = setup();
        dispatch(
            &mut state,
            &config,
            &BrowserEvent::TabCreated { tab: TabId(1) },
            t0(),
        );
        let action = dispatch(
            &mut state,
            &config,
            &committed(1, TICKET_URL, 0),
            t0() + TimeDelta::seconds(RECENT_WINDOW_SECS + 1),
        );
        assert_eq!(action, DispatchAction::None);
    }

    #[test]
    fn untracked_tab_on_ticket_is_ignored() {
        let (mut state, config) = setup();
        let action = dispatch(&mut state, &config, &committed(42, TICKET_URL, 0), t0());
        assert_eq!(action, DispatchAction::None);
    }

    #[test]
    fn history_state_update_behaves_like_commit() {
        let (mut state, config) = setup();
        dispatch(
            &mut state,
            &config,
            &BrowserEvent::NavigationTargetCreated {
                source_tab: TabId(9),
                tab: TabId(1),
                url: TICKET_URL.to_string(),
            },
            t0(),
        );
        let action = dispatch(
            &mut state,
            &config,
            &BrowserEvent::HistoryStateUpdated {
                tab: TabId(1),
                url: "https://acme.zendesk.com/agent/#/tickets/500".to_string(),
                frame_id: 0,
            },
            // Navigation targets stay recent no matter how late this fires.
            t0() + TimeDelta::hours(2),
        );
        assert_eq!(
            action,
            DispatchAction::Handoff(HandoffRequest {
                key: ResourceKey::new("acme", 500),
                origin_tab: TabId(1),
            })
        );
    }
}
