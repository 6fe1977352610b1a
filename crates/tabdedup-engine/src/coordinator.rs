//! Coordinator: owns the shared tables and wires the dispatcher to the
//! executor and the periodic sweeper.

use std::sync::Arc;

use chrono::Utc;

use tabdedup_bridge::events::BrowserEvent;
use tabdedup_bridge::registry::TabRegistry;
use tabdedup_bridge::script::ScriptRunner;

use crate::config::EngineConfig;
use crate::dispatcher::{DispatchAction, apply_divert, dispatch};
use crate::executor::{HandoffExecutor, HandoffRequest};
use crate::state::{SharedState, shared};

/// Event-to-action front end for the run loop. Hand-offs themselves are
/// returned to the caller, which decides whether to spawn or await them —
/// that keeps different resource keys free to overlap while tests stay
/// deterministic.
pub struct Coordinator<R, S> {
    state: SharedState,
    registry: Arc<R>,
    scripts: Arc<S>,
    config: EngineConfig,
}

impl<R, S> Coordinator<R, S>
where
    R: TabRegistry,
    S: ScriptRunner,
{
    pub fn new(registry: Arc<R>, scripts: Arc<S>, config: EngineConfig) -> Self {
        Self {
            state: shared(&config),
            registry,
            scripts,
            config,
        }
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Route one inbound event. Divert actions are applied here; hand-off
    /// requests are handed back to the caller.
    pub async fn handle_event(&self, event: &BrowserEvent) -> Option<HandoffRequest> {
        let action = {
            let mut st = self.state.lock().await;
            dispatch(&mut st, &self.config, event, Utc::now())
        };
        match action {
            DispatchAction::None => None,
            DispatchAction::Handoff(request) => Some(request),
            DispatchAction::Divert {
                source_tab,
                new_tab,
                url,
            } => {
                if let Err(e) =
                    apply_divert(self.registry.as_ref(), source_tab, new_tab, &url).await
                {
                    tracing::warn!(source_tab = %source_tab, new_tab = %new_tab, "divert failed: {e}");
                }
                None
            }
        }
    }

    /// Executor bound to this coordinator's tables and bridge handles.
    pub fn executor(&self) -> HandoffExecutor<R, S> {
        HandoffExecutor::new(
            Arc::clone(&self.state),
            Arc::clone(&self.registry),
            Arc::clone(&self.scripts),
            self.config.clone(),
        )
    }

    /// Periodic maintenance: age out stale entries, then probe tracked
    /// navigation-target tabs against the live registry and forget the
    /// dead ones. Probe failures keep the entry — the age sweep bounds it.
    pub async fn sweep(&self) {
        let now = Utc::now();
        let (evicted, targets) = {
            let mut st = self.state.lock().await;
            let evicted = st.tracker.sweep(now);
            (evicted, st.tracker.navigation_target_ids())
        };
        if !evicted.is_empty() {
            tracing::debug!(count = evicted.len(), "swept stale tab entries");
        }
        for tab in targets {
            match self.registry.get_tab(tab).await {
                Ok(Some(_)) => {}
                Ok(None) => {
                    self.state.lock().await.tracker.forget(tab);
                    tracing::debug!(tab = %tab, "forgot vanished navigation target");
                }
                Err(e) => tracing::debug!(tab = %tab, "existence probe failed: {e}"),
            }
        }
    }
}
