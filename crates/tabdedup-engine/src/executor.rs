//! Hand-off executor: repoints an existing tab at a resource, focuses it,
//! and discards the duplicate origin tab.
//!
//! One execution walks `Locking → Selecting → Focusing → Navigating →
//! ClosingOrigin → Done`, with `Aborted` reachable from every step and a
//! defensive existence check before anything irreversible. Cleanup —
//! forget both tabs, release the lock, clear the global flag — always
//! runs, including when the failsafe timeout fires; a failure can never
//! leave the lock or flag stuck beyond the failsafe window.

use std::sync::Arc;

use chrono::Utc;

use tabdedup_bridge::error::BridgeError;
use tabdedup_bridge::registry::TabRegistry;
use tabdedup_bridge::script::{InPageScript, ScriptRunner, script_succeeded};
use tabdedup_bridge::tabs::{TabInfo, TabUpdate};
use tabdedup_core::classify::{
    Classification, agent_area_pattern, canonical_url, classify, ticket_route,
};
use tabdedup_core::handoff::{AbortReason, HandoffOutcome, HandoffState, NavigationMethod};
use tabdedup_core::select::select_target;
use tabdedup_core::types::{CandidateTab, ResourceKey, TabId};

use crate::config::EngineConfig;
use crate::state::SharedState;

/// Input to one hand-off execution: the resource and the duplicate tab
/// that triggered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffRequest {
    pub key: ResourceKey,
    pub origin_tab: TabId,
}

/// Drives hand-offs against the bridge capabilities. Cheap to clone per
/// execution; hand-offs for different resources may run concurrently, the
/// lock table enforces per-resource exclusion.
pub struct HandoffExecutor<R, S> {
    state: SharedState,
    registry: Arc<R>,
    scripts: Arc<S>,
    config: EngineConfig,
}

impl<R, S> HandoffExecutor<R, S>
where
    R: TabRegistry,
    S: ScriptRunner,
{
    pub fn new(
        state: SharedState,
        registry: Arc<R>,
        scripts: Arc<S>,
        config: EngineConfig,
    ) -> Self {
        Self {
            state,
            registry,
            scripts,
            config,
        }
    }

    /// Run one hand-off to completion.
    pub async fn run(&self, request: HandoffRequest) -> HandoffOutcome {
        let mut machine = HandoffState::Idle;

        // Locking. A held lock means another hand-off owns this resource;
        // the duplicate event is redundant and this attempt ends silently,
        // leaving the owner's lock and global flag untouched.
        {
            let mut st = self.state.lock().await;
            self.advance(&mut machine, HandoffState::Locking, &request);
            if !st.locks.try_acquire(&request.key, Utc::now()) {
                tracing::debug!(key = %request.key, "resource locked, debouncing");
                self.advance(&mut machine, HandoffState::Aborted, &request);
                return HandoffOutcome::Aborted(AbortReason::LockHeld);
            }
            st.locks.set_global_busy(true);
        }

        // Working span, bounded by the failsafe. The timeout releases
        // nothing itself — cleanup below does — and in-flight browser
        // calls are left to finish or fail on their own.
        let (outcome, target) = match tokio::time::timeout(
            self.config.failsafe(),
            self.perform(&mut machine, &request),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(key = %request.key, "hand-off exceeded failsafe, giving up");
                (HandoffOutcome::Aborted(AbortReason::Failsafe), None)
            }
        };
        if !machine.is_terminal() {
            self.advance(&mut machine, HandoffState::Aborted, &request);
        }

        self.cleanup(&request, target).await;
        outcome
    }

    async fn perform(
        &self,
        machine: &mut HandoffState,
        request: &HandoffRequest,
    ) -> (HandoffOutcome, Option<TabId>) {
        let suffix = &self.config.host_suffix;

        // Selecting: query live tabs fresh — never from a cache — and pick
        // the reuse target.
        self.advance(machine, HandoffState::Selecting, request);
        let pattern = agent_area_pattern(&request.key.subdomain, suffix);
        let tabs = match self.registry.query_tabs(&pattern).await {
            Ok(tabs) => tabs,
            Err(e) => return (self.abort_on(machine, request, &e), None),
        };
        let candidates: Vec<CandidateTab> = tabs.iter().map(TabInfo::to_candidate).collect();
        let Some(target) = select_target(&request.key, request.origin_tab, &candidates, suffix)
        else {
            tracing::debug!(key = %request.key, "no reuse candidate");
            self.advance(machine, HandoffState::Aborted, request);
            return (HandoffOutcome::Aborted(AbortReason::NoCandidate), None);
        };
        let target_tab = target.tab_id;

        // Focusing: window first, then the tab — before navigating, so the
        // user sees continuity immediately even if navigation fails.
        self.advance(machine, HandoffState::Focusing, request);
        if let Err(e) = self.registry.focus_window(target.window_id).await {
            return (self.abort_on(machine, request, &e), Some(target_tab));
        }
        if let Err(e) = self
            .registry
            .update_tab(target_tab, TabUpdate::activate())
            .await
        {
            return (self.abort_on(machine, request, &e), Some(target_tab));
        }

        // Navigating: a no-op when the target already shows this resource.
        let already_there = matches!(
            classify(&target.url, suffix),
            Classification::Resource(ref k) if *k == request.key
        );
        if already_there {
            tracing::debug!(
                key = %request.key,
                target = %target_tab,
                "target already on resource, skipping navigation"
            );
        } else {
            self.advance(machine, HandoffState::Navigating, request);
            let desired = canonical_url(&request.key, suffix);
            if let Err(reason) = self.navigate(target_tab, &request.key, &desired).await {
                self.advance(machine, HandoffState::Aborted, request);
                return (HandoffOutcome::Aborted(reason), Some(target_tab));
            }
        }

        // ClosingOrigin: bounded grace, then re-check the origin still
        // exists — removing a vanished tab is neither an error nor
        // attempted.
        self.advance(machine, HandoffState::ClosingOrigin, request);
        tokio::time::sleep(self.config.close_grace()).await;
        let origin_closed = self.close_origin(request.origin_tab).await;

        self.advance(machine, HandoffState::Done, request);
        (
            HandoffOutcome::Completed {
                target: target_tab,
                origin_closed,
            },
            Some(target_tab),
        )
    }

    /// In-place techniques in order, each short-circuiting on success, then
    /// the direct URL replacement that always applies. A script result of
    /// any unexpected shape counts as "technique did not apply".
    async fn navigate(
        &self,
        tab: TabId,
        key: &ResourceKey,
        desired_url: &str,
    ) -> Result<(), AbortReason> {
        if self.config.prefer_in_place {
            let route = ticket_route(key);
            let attempts = [
                (
                    NavigationMethod::SpaRouter,
                    InPageScript::SpaRouter {
                        path: route.clone(),
                    },
                ),
                (
                    NavigationMethod::HistoryPush,
                    InPageScript::HistoryPush {
                        path: route.clone(),
                    },
                ),
                (
                    NavigationMethod::LinkClick,
                    InPageScript::ClickTicketLink {
                        ticket_id: key.ticket_id,
                    },
                ),
            ];
            for (method, script) in attempts {
                match self.scripts.run_in_tab(tab, script).await {
                    Ok(result) if script_succeeded(&result) => {
                        tracing::debug!(tab = %tab, method = %method, "in-place navigation succeeded");
                        return Ok(());
                    }
                    Ok(_) => {
                        tracing::debug!(tab = %tab, method = %method, "technique did not apply")
                    }
                    Err(e) if e.is_tab_gone() => {
                        tracing::debug!(tab = %tab, method = %method, "target vanished during navigation: {e}");
                        return Err(AbortReason::TabGone);
                    }
                    Err(e) => {
                        tracing::debug!(tab = %tab, method = %method, "technique failed: {e}")
                    }
                }
            }
        }

        match self
            .registry
            .update_tab(tab, TabUpdate::navigate(desired_url))
            .await
        {
            Ok(()) => {
                tracing::debug!(tab = %tab, method = %NavigationMethod::UrlReplace, "navigated by url replacement");
                Ok(())
            }
            Err(e) if e.is_tab_gone() => {
                tracing::debug!(tab = %tab, "target vanished before url replacement: {e}");
                Err(AbortReason::TabGone)
            }
            Err(e) => {
                tracing::warn!(tab = %tab, "url replacement failed: {e}");
                Err(AbortReason::HostFailure)
            }
        }
    }

    async fn close_origin(&self, origin: TabId) -> bool {
        match self.registry.get_tab(origin).await {
            Ok(Some(_)) => match self.registry.remove_tab(origin).await {
                Ok(()) => true,
                Err(e) if e.is_tab_gone() => {
                    tracing::debug!(origin = %origin, "origin closed within the grace window");
                    false
                }
                Err(e) => {
                    tracing::warn!(origin = %origin, "failed to close origin: {e}");
                    false
                }
            },
            Ok(None) => {
                tracing::debug!(origin = %origin, "origin tab already gone");
                false
            }
            Err(e) => {
                tracing::warn!(origin = %origin, "origin existence check failed: {e}");
                false
            }
        }
    }

    /// Unconditional cleanup: forget both tabs, release the lock, clear
    /// the global flag.
    async fn cleanup(&self, request: &HandoffRequest, target: Option<TabId>) {
        let mut st = self.state.lock().await;
        st.tracker.forget(request.origin_tab);
        if let Some(target) = target {
            st.tracker.forget(target);
        }
        st.locks.release(&request.key);
        st.locks.set_global_busy(false);
        tracing::debug!(key = %request.key, origin = %request.origin_tab, "hand-off cleanup complete");
    }

    fn abort_on(
        &self,
        machine: &mut HandoffState,
        request: &HandoffRequest,
        err: &BridgeError,
    ) -> HandoffOutcome {
        let reason = if err.is_tab_gone() {
            tracing::debug!(key = %request.key, "tab vanished mid hand-off: {err}");
            AbortReason::TabGone
        } else {
            tracing::warn!(key = %request.key, "browser call failed: {err}");
            AbortReason::HostFailure
        };
        self.advance(machine, HandoffState::Aborted, request);
        HandoffOutcome::Aborted(reason)
    }

    fn advance(&self, machine: &mut HandoffState, next: HandoffState, request: &HandoffRequest) {
        debug_assert!(
            machine.can_advance_to(next),
            "illegal hand-off transition {machine} -> {next}"
        );
        tracing::debug!(
            key = %request.key,
            origin = %request.origin_tab,
            from = %machine,
            to = %next,
            "hand-off transition"
        );
        *machine = next;
    }
}

impl<R, S> Clone for HandoffExecutor<R, S> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            registry: Arc::clone(&self.registry),
            scripts: Arc::clone(&self.scripts),
            config: self.config.clone(),
        }
    }
}
