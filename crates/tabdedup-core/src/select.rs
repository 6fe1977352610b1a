//! Candidate selection: pick the best existing tab to reuse for a
//! resource, from a freshly queried tab list.

use std::cmp::Reverse;

use crate::classify::in_agent_area;
use crate::types::{CandidateTab, ResourceKey, TabId};

/// Choose the reuse target for a resource among live tabs.
///
/// Keeps tabs in the resource subdomain's agent area (restricted views and
/// the origin tab are dropped), then prefers the greatest
/// `last_accessed_at`; when no tab reports one, the lowest tab id is the
/// deterministic stable choice. Returns `None` when nothing qualifies —
/// there is nothing to reuse into and the caller aborts.
pub fn select_target(
    key: &ResourceKey,
    exclude: TabId,
    tabs: &[CandidateTab],
    host_suffix: &str,
) -> Option<CandidateTab> {
    tabs.iter()
        .filter(|t| t.tab_id != exclude)
        .filter(|t| in_agent_area(&t.url, &key.subdomain, host_suffix))
        // None sorts below any Some, so timestamped tabs always win over
        // tabs the host reports nothing for.
        .max_by_key(|t| (t.last_accessed_at, Reverse(t.tab_id)))
        .cloned()
}

// ─── Tests ────────────────────────────────────────────────────────
