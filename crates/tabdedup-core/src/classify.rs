//! URL classification: maps a raw URL to a ticket resource key, a
//! "never touch" restricted view, or unrelated.
//!
//! Pure and total — garbage input classifies as `Unrelated`, never as an
//! error. No network or browser calls; the same URL always yields the same
//! classification.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::types::ResourceKey;

// ─── Constants ────────────────────────────────────────────────────

/// Default resource-hosting domain suffix. Overridable via settings.
pub const DEFAULT_HOST_SUFFIX: &str = "zendesk.com";

/// Application area under which ticket routes live.
const AGENT_AREA: &str = "agent";

/// Ticket route type segment.
const TICKETS_SEGMENT: &str = "tickets";

/// Path prefixes for live-session views that must never be reused into or
/// navigated away from automatically.
const RESTRICTED_PREFIXES: [&str; 2] = ["/chat", "/voice"];

/// Sub-view segment marking a print view (`.../tickets/{id}/print`).
const PRINT_SEGMENT: &str = "print";

// ─── Classification ───────────────────────────────────────────────

/// Result of classifying a URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Classification {
    /// Chat, voice, or print sub-view — interrupting a live session is
    /// never acceptable, so these are never touched.
    Restricted,
    /// A ticket resource tab.
    Resource(ResourceKey),
    /// Not a ticket URL (including anything that fails to parse).
    Unrelated,
}

/// Classify a raw URL against the given hosting-domain suffix.
///
/// Accepted ticket route shapes:
/// - plain path: `https://{sub}.{suffix}/agent/tickets/{id}`
/// - hash SPA route: `https://{sub}.{suffix}/agent/#/tickets/{id}`
///
/// The id segment must be fully numeric; anything else (including extra
/// path segments after the id) is `Unrelated`.
pub fn classify(raw: &str, host_suffix: &str) -> Classification {
    let Ok(url) = Url::parse(raw) else {
        return Classification::Unrelated;
    };
    if !matches!(url.scheme(), "http" | "https") {
        return Classification::Unrelated;
    }
    let Some(host) = url.host_str() else {
        return Classification::Unrelated;
    };
    let Some(subdomain) = subdomain_for(host, host_suffix) else {
        return Classification::Unrelated;
    };

    let path = url.path();
    let fragment = url.fragment().unwrap_or("");
    if is_restricted(path, fragment) {
        return Classification::Restricted;
    }

    // Plain path route: /agent/tickets/{id}
    if let Some(id) = ticket_id_from_segments(segments(path), AGENT_AREA) {
        return Classification::Resource(ResourceKey::new(subdomain, id));
    }

    // Hash SPA route: path is the agent root, fragment carries /tickets/{id}
    if is_agent_root(path) {
        if let Some(id) = ticket_id_from_segments(segments(fragment), TICKETS_SEGMENT) {
            // Fragment segments start at "tickets", so the marker doubles
            // as the leading segment here.
            return Classification::Resource(ResourceKey::new(subdomain, id));
        }
    }

    Classification::Unrelated
}

/// Rebuild the canonical clean URL for a resource key.
/// `classify(canonical_url(key, s), s)` yields the same key.
pub fn canonical_url(key: &ResourceKey, host_suffix: &str) -> String {
    format!(
        "https://{}.{}/{}/{}/{}",
        key.subdomain, host_suffix, AGENT_AREA, TICKETS_SEGMENT, key.ticket_id
    )
}

/// In-page route path for a ticket, as the SPA router expects it.
pub fn ticket_route(key: &ResourceKey) -> String {
    format!("/{}/{}/{}", AGENT_AREA, TICKETS_SEGMENT, key.ticket_id)
}

/// URL pattern selecting all tabs in a subdomain's agent area, for
/// registry queries.
pub fn agent_area_pattern(subdomain: &str, host_suffix: &str) -> String {
    format!("https://{subdomain}.{host_suffix}/{AGENT_AREA}/*")
}

/// Whether a tab URL belongs to the subdomain's agent area and is safe to
/// reuse into (same host, agent path, not a restricted view).
pub fn in_agent_area(raw: &str, subdomain: &str, host_suffix: &str) -> bool {
    let Ok(url) = Url::parse(raw) else {
        return false;
    };
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }
    let expected = format!("{}.{}", subdomain, host_suffix.to_ascii_lowercase());
    if url.host_str() != Some(expected.as_str()) {
        return false;
    }
    let path = url.path();
    let in_area = is_agent_root(path) || path.starts_with("/agent/");
    in_area && !is_restricted(path, url.fragment().unwrap_or(""))
}

// ─── Internals ────────────────────────────────────────────────────

fn subdomain_for(host: &str, host_suffix: &str) -> Option<String> {
    let dot_suffix = format!(".{}", host_suffix.to_ascii_lowercase());
    let prefix = host.strip_suffix(dot_suffix.as_str())?;
    // Single non-empty label only; multi-label prefixes are ambiguous and
    // rejected conservatively.
    if prefix.is_empty() || prefix.contains('.') {
        return None;
    }
    Some(prefix.to_string())
}

fn is_restricted(path: &str, fragment: &str) -> bool {
    if RESTRICTED_PREFIXES
        .iter()
        .any(|p| path == *p || path.starts_with(&format!("{p}/")))
    {
        return true;
    }
    segments(path).any(|s| s == PRINT_SEGMENT) || segments(fragment).any(|s| s == PRINT_SEGMENT)
}

fn is_agent_root(path: &str) -> bool {
    path == "/agent" || path == "/agent/"
}

/// Non-empty `/`-separated segments of a path or fragment.
fn segments(s: &str) -> impl Iterator<Item = &str> {
    s.split('/').filter(|seg| !seg.is_empty())
}

/// Match `[marker, "tickets", id]` (path form) or `[marker, id]` where the
/// marker already is `tickets` (fragment form), requiring a fully numeric
/// id and nothing after it.
fn ticket_id_from_segments<'a>(
    mut segs: impl Iterator<Item = &'a str>,
    leading: &str,
) -> Option<u64> {
    if segs.next()? != leading {
        return None;
    }
    let id_seg = if leading == TICKETS_SEGMENT {
        segs.next()?
    } else {
        if segs.next()? != TICKETS_SEGMENT {
            return None;
        }
        segs.next()?
    };
    if segs.next().is_some() {
        return None;
    }
    numeric_id(id_seg)
}

fn numeric_id(segment: &str) -> Option<u64> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

// ─── Tests ────────────────────────────────────────────────────────
