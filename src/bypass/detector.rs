use crate::backend::BackendKind;
use crate::output::Finding;
use crate::probe::{FailureKind, PathOutcome, SvcState};

pub const EXPOSED_CATEGORY: &str = "publicly_exposed_http_service";
pub const EXPOSED_RESOURCE: &str = "Publicly Exposed HTTP Service";

/// What comparing the two paths of one target tells us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The CDN got a 502 from an origin that also failed our TLS handshake.
    /// Says nothing about allow-listing.
    OriginTlsFailure,
    /// Blocked directly, reachable through the CDN with a 2xx.
    FullBypass,
    /// Blocked directly, reachable through the CDN with something other
    /// than a 2xx. Usually a Host header the origin did not like.
    PartialBypass,
    /// Reachable both ways, so nothing is being allow-listed.
    PubliclyExposed,
    NoFinding,
}

impl Verdict {
    pub fn is_bypass(&self) -> bool {
        matches!(self, Verdict::FullBypass | Verdict::PartialBypass)
    }
}

pub fn detect(direct: &PathOutcome, proxied: &PathOutcome) -> Verdict {
    if proxied.status() == Some(502) && direct.failure == Some(FailureKind::TlsHandshake) {
        return Verdict::OriginTlsFailure;
    }

    match (proxied.state, direct.state) {
        (SvcState::Open, d) if d.is_blocked() => match proxied.status() {
            Some(200..=299) => Verdict::FullBypass,
            _ => Verdict::PartialBypass,
        },
        (SvcState::Open, SvcState::Open) => Verdict::PubliclyExposed,
        _ => Verdict::NoFinding,
    }
}

/// Report category and finding for a verdict, if it produces one.
pub fn finding_for(kind: BackendKind, verdict: Verdict, url: &str) -> Option<(String, Finding)> {
    let cdn = kind.cdn_name();
    let prefix = kind.category_prefix();
    let (category, resource) = match verdict {
        Verdict::FullBypass => (format!("{}_proxy_bypass", prefix), format!("{} Proxy Bypass", cdn)),
        Verdict::PartialBypass => (
            format!("{}_partial_proxy_bypass", prefix),
            format!("Partial {} Proxy Bypass", cdn),
        ),
        Verdict::PubliclyExposed => (EXPOSED_CATEGORY.to_string(), EXPOSED_RESOURCE.to_string()),
        Verdict::OriginTlsFailure | Verdict::NoFinding => return None,
    };
    Some((category, Finding::new(resource, url)))
}
