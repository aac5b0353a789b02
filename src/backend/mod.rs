//! CDN routing backends.
//!
//! Both backends answer the same three questions: how to read a direct
//! response, how to read a proxied response, and how to get a request to the
//! origin through the CDN at all.

pub mod dns_rotation;
pub mod header_proxy;
pub mod lease;
pub mod poll;

use async_trait::async_trait;

use crate::probe::{classify_direct, classify_proxied, PathOutcome, ProbeRequest, TransportResult};

pub use dns_rotation::DnsRotationBackend;
pub use header_proxy::HeaderProxyBackend;
pub use lease::{SubdomainLease, SubdomainPool};
pub use poll::{Clock, PollSchedule, RebindState, TokioClock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// A pre-provisioned distribution that forwards based on request headers.
    HeaderProxy,
    /// A spare zone whose proxied subdomains are re-pointed per request.
    DnsRotation,
}

impl BackendKind {
    pub fn cdn_name(&self) -> &'static str {
        match self {
            BackendKind::HeaderProxy => "CloudFront",
            BackendKind::DnsRotation => "CloudFlare",
        }
    }

    /// Prefix of the report categories for bypass findings.
    pub fn category_prefix(&self) -> &'static str {
        match self {
            BackendKind::HeaderProxy => "cloudfront",
            BackendKind::DnsRotation => "cloudflare",
        }
    }

    /// Whether findings from this backend go into the report by default. The
    /// header backend has only ever printed them.
    pub fn records_findings(&self) -> bool {
        matches!(self, BackendKind::DnsRotation)
    }
}

#[async_trait]
pub trait CdnBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    fn classify_direct(&self, result: TransportResult) -> PathOutcome {
        classify_direct(self.kind(), result)
    }

    fn classify_proxy(&self, result: TransportResult) -> PathOutcome {
        classify_proxied(self.kind(), result)
    }

    /// Send `request` to its origin through the CDN and classify the result.
    /// Never fails: setup problems come back as an `Unknown` outcome.
    async fn route_proxied(&self, request: &ProbeRequest) -> PathOutcome;
}
