use async_trait::async_trait;
use std::sync::Arc;

use crate::backend::{BackendKind, CdnBackend};
use crate::errors::ScanError;
use crate::probe::{OutboundRequest, PathOutcome, ProbeRequest, Transport};

/// Host the distribution should forward the request to.
pub const ORIGIN_HOST_HEADER: &str = "Origin-Host";
/// Host header the distribution should present to the origin.
pub const FORWARDED_HOST_HEADER: &str = "Forwarded-Host";

/// Routes every request through one shared distribution which picks the
/// origin from request headers.
pub struct HeaderProxyBackend {
    proxy_domain: String,
    transport: Arc<dyn Transport>,
}

impl HeaderProxyBackend {
    pub fn new(proxy_domain: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self { proxy_domain: proxy_domain.into(), transport }
    }

    pub fn proxy_domain(&self) -> &str {
        &self.proxy_domain
    }

    /// Rewrite `request` to go to the distribution. Refuses requests that
    /// already carry one of the routing headers.
    pub fn proxied_request(&self, request: &ProbeRequest) -> Result<OutboundRequest, ScanError> {
        for reserved in [ORIGIN_HOST_HEADER, FORWARDED_HOST_HEADER] {
            if request.has_header(reserved) {
                return Err(ScanError::ReservedHeader(reserved.to_string()));
            }
        }

        let mut out = request.via(&self.proxy_domain);
        out.headers.push((ORIGIN_HOST_HEADER.to_string(), request.target.host.clone()));
        out.headers.push((FORWARDED_HOST_HEADER.to_string(), request.host_header().to_string()));
        Ok(out)
    }
}

#[async_trait]
impl CdnBackend for HeaderProxyBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::HeaderProxy
    }

    async fn route_proxied(&self, request: &ProbeRequest) -> PathOutcome {
        let out = match self.proxied_request(request) {
            Ok(out) => out,
            Err(e) => return PathOutcome::unknown(e.to_string()),
        };

        tracing::debug!(host = %request.target, via = %out.url, "sending proxied request");
        let result = self.transport.send(&out).await;
        self.classify_proxy(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{ProbeResponse, ScanTarget, Scheme, SvcState, TransportResult};
    use parking_lot::Mutex;

    struct Recording {
        sent: Mutex<Vec<OutboundRequest>>,
    }

    #[async_trait]
    impl Transport for Recording {
        async fn send(&self, req: &OutboundRequest) -> TransportResult {
            self.sent.lock().push(req.clone());
            Ok(ProbeResponse::new(504))
        }
    }

    fn request() -> ProbeRequest {
        ProbeRequest::new(ScanTarget::new("10.1.2.3", Scheme::Https))
    }

    #[test]
    fn test_routing_headers() {
        let transport = Arc::new(Recording { sent: Mutex::new(Vec::new()) });
        let backend = HeaderProxyBackend::new("d111.cloudfront.net", transport);
        let out = backend.proxied_request(&request()).unwrap();
        assert_eq!(out.url, "https://d111.cloudfront.net/");
        assert_eq!(out.header("origin-host"), Some("10.1.2.3"));
        assert_eq!(out.header("forwarded-host"), Some("10.1.2.3"));
    }

    #[test]
    fn test_host_override_is_forwarded_not_sent() {
        let transport = Arc::new(Recording { sent: Mutex::new(Vec::new()) });
        let backend = HeaderProxyBackend::new("d111.cloudfront.net", transport);
        let req = request().with_headers(vec![("Host".into(), "intranet.example.com".into())]);
        let out = backend.proxied_request(&req).unwrap();
        assert_eq!(out.header("host"), None);
        assert_eq!(out.header("forwarded-host"), Some("intranet.example.com"));
        assert_eq!(out.header("origin-host"), Some("10.1.2.3"));
    }

    #[tokio::test]
    async fn test_reserved_header_makes_no_request() {
        let transport = Arc::new(Recording { sent: Mutex::new(Vec::new()) });
        let backend = HeaderProxyBackend::new("d111.cloudfront.net", transport.clone());
        let req = request().with_headers(vec![("origin-host".into(), "evil.example.com".into())]);

        let outcome = backend.route_proxied(&req).await;
        assert_eq!(outcome.state, SvcState::Unknown);
        assert!(outcome.error.unwrap().contains("Origin-Host"));
        assert!(transport.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_gateway_timeout_is_filtered() {
        let transport = Arc::new(Recording { sent: Mutex::new(Vec::new()) });
        let backend = HeaderProxyBackend::new("d111.cloudfront.net", transport.clone());
        let outcome = backend.route_proxied(&request()).await;
        assert_eq!(outcome.state, SvcState::Filtered);
        assert_eq!(outcome.status(), Some(504));
        assert_eq!(transport.sent.lock().len(), 1);
    }
}
