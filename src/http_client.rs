use reqwest::{Client, ClientBuilder};
use std::sync::Arc;
use std::time::Duration;

use crate::resolver::ProxyResolver;

/// Create the HTTP client shared by the direct and proxied paths of a scan.
///
/// Redirects are never followed so the classifier sees the 3xx itself, and
/// certificate validation is off: the CDN certificate never matches the
/// origin, and origins scanned by IP rarely have valid ones either.
pub fn create_scan_client(timeout: Duration, resolver: Option<ProxyResolver>) -> anyhow::Result<Client> {
    let mut builder = ClientBuilder::new()
        // Connection pooling - reuse connections to the CDN edge
        .pool_max_idle_per_host(32)
        .pool_idle_timeout(Some(Duration::from_secs(90)))
        .tcp_nodelay(true)

        // Whole request, headers included
        .timeout(timeout)

        // TLS
        .use_rustls_tls()
        .danger_accept_invalid_certs(true)

        // Redirects
        .redirect(reqwest::redirect::Policy::none())

        .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36");

    if let Some(resolver) = resolver {
        builder = builder.dns_resolver(Arc::new(resolver));
    }

    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = create_scan_client(Duration::from_secs(15), None);
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_client_with_proxy_resolver() {
        let resolver = ProxyResolver::cloudflare(Duration::from_secs(1));
        let client = create_scan_client(Duration::from_secs(15), Some(resolver));
        assert!(client.is_ok());
    }
}
