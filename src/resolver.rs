use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::ResolveErrorKind;
use hickory_resolver::TokioAsyncResolver;
use hyper::client::connect::dns::Name;
use reqwest::dns::{Addrs, Resolve, Resolving};
use thiserror::Error;

/// Marker text for a name that does not exist. Used by the DNS backend to
/// notice that a deleted record has propagated.
pub const NO_SUCH_HOST: &str = "no such host";

#[derive(Debug, Error)]
#[error("lookup {host}: {reason}")]
pub struct LookupError {
    pub host: String,
    pub reason: String,
}

/// Resolver for proxy subdomains. Queries Cloudflare's public DNS directly
/// with caching disabled, so record changes are seen as soon as the
/// authoritative servers publish them.
#[derive(Clone)]
pub struct ProxyResolver {
    inner: Arc<TokioAsyncResolver>,
}

impl ProxyResolver {
    pub fn cloudflare(timeout: Duration) -> Self {
        let mut opts = ResolverOpts::default();
        opts.timeout = timeout;
        opts.attempts = 2;
        opts.cache_size = 0;
        Self {
            inner: Arc::new(TokioAsyncResolver::tokio(ResolverConfig::cloudflare(), opts)),
        }
    }
}

impl Resolve for ProxyResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let resolver = self.inner.clone();
        let host = name.as_str().to_string();
        Box::pin(async move {
            match resolver.lookup_ip(host.as_str()).await {
                Ok(lookup) => {
                    let ips: Vec<SocketAddr> = lookup.iter().map(|ip| SocketAddr::new(ip, 0)).collect();
                    tracing::trace!(host = %host, count = ips.len(), "resolved proxy host");
                    let addrs: Addrs = Box::new(ips.into_iter());
                    Ok(addrs)
                }
                Err(e) => {
                    let reason = match e.kind() {
                        ResolveErrorKind::NoRecordsFound { .. } => NO_SUCH_HOST.to_string(),
                        _ => e.to_string(),
                    };
                    Err(Box::new(LookupError { host, reason }) as Box<dyn std::error::Error + Send + Sync>)
                }
            }
        })
    }
}
