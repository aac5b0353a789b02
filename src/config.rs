use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::backend::{PollSchedule, SubdomainPool};
use crate::cloudflare::DEFAULT_API_BASE;
use crate::errors::ScanError;

/// Tunables for one run. Every field has a default so a config file only
/// needs the keys it changes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub workers: usize,
    pub queue_capacity: usize,
    pub proxy_domain: Option<String>,
    pub report: Option<PathBuf>,
    pub header_timeout_secs: u64,
    pub dns_timeout_secs: u64,
    pub poll: PollSchedule,
    pub subdomain_pool_size: usize,
    pub resolver_timeout_ms: u64,
    pub cloudflare_api_base: String,
    /// Put header-backend findings in the report, not only on the console.
    pub record_header_findings: bool,
    /// Extra request headers as "Name: value".
    pub headers: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            workers: 100,
            queue_capacity: 1000,
            proxy_domain: None,
            report: None,
            header_timeout_secs: 15,
            dns_timeout_secs: 40,
            poll: PollSchedule::default(),
            subdomain_pool_size: SubdomainPool::DEFAULT_SIZE,
            resolver_timeout_ms: 1000,
            cloudflare_api_base: DEFAULT_API_BASE.to_string(),
            record_header_findings: false,
            headers: Vec::new(),
        }
    }
}

impl ScanConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn header_timeout(&self) -> Duration {
        Duration::from_secs(self.header_timeout_secs)
    }

    pub fn dns_timeout(&self) -> Duration {
        Duration::from_secs(self.dns_timeout_secs)
    }

    pub fn resolver_timeout(&self) -> Duration {
        Duration::from_millis(self.resolver_timeout_ms)
    }

    pub fn require_proxy_domain(&self) -> Result<&str, ScanError> {
        self.proxy_domain
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .ok_or(ScanError::MissingProxyDomain)
    }

    /// Parse the configured "Name: value" headers.
    pub fn parsed_headers(&self) -> Result<Vec<(String, String)>, ScanError> {
        self.headers
            .iter()
            .map(|raw| match raw.split_once(':') {
                Some((name, value)) if !name.trim().is_empty() => {
                    Ok((name.trim().to_string(), value.trim().to_string()))
                }
                _ => Err(ScanError::InvalidHeader(raw.clone())),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = ScanConfig::default();
        assert_eq!(cfg.workers, 100);
        assert_eq!(cfg.queue_capacity, 1000);
        assert_eq!(cfg.header_timeout(), Duration::from_secs(15));
        assert_eq!(cfg.dns_timeout(), Duration::from_secs(40));
        assert_eq!(cfg.subdomain_pool_size, 500);
        assert!(matches!(cfg.require_proxy_domain(), Err(ScanError::MissingProxyDomain)));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"workers": 8, "proxy_domain": "spare.example.com", "poll": {{"interval": 1}}}}"#).unwrap();
        let cfg = ScanConfig::from_file(file.path()).unwrap();
        assert_eq!(cfg.workers, 8);
        assert_eq!(cfg.require_proxy_domain().unwrap(), "spare.example.com");
        assert_eq!(cfg.poll.interval, Duration::from_secs(1));
        assert_eq!(cfg.poll.delete_attempts, 30);
        assert_eq!(cfg.queue_capacity, 1000);
    }

    #[test]
    fn test_bad_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "workers = 8").unwrap();
        assert!(ScanConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn test_header_parsing() {
        let cfg = ScanConfig {
            headers: vec!["Host: intranet.example.com".into(), "X-Test:1".into()],
            ..Default::default()
        };
        assert_eq!(
            cfg.parsed_headers().unwrap(),
            vec![
                ("Host".to_string(), "intranet.example.com".to_string()),
                ("X-Test".to_string(), "1".to_string())
            ]
        );

        let bad = ScanConfig { headers: vec!["no-colon".into()], ..Default::default() };
        assert!(matches!(bad.parsed_headers(), Err(ScanError::InvalidHeader(_))));
    }
}
