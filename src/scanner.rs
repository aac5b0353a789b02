use std::sync::Arc;

use crate::backend::CdnBackend;
use crate::bypass::{detect, finding_for, summary, Verdict};
use crate::concurrent::WorkerPool;
use crate::discover::TargetSpec;
use crate::output::Reporter;
use crate::probe::{PathOutcome, ProbeRequest, ScanTarget, Transport};

/// Everything learned about one target.
#[derive(Debug, Clone)]
pub struct TargetReport {
    pub request: ProbeRequest,
    pub proxied: PathOutcome,
    pub direct: PathOutcome,
    pub verdict: Verdict,
    pub line: String,
}

/// Runs both paths for one target at a time and records what it finds.
pub struct Scanner {
    backend: Arc<dyn CdnBackend>,
    direct: Arc<dyn Transport>,
    reporter: Arc<Reporter>,
    headers: Vec<(String, String)>,
    record_findings: bool,
    quiet: bool,
}

impl Scanner {
    pub fn new(backend: Arc<dyn CdnBackend>, direct: Arc<dyn Transport>, reporter: Arc<Reporter>) -> Self {
        let record_findings = backend.kind().records_findings();
        Self {
            backend,
            direct,
            reporter,
            headers: Vec::new(),
            record_findings,
            quiet: false,
        }
    }

    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }

    /// Also record findings for backends that by default only print them.
    pub fn record_all_findings(mut self, enabled: bool) -> Self {
        self.record_findings |= enabled;
        self
    }

    /// Do not print summary lines. Used by tests.
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    pub async fn scan(&self, target: ScanTarget) -> TargetReport {
        let request = ProbeRequest::new(target).with_headers(self.headers.clone());

        let proxied = self.backend.route_proxied(&request).await;
        let direct = self.backend.classify_direct(self.direct.send(&request.direct()).await);
        tracing::debug!(
            target_url = %request.url(),
            proxied = %proxied.state,
            direct = %direct.state,
            "classified"
        );

        let verdict = detect(&direct, &proxied);
        if self.record_findings {
            if let Some((category, finding)) = finding_for(self.backend.kind(), verdict, &request.url()) {
                self.reporter.add(&category, finding);
            }
        }

        let line = summary::render(&request, &direct, &proxied, verdict);
        if !self.quiet {
            println!("{}", line);
        }

        TargetReport { request, proxied, direct, verdict, line }
    }
}

/// Task totals of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanStats {
    pub submitted: usize,
    pub completed: usize,
    pub failed: usize,
}

/// Push every target of `specs` through a worker pool and wait for all of
/// them. Findings are in the scanner's reporter once this returns.
pub async fn scan_all(
    scanner: Arc<Scanner>,
    specs: &[TargetSpec],
    workers: usize,
    queue_capacity: usize,
) -> anyhow::Result<ScanStats> {
    let mut pool = WorkerPool::new(workers, queue_capacity);
    let mut submitted = 0;

    for spec in specs {
        for target in spec.targets() {
            let scanner = scanner.clone();
            pool.submit(async move {
                scanner.scan(target).await;
            })
            .await?;
            submitted += 1;
        }
    }
    tracing::info!(submitted, "all targets queued");

    let (completed, failed) = pool.stop_and_wait().await;
    Ok(ScanStats { submitted, completed, failed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendKind;
    use crate::probe::{FailureKind, OutboundRequest, ProbeResponse, Scheme, SvcState, TransportError, TransportResult};
    use async_trait::async_trait;

    struct FixedBackend {
        kind: BackendKind,
        proxied: TransportResult,
    }

    #[async_trait]
    impl CdnBackend for FixedBackend {
        fn kind(&self) -> BackendKind {
            self.kind
        }

        async fn route_proxied(&self, _request: &ProbeRequest) -> PathOutcome {
            self.classify_proxy(self.proxied.clone())
        }
    }

    struct FixedTransport(TransportResult);

    #[async_trait]
    impl Transport for FixedTransport {
        async fn send(&self, _req: &OutboundRequest) -> TransportResult {
            self.0.clone()
        }
    }

    fn scanner(kind: BackendKind, proxied: TransportResult, direct: TransportResult) -> (Scanner, Arc<Reporter>) {
        let reporter = Arc::new(Reporter::new());
        let backend = Arc::new(FixedBackend { kind, proxied });
        let scanner = Scanner::new(backend, Arc::new(FixedTransport(direct)), reporter.clone()).quiet();
        (scanner, reporter)
    }

    fn refused() -> TransportResult {
        Err(TransportError::new(FailureKind::ConnectionRefused, "connection refused"))
    }

    #[tokio::test]
    async fn test_full_bypass_is_recorded() {
        let (scanner, reporter) = scanner(BackendKind::DnsRotation, Ok(ProbeResponse::new(200)), refused());
        let report = scanner.scan(ScanTarget::new("10.0.0.1", Scheme::Https)).await;
        assert_eq!(report.direct.state, SvcState::Closed);
        assert_eq!(report.verdict, Verdict::FullBypass);

        let vulns = reporter.snapshot().vulnerabilities.unwrap();
        assert_eq!(vulns.len(), 1);
        assert_eq!(vulns["cloudflare_proxy_bypass"][0].global_identifier, "https://10.0.0.1/");
    }

    #[tokio::test]
    async fn test_header_backend_only_prints_by_default() {
        let (scanner, reporter) = scanner(BackendKind::HeaderProxy, Ok(ProbeResponse::new(200)), Ok(ProbeResponse::new(403)));
        let report = scanner.scan(ScanTarget::new("10.0.0.1", Scheme::Http)).await;
        assert_eq!(report.verdict, Verdict::FullBypass);
        assert!(report.line.contains("Bypass Found!"));
        assert_eq!(reporter.finding_count(), 0);
    }

    #[tokio::test]
    async fn test_header_findings_can_be_enabled() {
        let (scanner, reporter) = scanner(BackendKind::HeaderProxy, Ok(ProbeResponse::new(301)), Ok(ProbeResponse::new(403)));
        let scanner = scanner.record_all_findings(true);
        scanner.scan(ScanTarget::new("10.0.0.1", Scheme::Http)).await;
        let vulns = reporter.snapshot().vulnerabilities.unwrap();
        assert_eq!(vulns["cloudfront_partial_proxy_bypass"].len(), 1);
    }

    #[tokio::test]
    async fn test_public_service() {
        let (scanner, reporter) = scanner(BackendKind::DnsRotation, Ok(ProbeResponse::new(200)), Ok(ProbeResponse::new(200)));
        let report = scanner.scan(ScanTarget::new("a.example.com", Scheme::Http)).await;
        assert_eq!(report.line, "http://a.example.com -- Both: open (200)");
        let vulns = reporter.snapshot().vulnerabilities.unwrap();
        assert_eq!(vulns["publicly_exposed_http_service"][0].global_identifier, "http://a.example.com/");
    }

    #[tokio::test]
    async fn test_scan_all_covers_every_address() {
        let (scanner, reporter) = scanner(BackendKind::DnsRotation, Ok(ProbeResponse::new(200)), refused());
        let specs = vec![TargetSpec::parse("10.0.0.0/30").unwrap(), TargetSpec::parse("a.example.com").unwrap()];

        let stats = scan_all(Arc::new(scanner), &specs, 3, 2).await.unwrap();
        assert_eq!(stats, ScanStats { submitted: 10, completed: 10, failed: 0 });

        let vulns = reporter.snapshot().vulnerabilities.unwrap();
        let mut urls: Vec<_> = vulns["cloudflare_proxy_bypass"].iter().map(|f| f.global_identifier.clone()).collect();
        urls.sort();
        assert_eq!(urls.len(), 10);
        assert!(urls.contains(&"http://10.0.0.0/".to_string()));
        assert!(urls.contains(&"https://10.0.0.3/".to_string()));
    }
}
