use std::sync::Arc;
use std::time::Instant;

use crate::cli::{Cli, Commands};
use cdn_scanner::backend::{CdnBackend, DnsRotationBackend, HeaderProxyBackend, SubdomainPool, TokioClock};
use cdn_scanner::cloudflare::CloudflareZone;
use cdn_scanner::config::ScanConfig;
use cdn_scanner::discover::expand_inputs;
use cdn_scanner::http_client::create_scan_client;
use cdn_scanner::output::Reporter;
use cdn_scanner::probe::{HttpTransport, Transport};
use cdn_scanner::resolver::ProxyResolver;
use cdn_scanner::scanner::{scan_all, Scanner};

pub async fn run_from_cli(cli: Cli) -> anyhow::Result<()> {
    // Keep external crates at INFO so --debug stays readable.
    use tracing_subscriber::EnvFilter;
    let crate_level = if cli.debug { "debug" } else if cli.verbose { "info" } else { "warn" };
    let filter_str = format!(
        "cdn_scanner={crate},reqwest=info,hyper=info,h2=info,hickory_resolver=info,hickory_proto=warn",
        crate = crate_level
    );
    let env_filter = EnvFilter::try_new(&filter_str).unwrap_or_else(|_| EnvFilter::new(crate_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .init();

    let config = merge_config(&cli)?;
    let headers = config.parsed_headers()?;

    // Every input is parsed before anything touches the network.
    let specs = expand_inputs(cli.command.targets())?;
    let total: u64 = specs.iter().map(|s| s.target_count()).sum();
    tracing::info!(inputs = cli.command.targets().len(), specs = specs.len(), targets = total, "expanded inputs");

    let domain = config.require_proxy_domain()?.to_string();
    let (backend, direct) = build_backend(&cli.command, &config, &domain).await?;

    let reporter = Arc::new(Reporter::new());
    let scanner = Scanner::new(backend, direct, reporter.clone())
        .with_headers(headers)
        .record_all_findings(config.record_header_findings);

    let started = Instant::now();
    let stats = scan_all(Arc::new(scanner), &specs, config.workers, config.queue_capacity).await?;
    tracing::info!(
        submitted = stats.submitted,
        completed = stats.completed,
        failed = stats.failed,
        findings = reporter.finding_count(),
        "scan finished"
    );
    if stats.failed > 0 {
        tracing::warn!(failed = stats.failed, "some scan tasks did not finish cleanly");
    }

    if let Some(path) = &config.report {
        reporter.write_to(path).await?;
    }

    println!("Scan completed in {:.1}s", started.elapsed().as_secs_f64());
    Ok(())
}

/// Config file first, then flags and environment on top.
fn merge_config(cli: &Cli) -> anyhow::Result<ScanConfig> {
    let mut config = match &cli.config {
        Some(path) => ScanConfig::from_file(path)?,
        None => ScanConfig::default(),
    };

    if let Some(workers) = cli.workers {
        config.workers = workers;
    }
    if let Some(domain) = &cli.domain {
        config.proxy_domain = Some(domain.clone());
    }
    if let Some(report) = &cli.report {
        config.report = Some(report.clone());
    }
    config.headers.extend(cli.headers.iter().cloned());
    Ok(config)
}

async fn build_backend(
    command: &Commands,
    config: &ScanConfig,
    domain: &str,
) -> anyhow::Result<(Arc<dyn CdnBackend>, Arc<dyn Transport>)> {
    match command {
        Commands::Cloudfront { .. } => {
            let client = create_scan_client(config.header_timeout(), None)?;
            let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(client));
            tracing::info!(distribution = domain, "using header routing backend");
            let backend = HeaderProxyBackend::new(domain, transport.clone());
            Ok((Arc::new(backend), transport))
        }
        Commands::Cloudflare { .. } => {
            let zone = CloudflareZone::from_env(&config.cloudflare_api_base, domain).await?;

            let resolver = ProxyResolver::cloudflare(config.resolver_timeout());
            let client = create_scan_client(config.dns_timeout(), Some(resolver))?;
            let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(client));

            let pool = Arc::new(SubdomainPool::new(config.subdomain_pool_size));
            if config.workers > pool.size() {
                tracing::warn!(
                    workers = config.workers,
                    subdomains = pool.size(),
                    "more workers than subdomains, workers will queue for free slots"
                );
            }

            tracing::info!(zone = domain, subdomains = pool.size(), "using dns rotation backend");
            let backend = DnsRotationBackend::new(
                domain,
                Arc::new(zone),
                transport.clone(),
                pool,
                config.poll,
                Arc::new(TokioClock),
            );
            Ok((Arc::new(backend), transport))
        }
    }
}
