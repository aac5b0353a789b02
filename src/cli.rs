use clap::Parser;
use std::path::PathBuf;

#[derive(clap::Parser, Debug)]
#[command(author, version, about = "Find origins whose IP allow-listing can be bypassed through a CDN", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Number of concurrent workers (default: 100)
    #[arg(short = 'w', long, global = true)]
    pub workers: Option<usize>,

    /// Proxy domain: the CloudFront distribution, or the spare CloudFlare zone
    #[arg(short = 'd', long, env = "CDN_SCANNER_DOMAIN", global = true)]
    pub domain: Option<String>,

    /// Write findings as JSON to this file
    #[arg(short = 'r', long, value_name = "FILE", global = true)]
    pub report: Option<PathBuf>,

    /// JSON file with scan settings; flags take precedence
    #[arg(short = 'c', long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Extra request header, e.g. -H "Host: intranet.example.com" (repeatable)
    #[arg(short = 'H', long = "header", value_name = "NAME: VALUE", global = true)]
    pub headers: Vec<String>,

    /// Enable detailed debug logging (global)
    #[arg(long, default_value_t = false, global = true)]
    pub debug: bool,

    /// Enable verbose logging (global)
    #[arg(long, default_value_t = false, global = true)]
    pub verbose: bool,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Scan through a CloudFront distribution that routes on request headers
    Cloudfront {
        /// IPs, hostnames, CIDRs, or files containing them
        #[arg(required = true)]
        targets: Vec<String>,
    },

    /// Scan by re-pointing proxied subdomains of a spare CloudFlare zone
    Cloudflare {
        /// IPs, hostnames, CIDRs, or files containing them
        #[arg(required = true)]
        targets: Vec<String>,
    },
}

impl Commands {
    pub fn targets(&self) -> &[String] {
        match self {
            Commands::Cloudfront { targets } | Commands::Cloudflare { targets } => targets,
        }
    }
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}
