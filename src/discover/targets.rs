use once_cell::sync::Lazy;
use regex::bytes::Regex;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::discover::cidr::Ipv4Cidr;
use crate::errors::ScanError;
use crate::probe::ScanTarget;

/// Dotted quads, optionally with a prefix length.
static IP_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:[0-9]{1,3}\.){3}[0-9]{1,3}(?:/\d\d?)?").expect("static ip pattern")
});

/// Rough domain matcher. Over- and under-matches; good enough for lists
/// pasted out of other tools.
static DOMAIN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^\s/,;@]+\.(?:com|net|io|org)(?-u:\b)").expect("static domain pattern")
});

/// Blocks bigger than this are expanded anyway, but loudly.
const LARGE_PREFIX: u8 = 16;

/// One parsed input token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSpec {
    Host(String),
    Cidr(Ipv4Cidr),
}

impl TargetSpec {
    pub fn parse(token: &str) -> Result<Self, ScanError> {
        if token.contains('/') {
            Ok(TargetSpec::Cidr(token.parse()?))
        } else {
            Ok(TargetSpec::Host(token.to_string()))
        }
    }

    /// Number of scan targets this token produces (two per address).
    pub fn target_count(&self) -> u64 {
        match self {
            TargetSpec::Host(_) => 2,
            TargetSpec::Cidr(cidr) => cidr.len() * 2,
        }
    }

    /// http and https targets for every address, produced lazily.
    pub fn targets(&self) -> Box<dyn Iterator<Item = ScanTarget> + Send> {
        match self {
            TargetSpec::Host(host) => Box::new(ScanTarget::pair(host).into_iter()),
            TargetSpec::Cidr(cidr) => Box::new(
                cidr.hosts().flat_map(|ip| ScanTarget::pair(&ip.to_string()).into_iter()),
            ),
        }
    }
}

/// Pull candidate hosts out of a file's contents: every IP/CIDR first, then
/// every domain-like token.
pub fn extract_tokens(content: &[u8]) -> Vec<String> {
    IP_PATTERN
        .find_iter(content)
        .chain(DOMAIN_PATTERN.find_iter(content))
        .map(|m| String::from_utf8_lossy(m.as_bytes()).into_owned())
        .collect()
}

/// Turn command line inputs into target specs. An input naming an existing
/// file is read and scraped for targets, anything else is a target itself.
///
/// Every token is validated here, before the first request goes out.
pub fn expand_inputs(inputs: &[String]) -> Result<Vec<TargetSpec>, ScanError> {
    let mut specs = Vec::new();

    for input in inputs {
        let tokens = match std::fs::read(input) {
            Ok(content) => {
                println!("Reading contents of {}", input);
                extract_tokens(&content)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => vec![input.clone()],
            Err(e) => {
                return Err(ScanError::InputFile { path: PathBuf::from(input), source: e });
            }
        };

        for token in tokens {
            let spec = TargetSpec::parse(&token)?;
            if let TargetSpec::Cidr(cidr) = &spec {
                if cidr.prefix() < LARGE_PREFIX {
                    tracing::warn!(cidr = %token, addresses = cidr.len(), "large CIDR block, this scan will take a long time");
                }
            }
            specs.push(spec);
        }
    }

    Ok(specs)
}
