use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a scan or a single proxied request before any network I/O.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("unable to read from file {path}: {source}")]
    InputFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error parsing cidr {cidr}: {reason}")]
    InvalidCidr { cidr: String, reason: String },

    #[error("{0} is a reserved header and is not allowed on requests")]
    ReservedHeader(String),

    #[error("no proxy domain configured, pass --domain or set CDN_SCANNER_DOMAIN")]
    MissingProxyDomain,

    #[error("environment variable {0} is not set")]
    MissingCredentials(&'static str),

    #[error("zone {0} not found in the cloudflare account")]
    ZoneNotFound(String),

    #[error("cloudflare api error: {0}")]
    ZoneApi(String),

    #[error("worker pool is no longer accepting tasks")]
    PoolStopped,

    #[error("invalid header {0:?}, expected \"Name: value\"")]
    InvalidHeader(String),
}
