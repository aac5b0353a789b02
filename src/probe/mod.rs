pub mod classify;
pub mod http_probe;
pub mod request;
pub mod state;

pub use classify::{classify_direct, classify_proxied};
pub use http_probe::{HttpTransport, Transport};
pub use request::{OutboundRequest, ProbeRequest, ScanTarget, Scheme};
pub use state::{FailureKind, PathOutcome, ProbeResponse, SvcState, TransportError, TransportResult};
