use std::fmt;

/// Classification of one observed network path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SvcState {
    Open,
    AccessDenied,
    Closed,
    Filtered,
    Unknown,
    ProxyError,
}

impl SvcState {
    pub const ALL: [SvcState; 6] = [
        SvcState::Open,
        SvcState::AccessDenied,
        SvcState::Closed,
        SvcState::Filtered,
        SvcState::Unknown,
        SvcState::ProxyError,
    ];

    /// The origin actively refused us, as opposed to simply not answering.
    pub fn is_blocked(&self) -> bool {
        matches!(self, SvcState::Closed | SvcState::AccessDenied)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SvcState::Open => "open",
            SvcState::AccessDenied => "access denied",
            SvcState::Closed => "closed",
            SvcState::Filtered => "filtered",
            SvcState::Unknown => "unknown",
            SvcState::ProxyError => "proxy error",
        }
    }
}

impl fmt::Display for SvcState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Coarse category of a request that produced no HTTP response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Timeout,
    ConnectionRefused,
    NoSuchHost,
    TlsHandshake,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    pub kind: FailureKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// A response as captured by the transport. The body is truncated to
/// `MAX_BODY_BYTES`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProbeResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

pub const MAX_BODY_BYTES: usize = 64 * 1024;

impl ProbeResponse {
    pub fn new(status: u16) -> Self {
        Self { status, ..Default::default() }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Case-insensitive header lookup, first value wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body_contains(&self, needle: &str) -> bool {
        let needle = needle.as_bytes();
        !needle.is_empty() && self.body.windows(needle.len()).any(|w| w == needle)
    }
}

pub type TransportResult = Result<ProbeResponse, TransportError>;

/// Classified result of one path (direct or proxied) for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathOutcome {
    pub state: SvcState,
    /// Descriptive text: a real failure, a redirect location or an
    /// unexpected status code.
    pub error: Option<String>,
    /// Set when the request produced no response at all.
    pub failure: Option<FailureKind>,
    pub response: Option<ProbeResponse>,
}

impl PathOutcome {
    pub fn unknown(error: impl Into<String>) -> Self {
        Self {
            state: SvcState::Unknown,
            error: Some(error.into()),
            failure: None,
            response: None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.response.as_ref().map(|r| r.status)
    }

    /// Status code as printed on the console, 0 when there was no response.
    pub fn code(&self) -> u16 {
        self.status().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_blocked() {
        let blocked: Vec<_> = SvcState::ALL.iter().filter(|s| s.is_blocked()).collect();
        assert_eq!(blocked, vec![&SvcState::AccessDenied, &SvcState::Closed]);
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let resp = ProbeResponse::new(301).with_header("Location", "https://example.com/");
        assert_eq!(resp.header("location"), Some("https://example.com/"));
        assert_eq!(resp.header("server"), None);
    }

    #[test]
    fn test_body_contains() {
        let resp = ProbeResponse::new(530).with_body("error code: 1016 Origin DNS error");
        assert!(resp.body_contains("Origin DNS error"));
        assert!(!resp.body_contains("Bad gateway"));
    }
}
