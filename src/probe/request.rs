use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One network asset probed over one scheme.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScanTarget {
    pub host: String,
    pub scheme: Scheme,
}

impl ScanTarget {
    pub fn new(host: impl Into<String>, scheme: Scheme) -> Self {
        Self { host: host.into(), scheme }
    }

    /// Every literal input is scanned once over http and once over https.
    pub fn pair(host: &str) -> [ScanTarget; 2] {
        [ScanTarget::new(host, Scheme::Http), ScanTarget::new(host, Scheme::Https)]
    }

    pub fn url(&self) -> String {
        format!("{}://{}/", self.scheme, self.host)
    }
}

impl fmt::Display for ScanTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.host)
    }
}

/// A request aimed at a target, before any CDN routing is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    pub target: ScanTarget,
    pub path: String,
    pub headers: Vec<(String, String)>,
}

impl ProbeRequest {
    pub fn new(target: ScanTarget) -> Self {
        Self { target, path: "/".to_string(), headers: Vec::new() }
    }

    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }

    pub fn url(&self) -> String {
        format!("{}://{}{}", self.target.scheme, self.target.host, self.path)
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    /// Host header the origin should see: an explicit `Host` header if one
    /// was supplied, otherwise the target host.
    pub fn host_header(&self) -> &str {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("host"))
            .map(|(_, v)| v.as_str())
            .unwrap_or(self.target.host.as_str())
    }

    /// The same request sent to `host` instead of the target. Any Host
    /// override is dropped so the Host header follows the URL.
    pub fn via(&self, host: &str) -> OutboundRequest {
        OutboundRequest {
            url: format!("{}://{}{}", self.target.scheme, host, self.path),
            headers: self
                .headers
                .iter()
                .filter(|(k, _)| !k.eq_ignore_ascii_case("host"))
                .cloned()
                .collect(),
        }
    }

    pub fn direct(&self) -> OutboundRequest {
        OutboundRequest { url: self.url(), headers: self.headers.clone() }
    }
}

/// What actually goes on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl OutboundRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
