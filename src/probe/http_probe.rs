use async_trait::async_trait;
use reqwest::Client;

use crate::probe::request::OutboundRequest;
use crate::probe::state::{FailureKind, ProbeResponse, TransportError, TransportResult, MAX_BODY_BYTES};
use crate::resolver::NO_SUCH_HOST;

/// Sends one request and reports either the response or why there was none.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, req: &OutboundRequest) -> TransportResult;
}

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, req: &OutboundRequest) -> TransportResult {
        let url = url::Url::parse(&req.url)
            .map_err(|e| TransportError::new(FailureKind::Other, format!("invalid url {}: {}", req.url, e)))?;

        let mut builder = self.client.get(url);
        for (name, value) in &req.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let mut resp = builder.send().await.map_err(|e| transport_error(&e))?;

        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
            .collect();

        // Keep a bounded prefix of the body; a failure half way through the
        // body does not change the status we already have.
        let mut body = Vec::new();
        while body.len() < MAX_BODY_BYTES {
            match resp.chunk().await {
                Ok(Some(chunk)) => {
                    let room = MAX_BODY_BYTES - body.len();
                    body.extend_from_slice(&chunk[..chunk.len().min(room)]);
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!(url = %req.url, error = %e, "failed reading body of response");
                    break;
                }
            }
        }

        Ok(ProbeResponse { status, headers, body })
    }
}

/// Flatten a reqwest error and its sources into one message and categorize it.
pub fn transport_error(err: &reqwest::Error) -> TransportError {
    let message = error_chain(err);
    TransportError::new(failure_kind(err.is_timeout(), &message), message)
}

pub fn failure_kind(is_timeout: bool, message: &str) -> FailureKind {
    let lower = message.to_lowercase();
    if is_timeout || lower.contains("timed out") {
        FailureKind::Timeout
    } else if lower.contains(NO_SUCH_HOST)
        || lower.contains("name or service not known")
        || lower.contains("nodename nor servname")
    {
        FailureKind::NoSuchHost
    } else if lower.contains("connection refused") {
        FailureKind::ConnectionRefused
    } else if lower.contains("handshake") {
        FailureKind::TlsHandshake
    } else {
        FailureKind::Other
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(s) = source {
        let text = s.to_string();
        if !parts.iter().any(|p| p.contains(&text)) {
            parts.push(text);
        }
        source = s.source();
    }
    parts.join(": ")
}
