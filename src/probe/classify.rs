//! Status/error rule tables for both paths of both backends.
//!
//! The header backend treats a direct timeout as `Closed`, the DNS backend
//! as `Filtered`. Each CDN reports origin failures with its own 5xx codes.

use crate::backend::BackendKind;
use crate::probe::state::{FailureKind, PathOutcome, ProbeResponse, SvcState, TransportResult};

/// Classify the result of a request sent straight to the origin.
pub fn classify_direct(backend: BackendKind, result: TransportResult) -> PathOutcome {
    match result {
        Err(err) => {
            let state = match (backend, err.kind) {
                (BackendKind::HeaderProxy, FailureKind::Timeout) => SvcState::Closed,
                (BackendKind::DnsRotation, FailureKind::Timeout) => SvcState::Filtered,
                (BackendKind::DnsRotation, FailureKind::ConnectionRefused) => SvcState::Closed,
                _ => SvcState::Unknown,
            };
            // Expected network answers are not errors, only the state matters.
            let error = if state == SvcState::Unknown { Some(err.message) } else { None };
            PathOutcome { state, error, failure: Some(err.kind), response: None }
        }
        Ok(resp) => {
            let redirect = match backend {
                BackendKind::HeaderProxy => matches!(resp.status, 301 | 302),
                BackendKind::DnsRotation => matches!(resp.status, 301 | 302 | 307),
            };
            let (state, error) = match resp.status {
                403 => (SvcState::AccessDenied, None),
                _ if redirect => (SvcState::Open, Some(location(&resp))),
                100..=599 => (SvcState::Open, None),
                c => (SvcState::Unknown, Some(format!("unknown status code: {}", c))),
            };
            PathOutcome { state, error, failure: None, response: Some(resp) }
        }
    }
}

/// Classify the result of a request routed through the CDN.
pub fn classify_proxied(backend: BackendKind, result: TransportResult) -> PathOutcome {
    match result {
        Err(err) => {
            let state = if err.kind == FailureKind::Timeout {
                SvcState::ProxyError
            } else {
                SvcState::Unknown
            };
            PathOutcome { state, error: Some(err.message), failure: Some(err.kind), response: None }
        }
        Ok(resp) => {
            let (state, error) = match backend {
                BackendKind::HeaderProxy => header_proxy_status(&resp),
                BackendKind::DnsRotation => dns_rotation_status(&resp),
            };
            PathOutcome { state, error, failure: None, response: Some(resp) }
        }
    }
}

fn header_proxy_status(resp: &ProbeResponse) -> (SvcState, Option<String>) {
    match resp.status {
        403 => (SvcState::AccessDenied, None),
        502 => (SvcState::Closed, None),
        504 => (SvcState::Filtered, None),
        301 | 302 => (SvcState::Open, Some(location(resp))),
        200..=499 => (SvcState::Open, None),
        c => (SvcState::Unknown, Some(format!("unknown status code: {}", c))),
    }
}

fn dns_rotation_status(resp: &ProbeResponse) -> (SvcState, Option<String>) {
    match resp.status {
        530 => (SvcState::Unknown, None),
        403 => (SvcState::AccessDenied, None),
        521 => (SvcState::Closed, None),
        522 | 523 => (SvcState::Filtered, None),
        301 | 302 | 307 => (SvcState::Open, Some(location(resp))),
        200..=599 => (SvcState::Open, None),
        c => (SvcState::Unknown, Some(format!("unknown status code: {}", c))),
    }
}

fn location(resp: &ProbeResponse) -> String {
    resp.header("location").unwrap_or_default().to_string()
}
