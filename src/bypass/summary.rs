use std::fmt::Write;

use crate::bypass::detector::Verdict;
use crate::probe::{PathOutcome, ProbeRequest};

/// Bytes of the proxied body shown as bypass evidence.
pub const EVIDENCE_BODY_BYTES: usize = 200;

/// `scheme://host -- `, naming the Host override when there is one.
pub fn line_prefix(request: &ProbeRequest) -> String {
    let host = request.host_header();
    if host == request.target.host {
        format!("{} -- ", request.target)
    } else {
        format!("{} (Host: {}) -- ", request.target, host)
    }
}

fn path_part(outcome: &PathOutcome) -> String {
    match &outcome.error {
        Some(err) => format!("{} ({} -- {})", outcome.state, outcome.code(), err),
        None => format!("{} ({})", outcome.state, outcome.code()),
    }
}

fn origin_part(direct: &PathOutcome) -> String {
    match (&direct.error, &direct.response) {
        (Some(err), None) => format!("error (000 -- {})", err),
        _ => path_part(direct),
    }
}

/// The console line for one target. Bypasses get the proxied response
/// appended as evidence.
pub fn render(request: &ProbeRequest, direct: &PathOutcome, proxied: &PathOutcome, verdict: Verdict) -> String {
    let mut msg = line_prefix(request);

    if verdict == Verdict::OriginTlsFailure {
        msg.push_str("origin tls handshake failure");
        return msg;
    }

    let same = proxied.state == direct.state && proxied.code() == direct.code() && proxied.error == direct.error;
    if same {
        let _ = write!(msg, "Both: {}", path_part(proxied));
    } else {
        let _ = write!(msg, "Via Proxy: {}, Origin: {}", path_part(proxied), origin_part(direct));
    }

    if verdict.is_bypass() {
        return format!("\n{} -- Bypass Found!\n{}", msg, evidence(proxied));
    }
    msg
}

fn evidence(proxied: &PathOutcome) -> String {
    let Some(resp) = &proxied.response else {
        return String::new();
    };

    let mut out = String::new();
    for (name, value) in &resp.headers {
        let _ = writeln!(out, " {}: {}", name, value);
    }
    let end = resp.body.len().min(EVIDENCE_BODY_BYTES);
    let _ = writeln!(out, "\n{}", String::from_utf8_lossy(&resp.body[..end]));
    out
}
