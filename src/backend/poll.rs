use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

use crate::probe::{FailureKind, TransportResult};

/// Body text the CDN serves on 530 when the subdomain has no origin record.
pub const ORIGIN_DNS_ERROR: &str = "Origin DNS error";

/// Status the CDN uses for "this hostname is not bound to an origin".
pub const UNBOUND_STATUS: u16 = 530;

/// Sleeps between poll attempts. Swapped out in tests.
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Attempt ceilings and spacing of the two propagation polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PollSchedule {
    #[serde(with = "secs")]
    pub interval: Duration,
    pub delete_attempts: u32,
    pub create_attempts: u32,
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            delete_attempts: 30,
            create_attempts: 20,
        }
    }
}

mod secs {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebindPhase {
    DeletePropagation,
    CreatePropagation,
}

impl fmt::Display for RebindPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RebindPhase::DeletePropagation => f.write_str("record deletion"),
            RebindPhase::CreatePropagation => f.write_str("record creation"),
        }
    }
}

/// Steps of re-pointing one subdomain at a new origin.
#[derive(Debug)]
pub enum RebindState {
    Deleting,
    AwaitingDeletePropagation { attempt: u32 },
    Creating,
    AwaitingCreatePropagation { attempt: u32 },
    /// The new binding answered; this is the result to classify.
    Ready(TransportResult),
    TimedOut { phase: RebindPhase, last: Option<TransportResult> },
    /// The zone API refused a change.
    Aborted(String),
}

impl RebindState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RebindState::Ready(_) | RebindState::TimedOut { .. } | RebindState::Aborted(_))
    }
}

/// The old binding is gone: either the name no longer resolves or the CDN
/// says it has no origin for it.
pub fn deletion_propagated(result: &TransportResult) -> bool {
    match result {
        Err(e) => e.kind == FailureKind::NoSuchHost,
        Ok(resp) => resp.status == UNBOUND_STATUS && resp.body_contains(ORIGIN_DNS_ERROR),
    }
}

/// The new binding answers. A 530 or an unresolvable name still means the
/// CDN has not picked the record up.
pub fn binding_live(result: &TransportResult) -> bool {
    match result {
        Err(e) => e.kind != FailureKind::NoSuchHost,
        Ok(resp) => resp.status != UNBOUND_STATUS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{ProbeResponse, TransportError};

    #[test]
    fn test_phase_predicates_differ_on_bare_530() {
        // 530 without the marker text: neither "old gone" nor "new live".
        let bare = Ok(ProbeResponse::new(530).with_body("error code: 1000"));
        assert!(!deletion_propagated(&bare));
        assert!(!binding_live(&bare));

        let unbound = Ok(ProbeResponse::new(530).with_body("Error 1016 Origin DNS error"));
        assert!(deletion_propagated(&unbound));
        assert!(!binding_live(&unbound));
    }

    #[test]
    fn test_predicates_on_transport_errors() {
        let nx: TransportResult = Err(TransportError::new(FailureKind::NoSuchHost, "no such host"));
        assert!(deletion_propagated(&nx));
        assert!(!binding_live(&nx));

        let timeout: TransportResult = Err(TransportError::new(FailureKind::Timeout, "timed out"));
        assert!(!deletion_propagated(&timeout));
        assert!(binding_live(&timeout));
    }

    #[test]
    fn test_old_origin_still_answering() {
        let stale = Ok(ProbeResponse::new(200));
        assert!(!deletion_propagated(&stale));
        assert!(binding_live(&stale));
    }

    #[test]
    fn test_schedule_from_json() {
        let schedule: PollSchedule = serde_json::from_str(r#"{"interval": 2, "delete_attempts": 3}"#).unwrap();
        assert_eq!(schedule.interval, Duration::from_secs(2));
        assert_eq!(schedule.delete_attempts, 3);
        assert_eq!(schedule.create_attempts, 20);
    }
}
