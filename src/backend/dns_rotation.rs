use async_trait::async_trait;
use std::sync::Arc;

use crate::backend::lease::{SubdomainLease, SubdomainPool};
use crate::backend::poll::{binding_live, deletion_propagated, Clock, PollSchedule, RebindPhase, RebindState};
use crate::backend::{BackendKind, CdnBackend};
use crate::cloudflare::{DnsRecord, ZoneRecords};
use crate::probe::{OutboundRequest, PathOutcome, ProbeRequest, Transport};

/// Routes each request through a proxied subdomain of a spare zone that is
/// re-pointed at the target just before the request.
///
/// The CDN control plane is eventually consistent, so every rebind deletes
/// the old record and waits for the deletion to be visible before creating
/// the new one and waiting for that. Skipping either wait eventually gets
/// responses from whatever origin the subdomain pointed at before.
pub struct DnsRotationBackend {
    zone_domain: String,
    zone: Arc<dyn ZoneRecords>,
    transport: Arc<dyn Transport>,
    pool: Arc<SubdomainPool>,
    schedule: PollSchedule,
    clock: Arc<dyn Clock>,
}

impl DnsRotationBackend {
    pub fn new(
        zone_domain: impl Into<String>,
        zone: Arc<dyn ZoneRecords>,
        transport: Arc<dyn Transport>,
        pool: Arc<SubdomainPool>,
        schedule: PollSchedule,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            zone_domain: zone_domain.into(),
            zone,
            transport,
            pool,
            schedule,
            clock,
        }
    }

    /// Drive one rebind of `lease` to `origin` until it reaches a terminal
    /// state. `probe` is the request aimed at the leased subdomain.
    pub async fn rebind(&self, lease: &SubdomainLease, origin: &str, probe: &OutboundRequest) -> RebindState {
        let record_name = lease.record_name(&self.zone_domain);

        let existing = match self.zone.list_records(&record_name).await {
            Ok(records) => records,
            Err(e) => {
                return RebindState::Aborted(format!("retrieving dns record for {}: {:#}", lease.subdomain(), e));
            }
        };

        let mut state = RebindState::Deleting;
        while !state.is_terminal() {
            tracing::trace!(subdomain = %lease.subdomain(), state = ?state, "rebind step");
            state = match state {
                RebindState::Deleting => self.delete_all(lease, &existing).await,

                RebindState::AwaitingDeletePropagation { attempt } => {
                    if attempt >= self.schedule.delete_attempts {
                        RebindState::TimedOut { phase: RebindPhase::DeletePropagation, last: None }
                    } else {
                        let result = self.transport.send(probe).await;
                        if deletion_propagated(&result) {
                            RebindState::Creating
                        } else if attempt + 1 >= self.schedule.delete_attempts {
                            RebindState::TimedOut { phase: RebindPhase::DeletePropagation, last: Some(result) }
                        } else {
                            self.clock.sleep(self.schedule.interval).await;
                            RebindState::AwaitingDeletePropagation { attempt: attempt + 1 }
                        }
                    }
                }

                RebindState::Creating => {
                    let record = DnsRecord::proxied_cname(&record_name, origin);
                    match self.zone.create_record(&record).await {
                        Ok(()) => RebindState::AwaitingCreatePropagation { attempt: 0 },
                        Err(e) => RebindState::Aborted(format!("creating record for {}: {:#}", lease.subdomain(), e)),
                    }
                }

                RebindState::AwaitingCreatePropagation { attempt } => {
                    if attempt >= self.schedule.create_attempts {
                        RebindState::TimedOut { phase: RebindPhase::CreatePropagation, last: None }
                    } else {
                        let result = self.transport.send(probe).await;
                        if binding_live(&result) {
                            RebindState::Ready(result)
                        } else if attempt + 1 >= self.schedule.create_attempts {
                            RebindState::TimedOut { phase: RebindPhase::CreatePropagation, last: Some(result) }
                        } else {
                            self.clock.sleep(self.schedule.interval).await;
                            RebindState::AwaitingCreatePropagation { attempt: attempt + 1 }
                        }
                    }
                }

                terminal => terminal,
            };
        }
        state
    }

    async fn delete_all(&self, lease: &SubdomainLease, records: &[DnsRecord]) -> RebindState {
        for record in records {
            let Some(id) = record.id.as_deref() else { continue };
            if let Err(e) = self.zone.delete_record(id).await {
                return RebindState::Aborted(format!("{}: {:#}", lease.subdomain(), e));
            }
        }
        RebindState::AwaitingDeletePropagation { attempt: 0 }
    }
}

#[async_trait]
impl CdnBackend for DnsRotationBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::DnsRotation
    }

    async fn route_proxied(&self, request: &ProbeRequest) -> PathOutcome {
        let lease = self.pool.acquire().await;
        let probe = request.via(&lease.record_name(&self.zone_domain));

        match self.rebind(&lease, &request.target.host, &probe).await {
            RebindState::Ready(result) => self.classify_proxy(result),
            RebindState::TimedOut { phase, last } => {
                tracing::warn!(host = %request.target, subdomain = %lease.subdomain(), phase = %phase, "gave up waiting for dns change");
                let mut outcome = PathOutcome::unknown(format!("{} for {} did not propagate", phase, lease.subdomain()));
                if let Some(Ok(resp)) = last {
                    outcome.response = Some(resp);
                }
                outcome
            }
            RebindState::Aborted(reason) => {
                tracing::warn!(host = %request.target, error = %reason, "dns rebind failed");
                PathOutcome::unknown(reason)
            }
            other => PathOutcome::unknown(format!("rebind stopped in state {:?}", other)),
        }
    }
}
