// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Primary Election
//!
//! Lease-by-insert leader election. There is no lock and no background
//! heartbeat sweep: the store's uniqueness constraint on the lease's zone id
//! picks exactly one winner among concurrent claims, and stale primaries are
//! replaced lazily by whichever agent next asks for the primary.
//!
//! # Two thresholds
//!
//! - **staleness margin** (default 1s): checked on every lookup. Crossing it only
//!   means "maybe stale" and triggers an evicting claim.
//! - **eviction threshold** (default 30s): checked inside the claim
//!   transaction. The holder's lease is deleted only if it has really been
//!   idle this long; otherwise the delete is a no-op, the insert loses to the
//!   existing row, and the current holder is re-adopted.
//!
//! # Claim transaction
//!
//! 1. Open a dedicated session
//! 2. Optionally delete the zone's lease if its holder is past the eviction threshold
//! 3. Insert `{zone, agent}`; one row → caller wins, conflict → re-read and adopt
//! 4. Resolve the winner's agent record
//! 5. Commit; on any error roll back and surface an internal fault
//!
//! No step is retried. A failed claim fails the request; the next request
//! from any agent in the zone tries again.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::agent::{Agent, AgentId};
use crate::domain::config::ElectionConfig;
use crate::domain::error::CoordinatorError;
use crate::domain::lease::{LeaseInsert, PrimaryDescriptor, PrimaryLease};
use crate::domain::repository::{AgentRepository, LeaseRepository, LeaseTransaction};
use crate::domain::zone::ZoneId;

/// How a claim transaction settled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// Our insert went through; the caller is the new primary
    Won,
    /// Another lease already existed; its holder was adopted
    Adopted,
}

impl ClaimOutcome {
    fn label(self) -> &'static str {
        match self {
            ClaimOutcome::Won => "won",
            ClaimOutcome::Adopted => "adopted",
        }
    }
}

#[derive(Clone)]
pub struct PrimaryElectionService {
    agents: Arc<dyn AgentRepository>,
    leases: Arc<dyn LeaseRepository>,
    staleness_margin: chrono::Duration,
    eviction_threshold: chrono::Duration,
}

impl PrimaryElectionService {
    pub fn new(
        agents: Arc<dyn AgentRepository>,
        leases: Arc<dyn LeaseRepository>,
        config: ElectionConfig,
    ) -> Self {
        Self {
            agents,
            leases,
            staleness_margin: to_chrono(config.staleness_margin),
            eviction_threshold: to_chrono(config.eviction_threshold),
        }
    }

    /// Current primary for `zone_id`, claiming or re-claiming the lease on
    /// behalf of `requesting` when there is none or the holder looks stale.
    pub async fn get_primary(
        &self,
        zone_id: ZoneId,
        requesting: AgentId,
    ) -> Result<PrimaryDescriptor, CoordinatorError> {
        let Some(lease) = self.leases.find_by_zone(zone_id).await? else {
            debug!(zone_id = %zone_id, "No primary lease, claiming");
            return Ok(self.claim(zone_id, requesting, false).await?.descriptor());
        };

        let holder = self.agents.find_by_id(lease.agent_id).await?.ok_or_else(|| {
            warn!(zone_id = %zone_id, agent_id = %lease.agent_id, "Primary lease points at a missing agent");
            CoordinatorError::internal("primary agent not exist.")
        })?;

        let now = Utc::now();
        if holder.idle_longer_than(self.staleness_margin, now) {
            debug!(
                zone_id = %zone_id,
                holder = %holder.agent_key,
                last_access = %holder.last_access_time,
                "Primary may be stale, re-claiming"
            );
            return Ok(self.claim(zone_id, requesting, true).await?.descriptor());
        }

        Ok(holder.descriptor())
    }

    /// Run one claim transaction and return the winning agent.
    pub async fn claim(
        &self,
        zone_id: ZoneId,
        agent_id: AgentId,
        force_evict: bool,
    ) -> Result<Agent, CoordinatorError> {
        let mut tx = self.leases.begin().await?;

        match self.claim_within(tx.as_mut(), zone_id, agent_id, force_evict).await {
            Ok((winner, outcome)) => {
                tx.commit().await?;
                metrics::counter!("keel_primary_claims_total", "outcome" => outcome.label()).increment(1);
                if outcome == ClaimOutcome::Won {
                    info!(zone_id = %zone_id, primary = %winner.agent_key, "Elected new primary");
                } else {
                    debug!(zone_id = %zone_id, primary = %winner.agent_key, "Adopted existing primary");
                }
                Ok(winner)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(zone_id = %zone_id, "Rollback after failed claim also failed: {}", rollback_err);
                }
                metrics::counter!("keel_primary_claims_total", "outcome" => "failed").increment(1);
                warn!(zone_id = %zone_id, agent_id = %agent_id, "Primary election failed: {}", e);
                Err(e)
            }
        }
    }

    async fn claim_within(
        &self,
        tx: &mut dyn LeaseTransaction,
        zone_id: ZoneId,
        agent_id: AgentId,
        force_evict: bool,
    ) -> Result<(Agent, ClaimOutcome), CoordinatorError> {
        if force_evict {
            let cutoff = eviction_cutoff(Utc::now(), self.eviction_threshold);
            let removed = tx.delete_if_holder_idle(zone_id, cutoff).await?;
            if removed > 0 {
                info!(zone_id = %zone_id, "Evicted idle primary lease");
            }
        }

        let (winner_id, outcome) = match tx.insert(&PrimaryLease { zone_id, agent_id }).await? {
            LeaseInsert::Inserted(1) => (agent_id, ClaimOutcome::Won),
            LeaseInsert::Inserted(count) => {
                warn!(zone_id = %zone_id, "Unexpected lease insert count: {}", count);
                return Err(CoordinatorError::internal("elect primary failed."));
            }
            LeaseInsert::Conflict => {
                let lease = tx.find_by_zone(zone_id).await?.ok_or_else(|| {
                    debug!(zone_id = %zone_id, "Lease insert conflicted but no lease is visible");
                    CoordinatorError::internal("elect primary failed.")
                })?;
                (lease.agent_id, ClaimOutcome::Adopted)
            }
        };

        let winner = tx.find_agent(winner_id).await?.ok_or_else(|| {
            warn!(zone_id = %zone_id, agent_id = %winner_id, "Elected primary agent does not exist");
            CoordinatorError::internal("elect primary failed.")
        })?;

        Ok((winner, outcome))
    }
}

fn to_chrono(duration: std::time::Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX)
}

/// Holders last seen before this instant may be evicted
fn eviction_cutoff(now: DateTime<Utc>, threshold: chrono::Duration) -> DateTime<Utc> {
    now.checked_sub_signed(threshold).unwrap_or(DateTime::<Utc>::MIN_UTC)
}
