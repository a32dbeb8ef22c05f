// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Agent Registry
//!
//! Owns the agent identity lifecycle: create on first handshake, refresh in
//! place on every later contact.
//!
//! # Flow (upsert)
//!
//! 1. Look the agent up by its key
//! 2. Unknown key → register: bind to the zone, mark active, stamp liveness,
//!    mint credentials, insert
//! 3. Known key → refresh address/resources/liveness and re-mint both keys
//! 4. Insert lost to a concurrent registration of the same key → refresh the
//!    row that won
//!
//! Any persistence failure fails the request; there is no partial upsert.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::agent::{Agent, AgentKey, AgentProfile};
use crate::domain::error::CoordinatorError;
use crate::domain::repository::{AgentRepository, RepositoryError};
use crate::domain::zone::ZoneId;
use crate::infrastructure::keys::mint_credentials;

#[derive(Clone)]
pub struct AgentRegistry {
    agents: Arc<dyn AgentRepository>,
}

impl AgentRegistry {
    pub fn new(agents: Arc<dyn AgentRepository>) -> Self {
        Self { agents }
    }

    /// Create or refresh the agent identified by `key`.
    pub async fn upsert(
        &self,
        key: &AgentKey,
        zone_id: ZoneId,
        profile: AgentProfile,
    ) -> Result<Agent, CoordinatorError> {
        ensure_key(key)?;

        if let Some(existing) = self.agents.find_by_key(key).await? {
            return self.refresh(existing, zone_id, profile).await;
        }

        let agent = Agent::register(key.clone(), zone_id, profile.clone(), mint_credentials(), Utc::now());
        match self.agents.insert(&agent).await {
            Ok(()) => {
                info!(agent_key = %key, agent_id = %agent.id, zone_id = %zone_id, "Registered new agent");
                Ok(agent)
            }
            Err(RepositoryError::Conflict(_)) => {
                debug!(agent_key = %key, "Concurrent registration won, refreshing existing agent");
                let existing = self.agents.find_by_key(key).await?.ok_or_else(|| {
                    CoordinatorError::internal(format!("agent '{}' vanished after registration conflict", key))
                })?;
                self.refresh(existing, zone_id, profile).await
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Refresh liveness for an already registered agent (poll/report path).
    /// Credentials are left untouched.
    pub async fn touch(&self, key: &AgentKey, zone_id: ZoneId) -> Result<Agent, CoordinatorError> {
        ensure_key(key)?;

        let mut agent = self
            .agents
            .find_by_key(key)
            .await?
            .ok_or_else(|| CoordinatorError::validation(format!("agent '{}' is not registered, handshake first", key)))?;
        ensure_zone(&agent, zone_id)?;

        agent.touch(Utc::now());
        self.agents.update(&agent).await?;
        debug!(agent_key = %key, last_access = %agent.last_access_time, "Agent liveness refreshed");
        Ok(agent)
    }

    async fn refresh(
        &self,
        mut agent: Agent,
        zone_id: ZoneId,
        profile: AgentProfile,
    ) -> Result<Agent, CoordinatorError> {
        ensure_zone(&agent, zone_id)?;

        agent.refresh(profile, mint_credentials(), Utc::now());
        self.agents.update(&agent).await?;
        debug!(agent_key = %agent.agent_key, agent_id = %agent.id, "Agent reconnected, credentials rotated");
        Ok(agent)
    }
}

fn ensure_key(key: &AgentKey) -> Result<(), CoordinatorError> {
    if key.is_empty() {
        return Err(CoordinatorError::validation("missing agent key"));
    }
    Ok(())
}

fn ensure_zone(agent: &Agent, zone_id: ZoneId) -> Result<(), CoordinatorError> {
    if agent.zone_id != zone_id {
        return Err(CoordinatorError::validation(format!(
            "agent '{}' belongs to zone {}, not zone {}",
            agent.agent_key, agent.zone_id, zone_id
        )));
    }
    Ok(())
}
