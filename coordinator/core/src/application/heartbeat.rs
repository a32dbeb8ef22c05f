// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Heartbeat Protocol
//!
//! Request-level orchestration for the three agent calls. Each one refreshes
//! the caller through the registry and then asks the election service for
//! the zone's primary; handshake additionally hands back freshly rotated
//! credentials.

use std::sync::Arc;
use tracing::debug;

use crate::application::election::PrimaryElectionService;
use crate::application::registry::AgentRegistry;
use crate::domain::agent::AgentProfile;
use crate::domain::error::CoordinatorError;
use crate::domain::header::CustomHeader;
use crate::domain::protocol::{HandshakeResponse, PrimaryResponse, ZoneView};
use crate::domain::repository::ZoneRepository;

#[derive(Clone)]
pub struct HeartbeatService {
    zones: Arc<dyn ZoneRepository>,
    registry: AgentRegistry,
    election: PrimaryElectionService,
}

impl HeartbeatService {
    pub fn new(
        zones: Arc<dyn ZoneRepository>,
        registry: AgentRegistry,
        election: PrimaryElectionService,
    ) -> Self {
        Self { zones, registry, election }
    }

    /// Register or reconnect. Unknown zones are rejected before anything is
    /// written.
    pub async fn handshake(
        &self,
        header: &CustomHeader,
        profile: AgentProfile,
    ) -> Result<HandshakeResponse, CoordinatorError> {
        let zone_id = header.zone();
        if self.zones.find_by_id(zone_id).await?.is_none() {
            return Err(CoordinatorError::validation(format!("zone {} does not exist", zone_id)));
        }

        let agent = self.registry.upsert(&header.agent(), zone_id, profile).await?;
        let primary = self.election.get_primary(zone_id, agent.id).await?;
        debug!(agent_key = %agent.agent_key, zone_id = %zone_id, primary = %primary.ip, "Handshake complete");

        Ok(HandshakeResponse {
            me: agent.credentials.into(),
            agent: ZoneView { primary },
        })
    }

    pub async fn poll(&self, header: &CustomHeader) -> Result<PrimaryResponse, CoordinatorError> {
        let agent = self.registry.touch(&header.agent(), header.zone()).await?;
        let primary = self.election.get_primary(agent.zone_id, agent.id).await?;
        Ok(PrimaryResponse { agent: ZoneView { primary } })
    }

    /// Same contract as [`poll`](Self::poll), served on the reports route.
    pub async fn report(&self, header: &CustomHeader) -> Result<PrimaryResponse, CoordinatorError> {
        self.poll(header).await
    }
}
