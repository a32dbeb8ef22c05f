// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Agent Aggregate
//!
//! A registered worker, identified externally by its [`AgentKey`] and
//! internally by its [`AgentId`]. The coordinator mutates an agent only on
//! behalf of that agent's own handshake/poll requests.
//!
//! # Invariants
//!
//! - `agent_key` → `id` never changes once the agent is registered.
//! - `last_access_time` never moves backwards (see [`Agent::refresh`]).
//! - Agents are never deleted and never marked inactive by the coordinator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::lease::PrimaryDescriptor;
use crate::domain::zone::ZoneId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub Uuid);

impl AgentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable external identity an agent presents in `X-AGENT-KEY`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentKey(pub String);

impl AgentKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AgentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Address other agents in the zone use to reach this one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentAddress {
    pub ip: String,
    pub port: u16,
}

/// Resources reported by the agent host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceProfile {
    /// CPU cores
    pub core: i32,
    /// Memory (agent-reported unit)
    pub memory: i64,
    /// Disk (agent-reported unit)
    pub disk: i64,
}

/// Everything an agent reports about itself on handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub address: AgentAddress,
    pub resources: ResourceProfile,
}

/// Symmetric keys handed to the agent. Both are re-minted on every
/// handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentCredentials {
    pub hmac_key: String,
    pub enc_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub zone_id: ZoneId,
    pub agent_key: AgentKey,
    pub address: AgentAddress,
    pub resources: ResourceProfile,
    pub credentials: AgentCredentials,
    pub last_access_time: DateTime<Utc>,
    pub is_active: bool,
}

impl Agent {
    /// Build a freshly registered, active agent.
    pub fn register(
        agent_key: AgentKey,
        zone_id: ZoneId,
        profile: AgentProfile,
        credentials: AgentCredentials,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AgentId::new(),
            zone_id,
            agent_key,
            address: profile.address,
            resources: profile.resources,
            credentials,
            last_access_time: now,
            is_active: true,
        }
    }

    /// Apply a reconnecting handshake: new address/resources, rotated
    /// credentials, refreshed liveness.
    pub fn refresh(&mut self, profile: AgentProfile, credentials: AgentCredentials, now: DateTime<Utc>) {
        self.address = profile.address;
        self.resources = profile.resources;
        self.credentials = credentials;
        self.touch(now);
    }

    /// Refresh liveness only.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_access_time = self.last_access_time.max(now);
        self.is_active = true;
    }

    /// True when the agent has not been seen for longer than `margin`.
    /// A margin too large to represent never elapses.
    pub fn idle_longer_than(&self, margin: chrono::Duration, now: DateTime<Utc>) -> bool {
        self.last_access_time
            .checked_add_signed(margin)
            .is_some_and(|deadline| deadline < now)
    }

    pub fn descriptor(&self) -> PrimaryDescriptor {
        PrimaryDescriptor {
            ip: self.address.ip.clone(),
            port: self.address.port,
            is_active: self.is_active,
            last_access_time: self.last_access_time.timestamp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn profile(ip: &str, port: u16) -> AgentProfile {
        AgentProfile {
            address: AgentAddress { ip: ip.to_string(), port },
            resources: ResourceProfile { core: 4, memory: 8192, disk: 100_000 },
        }
    }

    fn creds(tag: &str) -> AgentCredentials {
        AgentCredentials {
            hmac_key: format!("hmac-{tag}"),
            enc_key: format!("enc-{tag}"),
        }
    }

    #[test]
    fn test_register_is_active_and_stamped() {
        let now = Utc::now();
        let agent = Agent::register(AgentKey::new("a1"), ZoneId(5), profile("10.0.0.1", 18800), creds("1"), now);

        assert!(agent.is_active);
        assert_eq!(agent.last_access_time, now);
        assert_eq!(agent.zone_id, ZoneId(5));
        assert_eq!(agent.address.port, 18800);
    }

    #[test]
    fn test_refresh_never_moves_liveness_backwards() {
        let now = Utc::now();
        let mut agent = Agent::register(AgentKey::new("a1"), ZoneId(5), profile("10.0.0.1", 1), creds("1"), now);

        agent.refresh(profile("10.0.0.2", 2), creds("2"), now - Duration::seconds(10));

        assert_eq!(agent.last_access_time, now);
        assert_eq!(agent.address.ip, "10.0.0.2");
        assert_eq!(agent.credentials, creds("2"));
    }

    #[test]
    fn test_idle_longer_than_is_strict() {
        let now = Utc::now();
        let mut agent = Agent::register(AgentKey::new("a1"), ZoneId(5), profile("h", 1), creds("1"), now);
        agent.last_access_time = now - Duration::seconds(1);

        assert!(!agent.idle_longer_than(Duration::seconds(1), now));
        assert!(agent.idle_longer_than(Duration::milliseconds(999), now));
    }

    #[test]
    fn test_descriptor_uses_epoch_seconds() {
        let now = Utc::now();
        let agent = Agent::register(AgentKey::new("a1"), ZoneId(5), profile("10.0.0.9", 7), creds("1"), now);
        let d = agent.descriptor();

        assert_eq!(d.ip, "10.0.0.9");
        assert_eq!(d.port, 7);
        assert!(d.is_active);
        assert_eq!(d.last_access_time, now.timestamp());
    }
}
