// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Infrastructure implementations of the repository traits defined in
//! `crate::domain::repository`.
//!
//! ## PostgreSQL Repositories
//!
//! - **PostgresZoneRepository** - zone existence checks and seeding
//! - **PostgresCredentialRepository** - API key → zone grants
//! - **PostgresAgentRepository** - agent registration and refresh
//! - **PostgresLeaseRepository** - primary leases, claim transactions
//!
//! ## In-Memory Store
//!
//! [`InMemoryStore`] implements every trait over one set of tables guarded
//! by a single async mutex. A lease transaction holds the mutex for its
//! whole lifetime and stages lease writes until commit, so claims are
//! serialized and exactly one concurrent insert per zone succeeds, matching
//! what the unique constraint gives the PostgreSQL backend.

pub mod postgres_agent;
pub mod postgres_credential;
pub mod postgres_lease;
pub mod postgres_zone;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::agent::{Agent, AgentId, AgentKey};
use crate::domain::lease::{LeaseInsert, PrimaryLease};
use crate::domain::repository::{
    AgentRepository, CredentialRepository, LeaseRepository, LeaseTransaction, RepositoryError,
    ZoneRepository,
};
use crate::domain::zone::{Zone, ZoneId};

#[derive(Debug, Default)]
struct Tables {
    zones: HashMap<ZoneId, Zone>,
    credentials: HashSet<(String, ZoneId)>,
    agents: HashMap<AgentId, Agent>,
    leases: HashMap<ZoneId, AgentId>,
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of lease rows held for a zone (0 or 1)
    pub async fn lease_rows(&self, zone_id: ZoneId) -> usize {
        let tables = self.tables.lock().await;
        usize::from(tables.leases.contains_key(&zone_id))
    }

    /// Number of agents registered under a key
    pub async fn agent_rows(&self, key: &AgentKey) -> usize {
        let tables = self.tables.lock().await;
        tables.agents.values().filter(|a| &a.agent_key == key).count()
    }

    /// Remove an agent without touching leases. Used to reproduce a lease
    /// that points at a vanished agent.
    pub async fn purge_agent(&self, id: AgentId) {
        let mut tables = self.tables.lock().await;
        tables.agents.remove(&id);
    }

    /// Set an agent's liveness to `idle` ago, bypassing the monotonic update
    pub async fn backdate_agent(&self, key: &AgentKey, idle: chrono::Duration) {
        let mut tables = self.tables.lock().await;
        if let Some(agent) = tables.agents.values_mut().find(|a| &a.agent_key == key) {
            agent.last_access_time = Utc::now() - idle;
        }
    }

    /// Write a lease row directly, bypassing the claim protocol
    pub async fn force_lease(&self, lease: PrimaryLease) {
        let mut tables = self.tables.lock().await;
        tables.leases.insert(lease.zone_id, lease.agent_id);
    }
}

#[async_trait]
impl ZoneRepository for InMemoryStore {
    async fn save(&self, zone: &Zone) -> Result<(), RepositoryError> {
        let mut tables = self.tables.lock().await;
        tables.zones.insert(zone.id, zone.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: ZoneId) -> Result<Option<Zone>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables.zones.get(&id).cloned())
    }
}

#[async_trait]
impl CredentialRepository for InMemoryStore {
    async fn grant(&self, api_key: &str, zone_id: ZoneId) -> Result<(), RepositoryError> {
        let mut tables = self.tables.lock().await;
        tables.credentials.insert((api_key.to_string(), zone_id));
        Ok(())
    }

    async fn exists(&self, api_key: &str, zone_id: ZoneId) -> Result<bool, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables.credentials.contains(&(api_key.to_string(), zone_id)))
    }
}

#[async_trait]
impl AgentRepository for InMemoryStore {
    async fn insert(&self, agent: &Agent) -> Result<(), RepositoryError> {
        let mut tables = self.tables.lock().await;
        if tables.agents.values().any(|a| a.agent_key == agent.agent_key) {
            return Err(RepositoryError::Conflict(format!("agent key '{}' already registered", agent.agent_key)));
        }
        if tables.agents.contains_key(&agent.id) {
            return Err(RepositoryError::Conflict(format!("agent id {} already registered", agent.id)));
        }
        tables.agents.insert(agent.id, agent.clone());
        Ok(())
    }

    async fn update(&self, agent: &Agent) -> Result<(), RepositoryError> {
        let mut tables = self.tables.lock().await;
        match tables.agents.get_mut(&agent.id) {
            Some(stored) => {
                // last_access_time never moves backwards, same as GREATEST in PostgreSQL
                let last_access_time = stored.last_access_time.max(agent.last_access_time);
                *stored = agent.clone();
                stored.last_access_time = last_access_time;
                Ok(())
            }
            None => Err(RepositoryError::NotFound(format!("agent {}", agent.id))),
        }
    }

    async fn find_by_id(&self, id: AgentId) -> Result<Option<Agent>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables.agents.get(&id).cloned())
    }

    async fn find_by_key(&self, key: &AgentKey) -> Result<Option<Agent>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables.agents.values().find(|a| &a.agent_key == key).cloned())
    }
}

#[async_trait]
impl LeaseRepository for InMemoryStore {
    async fn find_by_zone(&self, zone_id: ZoneId) -> Result<Option<PrimaryLease>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .leases
            .get(&zone_id)
            .map(|agent_id| PrimaryLease { zone_id, agent_id: *agent_id }))
    }

    async fn begin(&self) -> Result<Box<dyn LeaseTransaction>, RepositoryError> {
        let guard = self.tables.clone().lock_owned().await;
        let staged = guard.leases.clone();
        Ok(Box::new(InMemoryLeaseTransaction { guard, staged }))
    }
}

/// Claim session over the in-memory tables. Holds the store lock until it
/// is committed, rolled back or dropped.
pub struct InMemoryLeaseTransaction {
    guard: OwnedMutexGuard<Tables>,
    staged: HashMap<ZoneId, AgentId>,
}

#[async_trait]
impl LeaseTransaction for InMemoryLeaseTransaction {
    async fn delete_if_holder_idle(
        &mut self,
        zone_id: ZoneId,
        idle_before: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        let idle = self
            .staged
            .get(&zone_id)
            .and_then(|holder| self.guard.agents.get(holder))
            .is_some_and(|agent| agent.last_access_time < idle_before);

        if idle {
            self.staged.remove(&zone_id);
            Ok(1)
        } else {
            Ok(0)
        }
    }

    async fn insert(&mut self, lease: &PrimaryLease) -> Result<LeaseInsert, RepositoryError> {
        if self.staged.contains_key(&lease.zone_id) {
            return Ok(LeaseInsert::Conflict);
        }
        self.staged.insert(lease.zone_id, lease.agent_id);
        Ok(LeaseInsert::Inserted(1))
    }

    async fn find_by_zone(&mut self, zone_id: ZoneId) -> Result<Option<PrimaryLease>, RepositoryError> {
        Ok(self
            .staged
            .get(&zone_id)
            .map(|agent_id| PrimaryLease { zone_id, agent_id: *agent_id }))
    }

    async fn find_agent(&mut self, id: AgentId) -> Result<Option<Agent>, RepositoryError> {
        Ok(self.guard.agents.get(&id).cloned())
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        let InMemoryLeaseTransaction { mut guard, staged } = *self;
        guard.leases = staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agent::{AgentAddress, AgentCredentials, AgentProfile, ResourceProfile};
    use chrono::Duration;

    fn agent(key: &str, zone: i64, last_access: DateTime<Utc>) -> Agent {
        Agent::register(
            AgentKey::new(key),
            ZoneId(zone),
            AgentProfile {
                address: AgentAddress { ip: "127.0.0.1".into(), port: 1 },
                resources: ResourceProfile::default(),
            },
            AgentCredentials { hmac_key: "h".into(), enc_key: "e".into() },
            last_access,
        )
    }

    #[tokio::test]
    async fn test_agent_key_is_unique() {
        let store = InMemoryStore::new();
        store.insert(&agent("a1", 1, Utc::now())).await.unwrap();

        let err = store.insert(&agent("a1", 1, Utc::now())).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert_eq!(store.agent_rows(&AgentKey::new("a1")).await, 1);
    }

    #[tokio::test]
    async fn test_update_with_older_snapshot_keeps_newer_liveness() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let registered = agent("a1", 1, now - Duration::seconds(5));
        store.insert(&registered).await.unwrap();

        // two requests read the same row; the later one commits first
        let mut slow = registered.clone();
        slow.touch(now);
        let mut fast = registered.clone();
        fast.touch(now + Duration::milliseconds(20));
        fast.address.ip = "10.0.0.2".into();
        store.update(&fast).await.unwrap();
        slow.address.ip = "10.0.0.3".into();
        store.update(&slow).await.unwrap();

        let stored = AgentRepository::find_by_id(&store, registered.id).await.unwrap().unwrap();
        assert_eq!(stored.last_access_time, fast.last_access_time);
        assert_eq!(stored.address.ip, "10.0.0.3");
    }

    #[tokio::test]
    async fn test_backdate_agent_moves_liveness_back() {
        let store = InMemoryStore::new();
        store.insert(&agent("a1", 1, Utc::now())).await.unwrap();

        store.backdate_agent(&AgentKey::new("a1"), Duration::seconds(40)).await;

        let stored = store.find_by_key(&AgentKey::new("a1")).await.unwrap().unwrap();
        assert!(stored.idle_longer_than(Duration::seconds(39), Utc::now()));
    }

    #[tokio::test]
    async fn test_grant_is_scoped_to_zone() {
        let store = InMemoryStore::new();
        store.grant("k", ZoneId(9)).await.unwrap();
        store.grant("k", ZoneId(9)).await.unwrap();

        assert!(store.exists("k", ZoneId(9)).await.unwrap());
        assert!(!store.exists("k", ZoneId(8)).await.unwrap());
        assert!(!store.exists("other", ZoneId(9)).await.unwrap());
        assert!(ZoneRepository::find_by_id(&store, ZoneId(9)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_uncommitted_lease_is_discarded_on_drop() {
        let store = InMemoryStore::new();
        let a = agent("a1", 1, Utc::now());
        store.insert(&a).await.unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            let outcome = tx.insert(&PrimaryLease { zone_id: ZoneId(1), agent_id: a.id }).await.unwrap();
            assert_eq!(outcome, LeaseInsert::Inserted(1));
        }

        assert_eq!(store.lease_rows(ZoneId(1)).await, 0);
    }

    #[tokio::test]
    async fn test_second_insert_conflicts() {
        let store = InMemoryStore::new();
        let a = agent("a1", 1, Utc::now());
        let b = agent("b1", 1, Utc::now());
        store.insert(&a).await.unwrap();
        store.insert(&b).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.insert(&PrimaryLease { zone_id: ZoneId(1), agent_id: a.id }).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let outcome = tx.insert(&PrimaryLease { zone_id: ZoneId(1), agent_id: b.id }).await.unwrap();
        assert_eq!(outcome, LeaseInsert::Conflict);
        assert_eq!(tx.find_by_zone(ZoneId(1)).await.unwrap().map(|l| l.agent_id), Some(a.id));
    }

    #[tokio::test]
    async fn test_delete_only_when_holder_idle() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let holder = agent("a1", 1, now - Duration::seconds(10));
        store.insert(&holder).await.unwrap();
        store.force_lease(PrimaryLease { zone_id: ZoneId(1), agent_id: holder.id }).await;

        let mut tx = store.begin().await.unwrap();
        let removed = tx
            .delete_if_holder_idle(ZoneId(1), now - Duration::seconds(30))
            .await
            .unwrap();
        assert_eq!(removed, 0);

        let removed = tx
            .delete_if_holder_idle(ZoneId(1), now - Duration::seconds(5))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        tx.rollback().await.unwrap();

        assert_eq!(store.lease_rows(ZoneId(1)).await, 1);
    }
}
