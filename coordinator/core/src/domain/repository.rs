// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contracts, one per aggregate, implemented in
//! `crate::infrastructure::repositories`.
//!
//! | Trait | Aggregate | Implementations |
//! |-------|-----------|----------------|
//! | `ZoneRepository` | `Zone` | `InMemoryStore`, `PostgresZoneRepository` |
//! | `CredentialRepository` | `(api key, zone)` | `InMemoryStore`, `PostgresCredentialRepository` |
//! | `AgentRepository` | `Agent` | `InMemoryStore`, `PostgresAgentRepository` |
//! | `LeaseRepository` | `PrimaryLease` | `InMemoryStore`, `PostgresLeaseRepository` |
//!
//! ## Lease transactions
//!
//! `LeaseRepository::begin` hands out a [`LeaseTransaction`]: a dedicated
//! session isolated from the pooled reads. Dropping it without calling
//! `commit` discards every staged write and releases the session, so the
//! election code can return early on any path without leaking it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::agent::{Agent, AgentId, AgentKey};
use crate::domain::lease::{LeaseInsert, PrimaryLease};
use crate::domain::zone::{Zone, ZoneId};

/// Storage backend enum for pluggable persistence
#[derive(Debug, Clone)]
pub enum StorageBackend {
    InMemory,
    PostgreSQL(PostgresConfig),
}

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub connection_string: String,
    pub max_connections: u32,
}

#[async_trait]
pub trait ZoneRepository: Send + Sync {
    /// Create or rename a zone
    async fn save(&self, zone: &Zone) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: ZoneId) -> Result<Option<Zone>, RepositoryError>;
}

#[async_trait]
pub trait CredentialRepository: Send + Sync {
    /// Grant `api_key` access to `zone_id` (idempotent)
    async fn grant(&self, api_key: &str, zone_id: ZoneId) -> Result<(), RepositoryError>;

    /// True if `api_key` is registered for `zone_id`
    async fn exists(&self, api_key: &str, zone_id: ZoneId) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait AgentRepository: Send + Sync {
    /// Insert a new agent. Fails with `RepositoryError::Conflict` when the
    /// agent key is already taken.
    async fn insert(&self, agent: &Agent) -> Result<(), RepositoryError>;

    /// Overwrite an existing agent, matched by id
    async fn update(&self, agent: &Agent) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: AgentId) -> Result<Option<Agent>, RepositoryError>;

    async fn find_by_key(&self, key: &AgentKey) -> Result<Option<Agent>, RepositoryError>;
}

#[async_trait]
pub trait LeaseRepository: Send + Sync {
    /// Read the committed lease for a zone
    async fn find_by_zone(&self, zone_id: ZoneId) -> Result<Option<PrimaryLease>, RepositoryError>;

    /// Open a dedicated transactional session for a claim
    async fn begin(&self) -> Result<Box<dyn LeaseTransaction>, RepositoryError>;
}

/// Unit of work used by a single claim attempt.
#[async_trait]
pub trait LeaseTransaction: Send {
    /// Delete the zone's lease only if its holder was last seen before
    /// `idle_before`. Returns the number of rows removed (0 or 1).
    async fn delete_if_holder_idle(
        &mut self,
        zone_id: ZoneId,
        idle_before: DateTime<Utc>,
    ) -> Result<u64, RepositoryError>;

    /// Insert a lease row, arbitrated by the zone uniqueness constraint.
    async fn insert(&mut self, lease: &PrimaryLease) -> Result<LeaseInsert, RepositoryError>;

    /// Read the lease as seen from inside this transaction
    async fn find_by_zone(&mut self, zone_id: ZoneId) -> Result<Option<PrimaryLease>, RepositoryError>;

    /// Resolve an agent as seen from inside this transaction
    async fn find_agent(&mut self, id: AgentId) -> Result<Option<Agent>, RepositoryError>;

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError>;

    async fn rollback(self: Box<Self>) -> Result<(), RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                RepositoryError::Conflict(db.message().to_string())
            }
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}
