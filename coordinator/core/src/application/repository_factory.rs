// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Repository Factory - Application Layer
//!
//! Creates concrete repository implementations based on the storage backend
//! configuration, so the services above only ever see the domain traits.

use anyhow::Result;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

use crate::domain::repository::{
    AgentRepository, CredentialRepository, LeaseRepository, StorageBackend, ZoneRepository,
};
use crate::infrastructure::db::Database;
use crate::infrastructure::repositories::postgres_agent::PostgresAgentRepository;
use crate::infrastructure::repositories::postgres_credential::PostgresCredentialRepository;
use crate::infrastructure::repositories::postgres_lease::PostgresLeaseRepository;
use crate::infrastructure::repositories::postgres_zone::PostgresZoneRepository;
use crate::infrastructure::repositories::InMemoryStore;

/// Every repository the coordinator needs, backed by one store
#[derive(Clone)]
pub struct Repositories {
    pub zones: Arc<dyn ZoneRepository>,
    pub credentials: Arc<dyn CredentialRepository>,
    pub agents: Arc<dyn AgentRepository>,
    pub leases: Arc<dyn LeaseRepository>,
}

impl Repositories {
    /// All four traits over one shared in-memory store
    pub fn in_memory(store: InMemoryStore) -> Self {
        Self {
            zones: Arc::new(store.clone()),
            credentials: Arc::new(store.clone()),
            agents: Arc::new(store.clone()),
            leases: Arc::new(store),
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self {
            zones: Arc::new(PostgresZoneRepository::new(pool.clone())),
            credentials: Arc::new(PostgresCredentialRepository::new(pool.clone())),
            agents: Arc::new(PostgresAgentRepository::new(pool.clone())),
            leases: Arc::new(PostgresLeaseRepository::new(pool)),
        }
    }
}

/// Build the repositories for `backend`. For PostgreSQL this connects the
/// pool and applies pending migrations before returning.
pub async fn create_repositories(backend: &StorageBackend) -> Result<Repositories> {
    match backend {
        StorageBackend::InMemory => {
            info!("Using in-memory storage backend");
            Ok(Repositories::in_memory(InMemoryStore::new()))
        }
        StorageBackend::PostgreSQL(config) => {
            let database = Database::new(config).await?;
            database.migrate().await?;
            info!(max_connections = config.max_connections, "Connected to PostgreSQL storage backend");
            Ok(Repositories::postgres(database.get_pool().clone()))
        }
    }
}
