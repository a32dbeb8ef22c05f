// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Agent Repository
//!
//! `AgentRepository` backed by the `agents` table. The unique index on
//! `agent_key` is what keeps concurrent first handshakes from registering
//! the same agent twice; a violation surfaces as `RepositoryError::Conflict`.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::agent::{
    Agent, AgentAddress, AgentCredentials, AgentId, AgentKey, ResourceProfile,
};
use crate::domain::repository::{AgentRepository, RepositoryError};
use crate::domain::zone::ZoneId;

pub(crate) const AGENT_COLUMNS: &str = "id, zone_id, agent_key, ip, port, cpu, memory, disk, \
     hmac_key, enc_key, last_access_time, is_active";

pub(crate) fn agent_from_row(row: &PgRow) -> Result<Agent, RepositoryError> {
    let port: i32 = row.try_get("port")?;
    let port = u16::try_from(port)
        .map_err(|_| RepositoryError::Serialization(format!("port {} out of range", port)))?;

    Ok(Agent {
        id: AgentId(row.try_get("id")?),
        zone_id: ZoneId(row.try_get("zone_id")?),
        agent_key: AgentKey(row.try_get("agent_key")?),
        address: AgentAddress {
            ip: row.try_get("ip")?,
            port,
        },
        resources: ResourceProfile {
            core: row.try_get("cpu")?,
            memory: row.try_get("memory")?,
            disk: row.try_get("disk")?,
        },
        credentials: AgentCredentials {
            hmac_key: row.try_get("hmac_key")?,
            enc_key: row.try_get("enc_key")?,
        },
        last_access_time: row.try_get("last_access_time")?,
        is_active: row.try_get("is_active")?,
    })
}

pub struct PostgresAgentRepository {
    pool: PgPool,
}

impl PostgresAgentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AgentRepository for PostgresAgentRepository {
    async fn insert(&self, agent: &Agent) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO agents (
                id, zone_id, agent_key, ip, port, cpu, memory, disk,
                hmac_key, enc_key, last_access_time, is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(agent.id.0)
        .bind(agent.zone_id.0)
        .bind(agent.agent_key.as_str())
        .bind(&agent.address.ip)
        .bind(i32::from(agent.address.port))
        .bind(agent.resources.core)
        .bind(agent.resources.memory)
        .bind(agent.resources.disk)
        .bind(&agent.credentials.hmac_key)
        .bind(&agent.credentials.enc_key)
        .bind(agent.last_access_time)
        .bind(agent.is_active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, agent: &Agent) -> Result<(), RepositoryError> {
        // GREATEST keeps last_access_time monotonic even if two requests
        // from the same agent commit out of order.
        let result = sqlx::query(
            r#"
            UPDATE agents SET
                ip = $2,
                port = $3,
                cpu = $4,
                memory = $5,
                disk = $6,
                hmac_key = $7,
                enc_key = $8,
                last_access_time = GREATEST(last_access_time, $9),
                is_active = $10,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(agent.id.0)
        .bind(&agent.address.ip)
        .bind(i32::from(agent.address.port))
        .bind(agent.resources.core)
        .bind(agent.resources.memory)
        .bind(agent.resources.disk)
        .bind(&agent.credentials.hmac_key)
        .bind(&agent.credentials.enc_key)
        .bind(agent.last_access_time)
        .bind(agent.is_active)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to update agent: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("agent {}", agent.id)));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: AgentId) -> Result<Option<Agent>, RepositoryError> {
        let sql = format!("SELECT {} FROM agents WHERE id = $1", AGENT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(agent_from_row).transpose()
    }

    async fn find_by_key(&self, key: &AgentKey) -> Result<Option<Agent>, RepositoryError> {
        let sql = format!("SELECT {} FROM agents WHERE agent_key = $1", AGENT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(agent_from_row).transpose()
    }
}
