// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Credential Repository
//!
//! API keys granted per zone, stored in `api_credentials`. Consulted by the
//! authentication middleware before any request reaches the core.

use async_trait::async_trait;
use sqlx::postgres::PgPool;

use crate::domain::repository::{CredentialRepository, RepositoryError};
use crate::domain::zone::ZoneId;

pub struct PostgresCredentialRepository {
    pool: PgPool,
}

impl PostgresCredentialRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialRepository for PostgresCredentialRepository {
    async fn grant(&self, api_key: &str, zone_id: ZoneId) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO api_credentials (api_key, zone_id)
            VALUES ($1, $2)
            ON CONFLICT (api_key, zone_id) DO NOTHING
            "#,
        )
        .bind(api_key)
        .bind(zone_id.0)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to grant API key: {}", e)))?;

        Ok(())
    }

    async fn exists(&self, api_key: &str, zone_id: ZoneId) -> Result<bool, RepositoryError> {
        let found: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM api_credentials WHERE api_key = $1 AND zone_id = $2)",
        )
        .bind(api_key)
        .bind(zone_id.0)
        .fetch_one(&self.pool)
        .await?;

        Ok(found)
    }
}
