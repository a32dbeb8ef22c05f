// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Zone Repository
//!
//! Backs `ZoneRepository` with the `zones` table.

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::domain::repository::{RepositoryError, ZoneRepository};
use crate::domain::zone::{Zone, ZoneId};

pub struct PostgresZoneRepository {
    pool: PgPool,
}

impl PostgresZoneRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ZoneRepository for PostgresZoneRepository {
    async fn save(&self, zone: &Zone) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO zones (id, name)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name
            "#,
        )
        .bind(zone.id.0)
        .bind(&zone.name)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to save zone: {}", e)))?;

        Ok(())
    }

    async fn find_by_id(&self, id: ZoneId) -> Result<Option<Zone>, RepositoryError> {
        let row = sqlx::query("SELECT id, name FROM zones WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(Zone {
                id: ZoneId(row.try_get("id")?),
                name: row.try_get("name")?,
            })),
            None => Ok(None),
        }
    }
}
