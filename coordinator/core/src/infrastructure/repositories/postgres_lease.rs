// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Lease Repository
//!
//! Primary leases live in `primary_leases`, keyed by `zone_id`. The primary
//! key is the sole arbiter between concurrent claimants: under READ
//! COMMITTED a second insert for the same zone blocks until the first
//! transaction finishes and then fails with a unique violation.
//!
//! A unique violation aborts the surrounding PostgreSQL transaction, so the
//! insert runs inside a savepoint. Rolling back to the savepoint leaves the
//! claim transaction usable for re-reading the winning lease.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, Postgres};
use sqlx::{Connection, Row, Transaction};

use crate::domain::agent::{Agent, AgentId};
use crate::domain::lease::{LeaseInsert, PrimaryLease};
use crate::domain::repository::{LeaseRepository, LeaseTransaction, RepositoryError};
use crate::domain::zone::ZoneId;
use crate::infrastructure::repositories::postgres_agent::{agent_from_row, AGENT_COLUMNS};

pub struct PostgresLeaseRepository {
    pool: PgPool,
}

impl PostgresLeaseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn lease_from_row(row: &sqlx::postgres::PgRow) -> Result<PrimaryLease, RepositoryError> {
    Ok(PrimaryLease {
        zone_id: ZoneId(row.try_get("zone_id")?),
        agent_id: AgentId(row.try_get("agent_id")?),
    })
}

#[async_trait]
impl LeaseRepository for PostgresLeaseRepository {
    async fn find_by_zone(&self, zone_id: ZoneId) -> Result<Option<PrimaryLease>, RepositoryError> {
        let row = sqlx::query("SELECT zone_id, agent_id FROM primary_leases WHERE zone_id = $1")
            .bind(zone_id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(lease_from_row).transpose()
    }

    async fn begin(&self) -> Result<Box<dyn LeaseTransaction>, RepositoryError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PostgresLeaseTransaction { tx }))
    }
}

/// Claim session on its own pooled connection. Dropping it without a commit
/// rolls the transaction back and returns the connection to the pool.
pub struct PostgresLeaseTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LeaseTransaction for PostgresLeaseTransaction {
    async fn delete_if_holder_idle(
        &mut self,
        zone_id: ZoneId,
        idle_before: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r#"
            DELETE FROM primary_leases pl
            USING agents a
            WHERE pl.zone_id = $1
              AND a.id = pl.agent_id
              AND a.last_access_time < $2
            "#,
        )
        .bind(zone_id.0)
        .bind(idle_before)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected())
    }

    async fn insert(&mut self, lease: &PrimaryLease) -> Result<LeaseInsert, RepositoryError> {
        let mut savepoint = Connection::begin(&mut *self.tx).await?;

        let result = sqlx::query("INSERT INTO primary_leases (zone_id, agent_id) VALUES ($1, $2)")
            .bind(lease.zone_id.0)
            .bind(lease.agent_id.0)
            .execute(&mut *savepoint)
            .await;

        match result {
            Ok(done) => {
                savepoint.commit().await?;
                Ok(LeaseInsert::Inserted(done.rows_affected()))
            }
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                savepoint.rollback().await?;
                Ok(LeaseInsert::Conflict)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_zone(&mut self, zone_id: ZoneId) -> Result<Option<PrimaryLease>, RepositoryError> {
        let row = sqlx::query("SELECT zone_id, agent_id FROM primary_leases WHERE zone_id = $1")
            .bind(zone_id.0)
            .fetch_optional(&mut *self.tx)
            .await?;

        row.as_ref().map(lease_from_row).transpose()
    }

    async fn find_agent(&mut self, id: AgentId) -> Result<Option<Agent>, RepositoryError> {
        let sql = format!("SELECT {} FROM agents WHERE id = $1", AGENT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id.0)
            .fetch_optional(&mut *self.tx)
            .await?;

        row.as_ref().map(agent_from_row).transpose()
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), RepositoryError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
