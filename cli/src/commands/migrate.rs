// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

use keel_core::config::CoordinatorConfigManifest;
use keel_core::infrastructure::db::Database;
use keel_core::repository::StorageBackend;

/// Apply pending schema migrations to the configured PostgreSQL database.
pub async fn run(config_path: Option<PathBuf>) -> Result<()> {
    let config = CoordinatorConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;

    let StorageBackend::PostgreSQL(pg) = config.spec.storage.to_backend()? else {
        anyhow::bail!("Nothing to migrate: spec.storage.backend is 'memory'. Configure postgres or set KEEL_DATABASE_URL.");
    };

    let database = Database::new(&pg).await?;
    database.migrate().await?;

    println!("{}", "✓ Database schema is up to date".green());
    Ok(())
}
