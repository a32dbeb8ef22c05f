// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Seeds zones and API keys declared under `spec.bootstrap` at startup.
//! Re-running against the same store is a no-op.

use anyhow::{Context, Result};
use tracing::info;

use crate::application::repository_factory::Repositories;
use crate::domain::config::{resolve_env_value, BootstrapConfig};
use crate::domain::zone::{Zone, ZoneId};

pub async fn seed(repos: &Repositories, bootstrap: &BootstrapConfig) -> Result<()> {
    for declared in &bootstrap.zones {
        let zone = Zone::new(ZoneId(declared.id), declared.name.clone());
        repos
            .zones
            .save(&zone)
            .await
            .with_context(|| format!("Failed to seed zone {}", declared.id))?;

        for raw in &declared.api_keys {
            let api_key = resolve_env_value(raw)
                .with_context(|| format!("Failed to resolve API key for zone {}", declared.id))?;
            repos
                .credentials
                .grant(&api_key, zone.id)
                .await
                .with_context(|| format!("Failed to grant API key for zone {}", declared.id))?;
        }

        info!(zone_id = %zone.id, name = %zone.name, api_keys = declared.api_keys.len(), "Seeded zone");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::BootstrapZone;
    use crate::infrastructure::repositories::InMemoryStore;

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let repos = Repositories::in_memory(InMemoryStore::new());
        let bootstrap = BootstrapConfig {
            zones: vec![BootstrapZone { id: 5, name: "seoul".into(), api_keys: vec!["k-5".into()] }],
        };

        seed(&repos, &bootstrap).await.unwrap();
        seed(&repos, &bootstrap).await.unwrap();

        let zone = repos.zones.find_by_id(ZoneId(5)).await.unwrap().unwrap();
        assert_eq!(zone.name, "seoul");
        assert!(repos.credentials.exists("k-5", ZoneId(5)).await.unwrap());
    }

    #[tokio::test]
    async fn test_seed_fails_on_unset_env_key() {
        let repos = Repositories::in_memory(InMemoryStore::new());
        let bootstrap = BootstrapConfig {
            zones: vec![BootstrapZone {
                id: 1,
                name: "z".into(),
                api_keys: vec!["env:KEEL_TEST_BOOTSTRAP_KEY_NEVER_SET".into()],
            }],
        };

        assert!(seed(&repos, &bootstrap).await.is_err());
    }
}
