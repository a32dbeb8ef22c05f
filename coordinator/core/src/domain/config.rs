// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Coordinator Configuration Types
//
// Kubernetes-style manifest (apiVersion/kind/metadata/spec) covering:
// - HTTP listener settings
// - Storage backend selection (in-memory or PostgreSQL)
// - Election thresholds (staleness margin, eviction threshold)
// - Bootstrap zones and API keys
// - Logging and metrics

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::repository::{PostgresConfig, StorageBackend};

pub const API_VERSION: &str = "keel.dev/v1";
pub const KIND: &str = "CoordinatorConfig";

/// Top-level coordinator configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfigManifest {
    /// API version (must be "keel.dev/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "CoordinatorConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    pub spec: CoordinatorConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Human-readable deployment name
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoordinatorConfigSpec {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub election: ElectionConfig,

    #[serde(default)]
    pub bootstrap: BootstrapConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_api_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageKind,

    /// Connection string (supports "env:VAR_NAME")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

/// Election thresholds.
///
/// `staleness_margin` is the cheap "maybe stale" trigger checked on every
/// primary lookup; `eviction_threshold` is the idle time a holder must
/// actually exceed before its lease is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionConfig {
    #[serde(with = "humantime_serde", default = "default_staleness_margin")]
    pub staleness_margin: Duration,

    #[serde(with = "humantime_serde", default = "default_eviction_threshold")]
    pub eviction_threshold: Duration,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BootstrapConfig {
    #[serde(default)]
    pub zones: Vec<BootstrapZone>,
}

/// Zone seeded at startup together with the API keys allowed to use it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapZone {
    pub id: i64,
    pub name: String,

    /// API keys (each supports "env:VAR_NAME")
    #[serde(default)]
    pub api_keys: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Prometheus exporter port; metrics are not exported when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics_port: Option<u16>,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8090
}

fn default_max_connections() -> u32 {
    5
}

fn default_staleness_margin() -> Duration {
    Duration::from_secs(1)
}

fn default_eviction_threshold() -> Duration {
    Duration::from_secs(30)
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_api_port(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageKind::Memory,
            database_url: None,
            max_connections: default_max_connections(),
        }
    }
}

impl Default for ElectionConfig {
    fn default() -> Self {
        Self {
            staleness_margin: default_staleness_margin(),
            eviction_threshold: default_eviction_threshold(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            metrics_port: None,
        }
    }
}

impl Default for CoordinatorConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "keel-coordinator".to_string(),
                labels: None,
            },
            spec: CoordinatorConfigSpec::default(),
        }
    }
}

/// Resolve "env:VAR_NAME" indirection; other values are returned unchanged.
pub fn resolve_env_value(value: &str) -> anyhow::Result<String> {
    match value.strip_prefix("env:") {
        Some(var) => std::env::var(var)
            .map_err(|_| anyhow::anyhow!("Environment variable '{}' is not set", var)),
        None => Ok(value.to_string()),
    }
}

impl StorageConfig {
    /// Translate into the repository factory's backend selector
    pub fn to_backend(&self) -> anyhow::Result<StorageBackend> {
        match self.backend {
            StorageKind::Memory => Ok(StorageBackend::InMemory),
            StorageKind::Postgres => {
                let url = self
                    .database_url
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("spec.storage.database_url is required for the postgres backend"))?;
                Ok(StorageBackend::PostgreSQL(PostgresConfig {
                    connection_string: resolve_env_value(url)?,
                    max_connections: self.max_connections,
                }))
            }
        }
    }
}

impl CoordinatorConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. KEEL_CONFIG_PATH environment variable
    /// 2. ./keel-config.yaml (working directory)
    /// 3. ~/.keel/config.yaml (user home)
    /// 4. /etc/keel/config.yaml (system)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("KEEL_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./keel-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".keel").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/keel/config.yaml");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides so container deployments can
    /// point at a database without a config file
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("KEEL_DATABASE_URL") {
            tracing::info!("Environment override: KEEL_DATABASE_URL set, using postgres backend");
            self.spec.storage.backend = StorageKind::Postgres;
            self.spec.storage.database_url = Some(url);
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!("Invalid apiVersion: '{}'. Must be '{}'", self.api_version, API_VERSION);
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        if self.spec.storage.backend == StorageKind::Postgres && self.spec.storage.database_url.is_none() {
            anyhow::bail!("spec.storage.database_url is required for the postgres backend");
        }

        if self.spec.storage.max_connections == 0 {
            anyhow::bail!("spec.storage.max_connections must be at least 1");
        }

        let election = &self.spec.election;
        if election.eviction_threshold < election.staleness_margin {
            anyhow::bail!(
                "spec.election.eviction_threshold ({:?}) must not be shorter than staleness_margin ({:?})",
                election.eviction_threshold,
                election.staleness_margin
            );
        }

        let mut seen = std::collections::HashSet::new();
        for zone in &self.spec.bootstrap.zones {
            if zone.name.is_empty() {
                anyhow::bail!("Bootstrap zone {} has an empty name", zone.id);
            }
            if !seen.insert(zone.id) {
                anyhow::bail!("Bootstrap zone id {} is declared twice", zone.id);
            }
            if zone.api_keys.iter().any(|k| k.is_empty()) {
                anyhow::bail!("Bootstrap zone {} has an empty API key", zone.id);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_manifest() {
        let manifest = CoordinatorConfigManifest::default();
        assert_eq!(manifest.api_version, API_VERSION);
        assert_eq!(manifest.kind, KIND);
        assert_eq!(manifest.spec.storage.backend, StorageKind::Memory);
        assert_eq!(manifest.spec.election.staleness_margin, Duration::from_secs(1));
        assert_eq!(manifest.spec.election.eviction_threshold, Duration::from_secs(30));
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_parse_full_manifest() {
        let yaml = r#"
apiVersion: keel.dev/v1
kind: CoordinatorConfig
metadata:
  name: edge-cluster
spec:
  server:
    port: 9000
  storage:
    backend: postgres
    database_url: postgres://keel@localhost/keel
  election:
    staleness_margin: 2s
    eviction_threshold: 1m
  bootstrap:
    zones:
      - id: 5
        name: seoul
        api_keys: ["k-5"]
  observability:
    log_level: debug
    metrics_port: 9100
"#;
        let manifest = CoordinatorConfigManifest::from_yaml_str(yaml).unwrap();

        assert_eq!(manifest.spec.server.port, 9000);
        assert_eq!(manifest.spec.server.bind_address, "0.0.0.0");
        assert_eq!(manifest.spec.election.staleness_margin, Duration::from_secs(2));
        assert_eq!(manifest.spec.election.eviction_threshold, Duration::from_secs(60));
        assert_eq!(manifest.spec.bootstrap.zones[0].api_keys, vec!["k-5".to_string()]);
        assert_eq!(manifest.spec.observability.metrics_port, Some(9100));
        assert!(manifest.validate().is_ok());

        match manifest.spec.storage.to_backend().unwrap() {
            StorageBackend::PostgreSQL(pg) => {
                assert_eq!(pg.connection_string, "postgres://keel@localhost/keel");
                assert_eq!(pg.max_connections, 5);
            }
            other => panic!("unexpected backend {:?}", other),
        }
    }

    #[test]
    fn test_validation() {
        let mut manifest = CoordinatorConfigManifest::default();

        manifest.api_version = "wrong/v1".to_string();
        assert!(manifest.validate().is_err());
        manifest.api_version = API_VERSION.to_string();

        manifest.spec.election.eviction_threshold = Duration::from_millis(500);
        assert!(manifest.validate().is_err());
        manifest.spec.election = ElectionConfig::default();

        manifest.spec.storage.backend = StorageKind::Postgres;
        assert!(manifest.validate().is_err());
        manifest.spec.storage.backend = StorageKind::Memory;

        manifest.spec.bootstrap.zones = vec![
            BootstrapZone { id: 1, name: "a".into(), api_keys: vec![] },
            BootstrapZone { id: 1, name: "b".into(), api_keys: vec![] },
        ];
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_resolve_env_value_passthrough() {
        assert_eq!(resolve_env_value("plain").unwrap(), "plain");
        assert!(resolve_env_value("env:KEEL_TEST_SURELY_UNSET_VARIABLE").is_err());
    }
}
