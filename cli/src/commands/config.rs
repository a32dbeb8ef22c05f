// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use keel_core::config::{BootstrapZone, CoordinatorConfigManifest, StorageKind};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./keel-config.yaml)
        #[arg(short, long, default_value = "./keel-config.yaml")]
        output: PathBuf,

        /// Include an example bootstrap zone
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, examples } => generate(&output, examples).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = CoordinatorConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag / KEEL_CONFIG_PATH: {}", path.display());
        } else {
            println!("  1. --config flag / KEEL_CONFIG_PATH: {}", "(not set)".dimmed());
        }
        println!("  2. ./keel-config.yaml");
        println!("  3. ~/.keel/config.yaml");
        println!("  4. /etc/keel/config.yaml");
        println!();
    }

    let spec = &config.spec;
    println!("{}", "Current configuration:".bold());
    println!("  Name: {}", config.metadata.name);
    println!("  Listen: {}:{}", spec.server.bind_address, spec.server.port);
    match spec.storage.backend {
        StorageKind::Memory => println!("  Storage: memory"),
        // Never echo credentials embedded in the URL
        StorageKind::Postgres => println!("  Storage: postgres (max {} connections)", spec.storage.max_connections),
    }
    println!(
        "  Election: staleness margin {:?}, eviction threshold {:?}",
        spec.election.staleness_margin, spec.election.eviction_threshold
    );
    println!("  Log level: {}", spec.observability.log_level);
    match spec.observability.metrics_port {
        Some(port) => println!("  Metrics: :{}", port),
        None => println!("  Metrics: {}", "(disabled)".dimmed()),
    }
    println!();

    println!("{}", "Bootstrap zones:".bold());
    if spec.bootstrap.zones.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for zone in &spec.bootstrap.zones {
        println!("  {} {} ({} API keys)", zone.id, zone.name.bold(), zone.api_keys.len());
    }

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = CoordinatorConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

pub async fn generate(output: &Path, with_examples: bool) -> Result<()> {
    let mut sample = CoordinatorConfigManifest::default();
    if with_examples {
        sample.spec.bootstrap.zones.push(BootstrapZone {
            id: 1,
            name: "default".to_string(),
            api_keys: vec!["env:KEEL_ZONE_1_API_KEY".to_string()],
        });
        sample.spec.observability.metrics_port = Some(9100);
    }

    sample
        .to_yaml_file(output)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}
