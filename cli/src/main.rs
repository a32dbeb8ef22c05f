// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Keel
//!
//! The `keel` binary runs the zone coordinator and ships a small agent
//! client for exercising it.
//!
//! ## Commands
//!
//! - `keel serve` - Run the coordinator HTTP API
//! - `keel migrate` - Apply database migrations
//! - `keel config show|validate|generate` - Configuration management
//! - `keel agent run|report` - Act as an agent against a coordinator

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use keel_cli::commands::{self, AgentCommand, ConfigCommand};
use keel_core::config::CoordinatorConfigManifest;

/// Keel - zone registry and primary election for agent fleets
#[derive(Parser)]
#[command(name = "keel")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "KEEL_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); defaults to the
    /// configured level
    #[arg(long, global = true, env = "KEEL_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the coordinator
    #[command(name = "serve")]
    Serve {
        /// Listen address (overrides spec.server.bind_address)
        #[arg(long, env = "KEEL_HOST")]
        host: Option<String>,

        /// Listen port (overrides spec.server.port)
        #[arg(long, env = "KEEL_PORT")]
        port: Option<u16>,
    },

    /// Apply database migrations
    #[command(name = "migrate")]
    Migrate,

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Agent-side operations against a running coordinator
    #[command(name = "agent")]
    Agent {
        #[command(subcommand)]
        command: AgentCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is not an error
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| configured_log_level(cli.config.as_deref()));
    init_logging(&level)?;

    match cli.command {
        Commands::Serve { host, port } => commands::serve::run(cli.config, host, port).await,
        Commands::Migrate => commands::migrate::run(cli.config).await,
        Commands::Config { command } => commands::config::handle_command(command, cli.config).await,
        Commands::Agent { command } => commands::agent::handle_command(command).await,
    }
}

/// Log level from the configuration file, read quietly before logging exists
fn configured_log_level(config: Option<&Path>) -> String {
    config
        .map(Path::to_path_buf)
        .or_else(CoordinatorConfigManifest::discover_config)
        .and_then(|path| CoordinatorConfigManifest::from_yaml_file(path).ok())
        .map(|manifest| manifest.spec.observability.log_level)
        .unwrap_or_else(|| "info".to_string())
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}
