// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Agent-side commands, useful for smoke-testing a coordinator.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use std::time::Duration;
use tokio::signal;
use tracing::warn;

use keel_agent_sdk::{AgentIdentity, CoordinatorClient, PrimaryDescriptor, ReportedAgent, ReportedResource};

#[derive(Args, Clone)]
pub struct AgentConnection {
    /// Coordinator base URL
    #[arg(long, env = "KEEL_COORDINATOR_URL", default_value = "http://127.0.0.1:8090")]
    coordinator: String,

    /// API key granted for the zone
    #[arg(long, env = "KEEL_API_KEY")]
    api_key: String,

    /// Stable agent key
    #[arg(long, env = "KEEL_AGENT_KEY")]
    agent_key: String,

    /// Zone to join
    #[arg(long, env = "KEEL_ZONE_ID")]
    zone: i64,
}

impl AgentConnection {
    fn client(&self) -> CoordinatorClient {
        CoordinatorClient::new(
            self.coordinator.clone(),
            AgentIdentity::new(&self.api_key, &self.agent_key, self.zone),
        )
    }
}

#[derive(Subcommand)]
pub enum AgentCommand {
    /// Handshake, then poll until interrupted, printing primary changes
    Run {
        #[command(flatten)]
        connection: AgentConnection,

        /// Address other agents can reach this agent on
        #[arg(long, default_value = "127.0.0.1")]
        ip: String,

        #[arg(long, default_value = "18800")]
        port: u16,

        /// Reported CPU cores
        #[arg(long, default_value = "1")]
        core: i32,

        /// Reported memory (MB)
        #[arg(long, default_value = "1024")]
        memory: i64,

        /// Reported disk (MB)
        #[arg(long, default_value = "10240")]
        disk: i64,

        /// Seconds between polls
        #[arg(long, default_value = "5")]
        interval: u64,
    },

    /// Send a single report and print the primary
    Report {
        #[command(flatten)]
        connection: AgentConnection,
    },
}

pub async fn handle_command(command: AgentCommand) -> Result<()> {
    match command {
        AgentCommand::Run { connection, ip, port, core, memory, disk, interval } => {
            let me = ReportedAgent { ip, port, resource: ReportedResource { core, memory, disk } };
            run(connection, me, Duration::from_secs(interval.max(1))).await
        }
        AgentCommand::Report { connection } => {
            let response = connection.client().report().await.context("Report failed")?;
            print_primary(&response.agent.primary);
            Ok(())
        }
    }
}

async fn run(connection: AgentConnection, me: ReportedAgent, every: Duration) -> Result<()> {
    let client = connection.client();

    let handshake = client.handshake(me).await.context("Handshake failed")?;
    println!("{}", format!("✓ Joined zone {} as {}", connection.zone, connection.agent_key).green());
    print_primary(&handshake.agent.primary);

    let mut current = handshake.agent.primary;
    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match client.poll().await {
                    Ok(response) if !same_agent(&response.agent.primary, &current) => {
                        current = response.agent.primary;
                        print_primary(&current);
                    }
                    Ok(_) => {}
                    // Coordinator hiccups are retried on the next tick
                    Err(e) => warn!("Poll failed: {}", e),
                }
            }
            _ = signal::ctrl_c() => {
                println!("Stopping agent");
                return Ok(());
            }
        }
    }
}

fn same_agent(a: &PrimaryDescriptor, b: &PrimaryDescriptor) -> bool {
    a.ip == b.ip && a.port == b.port
}

fn print_primary(primary: &PrimaryDescriptor) {
    println!(
        "  Primary: {}:{} (active: {}, last seen: {})",
        primary.ip.bold(),
        primary.port,
        primary.is_active,
        primary.last_access_time
    );
}
