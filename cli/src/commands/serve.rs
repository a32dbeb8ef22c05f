// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Coordinator server
//!
//! Loads and validates configuration, connects storage, seeds bootstrap
//! zones and serves the agent API until SIGINT/SIGTERM.

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use keel_core::application::{bootstrap, create_repositories};
use keel_core::config::CoordinatorConfigManifest;
use keel_core::presentation::api::{app, AppState};

pub async fn run(config_path: Option<PathBuf>, host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut config = CoordinatorConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;
    if let Some(host) = host {
        config.spec.server.bind_address = host;
    }
    if let Some(port) = port {
        config.spec.server.port = port;
    }
    config.validate().context("Configuration validation failed")?;

    info!(
        name = %config.metadata.name,
        staleness_margin = ?config.spec.election.staleness_margin,
        eviction_threshold = ?config.spec.election.eviction_threshold,
        "Configuration loaded"
    );

    if let Some(metrics_port) = config.spec.observability.metrics_port {
        let metrics_addr = SocketAddr::from(([0, 0, 0, 0], metrics_port));
        PrometheusBuilder::new()
            .with_http_listener(metrics_addr)
            .install()
            .context("Failed to install Prometheus exporter")?;
        info!("Metrics exported on {}", metrics_addr);
    }

    let backend = config.spec.storage.to_backend()?;
    let repos = create_repositories(&backend)
        .await
        .context("Failed to initialize storage")?;
    bootstrap::seed(&repos, &config.spec.bootstrap)
        .await
        .context("Failed to seed bootstrap zones")?;

    let router = app(Arc::new(AppState::new(&repos, config.spec.election)));

    let addr = format!("{}:{}", config.spec.server.bind_address, config.spec.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Coordinator listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Coordinator shutting down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
