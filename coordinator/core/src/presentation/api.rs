// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Agent HTTP API (axum).
//!
//! | Route | Method | Handler |
//! |-------|--------|---------|
//! | `/health` | GET | liveness, unauthenticated |
//! | `/agents/handshake` | PUT | register or reconnect |
//! | `/agents/{agent_key}` | PUT | poll |
//! | `/agents/reports/{agent_key}` | GET | report |
//!
//! Every `/agents` route sits behind [`authenticate`], which also echoes the
//! agent headers onto whatever response comes back.

use axum::{
    body::Bytes,
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, warn};

use crate::application::election::PrimaryElectionService;
use crate::application::heartbeat::HeartbeatService;
use crate::application::registry::AgentRegistry;
use crate::application::repository_factory::Repositories;
use crate::domain::config::ElectionConfig;
use crate::domain::error::CoordinatorError;
use crate::domain::header::CustomHeader;
use crate::domain::protocol::{HandshakeRequest, HandshakeResponse, PrimaryResponse};
use crate::domain::repository::CredentialRepository;
use crate::presentation::headers;

pub struct AppState {
    pub heartbeat: HeartbeatService,
    pub credentials: Arc<dyn CredentialRepository>,
    pub start_time: Instant,
}

impl AppState {
    /// Wire the registry, election and heartbeat services over `repos`.
    pub fn new(repos: &Repositories, election: ElectionConfig) -> Self {
        let registry = AgentRegistry::new(repos.agents.clone());
        let election = PrimaryElectionService::new(repos.agents.clone(), repos.leases.clone(), election);
        Self {
            heartbeat: HeartbeatService::new(repos.zones.clone(), registry, election),
            credentials: repos.credentials.clone(),
            start_time: Instant::now(),
        }
    }
}

pub fn app(state: Arc<AppState>) -> Router {
    let agents = Router::new()
        .route("/handshake", put(handshake_handler))
        .route("/reports/{agent_key}", get(report_handler))
        .route("/{agent_key}", put(poll_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/agents", agents)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// API key + zone check against the credential store. Rejected requests get
/// a 401 and never reach a handler.
async fn authenticate(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    let header = headers::from_headers(request.headers());

    let mut response = match authorize(&state, &header).await {
        Ok(()) => next.run(request).await,
        Err(e) => e.into_response(),
    };
    headers::echo(&header, response.headers_mut());
    response
}

async fn authorize(state: &AppState, header: &CustomHeader) -> Result<(), CoordinatorError> {
    if header.api_key.is_empty() {
        return Err(CoordinatorError::Unauthorized("missing API key".to_string()));
    }
    if !state.credentials.exists(&header.api_key, header.zone()).await? {
        debug!(zone_id = header.zone_id, agent_key = %header.agent_key, "Rejected API key");
        return Err(CoordinatorError::Unauthorized(format!(
            "API key is not valid for zone {}",
            header.zone_id
        )));
    }
    Ok(())
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "uptime_seconds": state.start_time.elapsed().as_secs(),
    }))
}

async fn handshake_handler(
    State(state): State<Arc<AppState>>,
    header: CustomHeader,
    body: Bytes,
) -> Result<Json<HandshakeResponse>, CoordinatorError> {
    let request: HandshakeRequest = serde_json::from_slice(&body)
        .map_err(|e| CoordinatorError::internal(format!("failed to decode handshake body: {}", e)))?;

    let response = state.heartbeat.handshake(&header, request.me.into()).await?;
    Ok(Json(response))
}

async fn poll_handler(
    State(state): State<Arc<AppState>>,
    Path(agent_key): Path<String>,
    header: CustomHeader,
) -> Result<Json<PrimaryResponse>, CoordinatorError> {
    ensure_same_agent(&agent_key, &header)?;
    Ok(Json(state.heartbeat.poll(&header).await?))
}

async fn report_handler(
    State(state): State<Arc<AppState>>,
    Path(agent_key): Path<String>,
    header: CustomHeader,
) -> Result<Json<PrimaryResponse>, CoordinatorError> {
    ensure_same_agent(&agent_key, &header)?;
    Ok(Json(state.heartbeat.report(&header).await?))
}

fn ensure_same_agent(path_key: &str, header: &CustomHeader) -> Result<(), CoordinatorError> {
    if path_key != header.agent_key {
        return Err(CoordinatorError::validation(format!(
            "agent key in path '{}' does not match header '{}'",
            path_key, header.agent_key
        )));
    }
    Ok(())
}

impl IntoResponse for CoordinatorError {
    fn into_response(self) -> Response {
        let status = match &self {
            CoordinatorError::Validation(_) => StatusCode::BAD_REQUEST,
            CoordinatorError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            CoordinatorError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        match status {
            StatusCode::INTERNAL_SERVER_ERROR => error!("Request failed: {}", self),
            _ => warn!(status = status.as_u16(), "Request rejected: {}", self),
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
