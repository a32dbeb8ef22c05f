// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! End-to-end tests for the agent HTTP API over the in-memory backend.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use keel_core::agent::AgentKey;
use keel_core::application::Repositories;
use keel_core::config::ElectionConfig;
use keel_core::infrastructure::repositories::InMemoryStore;
use keel_core::presentation::api::{app, AppState};
use keel_core::repository::LeaseRepository;
use keel_core::zone::{Zone, ZoneId};

struct Harness {
    store: InMemoryStore,
    repos: Repositories,
    router: Router,
}

async fn harness() -> Harness {
    let store = InMemoryStore::new();
    let repos = Repositories::in_memory(store.clone());
    repos.zones.save(&Zone::new(ZoneId(5), "seoul")).await.unwrap();
    repos.credentials.grant("k-5", ZoneId(5)).await.unwrap();
    // valid key for a zone nobody configured
    repos.credentials.grant("k-99", ZoneId(99)).await.unwrap();

    let router = app(Arc::new(AppState::new(&repos, ElectionConfig::default())));
    Harness { store, repos, router }
}

fn agent_request(method: &str, uri: &str, api_key: &str, zone: i64, agent_key: &str, body: Body) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("X-API-KEY", api_key)
        .header("X-ZONE-ID", zone.to_string())
        .header("X-AGENT-KEY", agent_key)
        .header("X-HASH-CODE", "hash-1")
        .header("X-SUPPORT-AGENT-VERSION", "2.1.0")
        .header("X-TIMESTAMP", "1700000000")
        .header("content-type", "application/json")
        .body(body)
        .unwrap()
}

fn handshake(agent_key: &str, ip: &str) -> Request<Body> {
    let body = json!({ "me": { "ip": ip, "port": 18800, "resource": { "core": 4, "memory": 8192, "disk": 65536 } } });
    agent_request("PUT", "/agents/handshake", "k-5", 5, agent_key, Body::from(body.to_string()))
}

fn poll(agent_key: &str) -> Request<Body> {
    agent_request("PUT", &format!("/agents/{}", agent_key), "k-5", 5, agent_key, Body::empty())
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, body)
}

#[tokio::test]
async fn test_primary_handover_scenario() {
    let h = harness().await;

    let (status, body) = send(&h.router, handshake("a1", "10.0.0.1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["agent"]["primary"]["ip"], "10.0.0.1");
    assert_eq!(body["me"]["hmacKey"].as_str().unwrap().len(), 16);
    assert_eq!(body["me"]["encKey"].as_str().unwrap().len(), 32);

    let (status, body) = send(&h.router, handshake("a2", "10.0.0.2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["agent"]["primary"]["ip"], "10.0.0.1");

    // a1 goes silent for 40s
    h.store.backdate_agent(&AgentKey::new("a1"), Duration::seconds(40)).await;

    let (status, body) = send(&h.router, poll("a2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["agent"]["primary"]["ip"], "10.0.0.2");
    assert_eq!(body["agent"]["primary"]["isActive"], true);

    let a2 = h.repos.agents.find_by_key(&AgentKey::new("a2")).await.unwrap().unwrap();
    assert_eq!(h.store.lease_rows(ZoneId(5)).await, 1);
    assert_eq!(h.store.find_by_zone(ZoneId(5)).await.unwrap().unwrap().agent_id, a2.id);
}

#[tokio::test]
async fn test_report_returns_current_primary() {
    let h = harness().await;
    send(&h.router, handshake("a1", "10.0.0.1")).await;
    send(&h.router, handshake("a2", "10.0.0.2")).await;

    let request = agent_request("GET", "/agents/reports/a2", "k-5", 5, "a2", Body::empty());
    let (status, body) = send(&h.router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["agent"]["primary"]["ip"], "10.0.0.1");
    assert_eq!(body["agent"]["primary"]["port"], 18800);
}

#[tokio::test]
async fn test_unknown_zone_is_rejected_without_side_effects() {
    let h = harness().await;
    let body = json!({ "me": { "ip": "10.0.0.9", "port": 1 } });
    let request = agent_request("PUT", "/agents/handshake", "k-99", 99, "ghost", Body::from(body.to_string()));

    let (status, body) = send(&h.router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("99"));
    assert_eq!(h.store.agent_rows(&AgentKey::new("ghost")).await, 0);
}

#[tokio::test]
async fn test_bad_api_key_is_unauthorized_and_still_echoes() {
    let h = harness().await;
    let body = json!({ "me": { "ip": "10.0.0.1", "port": 1 } });
    let request = agent_request("PUT", "/agents/handshake", "wrong", 5, "a1", Body::from(body.to_string()));

    let response = h.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()["x-agent-key"], "a1");
    assert_eq!(response.headers()["x-hash-code"], "hash-1");
    assert_eq!(response.headers()["x-support-agent-version"], "2.1.0");
    assert_eq!(h.store.agent_rows(&AgentKey::new("a1")).await, 0);
}

#[tokio::test]
async fn test_response_timestamp_is_server_time() {
    let h = harness().await;

    let response = h.router.clone().oneshot(handshake("a1", "10.0.0.1")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let stamped: i64 = response.headers()["x-timestamp"].to_str().unwrap().parse().unwrap();
    assert!(stamped >= Utc::now().timestamp() - 5);
}

#[tokio::test]
async fn test_repeated_handshake_rotates_credentials_in_place() {
    let h = harness().await;

    let (_, first) = send(&h.router, handshake("a1", "10.0.0.1")).await;
    let (_, second) = send(&h.router, handshake("a1", "10.0.0.7")).await;

    assert_ne!(first["me"]["hmacKey"], second["me"]["hmacKey"]);
    assert_ne!(first["me"]["encKey"], second["me"]["encKey"]);
    assert_eq!(h.store.agent_rows(&AgentKey::new("a1")).await, 1);
    let stored = h.repos.agents.find_by_key(&AgentKey::new("a1")).await.unwrap().unwrap();
    assert_eq!(stored.address.ip, "10.0.0.7");
}

#[tokio::test]
async fn test_malformed_body_is_internal_error() {
    let h = harness().await;
    let request = agent_request("PUT", "/agents/handshake", "k-5", 5, "a1", Body::from("{not json"));

    let (status, body) = send(&h.router, request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().is_some());
    assert_eq!(h.store.agent_rows(&AgentKey::new("a1")).await, 0);
}

#[tokio::test]
async fn test_poll_validation_failures() {
    let h = harness().await;

    let (status, _) = send(&h.router, poll("never-registered")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    send(&h.router, handshake("a1", "10.0.0.1")).await;
    let mismatched = agent_request("PUT", "/agents/someone-else", "k-5", 5, "a1", Body::empty());
    let (status, _) = send(&h.router, mismatched).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_needs_no_credentials() {
    let h = harness().await;
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

    let (status, body) = send(&h.router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}
