// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Election properties exercised through the public service API.

use chrono::{Duration, Utc};
use std::sync::Arc;

use keel_core::agent::{Agent, AgentAddress, AgentCredentials, AgentKey, AgentProfile, ResourceProfile};
use keel_core::application::PrimaryElectionService;
use keel_core::config::ElectionConfig;
use keel_core::infrastructure::repositories::InMemoryStore;
use keel_core::lease::PrimaryLease;
use keel_core::repository::{AgentRepository, LeaseRepository};
use keel_core::zone::ZoneId;

async fn register(store: &InMemoryStore, key: &str, zone: i64, idle: Duration) -> Agent {
    let agent = Agent::register(
        AgentKey::new(key),
        ZoneId(zone),
        AgentProfile {
            address: AgentAddress { ip: format!("ip-{key}"), port: 18800 },
            resources: ResourceProfile::default(),
        },
        AgentCredentials { hmac_key: "h".into(), enc_key: "e".into() },
        Utc::now() - idle,
    );
    store.insert(&agent).await.unwrap();
    agent
}

fn election(store: &InMemoryStore) -> PrimaryElectionService {
    PrimaryElectionService::new(Arc::new(store.clone()), Arc::new(store.clone()), ElectionConfig::default())
}

#[tokio::test]
async fn test_one_lease_per_zone_under_concurrent_lookups() {
    let store = InMemoryStore::new();
    let service = election(&store);

    let mut handles = Vec::new();
    for zone in 1..=3 {
        for i in 0..10 {
            let agent = register(&store, &format!("z{zone}-a{i}"), zone, Duration::zero()).await;
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                (zone, service.get_primary(ZoneId(zone), agent.id).await.unwrap())
            }));
        }
    }

    let mut seen: Vec<(i64, String)> = Vec::new();
    for handle in handles {
        let (zone, primary) = handle.await.unwrap();
        seen.push((zone, primary.ip));
    }

    for zone in 1..=3 {
        assert_eq!(store.lease_rows(ZoneId(zone)).await, 1);
        let lease = store.find_by_zone(ZoneId(zone)).await.unwrap().unwrap();
        let holder = store.find_by_id(lease.agent_id).await.unwrap().unwrap();
        assert!(seen.iter().filter(|(z, _)| *z == zone).all(|(_, ip)| *ip == holder.address.ip));
    }
}

#[tokio::test]
async fn test_healthy_holder_survives_stale_suspicion() {
    let store = InMemoryStore::new();
    let holder = register(&store, "holder", 7, Duration::seconds(29)).await;
    store.force_lease(PrimaryLease { zone_id: ZoneId(7), agent_id: holder.id }).await;

    for i in 0..5 {
        let challenger = register(&store, &format!("c{i}"), 7, Duration::zero()).await;
        let primary = election(&store).get_primary(ZoneId(7), challenger.id).await.unwrap();
        assert_eq!(primary.ip, holder.address.ip);
    }

    assert_eq!(store.find_by_zone(ZoneId(7)).await.unwrap().unwrap().agent_id, holder.id);
}

#[tokio::test]
async fn test_dead_holder_replaced_by_single_race_winner() {
    let store = InMemoryStore::new();
    let dead = register(&store, "dead", 8, Duration::seconds(45)).await;
    store.force_lease(PrimaryLease { zone_id: ZoneId(8), agent_id: dead.id }).await;

    let service = election(&store);
    let mut handles = Vec::new();
    for i in 0..6 {
        let challenger = register(&store, &format!("live{i}"), 8, Duration::zero()).await;
        let service = service.clone();
        handles.push(tokio::spawn(async move { service.claim(ZoneId(8), challenger.id, true).await }));
    }

    let mut winners = Vec::new();
    for handle in handles {
        winners.push(handle.await.unwrap().unwrap().id);
    }

    let lease = store.find_by_zone(ZoneId(8)).await.unwrap().unwrap();
    assert_ne!(lease.agent_id, dead.id);
    assert_eq!(store.lease_rows(ZoneId(8)).await, 1);
    assert!(winners.iter().all(|w| *w == lease.agent_id));
}

#[tokio::test]
async fn test_claim_result_matches_committed_lease() {
    let store = InMemoryStore::new();
    let a = register(&store, "a", 2, Duration::zero()).await;
    let b = register(&store, "b", 2, Duration::zero()).await;
    let service = election(&store);

    let first = service.claim(ZoneId(2), a.id, false).await.unwrap();
    let second = service.claim(ZoneId(2), b.id, false).await.unwrap();

    let lease = store.find_by_zone(ZoneId(2)).await.unwrap().unwrap();
    assert_eq!(first.id, lease.agent_id);
    assert_eq!(second.id, lease.agent_id);
}
