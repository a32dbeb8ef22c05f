// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Primary Lease
//!
//! The durable claim binding one zone to one agent. At most one lease row
//! exists per zone at any committed state; the store's uniqueness constraint
//! on `zone_id` is the only arbiter between concurrent claimants.
//!
//! ```text
//! NoLease ──claim──▶ Held(A) ──lookup (A fresh or < eviction threshold)──▶ Held(A)
//!                       │
//!                       └──A idle > eviction threshold, B wins insert──▶ Held(B)
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::agent::AgentId;
use crate::domain::zone::ZoneId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryLease {
    pub zone_id: ZoneId,
    pub agent_id: AgentId,
}

/// Result of inserting a lease row inside a claim transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseInsert {
    /// The insert went through; carries the affected-row count.
    Inserted(u64),
    /// The zone already has a lease (uniqueness constraint rejected the row).
    Conflict,
}

/// What agents learn about their zone's primary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryDescriptor {
    pub ip: String,
    pub port: u16,
    pub is_active: bool,
    /// UTC epoch seconds
    pub last_access_time: i64,
}
