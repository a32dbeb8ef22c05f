// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `keel-core`: Zone Registry and Primary Election
//!
//! Agents are partitioned into zones. Every agent registers through a
//! handshake and then polls; each request refreshes the agent's liveness
//! and answers with the zone's current primary. The primary is decided by a
//! lease-by-insert election arbitrated entirely by the backing store's
//! transactions and the per-zone uniqueness constraint.
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | `Agent`, `Zone`, `PrimaryLease`, repository traits, config manifest |
//! | [`application`] | Application | `AgentRegistry`, `PrimaryElectionService`, `HeartbeatService` |
//! | [`infrastructure`] | Infrastructure | in-memory and PostgreSQL repositories, key minting, pool |
//! | [`presentation`] | Presentation | axum agent API, header extraction, authentication |

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
