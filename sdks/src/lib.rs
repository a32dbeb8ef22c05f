// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Keel agent SDK
//!
//! HTTP client for the coordinator's agent API: handshake once, then poll
//! to keep the agent alive and learn who the zone's primary is.

pub mod client;
pub mod types;

pub use client::{ClientError, CoordinatorClient};
pub use types::*;
