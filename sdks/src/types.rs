// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Types
//!
//! Wire bodies are shared with the coordinator; only the caller's identity
//! is defined here.

pub use keel_core::lease::PrimaryDescriptor;
pub use keel_core::protocol::{
    HandshakeRequest, HandshakeResponse, IssuedCredentials, PrimaryResponse, ReportedAgent,
    ReportedResource, ZoneView,
};

/// What an agent sends in the protocol headers on every call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentIdentity {
    pub api_key: String,
    pub agent_key: String,
    pub zone_id: i64,
    pub hash_code: String,
    pub support_version: String,
}

impl AgentIdentity {
    pub fn new(api_key: impl Into<String>, agent_key: impl Into<String>, zone_id: i64) -> Self {
        Self {
            api_key: api_key.into(),
            agent_key: agent_key.into(),
            zone_id,
            hash_code: String::new(),
            support_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn with_hash_code(mut self, hash_code: impl Into<String>) -> Self {
        self.hash_code = hash_code.into();
        self
    }
}
