// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Agent protocol headers.
//!
//! [`CustomHeader`] is built once per request at the HTTP boundary and then
//! passed by value down into the application services.

use crate::domain::agent::AgentKey;
use crate::domain::zone::ZoneId;

pub const HEADER_API_KEY: &str = "X-API-KEY";
pub const HEADER_AGENT_KEY: &str = "X-AGENT-KEY";
pub const HEADER_HASH_CODE: &str = "X-HASH-CODE";
pub const HEADER_ZONE_ID: &str = "X-ZONE-ID";
pub const HEADER_SUPPORT_VERSION: &str = "X-SUPPORT-AGENT-VERSION";
pub const HEADER_TIMESTAMP: &str = "X-TIMESTAMP";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomHeader {
    pub api_key: String,
    pub agent_key: String,
    pub hash_code: String,
    /// Zero when the header is absent or not a number.
    pub zone_id: i64,
    pub support_version: String,
    /// Agent-side UTC epoch seconds; zero when absent or not a number.
    pub timestamp: i64,
}

impl CustomHeader {
    pub fn zone(&self) -> ZoneId {
        ZoneId(self.zone_id)
    }

    pub fn agent(&self) -> AgentKey {
        AgentKey::new(self.agent_key.clone())
    }
}
