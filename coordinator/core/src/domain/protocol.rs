// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Wire bodies of the agent API, shared by the server and the agent SDK.
//!
//! Decoding is lenient in the same way for every field: anything the agent
//! omits falls back to its zero value.

use serde::{Deserialize, Serialize};

use crate::domain::agent::{AgentAddress, AgentCredentials, AgentProfile, ResourceProfile};
use crate::domain::lease::PrimaryDescriptor;

/// `PUT /handshake` request body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeRequest {
    #[serde(default)]
    pub me: ReportedAgent,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedAgent {
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub resource: ReportedResource,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedResource {
    #[serde(default)]
    pub core: i32,
    #[serde(default)]
    pub memory: i64,
    #[serde(default)]
    pub disk: i64,
}

impl From<ReportedAgent> for AgentProfile {
    fn from(me: ReportedAgent) -> Self {
        AgentProfile {
            address: AgentAddress { ip: me.ip, port: me.port },
            resources: ResourceProfile {
                core: me.resource.core,
                memory: me.resource.memory,
                disk: me.resource.disk,
            },
        }
    }
}

/// Credentials section of the handshake response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedCredentials {
    pub hmac_key: String,
    pub enc_key: String,
}

impl From<AgentCredentials> for IssuedCredentials {
    fn from(c: AgentCredentials) -> Self {
        Self { hmac_key: c.hmac_key, enc_key: c.enc_key }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneView {
    pub primary: PrimaryDescriptor,
}

/// `PUT /handshake` response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeResponse {
    pub me: IssuedCredentials,
    pub agent: ZoneView,
}

/// Poll and report response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryResponse {
    pub agent: ZoneView,
}
