// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::Utc;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use keel_core::header::{
    HEADER_AGENT_KEY, HEADER_API_KEY, HEADER_HASH_CODE, HEADER_SUPPORT_VERSION, HEADER_TIMESTAMP,
    HEADER_ZONE_ID,
};

use crate::types::{AgentIdentity, HandshakeRequest, HandshakeResponse, PrimaryResponse, ReportedAgent};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The coordinator answered with a non-success status
    #[error("coordinator returned {status}: {message}")]
    Api { status: u16, message: String },
}

/// Client for one agent talking to a Keel coordinator.
pub struct CoordinatorClient {
    base_url: String,
    client: Client,
    identity: AgentIdentity,
}

impl CoordinatorClient {
    pub fn new(base_url: impl Into<String>, identity: AgentIdentity) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
            identity,
        }
    }

    pub fn identity(&self) -> &AgentIdentity {
        &self.identity
    }

    /// Register (or reconnect) and receive fresh credentials plus the
    /// zone's primary.
    pub async fn handshake(&self, me: ReportedAgent) -> Result<HandshakeResponse, ClientError> {
        let url = format!("{}/agents/handshake", self.base_url);
        let req = self.client.put(&url).json(&HandshakeRequest { me });
        decode(self.with_headers(req).send().await?).await
    }

    /// Refresh liveness and learn the current primary.
    pub async fn poll(&self) -> Result<PrimaryResponse, ClientError> {
        let url = format!("{}/agents/{}", self.base_url, self.identity.agent_key);
        decode(self.with_headers(self.client.put(&url)).send().await?).await
    }

    /// Same as [`poll`](Self::poll), over the reports route.
    pub async fn report(&self) -> Result<PrimaryResponse, ClientError> {
        let url = format!("{}/agents/reports/{}", self.base_url, self.identity.agent_key);
        decode(self.with_headers(self.client.get(&url)).send().await?).await
    }

    fn with_headers(&self, req: RequestBuilder) -> RequestBuilder {
        req.header(HEADER_API_KEY, &self.identity.api_key)
            .header(HEADER_AGENT_KEY, &self.identity.agent_key)
            .header(HEADER_ZONE_ID, self.identity.zone_id.to_string())
            .header(HEADER_HASH_CODE, &self.identity.hash_code)
            .header(HEADER_SUPPORT_VERSION, &self.identity.support_version)
            .header(HEADER_TIMESTAMP, Utc::now().timestamp().to_string())
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let body: serde_json::Value = response.json().await.unwrap_or_default();
    let message = body["error"].as_str().unwrap_or("no error message").to_string();
    Err(ClientError::Api { status: status.as_u16(), message })
}
