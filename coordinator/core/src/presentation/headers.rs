// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Header extraction and echo for the agent API.
//!
//! Parsing never fails: repeated header values are concatenated, missing ones
//! become empty strings and non-numeric zone ids or timestamps become 0.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use chrono::Utc;
use std::convert::Infallible;

use crate::domain::header::{
    CustomHeader, HEADER_AGENT_KEY, HEADER_API_KEY, HEADER_HASH_CODE, HEADER_SUPPORT_VERSION,
    HEADER_TIMESTAMP, HEADER_ZONE_ID,
};

pub fn from_headers(headers: &HeaderMap) -> CustomHeader {
    CustomHeader {
        api_key: joined(headers, HEADER_API_KEY),
        agent_key: joined(headers, HEADER_AGENT_KEY),
        hash_code: joined(headers, HEADER_HASH_CODE),
        zone_id: numeric(headers, HEADER_ZONE_ID),
        support_version: joined(headers, HEADER_SUPPORT_VERSION),
        timestamp: numeric(headers, HEADER_TIMESTAMP),
    }
}

fn joined(headers: &HeaderMap, name: &str) -> String {
    headers
        .get_all(name)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect::<Vec<_>>()
        .concat()
}

fn numeric(headers: &HeaderMap, name: &str) -> i64 {
    joined(headers, name).trim().parse().unwrap_or(0)
}

/// Copy agent key, hash code and support version back onto the response and
/// stamp it with the server's clock.
pub fn echo(header: &CustomHeader, response_headers: &mut HeaderMap) {
    let echoed = [
        (HEADER_AGENT_KEY, HeaderValue::from_str(&header.agent_key)),
        (HEADER_HASH_CODE, HeaderValue::from_str(&header.hash_code)),
        (HEADER_SUPPORT_VERSION, HeaderValue::from_str(&header.support_version)),
        (HEADER_TIMESTAMP, Ok(HeaderValue::from(Utc::now().timestamp()))),
    ];
    for (name, value) in echoed {
        // from_bytes lowercases the canonical upper-case names
        if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name.as_bytes()), value) {
            response_headers.insert(name, value);
        }
    }
}

impl<S> FromRequestParts<S> for CustomHeader
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(from_headers(&parts.headers))
    }
}
