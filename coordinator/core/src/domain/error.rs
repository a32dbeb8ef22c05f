// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Request-level fault taxonomy.
//!
//! | Variant | HTTP | Raised for |
//! |---------|------|-----------|
//! | `Validation` | 400 | unknown zone, unregistered agent, zone or key mismatch |
//! | `Unauthorized` | 401 | API key not valid for the zone |
//! | `Internal` | 500 | body decode, election invariant breaks, store failures |

use crate::domain::repository::RepositoryError;

#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Internal(String),
}

impl CoordinatorError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<RepositoryError> for CoordinatorError {
    fn from(err: RepositoryError) -> Self {
        CoordinatorError::Internal(err.to_string())
    }
}
