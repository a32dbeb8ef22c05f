// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Layer
//!
//! Pure types and persistence contracts. No I/O lives here; the only
//! infrastructure type that leaks in is `sqlx::Error`, converted into
//! [`repository::RepositoryError`].

pub mod agent;
pub mod config;
pub mod error;
pub mod header;
pub mod lease;
pub mod protocol;
pub mod repository;
pub mod zone;
