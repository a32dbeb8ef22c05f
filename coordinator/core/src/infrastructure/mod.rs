// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Infrastructure Layer
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`db`] | PostgreSQL pool and embedded migrations |
//! | [`keys`] | Symmetric key minting for agent credentials |
//! | [`repositories`] | In-memory and PostgreSQL repository implementations |

pub mod db;
pub mod keys;
pub mod repositories;
