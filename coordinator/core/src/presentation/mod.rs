// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Presentation Layer (`keel-core`)
//!
//! HTTP surface that translates agent requests into application service
//! calls. All real work is delegated to `crate::application`.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`api`] | axum router, handlers, authentication middleware |
//! | [`headers`] | `CustomHeader` extraction and response echo |

pub mod api;
pub mod headers;
