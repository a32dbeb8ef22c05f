// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Keel CLI library - exposes the command handlers for tests

pub mod commands;
