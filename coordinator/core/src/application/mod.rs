// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod bootstrap;
pub mod election;
pub mod heartbeat;
pub mod registry;
pub mod repository_factory;

// Re-export services for convenience
pub use election::{ClaimOutcome, PrimaryElectionService};
pub use heartbeat::HeartbeatService;
pub use registry::AgentRegistry;
pub use repository_factory::{create_repositories, Repositories};
