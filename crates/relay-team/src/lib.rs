// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! Agent-to-agent delegation with hard safety bounds.
//!
//! A delegation runs the target agent as an ordinary chat turn.  Three
//! guards keep the graph finite: a cycle check against the in-flight
//! delegation stack, a depth cap across the chain, and a sliding-window
//! rate limit per user.

mod delegation;
mod tools;

pub use delegation::{
    ChatInvoker, DelegationContext, DelegationLimiter, TeamDelegation, TeamError,
};
pub use tools::{DelegateByRoleTool, DelegateToTeamMemberTool};
