// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! Conversation management: ownership enforcement, message append with
//! atomic bookkeeping, share links, monthly quotas, and history export.

mod error;
mod export;
mod manager;
mod usage;

pub use error::ConvoError;
pub use export::export_history_csv;
pub use manager::{ConversationManager, ConversationUpdate, ShareInfo};
pub use usage::{current_period, ToolKind, UsageManager};
