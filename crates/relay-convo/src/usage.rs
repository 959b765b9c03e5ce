// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! Monthly usage accounting.
//!
//! Checks are fail-closed (a reached cap raises `QuotaExceeded` before the
//! operation runs); increments after a successful operation are
//! best-effort and never propagate their failures.

use std::sync::Arc;

use tracing::warn;

use relay_config::LimitsConfig;
use relay_store::{Plan, Repository, User};

use crate::ConvoError;

/// Tool pricing class, mirrored from the tool descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    Normal,
    Premium,
}

/// The current accounting period, `YYYY-MM` in UTC.
pub fn current_period() -> String {
    chrono::Utc::now().format("%Y-%m").to_string()
}

pub struct UsageManager {
    repo: Arc<dyn Repository>,
    limits: LimitsConfig,
}

impl UsageManager {
    pub fn new(repo: Arc<dyn Repository>, limits: LimitsConfig) -> Self {
        Self { repo, limits }
    }

    /// Raise `QuotaExceeded` when the user's plan has no allowance left for
    /// a chat turn (and, when `tool` is given, for that class of tool call).
    pub async fn check(&self, user: &User, tool: Option<ToolKind>) -> Result<(), ConvoError> {
        let usage = self.repo.get_usage(user.id, &current_period()).await?;

        if user.plan == Plan::Free && usage.message_count >= self.limits.free_monthly_messages {
            return Err(ConvoError::QuotaExceeded(format!(
                "free plan monthly message limit ({}) reached",
                self.limits.free_monthly_messages
            )));
        }

        if tool == Some(ToolKind::Premium)
            && usage.premium_function_calls >= self.limits.pro_monthly_premium_calls
        {
            return Err(ConvoError::QuotaExceeded(format!(
                "monthly premium tool limit ({}) reached",
                self.limits.pro_monthly_premium_calls
            )));
        }
        Ok(())
    }

    /// Count one completion against the user's month; best-effort.
    pub async fn increment_message(&self, user_id: u64, model: &str) {
        let period = current_period();
        let result = async {
            let mut usage = self.repo.get_usage(user_id, &period).await?;
            usage.message_count += 1;
            *usage.model_counts.entry(model.to_string()).or_insert(0) += 1;
            self.repo.put_usage(usage).await
        }
        .await;
        if let Err(e) = result {
            warn!(user_id, model, error = %e, "usage increment failed");
        }
    }

    /// Count one tool call against the user's month; best-effort.
    pub async fn increment_function(&self, user_id: u64, kind: ToolKind, cost_per_call: f64) {
        let period = current_period();
        let result = async {
            let mut usage = self.repo.get_usage(user_id, &period).await?;
            match kind {
                ToolKind::Premium => usage.premium_function_calls += 1,
                ToolKind::Normal => usage.normal_function_calls += 1,
            }
            usage.function_cost += cost_per_call;
            self.repo.put_usage(usage).await
        }
        .await;
        if let Err(e) = result {
            warn!(user_id, error = %e, "function usage increment failed");
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
