// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: Apache-2.0
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use relay_config::LimitsConfig;
use relay_store::{AgentRecord, Repository, StoreError, User};

#[derive(Debug, Error)]
pub enum TeamError {
    #[error("no current agent in the request context")]
    MissingCurrentAgent,

    #[error("agent {0} not found")]
    AgentNotFound(String),

    #[error("agent {0} belongs to another user")]
    Forbidden(String),

    #[error("delegation to {0} refused: it is already in the delegation chain")]
    CycleDetected(String),

    #[error("delegation depth limit ({0}) reached")]
    DepthExceeded(usize),

    #[error("delegation rate limit reached: {0} delegations per window")]
    RateLimited(usize),

    #[error("delegated chat turn failed: {0}")]
    Invoke(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Seam through which a delegation becomes a nested chat turn.  The
/// orchestrator implements this; tests substitute a stub.
#[async_trait]
pub trait ChatInvoker: Send + Sync {
    /// Run `task` as a chat turn against `agent`, with `context_messages`
    /// prepended and the extended delegation stack in effect.  Returns the
    /// assistant messages produced by the turn.
    async fn invoke_agent(
        &self,
        agent: &AgentRecord,
        user: &User,
        task: &str,
        context_messages: &[String],
        delegation_stack: &[String],
    ) -> Result<Vec<String>, TeamError>;
}

/// Sliding-window delegation counter, shared across requests.
#[derive(Default, Clone)]
pub struct DelegationLimiter {
    starts: Arc<Mutex<HashMap<u64, Vec<i64>>>>,
}

impl DelegationLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a delegation start for `user_id`; returns `false` when the
    /// window already holds `max_per_window` starts.
    fn try_acquire(&self, user_id: u64, window_ms: u64, max_per_window: usize) -> bool {
        let now = chrono::Utc::now().timestamp_millis();
        let mut starts = self.starts.lock().unwrap();
        let entry = starts.entry(user_id).or_default();
        entry.retain(|t| now - *t < window_ms as i64);
        if entry.len() >= max_per_window {
            return false;
        }
        entry.push(now);
        true
    }
}

/// Identity and chain state of the in-flight request.
pub struct DelegationContext<'a> {
    pub user: &'a User,
    pub current_agent_id: Option<&'a str>,
    pub delegation_stack: &'a [String],
    /// Request-level depth cap; the configured default applies when unset.
    pub max_depth_override: Option<usize>,
}

pub struct TeamDelegation {
    repo: Arc<dyn Repository>,
    limiter: DelegationLimiter,
    limits: LimitsConfig,
}

impl TeamDelegation {
    pub fn new(repo: Arc<dyn Repository>, limiter: DelegationLimiter, limits: LimitsConfig) -> Self {
        Self {
            repo,
            limiter,
            limits,
        }
    }

    async fn load_owned_agent(&self, id: &str, user: &User) -> Result<AgentRecord, TeamError> {
        let agent = match self.repo.get_agent(id).await {
            Ok(a) => a,
            Err(StoreError::NotFound(_)) => return Err(TeamError::AgentNotFound(id.to_string())),
            Err(e) => return Err(e.into()),
        };
        if agent.user_id != user.id {
            return Err(TeamError::Forbidden(id.to_string()));
        }
        Ok(agent)
    }

    /// Delegate `task` to `target_agent_id`, enforcing cycle, depth, and
    /// rate bounds, and return the sub-agent's concatenated reply.
    pub async fn delegate(
        &self,
        ctx: &DelegationContext<'_>,
        target_agent_id: &str,
        task: &str,
        context_messages: &[String],
        invoker: &dyn ChatInvoker,
    ) -> Result<String, TeamError> {
        let current_agent_id = ctx
            .current_agent_id
            .ok_or(TeamError::MissingCurrentAgent)?;

        // Both ends of the delegation must exist and belong to the caller.
        let _current = self.load_owned_agent(current_agent_id, ctx.user).await?;
        let target = self.load_owned_agent(target_agent_id, ctx.user).await?;

        if ctx
            .delegation_stack
            .iter()
            .any(|id| id == &target.id)
        {
            return Err(TeamError::CycleDetected(target.id));
        }
        let max_depth = ctx
            .max_depth_override
            .unwrap_or(self.limits.max_delegation_depth);
        if ctx.delegation_stack.len() >= max_depth {
            return Err(TeamError::DepthExceeded(max_depth));
        }
        if !self.limiter.try_acquire(
            ctx.user.id,
            self.limits.delegation_window_ms,
            self.limits.max_delegations_per_window,
        ) {
            return Err(TeamError::RateLimited(
                self.limits.max_delegations_per_window,
            ));
        }

        let mut stack: Vec<String> = ctx.delegation_stack.to_vec();
        stack.push(target.id.clone());
        debug!(target = %target.id, depth = stack.len(), "delegating task");

        let replies = invoker
            .invoke_agent(&target, ctx.user, task, context_messages, &stack)
            .await?;
        Ok(replies.join("\n\n"))
    }

    /// Delegate to the first of the user's agents holding `role`.
    pub async fn delegate_by_role(
        &self,
        ctx: &DelegationContext<'_>,
        role: &str,
        task: &str,
        context_messages: &[String],
        invoker: &dyn ChatInvoker,
    ) -> Result<String, TeamError> {
        let agents = self.repo.list_agents(ctx.user.id).await?;
        let target = agents
            .iter()
            .find(|a| a.role == role)
            .ok_or_else(|| TeamError::AgentNotFound(format!("role {role}")))?;
        self.delegate(ctx, &target.id, task, context_messages, invoker)
            .await
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
