// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: MIT
//! Tool dispatch: the single gate every tool call passes through.
//!
//! Order matters and is part of the contract: MCP routing first, then
//! registry lookup, premium gating, the fail-closed quota check, execution,
//! and finally best-effort usage accounting.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use relay_convo::ToolKind;
use relay_store::Plan;

use crate::{
    mcp::{McpRegistry, MCP_PREFIX},
    ToolCall, ToolContext, ToolError, ToolInvoker, ToolRegistry, ToolResult,
};

pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    mcp: Arc<McpRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>, mcp: Arc<McpRegistry>) -> Self {
        Self { registry, mcp }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Run one tool call through the full gate sequence.
    pub async fn dispatch(
        &self,
        ctx: &ToolContext<'_>,
        call: &ToolCall,
    ) -> Result<ToolResult, ToolError> {
        if call.name.starts_with(MCP_PREFIX) {
            let (client, tool) = self.mcp.route(&call.name)?;
            debug!(agent = %client.agent_id(), tool = %tool, "dispatching MCP tool");
            return client.call(&tool, call.args.clone()).await;
        }

        let tool = self
            .registry
            .get(&call.name)
            .ok_or_else(|| ToolError::NotFound(call.name.clone()))?;

        if tool.kind() == ToolKind::Premium {
            let is_pro = ctx.user.map(|u| u.plan == Plan::Pro).unwrap_or(false);
            if !is_pro {
                return Err(ToolError::PremiumRequired(call.name.clone()));
            }
        }

        if let Some(conversation) = ctx.conversation {
            conversation.check_usage_limits(Some(tool.kind())).await?;
        }

        debug!(tool = %call.name, "dispatching native tool");
        let result = tool.execute(ctx, call).await;

        if !result.is_error() {
            if let Some(conversation) = ctx.conversation {
                conversation
                    .increment_function_usage(tool.kind(), tool.cost_per_call())
                    .await;
            }
        }
        Ok(result)
    }
}

#[async_trait]
impl ToolInvoker for Dispatcher {
    async fn invoke(
        &self,
        ctx: &ToolContext<'_>,
        call: &ToolCall,
    ) -> Result<ToolResult, ToolError> {
        self.dispatch(ctx, call).await
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Tool;
    use async_trait::async_trait;
    use relay_config::LimitsConfig;
    use relay_convo::ConversationManager;
    use relay_store::{MemoryRepository, Repository, User};
    use serde_json::{json, Value};

    struct PlainTool;

    #[async_trait]
    impl Tool for PlainTool {
        fn name(&self) -> &str {
            "plain"
        }
        fn description(&self) -> &str {
            "a normal tool"
        }
        fn parameters_schema(&self) -> Value {
            json!({ "type": "object" })
        }
        async fn execute(&self, _ctx: &ToolContext<'_>, _call: &ToolCall) -> ToolResult {
            ToolResult::success("plain", "done")
        }
    }

    struct PremiumTool;

    #[async_trait]
    impl Tool for PremiumTool {
        fn name(&self) -> &str {
            "fancy"
        }
        fn description(&self) -> &str {
            "a premium tool"
        }
        fn parameters_schema(&self) -> Value {
            json!({ "type": "object" })
        }
        fn kind(&self) -> ToolKind {
            ToolKind::Premium
        }
        fn cost_per_call(&self) -> f64 {
            0.5
        }
        async fn execute(&self, _ctx: &ToolContext<'_>, _call: &ToolCall) -> ToolResult {
            ToolResult::success("fancy", "premium done")
        }
    }

    fn dispatcher() -> Dispatcher {
        let mut registry = ToolRegistry::new();
        registry.register(PlainTool);
        registry.register(PremiumTool);
        Dispatcher::new(Arc::new(registry), Arc::new(McpRegistry::new()))
    }

    fn ctx_in<'a>(
        dispatcher: &'a Dispatcher,
        user: Option<&'a User>,
        request: &'a Value,
    ) -> ToolContext<'a> {
        ToolContext {
            completion_id: "cmp-1",
            user,
            app_url: None,
            request,
            conversation: None,
            invoker: dispatcher,
        }
    }

    #[tokio::test]
    async fn unknown_tool_is_not_found() {
        let d = dispatcher();
        let request = json!({});
        let ctx = ctx_in(&d, None, &request);
        let err = d
            .dispatch(&ctx, &ToolCall::new("1", "missing", json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[tokio::test]
    async fn plain_tool_runs_for_anyone() {
        let d = dispatcher();
        let request = json!({});
        let ctx = ctx_in(&d, None, &request);
        let result = d
            .dispatch(&ctx, &ToolCall::new("1", "plain", json!({})))
            .await
            .unwrap();
        assert_eq!(result.content, "done");
    }

    #[tokio::test]
    async fn premium_requires_pro_plan() {
        let d = dispatcher();
        let request = json!({});
        let free = User::new(1, "free@x.com", Plan::Free);
        let ctx = ctx_in(&d, Some(&free), &request);
        let err = d
            .dispatch(&ctx, &ToolCall::new("1", "fancy", json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::PremiumRequired(_)));

        let pro = User::new(2, "pro@x.com", Plan::Pro);
        let ctx = ctx_in(&d, Some(&pro), &request);
        assert!(d
            .dispatch(&ctx, &ToolCall::new("1", "fancy", json!({})))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn anonymous_caller_cannot_use_premium() {
        let d = dispatcher();
        let request = json!({});
        let ctx = ctx_in(&d, None, &request);
        assert!(matches!(
            d.dispatch(&ctx, &ToolCall::new("1", "fancy", json!({})))
                .await,
            Err(ToolError::PremiumRequired(_))
        ));
    }

    #[tokio::test]
    async fn successful_call_accounts_usage() {
        let repo = Arc::new(MemoryRepository::new());
        let user = User::new(7, "pro@x.com", Plan::Pro);
        let conversation = ConversationManager::new(
            repo.clone(),
            LimitsConfig::default(),
            Some(user.clone()),
            true,
        );
        let d = dispatcher();
        let request = json!({});
        let ctx = ToolContext {
            completion_id: "cmp-1",
            user: Some(&user),
            app_url: None,
            request: &request,
            conversation: Some(&conversation),
            invoker: &d,
        };
        d.dispatch(&ctx, &ToolCall::new("1", "fancy", json!({})))
            .await
            .unwrap();

        let usage = repo
            .get_usage(7, &relay_convo::current_period())
            .await
            .unwrap();
        assert_eq!(usage.premium_function_calls, 1);
        assert!((usage.function_cost - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn quota_check_fails_closed() {
        let repo = Arc::new(MemoryRepository::new());
        let user = User::new(8, "pro@x.com", Plan::Pro);
        let limits = LimitsConfig {
            pro_monthly_premium_calls: 0,
            ..LimitsConfig::default()
        };
        let conversation =
            ConversationManager::new(repo, limits, Some(user.clone()), true);
        let d = dispatcher();
        let request = json!({});
        let ctx = ToolContext {
            completion_id: "cmp-1",
            user: Some(&user),
            app_url: None,
            request: &request,
            conversation: Some(&conversation),
            invoker: &d,
        };
        let err = d
            .dispatch(&ctx, &ToolCall::new("1", "fancy", json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Quota(_)));
    }
}
