// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! Delegation exposed as registered tools.
//!
//! The current agent id and delegation stack ride on the raw request body
//! (`current_agent_id`, `delegation_stack`), so nested turns inherit the
//! chain without any process-global state.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use relay_tools::{Tool, ToolCall, ToolContext, ToolResult};

use crate::{ChatInvoker, DelegationContext, TeamDelegation};

fn stack_from_request(request: &Value) -> Vec<String> {
    request
        .get("delegation_stack")
        .and_then(|s| s.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn context_messages_from(args: &Value) -> Vec<String> {
    args.get("context_messages")
        .and_then(|m| m.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

async fn run_delegation(
    tool_name: &str,
    delegation: &TeamDelegation,
    invoker: &dyn ChatInvoker,
    ctx: &ToolContext<'_>,
    target: DelegationTarget<'_>,
    task: &str,
    context_messages: &[String],
) -> ToolResult {
    let Some(user) = ctx.user else {
        return ToolResult::error(tool_name, "delegation requires a user principal");
    };
    let current_agent_id = ctx.request.get("current_agent_id").and_then(|v| v.as_str());
    let stack = stack_from_request(ctx.request);
    let max_depth_override = ctx
        .request
        .get("max_delegation_depth")
        .and_then(|v| v.as_u64())
        .map(|v| v as usize);
    let delegation_ctx = DelegationContext {
        user,
        current_agent_id,
        delegation_stack: &stack,
        max_depth_override,
    };

    let outcome = match target {
        DelegationTarget::Agent(agent_id) => {
            delegation
                .delegate(&delegation_ctx, agent_id, task, context_messages, invoker)
                .await
        }
        DelegationTarget::Role(role) => {
            delegation
                .delegate_by_role(&delegation_ctx, role, task, context_messages, invoker)
                .await
        }
    };

    match outcome {
        Ok(reply) => ToolResult::success(tool_name, reply),
        Err(e) => ToolResult::error(tool_name, e.to_string()),
    }
}

enum DelegationTarget<'a> {
    Agent(&'a str),
    Role(&'a str),
}

/// Delegate a task to a named team-member agent.
pub struct DelegateToTeamMemberTool {
    delegation: Arc<TeamDelegation>,
    invoker: Arc<dyn ChatInvoker>,
}

impl DelegateToTeamMemberTool {
    pub fn new(delegation: Arc<TeamDelegation>, invoker: Arc<dyn ChatInvoker>) -> Self {
        Self { delegation, invoker }
    }
}

#[async_trait]
impl Tool for DelegateToTeamMemberTool {
    fn name(&self) -> &str {
        "delegate_to_team_member"
    }

    fn description(&self) -> &str {
        "Hand a task to another of your agents. The sub-agent runs a full \
         chat turn and its reply is returned here. Delegation is bounded: \
         cycles, excessive depth, and bursts are refused."
    }

    fn is_default(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "agent_id": { "type": "string" },
                "task_description": { "type": "string" },
                "context_messages": {
                    "type": "array",
                    "items": { "type": "string" }
                }
            },
            "required": ["agent_id", "task_description"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, ctx: &ToolContext<'_>, call: &ToolCall) -> ToolResult {
        let Some(agent_id) = call.args.get("agent_id").and_then(|v| v.as_str()) else {
            return ToolResult::error(self.name(), "missing 'agent_id'");
        };
        let Some(task) = call.args.get("task_description").and_then(|v| v.as_str()) else {
            return ToolResult::error(self.name(), "missing 'task_description'");
        };
        run_delegation(
            self.name(),
            &self.delegation,
            self.invoker.as_ref(),
            ctx,
            DelegationTarget::Agent(agent_id),
            task,
            &context_messages_from(&call.args),
        )
        .await
    }
}

/// Delegate a task to whichever team member holds a role.
pub struct DelegateByRoleTool {
    delegation: Arc<TeamDelegation>,
    invoker: Arc<dyn ChatInvoker>,
}

impl DelegateByRoleTool {
    pub fn new(delegation: Arc<TeamDelegation>, invoker: Arc<dyn ChatInvoker>) -> Self {
        Self { delegation, invoker }
    }
}

#[async_trait]
impl Tool for DelegateByRoleTool {
    fn name(&self) -> &str {
        "delegate_to_team_member_by_role"
    }

    fn description(&self) -> &str {
        "Hand a task to the team member holding a given role."
    }

    fn is_default(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "role": { "type": "string" },
                "task_description": { "type": "string" },
                "context_messages": {
                    "type": "array",
                    "items": { "type": "string" }
                }
            },
            "required": ["role", "task_description"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, ctx: &ToolContext<'_>, call: &ToolCall) -> ToolResult {
        let Some(role) = call.args.get("role").and_then(|v| v.as_str()) else {
            return ToolResult::error(self.name(), "missing 'role'");
        };
        let Some(task) = call.args.get("task_description").and_then(|v| v.as_str()) else {
            return ToolResult::error(self.name(), "missing 'task_description'");
        };
        run_delegation(
            self.name(),
            &self.delegation,
            self.invoker.as_ref(),
            ctx,
            DelegationTarget::Role(role),
            task,
            &context_messages_from(&call.args),
        )
        .await
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DelegationLimiter, TeamError};
    use relay_config::LimitsConfig;
    use relay_store::{AgentRecord, MemoryRepository, Plan, Repository, User};
    use relay_tools::{mcp::McpRegistry, Dispatcher, ToolRegistry};

    struct StubInvoker;

    #[async_trait]
    impl ChatInvoker for StubInvoker {
        async fn invoke_agent(
            &self,
            agent: &AgentRecord,
            _user: &User,
            task: &str,
            context_messages: &[String],
            _delegation_stack: &[String],
        ) -> Result<Vec<String>, TeamError> {
            let mut out = Vec::new();
            if !context_messages.is_empty() {
                out.push(format!("context: {}", context_messages.join(" | ")));
            }
            out.push(format!("{} did: {task}", agent.name));
            Ok(out)
        }
    }

    async fn dispatcher() -> (Dispatcher, User) {
        let repo = Arc::new(MemoryRepository::new());
        for (id, role) in [("agent-a", "lead"), ("agent-b", "researcher")] {
            repo.put_agent(AgentRecord {
                id: id.into(),
                user_id: 1,
                name: id.to_uppercase(),
                role: role.into(),
                description: None,
                model: None,
            })
            .await
            .unwrap();
        }
        let delegation = Arc::new(TeamDelegation::new(
            repo,
            DelegationLimiter::new(),
            LimitsConfig::default(),
        ));
        let invoker: Arc<dyn ChatInvoker> = Arc::new(StubInvoker);
        let mut registry = ToolRegistry::new();
        registry.register(DelegateToTeamMemberTool::new(
            delegation.clone(),
            invoker.clone(),
        ));
        registry.register(DelegateByRoleTool::new(delegation, invoker));
        (
            Dispatcher::new(Arc::new(registry), Arc::new(McpRegistry::new())),
            User::new(1, "lead@x.com", Plan::Pro),
        )
    }

    async fn run(
        d: &Dispatcher,
        user: &User,
        request: &Value,
        name: &str,
        args: Value,
    ) -> ToolResult {
        let ctx = ToolContext {
            completion_id: "cmp",
            user: Some(user),
            app_url: None,
            request,
            conversation: None,
            invoker: d,
        };
        d.dispatch(&ctx, &ToolCall::new("1", name, args)).await.unwrap()
    }

    #[tokio::test]
    async fn delegation_tool_returns_sub_agent_reply() {
        let (d, user) = dispatcher().await;
        let request = json!({ "current_agent_id": "agent-a", "delegation_stack": [] });
        let result = run(
            &d,
            &user,
            &request,
            "delegate_to_team_member",
            json!({
                "agent_id": "agent-b",
                "task_description": "collect sources",
                "context_messages": ["prior note"],
            }),
        )
        .await;
        assert!(!result.is_error());
        assert!(result.content.contains("AGENT-B did: collect sources"));
        assert!(result.content.contains("context: prior note"));
    }

    #[tokio::test]
    async fn cycle_in_request_stack_yields_error_result() {
        let (d, user) = dispatcher().await;
        let request = json!({
            "current_agent_id": "agent-a",
            "delegation_stack": ["agent-a"],
        });
        let result = run(
            &d,
            &user,
            &request,
            "delegate_to_team_member",
            json!({ "agent_id": "agent-a", "task_description": "loop" }),
        )
        .await;
        assert!(result.is_error());
        assert!(result.content.contains("delegation chain"));
    }

    #[tokio::test]
    async fn missing_current_agent_yields_error_result() {
        let (d, user) = dispatcher().await;
        let request = json!({});
        let result = run(
            &d,
            &user,
            &request,
            "delegate_to_team_member",
            json!({ "agent_id": "agent-b", "task_description": "x" }),
        )
        .await;
        assert!(result.is_error());
        assert!(result.content.contains("current agent"));
    }

    #[tokio::test]
    async fn by_role_tool_resolves_the_role() {
        let (d, user) = dispatcher().await;
        let request = json!({ "current_agent_id": "agent-a", "delegation_stack": [] });
        let result = run(
            &d,
            &user,
            &request,
            "delegate_to_team_member_by_role",
            json!({ "role": "researcher", "task_description": "survey" }),
        )
        .await;
        assert!(!result.is_error());
        assert!(result.content.contains("AGENT-B"));
    }
}
