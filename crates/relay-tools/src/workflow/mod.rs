// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: MIT
//! Workflow and recovery meta-tools.
//!
//! These are ordinary registered tools that use the dispatcher recursively,
//! so every step passes the same premium/quota gates as a direct call.

mod branch;
mod call_api;
mod compose;
mod fallback;
mod hitl;
mod parallel;
mod refs;
mod retry;

pub use branch::IfThenElseTool;
pub use call_api::CallApiTool;
pub use compose::{ComposeFunctionsTool, MAX_WORKFLOW_STEPS};
pub use fallback::FallbackTool;
pub use hitl::{AskUserTool, RequestApprovalTool};
pub use parallel::{ParallelExecuteTool, MAX_PARALLEL_TASKS};
pub use refs::resolve_refs;
pub use retry::RetryWithBackoffTool;

use serde_json::Value;

use crate::{ToolCall, ToolContext, ToolError, ToolRegistry, ToolResult};

/// Register the full workflow tool set.
pub fn register_workflow_tools(registry: &mut ToolRegistry) {
    registry.register(ComposeFunctionsTool);
    registry.register(IfThenElseTool);
    registry.register(ParallelExecuteTool);
    registry.register(RetryWithBackoffTool);
    registry.register(FallbackTool);
    registry.register(RequestApprovalTool);
    registry.register(AskUserTool);
    registry.register(CallApiTool::default());
}

/// A `{function, args}` step spec as found in workflow arguments.
pub(crate) struct StepSpec {
    pub function: String,
    pub args: Value,
}

pub(crate) fn parse_step(value: &Value) -> Result<StepSpec, String> {
    let function = value
        .get("function")
        .and_then(|f| f.as_str())
        .ok_or("step is missing 'function'")?
        .to_string();
    let args = value.get("args").cloned().unwrap_or(Value::Object(Default::default()));
    Ok(StepSpec { function, args })
}

/// Run one step through the dispatcher, folding dispatch errors into an
/// error result so workflow tools can treat both failure shapes uniformly.
pub(crate) async fn run_step(
    ctx: &ToolContext<'_>,
    function: &str,
    args: Value,
) -> ToolResult {
    let call = ToolCall::new(format!("wf-{function}"), function, args);
    match ctx.invoker.invoke(ctx, &call).await {
        Ok(result) => result,
        Err(e) => ToolResult::error(function, e.to_string()),
    }
}
