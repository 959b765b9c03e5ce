// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: MIT
use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::{Tool, ToolCall, ToolContext, ToolResult};

use super::{parse_step, resolve_refs, run_step};

pub const MAX_WORKFLOW_STEPS: usize = 20;

/// Execute an ordered list of tool steps, piping outputs into later steps
/// through `$var` references.
pub struct ComposeFunctionsTool;

#[async_trait]
impl Tool for ComposeFunctionsTool {
    fn name(&self) -> &str {
        "compose_functions"
    }

    fn description(&self) -> &str {
        "Run a sequence of tools. Each step may bind its result to an \
         output_var; later steps reference prior results with \"$var\" or \
         {\"$ref\": \"$var.path\"} inside their args. on_error is 'stop' \
         (default) or 'skip'."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "steps": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "function": { "type": "string" },
                            "args": { "type": "object" },
                            "output_var": { "type": "string" },
                            "on_error": { "type": "string", "enum": ["stop", "skip"] }
                        },
                        "required": ["function"]
                    }
                }
            },
            "required": ["steps"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, ctx: &ToolContext<'_>, call: &ToolCall) -> ToolResult {
        let Some(steps) = call.args.get("steps").and_then(|s| s.as_array()) else {
            return ToolResult::error(self.name(), "missing 'steps' array");
        };
        if steps.len() > MAX_WORKFLOW_STEPS {
            return ToolResult::error(
                self.name(),
                format!("too many steps: {} (max {MAX_WORKFLOW_STEPS})", steps.len()),
            );
        }

        let mut outputs: HashMap<String, Value> = HashMap::new();
        let mut log: Vec<Value> = Vec::new();

        for (index, raw) in steps.iter().enumerate() {
            let step = match parse_step(raw) {
                Ok(s) => s,
                Err(e) => return ToolResult::error(self.name(), format!("step {index}: {e}")),
            };
            let on_error_stop = raw
                .get("on_error")
                .and_then(|v| v.as_str())
                .map(|v| v != "skip")
                .unwrap_or(true);

            let args = match resolve_refs(&step.args, &outputs) {
                Ok(a) => a,
                Err(e) => {
                    let entry = json!({
                        "step": index,
                        "function": step.function,
                        "status": "error",
                        "error": format!("reference resolution failed: {e}"),
                    });
                    log.push(entry);
                    if on_error_stop {
                        return ToolResult::error(
                            self.name(),
                            format!("step {index} ({}) failed: {e}", step.function),
                        )
                        .with_data(json!({ "steps": log }));
                    }
                    continue;
                }
            };

            let result = run_step(ctx, &step.function, args).await;
            log.push(json!({
                "step": index,
                "function": step.function,
                "status": result.status,
                "content": result.content,
            }));

            if result.is_error() {
                if on_error_stop {
                    return ToolResult::error(
                        self.name(),
                        format!(
                            "step {index} ({}) failed: {}",
                            step.function, result.content
                        ),
                    )
                    .with_data(json!({ "steps": log }));
                }
                continue;
            }

            if let Some(var) = raw.get("output_var").and_then(|v| v.as_str()) {
                outputs.insert(var.to_string(), result.to_value());
            }
        }

        let last_content = log
            .last()
            .and_then(|entry| entry.get("content"))
            .and_then(|c| c.as_str())
            .unwrap_or_default()
            .to_string();
        ToolResult::success(self.name(), last_content).with_data(json!({
            "steps": log,
            "outputs": outputs,
        }))
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{mcp::McpRegistry, Dispatcher, Tool, ToolError, ToolRegistry};
    use std::sync::{Arc, Mutex};

    /// Records the args each invocation received.
    struct RecordingTool {
        name: &'static str,
        result: ToolResult,
        seen: Arc<Mutex<Vec<Value>>>,
    }

    #[async_trait]
    impl Tool for RecordingTool {
        fn name(&self) -> &str {
            self.name
        }
        fn description(&self) -> &str {
            "test tool"
        }
        fn parameters_schema(&self) -> Value {
            json!({ "type": "object" })
        }
        async fn execute(&self, _ctx: &ToolContext<'_>, call: &ToolCall) -> ToolResult {
            self.seen.lock().unwrap().push(call.args.clone());
            self.result.clone()
        }
    }

    fn dispatcher_with(tools: Vec<RecordingTool>) -> Dispatcher {
        let mut registry = ToolRegistry::new();
        for tool in tools {
            registry.register(tool);
        }
        registry.register(ComposeFunctionsTool);
        Dispatcher::new(Arc::new(registry), Arc::new(McpRegistry::new()))
    }

    async fn run(d: &Dispatcher, args: Value) -> Result<ToolResult, ToolError> {
        let request = json!({});
        let ctx = ToolContext {
            completion_id: "cmp",
            user: None,
            app_url: None,
            request: &request,
            conversation: None,
            invoker: d,
        };
        d.dispatch(&ctx, &ToolCall::new("1", "compose_functions", args))
            .await
    }

    #[tokio::test]
    async fn pipes_output_var_into_later_step() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let d = dispatcher_with(vec![
            RecordingTool {
                name: "search",
                result: ToolResult::success("search", "2 hits")
                    .with_data(json!({"items": ["a", "b"]})),
                seen: Arc::new(Mutex::new(Vec::new())),
            },
            RecordingTool {
                name: "analyze_dataset",
                result: ToolResult::success("analyze_dataset", "analyzed"),
                seen: seen.clone(),
            },
        ]);

        let result = run(
            &d,
            json!({
                "steps": [
                    { "function": "search", "args": {"q": "rust"}, "output_var": "search_results" },
                    { "function": "analyze_dataset", "args": {"data": "$search_results.data"} },
                ]
            }),
        )
        .await
        .unwrap();

        assert!(!result.is_error());
        let analyzed_args = seen.lock().unwrap();
        assert_eq!(
            analyzed_args[0],
            json!({"data": {"items": ["a", "b"]}}),
            "reference must resolve to the bound step's data"
        );
    }

    #[tokio::test]
    async fn stop_on_error_terminates_with_log() {
        let tail = Arc::new(Mutex::new(Vec::new()));
        let d = dispatcher_with(vec![
            RecordingTool {
                name: "boom",
                result: ToolResult::error("boom", "exploded"),
                seen: Arc::new(Mutex::new(Vec::new())),
            },
            RecordingTool {
                name: "after",
                result: ToolResult::success("after", "ran"),
                seen: tail.clone(),
            },
        ]);

        let result = run(
            &d,
            json!({
                "steps": [
                    { "function": "boom" },
                    { "function": "after" },
                ]
            }),
        )
        .await
        .unwrap();

        assert!(result.is_error());
        assert!(result.content.contains("boom"));
        assert!(tail.lock().unwrap().is_empty(), "later steps must not run");
        let log = result.data.unwrap();
        assert_eq!(log["steps"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn skip_on_error_continues() {
        let tail = Arc::new(Mutex::new(Vec::new()));
        let d = dispatcher_with(vec![
            RecordingTool {
                name: "boom",
                result: ToolResult::error("boom", "exploded"),
                seen: Arc::new(Mutex::new(Vec::new())),
            },
            RecordingTool {
                name: "after",
                result: ToolResult::success("after", "ran"),
                seen: tail.clone(),
            },
        ]);

        let result = run(
            &d,
            json!({
                "steps": [
                    { "function": "boom", "on_error": "skip" },
                    { "function": "after" },
                ]
            }),
        )
        .await
        .unwrap();

        assert!(!result.is_error());
        assert_eq!(tail.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unresolved_reference_fails_step() {
        let d = dispatcher_with(vec![RecordingTool {
            name: "consumer",
            result: ToolResult::success("consumer", "ran"),
            seen: Arc::new(Mutex::new(Vec::new())),
        }]);

        let result = run(
            &d,
            json!({
                "steps": [
                    { "function": "consumer", "args": {"data": "$nothing.bound"} },
                ]
            }),
        )
        .await
        .unwrap();
        assert!(result.is_error());
        assert!(result.content.contains("nothing"));
    }

    #[tokio::test]
    async fn step_count_is_bounded() {
        let d = dispatcher_with(vec![]);
        let steps: Vec<Value> = (0..MAX_WORKFLOW_STEPS + 1)
            .map(|_| json!({ "function": "x" }))
            .collect();
        let result = run(&d, json!({ "steps": steps })).await.unwrap();
        assert!(result.is_error());
        assert!(result.content.contains("too many steps"));
    }

    #[tokio::test]
    async fn unknown_step_function_reports_error() {
        let d = dispatcher_with(vec![]);
        let result = run(&d, json!({ "steps": [{ "function": "ghost" }] }))
            .await
            .unwrap();
        assert!(result.is_error());
        assert!(result.content.contains("ghost"));
    }
}
