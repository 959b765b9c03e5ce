// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};

use crate::{Tool, ToolCall, ToolContext, ToolResult};

use super::{parse_step, run_step};

pub const MAX_PARALLEL_TASKS: usize = 8;

/// Run independent tool calls concurrently, bounded to
/// [`MAX_PARALLEL_TASKS`] in flight.  All tasks are awaited; the combined
/// status is `error` iff any task failed.
pub struct ParallelExecuteTool;

#[async_trait]
impl Tool for ParallelExecuteTool {
    fn name(&self) -> &str {
        "parallel_execute"
    }

    fn description(&self) -> &str {
        "Run up to 8 independent tools concurrently and collect all results."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "tasks": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "function": { "type": "string" },
                            "args": { "type": "object" }
                        },
                        "required": ["function"]
                    }
                }
            },
            "required": ["tasks"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, ctx: &ToolContext<'_>, call: &ToolCall) -> ToolResult {
        let Some(tasks) = call.args.get("tasks").and_then(|t| t.as_array()) else {
            return ToolResult::error(self.name(), "missing 'tasks' array");
        };
        if tasks.is_empty() {
            return ToolResult::error(self.name(), "'tasks' is empty");
        }
        if tasks.len() > MAX_PARALLEL_TASKS {
            return ToolResult::error(
                self.name(),
                format!("too many tasks: {} (max {MAX_PARALLEL_TASKS})", tasks.len()),
            );
        }

        let steps: Result<Vec<_>, String> = tasks.iter().map(parse_step).collect();
        let steps = match steps {
            Ok(s) => s,
            Err(e) => return ToolResult::error(self.name(), e),
        };

        // Ordered fan-out with a concurrency bound; results keep task order.
        let results: Vec<ToolResult> = futures::stream::iter(steps)
            .map(|step| async move { run_step(ctx, &step.function, step.args).await })
            .buffered(MAX_PARALLEL_TASKS)
            .collect()
            .await;

        let failures: Vec<&ToolResult> = results.iter().filter(|r| r.is_error()).collect();
        let summary = format!(
            "{} succeeded, {} failed",
            results.len() - failures.len(),
            failures.len()
        );
        let data = json!({
            "results": results.iter().map(|r| r.to_value()).collect::<Vec<_>>(),
            "errors": failures.iter().map(|r| r.content.clone()).collect::<Vec<_>>(),
        });

        if failures.is_empty() {
            ToolResult::success(self.name(), summary).with_data(data)
        } else {
            ToolResult::error(self.name(), summary).with_data(data)
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
