// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::{Tool, ToolCall, ToolContext, ToolResult};

use super::{parse_step, run_step};

/// Run a condition tool, coerce its output to a boolean, and execute one of
/// two step lists.
pub struct IfThenElseTool;

/// Boolean coercion order: `data.result`, `data.value`, `data.condition`
/// (booleans or the strings "true"/"false"), then the content field.
fn coerce_condition(result: &ToolResult) -> Option<bool> {
    if let Some(data) = &result.data {
        for key in ["result", "value", "condition"] {
            match data.get(key) {
                Some(Value::Bool(b)) => return Some(*b),
                Some(Value::String(s)) if s == "true" => return Some(true),
                Some(Value::String(s)) if s == "false" => return Some(false),
                _ => {}
            }
        }
    }
    match result.content.trim() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

#[async_trait]
impl Tool for IfThenElseTool {
    fn name(&self) -> &str {
        "if_then_else"
    }

    fn description(&self) -> &str {
        "Run a condition tool; when its result coerces to true run \
         then_steps, otherwise else_steps. A condition that cannot be \
         coerced to a boolean fails the whole tool."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "condition": {
                    "type": "object",
                    "properties": {
                        "function": { "type": "string" },
                        "args": { "type": "object" }
                    },
                    "required": ["function"]
                },
                "then_steps": { "type": "array", "items": { "type": "object" } },
                "else_steps": { "type": "array", "items": { "type": "object" } }
            },
            "required": ["condition"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, ctx: &ToolContext<'_>, call: &ToolCall) -> ToolResult {
        let Some(condition_raw) = call.args.get("condition") else {
            return ToolResult::error(self.name(), "missing 'condition'");
        };
        let condition = match parse_step(condition_raw) {
            Ok(s) => s,
            Err(e) => return ToolResult::error(self.name(), format!("condition: {e}")),
        };

        let condition_result = run_step(ctx, &condition.function, condition.args).await;
        if condition_result.is_error() {
            return ToolResult::error(
                self.name(),
                format!("condition tool failed: {}", condition_result.content),
            );
        }
        let Some(branch) = coerce_condition(&condition_result) else {
            return ToolResult::error(
                self.name(),
                format!(
                    "condition result is not a boolean: {}",
                    condition_result.content
                ),
            );
        };

        let steps_key = if branch { "then_steps" } else { "else_steps" };
        let steps = call
            .args
            .get(steps_key)
            .and_then(|s| s.as_array())
            .cloned()
            .unwrap_or_default();

        let mut results: Vec<Value> = Vec::new();
        for (index, raw) in steps.iter().enumerate() {
            let step = match parse_step(raw) {
                Ok(s) => s,
                Err(e) => {
                    return ToolResult::error(self.name(), format!("{steps_key}[{index}]: {e}"))
                }
            };
            let result = run_step(ctx, &step.function, step.args).await;
            let failed = result.is_error();
            results.push(result.to_value());
            if failed {
                return ToolResult::error(
                    self.name(),
                    format!("{steps_key}[{index}] ({}) failed", step.function),
                )
                .with_data(json!({ "branch": branch, "results": results }));
            }
        }

        ToolResult::success(
            self.name(),
            format!("took {} branch ({} steps)", steps_key, results.len()),
        )
        .with_data(json!({ "branch": branch, "results": results }))
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
