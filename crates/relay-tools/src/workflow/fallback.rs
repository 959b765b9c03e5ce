// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::{Tool, ToolCall, ToolContext, ToolResult};

use super::{parse_step, run_step};

/// Run a primary tool; on failure run a fallback tool.  Succeeds when
/// either succeeds; when both fail the error carries both messages.
pub struct FallbackTool;

#[async_trait]
impl Tool for FallbackTool {
    fn name(&self) -> &str {
        "fallback"
    }

    fn description(&self) -> &str {
        "Run a primary tool and, if it fails, a fallback tool."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "primary": {
                    "type": "object",
                    "properties": {
                        "function": { "type": "string" },
                        "args": { "type": "object" }
                    },
                    "required": ["function"]
                },
                "fallback": {
                    "type": "object",
                    "properties": {
                        "function": { "type": "string" },
                        "args": { "type": "object" }
                    },
                    "required": ["function"]
                }
            },
            "required": ["primary", "fallback"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, ctx: &ToolContext<'_>, call: &ToolCall) -> ToolResult {
        let primary = match call.args.get("primary").ok_or("missing 'primary'").and_then(|v| {
            parse_step(v).map_err(|_| "malformed 'primary'")
        }) {
            Ok(s) => s,
            Err(e) => return ToolResult::error(self.name(), e),
        };
        let fallback = match call.args.get("fallback").ok_or("missing 'fallback'").and_then(|v| {
            parse_step(v).map_err(|_| "malformed 'fallback'")
        }) {
            Ok(s) => s,
            Err(e) => return ToolResult::error(self.name(), e),
        };

        let primary_result = run_step(ctx, &primary.function, primary.args).await;
        if !primary_result.is_error() {
            return ToolResult {
                data: Some(json!({
                    "used": "primary",
                    "result": primary_result.to_value(),
                })),
                ..primary_result
            };
        }

        let fallback_result = run_step(ctx, &fallback.function, fallback.args).await;
        if !fallback_result.is_error() {
            return ToolResult {
                data: Some(json!({
                    "used": "fallback",
                    "primary_error": primary_result.content,
                    "result": fallback_result.to_value(),
                })),
                ..fallback_result
            };
        }

        ToolResult::error(
            self.name(),
            format!(
                "primary ({}) failed: {}; fallback ({}) failed: {}",
                primary.function,
                primary_result.content,
                fallback.function,
                fallback_result.content
            ),
        )
        .with_data(json!({
            "primary_error": primary_result.content,
            "fallback_error": fallback_result.content,
        }))
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
