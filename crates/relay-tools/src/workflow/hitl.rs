// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: MIT
//! Human-in-the-loop tools.
//!
//! These never block: they return `status = pending` immediately and the
//! orchestrator surfaces the request to the client.  The resolution comes
//! back in a later chat turn as a `role = tool` message bound to the same
//! tool-call id.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::{Tool, ToolCall, ToolContext, ToolResult, ToolStatus};

/// Pause the workflow until a human approves or rejects an action.
pub struct RequestApprovalTool;

#[async_trait]
impl Tool for RequestApprovalTool {
    fn name(&self) -> &str {
        "request_approval"
    }

    fn description(&self) -> &str {
        "Ask the user to approve or reject an action before continuing. \
         Returns a pending result; the user's decision arrives in a \
         follow-up turn."
    }

    fn is_default(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "message": { "type": "string", "description": "What needs approval and why" },
                "options": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Choices offered to the user (default approve/reject)"
                }
            },
            "required": ["message"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, _ctx: &ToolContext<'_>, call: &ToolCall) -> ToolResult {
        let Some(message) = call.args.get("message").and_then(|m| m.as_str()) else {
            return ToolResult::error(self.name(), "missing 'message'");
        };
        let options = call
            .args
            .get("options")
            .cloned()
            .unwrap_or_else(|| json!(["approve", "reject"]));

        ToolResult {
            status: ToolStatus::Pending,
            name: self.name().to_string(),
            content: format!("Approval requested: {message}"),
            data: Some(json!({
                "humanInTheLoop": {
                    "type": "approval",
                    "status": "pending",
                    "requires_user_action": true,
                    "message": message,
                    "options": options,
                    "tool_call_id": call.id,
                }
            })),
            role: None,
        }
    }
}

/// Ask the user a clarifying question mid-workflow.
pub struct AskUserTool;

#[async_trait]
impl Tool for AskUserTool {
    fn name(&self) -> &str {
        "ask_user"
    }

    fn description(&self) -> &str {
        "Ask the user a question and pause until they answer in a \
         follow-up turn."
    }

    fn is_default(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "question": { "type": "string" },
                "suggestions": {
                    "type": "array",
                    "items": { "type": "string" }
                },
                "expected_format": { "type": "string" }
            },
            "required": ["question"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, _ctx: &ToolContext<'_>, call: &ToolCall) -> ToolResult {
        let Some(question) = call.args.get("question").and_then(|q| q.as_str()) else {
            return ToolResult::error(self.name(), "missing 'question'");
        };
        let mut hitl = json!({
            "type": "question",
            "status": "pending",
            "requires_user_action": true,
            "question": question,
            "tool_call_id": call.id,
        });
        if let Some(suggestions) = call.args.get("suggestions") {
            hitl["suggestions"] = suggestions.clone();
        }
        if let Some(format) = call.args.get("expected_format") {
            hitl["expected_format"] = format.clone();
        }

        ToolResult {
            status: ToolStatus::Pending,
            name: self.name().to_string(),
            content: format!("Question for the user: {question}"),
            data: Some(json!({ "humanInTheLoop": hitl })),
            role: None,
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
