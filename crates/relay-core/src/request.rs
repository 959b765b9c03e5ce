// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: Apache-2.0
use serde::{Deserialize, Serialize};
use serde_json::Value;

use relay_provider::{Attachment, Role, ToolCallRequest, Usage};
use relay_store::User;
use relay_tools::ToolResult;

/// One incoming transcript message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A chat completion request as received from the transport layer.  The
/// principal in `user` is already authenticated; the core never sees
/// credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    #[serde(default)]
    pub completion_id: String,
    /// Explicit model choice; bypasses the router.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Explicit provider choice, used when no model is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    pub messages: Vec<IncomingMessage>,
    /// Names of tools to surface; `None` surfaces the default set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_agent_id: Option<String>,
    #[serde(default)]
    pub delegation_stack: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_delegation_depth: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_constraint: Option<f64>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Rewrite the final user message with retrieved context.
    #[serde(default)]
    pub use_rag: bool,
    /// Optional vector-store namespace for retrieval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rag_namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Persist the dialogue (`false` for stateless calls).
    #[serde(default = "default_store")]
    pub store: bool,
}

fn default_store() -> bool {
    true
}

impl Default for ChatCompletionRequest {
    fn default() -> Self {
        Self {
            completion_id: String::new(),
            model: None,
            provider: None,
            messages: Vec::new(),
            tools: None,
            user: None,
            app_url: None,
            current_agent_id: None,
            delegation_stack: Vec::new(),
            max_delegation_depth: None,
            budget_constraint: None,
            attachments: Vec::new(),
            use_rag: false,
            rag_namespace: None,
            system_prompt: None,
            // Mirrors the serde default: dialogue persists unless the
            // caller opts out.
            store: true,
        }
    }
}

/// The assistant's reply within a [`ChatCompletionResponse`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssistantReply {
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_fingerprint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    pub response: AssistantReply,
    #[serde(rename = "toolResponses", default, skip_serializing_if = "Vec::is_empty")]
    pub tool_responses: Vec<ToolResult>,
    #[serde(rename = "selectedModel")]
    pub selected_model: String,
    pub completion_id: String,
}

impl ChatCompletionRequest {
    /// The raw request view handed to tools (`ctx.request`).
    pub fn as_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Text of the final user message, if any.
    pub fn last_user_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
