// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use relay_convo::{ConversationManager, ConvoError, ToolKind};
use relay_store::User;

/// A single tool invocation requested by the model.
#[derive(Debug, Clone)]
pub struct ToolCall {
    /// Opaque identifier returned by the model (forwarded verbatim).
    pub id: String,
    pub name: String,
    /// Parsed JSON arguments.
    pub args: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, args: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            args,
        }
    }
}

/// Terminal state of a tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Success,
    Error,
    /// Human-in-the-loop: the caller must resolve this in a later turn.
    Pending,
    /// An async upstream run; poll via the handle in `data`.
    InProgress,
}

/// The result of executing a tool, appended to the transcript verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub status: ToolStatus,
    pub name: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl ToolResult {
    pub fn success(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Success,
            name: name.into(),
            content: content.into(),
            data: None,
            role: None,
        }
    }

    pub fn error(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Error,
            name: name.into(),
            content: content.into(),
            data: None,
            role: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn is_error(&self) -> bool {
        self.status == ToolStatus::Error
    }

    pub fn is_pending(&self) -> bool {
        self.status == ToolStatus::Pending
    }

    /// JSON view used by workflow output references (`$var.path`).
    pub fn to_value(&self) -> Value {
        json!({
            "status": self.status,
            "name": self.name,
            "content": self.content,
            "data": self.data.clone().unwrap_or(Value::Null),
        })
    }
}

/// Dispatch failures that precede tool execution.  Tool-internal failures
/// are expressed as `ToolResult { status: Error }`, not as `ToolError`.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    NotFound(String),

    #[error("tool {0} requires the pro plan")]
    PremiumRequired(String),

    #[error(transparent)]
    Quota(#[from] ConvoError),

    #[error("invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("mcp routing failed: {0}")]
    Mcp(String),
}

/// Recursive dispatch seam handed to every tool.  Workflow tools use it to
/// run their steps through the same premium/quota gates as direct calls.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn invoke(&self, ctx: &ToolContext<'_>, call: &ToolCall) -> Result<ToolResult, ToolError>;
}

/// Per-request execution context threaded through tool calls.  Everything a
/// tool may need lives here as an explicit handle; there is no ambient
/// process state.
pub struct ToolContext<'a> {
    pub completion_id: &'a str,
    pub user: Option<&'a User>,
    pub app_url: Option<&'a str>,
    /// The raw incoming request body, for tools that inspect it.
    pub request: &'a Value,
    pub conversation: Option<&'a ConversationManager>,
    pub invoker: &'a dyn ToolInvoker,
}

/// A registered tool.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    /// JSON Schema for the arguments object.
    fn parameters_schema(&self) -> Value;
    /// Pricing class; premium tools require the pro plan.
    fn kind(&self) -> ToolKind {
        ToolKind::Normal
    }
    /// Per-call cost charged to the monthly usage ledger.
    fn cost_per_call(&self) -> f64 {
        0.0
    }
    /// Included in the default tool set surfaced to the model.
    fn is_default(&self) -> bool {
        false
    }
    /// Request strict schema validation from providers that support it.
    fn strict(&self) -> bool {
        false
    }
    /// Execute the tool.  Failures are expressed via [`ToolResult::error`].
    async fn execute(&self, ctx: &ToolContext<'_>, call: &ToolCall) -> ToolResult;
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
