// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: MIT
//! MCP (Model-Context-Protocol) tool routing.
//!
//! External MCP servers expose tools to the assistant through a client
//! registered per agent.  The wire protocol lives outside the core; the
//! registry only routes `mcp_{shortAgentId}_{toolName}` invocations to the
//! matching client.  Registration is insert-only during agent startup, so
//! dispatch reads without locking.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::{ToolError, ToolResult};

/// Prefix marking a tool name as MCP-routed.
pub const MCP_PREFIX: &str = "mcp_";

/// A connected MCP server, bound to one agent.
#[async_trait]
pub trait McpClient: Send + Sync + std::fmt::Debug {
    /// The owning agent's full id.
    fn agent_id(&self) -> &str;
    /// Tool names exposed by the server.
    fn tool_names(&self) -> Vec<String>;
    /// Invoke one tool with JSON arguments.
    async fn call(&self, tool: &str, args: Value) -> Result<ToolResult, ToolError>;
}

/// Insert-only registry of MCP clients.
#[derive(Default)]
pub struct McpRegistry {
    clients: Vec<Arc<dyn McpClient>>,
}

impl McpRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, client: Arc<dyn McpClient>) {
        self.clients.push(client);
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Split an `mcp_{shortAgentId}_{toolName}` call name.
    pub fn parse_name(name: &str) -> Option<(&str, &str)> {
        let rest = name.strip_prefix(MCP_PREFIX)?;
        let (short_id, tool) = rest.split_once('_')?;
        if short_id.is_empty() || tool.is_empty() {
            return None;
        }
        Some((short_id, tool))
    }

    /// Route a call name to `(client, resolved tool name)`.
    ///
    /// The agent is matched by id prefix.  The tool resolves by exact name
    /// first; otherwise a unique substring match within that server wins,
    /// and ambiguity is an error.
    pub fn route(&self, name: &str) -> Result<(Arc<dyn McpClient>, String), ToolError> {
        let (short_id, tool) = Self::parse_name(name)
            .ok_or_else(|| ToolError::Mcp(format!("malformed MCP tool name: {name}")))?;

        let client = self
            .clients
            .iter()
            .find(|c| c.agent_id().starts_with(short_id))
            .cloned()
            .ok_or_else(|| ToolError::Mcp(format!("no MCP agent matches prefix {short_id}")))?;

        let tools = client.tool_names();
        if tools.iter().any(|t| t == tool) {
            return Ok((client, tool.to_string()));
        }
        let substring_matches: Vec<&String> =
            tools.iter().filter(|t| t.contains(tool)).collect();
        match substring_matches.as_slice() {
            [only] => Ok((client.clone(), (*only).clone())),
            [] => Err(ToolError::Mcp(format!(
                "tool {tool} not found on MCP agent {}",
                client.agent_id()
            ))),
            _ => Err(ToolError::Mcp(format!(
                "tool name {tool} is ambiguous on MCP agent {}",
                client.agent_id()
            ))),
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
