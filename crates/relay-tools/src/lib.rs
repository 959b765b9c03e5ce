// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: MIT
//! Tool orchestration: typed descriptors in a flat registry, a dispatcher
//! gating premium access and quotas, MCP routing, and the workflow /
//! recovery meta-tools built on recursive dispatch.

pub mod builtin;
mod dispatcher;
pub mod mcp;
mod registry;
mod tool;
pub mod workflow;

pub use builtin::{GenerateImageTool, ResearchTool, SynthesizeSpeechTool};
pub use dispatcher::Dispatcher;
pub use mcp::{McpClient, McpRegistry, MCP_PREFIX};
pub use registry::ToolRegistry;
pub use tool::{Tool, ToolCall, ToolContext, ToolError, ToolInvoker, ToolResult, ToolStatus};
pub use workflow::register_workflow_tools;
