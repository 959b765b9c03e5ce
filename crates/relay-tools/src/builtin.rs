// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: MIT
//! Built-in capability tools: deep research and media generation.
//!
//! Each tool owns the provider handle it needs; construction happens at
//! registry build time so execution needs no ambient environment.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use relay_convo::ToolKind;
use relay_provider::{
    ImageProvider, ImageRequest, ResearchOutcome, ResearchProvider, SpeechProvider, SpeechRequest,
};

use crate::{Tool, ToolCall, ToolContext, ToolResult, ToolStatus};

/// Deep research: synchronous for quick lookups, an async poll handle for
/// long runs.
pub struct ResearchTool {
    provider: Arc<dyn ResearchProvider>,
}

impl ResearchTool {
    pub fn new(provider: Arc<dyn ResearchProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Tool for ResearchTool {
    fn name(&self) -> &str {
        "research"
    }

    fn description(&self) -> &str {
        "Run a deep research query. Long runs return an in-progress handle \
         the client polls; short ones return the findings directly."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string" },
                "depth": { "type": "string", "enum": ["quick", "deep"] }
            },
            "required": ["query"],
            "additionalProperties": false
        })
    }

    fn kind(&self) -> ToolKind {
        ToolKind::Premium
    }

    fn cost_per_call(&self) -> f64 {
        1.0
    }

    fn is_default(&self) -> bool {
        true
    }

    async fn execute(&self, _ctx: &ToolContext<'_>, call: &ToolCall) -> ToolResult {
        let Some(query) = call.args.get("query").and_then(|q| q.as_str()) else {
            return ToolResult::error(self.name(), "missing 'query'");
        };
        let depth = call.args.get("depth").and_then(|d| d.as_str());

        match self.provider.begin(query, depth).await {
            Ok(ResearchOutcome::Completed { content, data }) => {
                ToolResult::success(self.name(), content).with_data(data)
            }
            Ok(ResearchOutcome::InProgress(invocation)) => ToolResult {
                status: ToolStatus::InProgress,
                name: self.name().to_string(),
                content: format!("research {} started", invocation.id),
                data: Some(json!({ "asyncInvocation": invocation })),
                role: None,
            },
            Err(e) => ToolResult::error(self.name(), e.to_string()),
        }
    }
}

/// Image generation, priced per call.
pub struct GenerateImageTool {
    provider: Arc<dyn ImageProvider>,
}

impl GenerateImageTool {
    pub fn new(provider: Arc<dyn ImageProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Tool for GenerateImageTool {
    fn name(&self) -> &str {
        "generate_image"
    }

    fn description(&self) -> &str {
        "Generate an image from a text prompt."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "prompt": { "type": "string" },
                "size": { "type": "string" },
                "count": { "type": "integer", "minimum": 1, "maximum": 4 }
            },
            "required": ["prompt"],
            "additionalProperties": false
        })
    }

    fn kind(&self) -> ToolKind {
        ToolKind::Premium
    }

    fn cost_per_call(&self) -> f64 {
        0.5
    }

    fn is_default(&self) -> bool {
        true
    }

    async fn execute(&self, _ctx: &ToolContext<'_>, call: &ToolCall) -> ToolResult {
        let Some(prompt) = call.args.get("prompt").and_then(|p| p.as_str()) else {
            return ToolResult::error(self.name(), "missing 'prompt'");
        };
        let request = ImageRequest {
            prompt: prompt.to_string(),
            size: call
                .args
                .get("size")
                .and_then(|s| s.as_str())
                .map(str::to_string),
            count: call.args.get("count").and_then(|c| c.as_u64()).map(|c| c as u32),
        };
        match self.provider.generate_image(request).await {
            Ok(result) => {
                let content = result
                    .url
                    .clone()
                    .unwrap_or_else(|| "image generated".into());
                ToolResult::success(self.name(), content)
                    .with_data(serde_json::to_value(result).unwrap_or(Value::Null))
            }
            Err(e) => ToolResult::error(self.name(), e.to_string()),
        }
    }
}

/// Text-to-speech synthesis.
pub struct SynthesizeSpeechTool {
    provider: Arc<dyn SpeechProvider>,
}

impl SynthesizeSpeechTool {
    pub fn new(provider: Arc<dyn SpeechProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Tool for SynthesizeSpeechTool {
    fn name(&self) -> &str {
        "synthesize_speech"
    }

    fn description(&self) -> &str {
        "Convert text to spoken audio."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "text": { "type": "string" },
                "voice": { "type": "string" }
            },
            "required": ["text"],
            "additionalProperties": false
        })
    }

    fn kind(&self) -> ToolKind {
        ToolKind::Premium
    }

    fn cost_per_call(&self) -> f64 {
        0.25
    }

    fn is_default(&self) -> bool {
        true
    }

    async fn execute(&self, _ctx: &ToolContext<'_>, call: &ToolCall) -> ToolResult {
        let Some(text) = call.args.get("text").and_then(|t| t.as_str()) else {
            return ToolResult::error(self.name(), "missing 'text'");
        };
        let request = SpeechRequest {
            text: text.to_string(),
            voice: call
                .args
                .get("voice")
                .and_then(|v| v.as_str())
                .map(str::to_string),
        };
        match self.provider.synthesize(request).await {
            Ok(result) => ToolResult::success(self.name(), "speech synthesized")
                .with_data(serde_json::to_value(result).unwrap_or(Value::Null)),
            Err(e) => ToolResult::error(self.name(), e.to_string()),
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
