// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: MIT
//! Shared implementation for OpenAI-compatible chat completion APIs.
//!
//! Nearly every hosted provider relay talks to speaks the same
//! `/chat/completions` wire format (natively or through a compatibility
//! endpoint), so a single configurable implementation serves them all:
//! each driver supplies its own base URL, auth style, and extra headers.
//!
//! # Auth styles
//! - `Bearer` – `Authorization: Bearer <key>` (most providers)
//! - `ApiKeyHeader` – `api-key: <key>`
//! - `None` – no authentication (local or edge-internal endpoints)

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};
use tracing::debug;

use crate::{
    chat::ResponseStream, ChatMessage, ChatProvider, ChatRequest, MessageContent, ProviderError,
    ResponseEvent, Role, Usage,
};

/// How to send the API key in HTTP requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStyle {
    Bearer,
    ApiKeyHeader,
    None,
}

/// OpenAI-compatible chat completion provider.
pub struct OpenAiCompatChat {
    driver_name: String,
    model: String,
    api_key: Option<String>,
    chat_url: String,
    auth_style: AuthStyle,
    extra_headers: Vec<(String, String)>,
    client: reqwest::Client,
}

impl OpenAiCompatChat {
    pub fn new(
        driver_name: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        base_url: &str,
        auth_style: AuthStyle,
        extra_headers: Vec<(String, String)>,
    ) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            driver_name: driver_name.into(),
            model: model.into(),
            api_key,
            chat_url: format!("{base}/chat/completions"),
            auth_style,
            extra_headers,
            client: reqwest::Client::new(),
        }
    }

    fn apply_auth(&self, mut req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(key) = &self.api_key {
            req = match self.auth_style {
                AuthStyle::Bearer => req.bearer_auth(key),
                AuthStyle::ApiKeyHeader => req.header("api-key", key),
                AuthStyle::None => req,
            };
        }
        for (name, value) in &self.extra_headers {
            req = req.header(name.as_str(), value.as_str());
        }
        req
    }

    fn build_body(&self, req: &ChatRequest) -> Value {
        let messages: Vec<Value> = req.messages.iter().map(wire_message).collect();
        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "stream": req.stream,
        });
        if !req.tools.is_empty() {
            body["tools"] = Value::Array(
                req.tools
                    .iter()
                    .map(|t| {
                        json!({
                            "type": "function",
                            "function": {
                                "name": t.name,
                                "description": t.description,
                                "parameters": t.parameters,
                            }
                        })
                    })
                    .collect(),
            );
        }
        if let Some(t) = req.settings.temperature {
            body["temperature"] = json!(t);
        }
        if let Some(p) = req.settings.top_p {
            body["top_p"] = json!(p);
        }
        if let Some(m) = req.settings.max_tokens {
            body["max_tokens"] = json!(m);
        }
        body
    }
}

fn wire_message(m: &ChatMessage) -> Value {
    let role = match m.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    };
    let mut out = json!({ "role": role });
    match &m.content {
        MessageContent::Text(t) => out["content"] = json!(t),
        MessageContent::Parts(parts) => {
            out["content"] = Value::Array(
                parts
                    .iter()
                    .map(|p| match p {
                        crate::ContentPart::Text { text } => {
                            json!({ "type": "text", "text": text })
                        }
                        crate::ContentPart::Image { image_url } => {
                            json!({ "type": "image_url", "image_url": { "url": image_url } })
                        }
                        crate::ContentPart::Document { document_url } => {
                            json!({ "type": "file", "file": { "url": document_url } })
                        }
                    })
                    .collect(),
            )
        }
    }
    if let Some(id) = &m.tool_call_id {
        out["tool_call_id"] = json!(id);
    }
    if let Some(calls) = &m.tool_calls {
        out["tool_calls"] = Value::Array(
            calls
                .iter()
                .map(|c| {
                    json!({
                        "id": c.id,
                        "type": "function",
                        "function": { "name": c.name, "arguments": c.arguments },
                    })
                })
                .collect(),
        );
    }
    if let Some(name) = &m.name {
        out["name"] = json!(name);
    }
    out
}

/// Parse one non-streaming response body into events.
fn events_from_body(body: &Value) -> Vec<ResponseEvent> {
    let mut events = Vec::new();
    if let Some(choice) = body["choices"].get(0) {
        let message = &choice["message"];
        if let Some(text) = message["content"].as_str() {
            if !text.is_empty() {
                events.push(ResponseEvent::TextDelta(text.to_string()));
            }
        }
        if let Some(calls) = message["tool_calls"].as_array() {
            for call in calls {
                events.push(ResponseEvent::ToolCall {
                    id: call["id"].as_str().unwrap_or_default().to_string(),
                    name: call["function"]["name"].as_str().unwrap_or_default().to_string(),
                    arguments: call["function"]["arguments"]
                        .as_str()
                        .unwrap_or_default()
                        .to_string(),
                });
            }
        }
    }
    if let Some(usage) = body.get("usage").filter(|u| !u.is_null()) {
        events.push(ResponseEvent::Usage(Usage {
            input_tokens: usage["prompt_tokens"].as_u64().unwrap_or(0) as u32,
            output_tokens: usage["completion_tokens"].as_u64().unwrap_or(0) as u32,
        }));
    }
    events.push(ResponseEvent::Meta {
        log_id: body["id"].as_str().map(str::to_string),
        system_fingerprint: body["system_fingerprint"].as_str().map(str::to_string),
    });
    events.push(ResponseEvent::Done);
    events
}

/// Parse one SSE `data:` payload into zero or more events.
fn events_from_chunk(chunk: &Value) -> Vec<ResponseEvent> {
    let mut events = Vec::new();
    if let Some(choice) = chunk["choices"].get(0) {
        let delta = &choice["delta"];
        if let Some(text) = delta["content"].as_str() {
            if !text.is_empty() {
                events.push(ResponseEvent::TextDelta(text.to_string()));
            }
        }
        if let Some(calls) = delta["tool_calls"].as_array() {
            for call in calls {
                events.push(ResponseEvent::ToolCall {
                    id: call["id"].as_str().unwrap_or_default().to_string(),
                    name: call["function"]["name"].as_str().unwrap_or_default().to_string(),
                    arguments: call["function"]["arguments"]
                        .as_str()
                        .unwrap_or_default()
                        .to_string(),
                });
            }
        }
    }
    if let Some(usage) = chunk.get("usage").filter(|u| !u.is_null()) {
        events.push(ResponseEvent::Usage(Usage {
            input_tokens: usage["prompt_tokens"].as_u64().unwrap_or(0) as u32,
            output_tokens: usage["completion_tokens"].as_u64().unwrap_or(0) as u32,
        }));
    }
    events
}

#[async_trait]
impl ChatProvider for OpenAiCompatChat {
    fn name(&self) -> &str {
        &self.driver_name
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, req: ChatRequest) -> Result<ResponseStream, ProviderError> {
        let body = self.build_body(&req);
        debug!(provider = %self.driver_name, model = %self.model, stream = req.stream, "chat completion");

        let http = self
            .apply_auth(self.client.post(&self.chat_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network {
                provider: self.driver_name.clone(),
                message: e.to_string(),
            })?;

        let status = http.status();
        if !status.is_success() {
            let message = http.text().await.unwrap_or_default();
            return Err(ProviderError::Upstream {
                provider: self.driver_name.clone(),
                status: status.as_u16(),
                message,
            });
        }

        if !req.stream {
            let parsed: Value = http.json().await.map_err(|e| ProviderError::Network {
                provider: self.driver_name.clone(),
                message: e.to_string(),
            })?;
            let events = events_from_body(&parsed);
            return Ok(Box::pin(futures::stream::iter(
                events.into_iter().map(Ok),
            )));
        }

        // SSE events can be split across TCP packets.  Maintain a line
        // buffer across chunks; emit events only for complete lines.
        let byte_stream = http.bytes_stream();
        let event_stream = byte_stream
            .scan(String::new(), |buf, chunk| {
                let events: Vec<anyhow::Result<ResponseEvent>> = match chunk {
                    Ok(b) => {
                        buf.push_str(&String::from_utf8_lossy(&b));
                        drain_complete_sse_lines(buf)
                    }
                    Err(e) => vec![Err(anyhow::anyhow!(e))],
                };
                std::future::ready(Some(events))
            })
            .flat_map(futures::stream::iter);
        Ok(Box::pin(event_stream))
    }
}

/// Drain every complete line from `buf`, parsing SSE `data:` payloads.
/// `[DONE]` maps to [`ResponseEvent::Done`]; other lines are ignored.
fn drain_complete_sse_lines(buf: &mut String) -> Vec<anyhow::Result<ResponseEvent>> {
    let mut events = Vec::new();
    while let Some(pos) = buf.find('\n') {
        let line = buf[..pos].trim().to_string();
        buf.drain(..=pos);
        let Some(data) = line.strip_prefix("data:") else {
            continue;
        };
        let data = data.trim();
        if data.is_empty() {
            continue;
        }
        if data == "[DONE]" {
            events.push(Ok(ResponseEvent::Done));
            continue;
        }
        match serde_json::from_str::<Value>(data) {
            Ok(parsed) => events.extend(events_from_chunk(&parsed).into_iter().map(Ok)),
            Err(e) => events.push(Ok(ResponseEvent::Error(format!("bad SSE chunk: {e}")))),
        }
    }
    events
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
