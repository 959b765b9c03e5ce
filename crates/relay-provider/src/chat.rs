// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: MIT
use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};

use crate::{ChatRequest, ChatResponse, ProviderError, ResponseEvent};

pub type ResponseStream = Pin<Box<dyn Stream<Item = anyhow::Result<ResponseEvent>> + Send>>;

/// Chat capability surface.  One instance is bound to a single
/// provider/model pair for its lifetime.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Provider id as registered in the driver registry.
    fn name(&self) -> &str;

    /// Model identifier forwarded to the upstream API.
    fn model_name(&self) -> &str;

    /// Send a completion request and return a streaming response.
    ///
    /// Providers that do not stream internally still return a stream with
    /// the full completion as a single batch of events.
    async fn complete(&self, req: ChatRequest) -> Result<ResponseStream, ProviderError>;
}

/// Drain an event stream into an aggregated [`ChatResponse`].
///
/// Tool-call events with the same id are merged (argument deltas are
/// concatenated).  In-stream `Error` events become hard errors only when no
/// text was produced at all; otherwise the partial text survives.
pub async fn collect_response(mut stream: ResponseStream) -> anyhow::Result<ChatResponse> {
    let mut response = ChatResponse::default();
    let mut soft_error: Option<String> = None;

    while let Some(event) = stream.next().await {
        match event? {
            ResponseEvent::TextDelta(t) => response.content.push_str(&t),
            ResponseEvent::ToolCall { id, name, arguments } => {
                match response.tool_calls.iter_mut().find(|c| c.id == id) {
                    Some(existing) => existing.arguments.push_str(&arguments),
                    None => response.tool_calls.push(crate::ToolCallRequest {
                        id,
                        name,
                        arguments,
                    }),
                }
            }
            ResponseEvent::Usage(u) => response.usage = Some(u),
            ResponseEvent::Meta {
                log_id,
                system_fingerprint,
            } => {
                if log_id.is_some() {
                    response.log_id = log_id;
                }
                if system_fingerprint.is_some() {
                    response.system_fingerprint = system_fingerprint;
                }
            }
            ResponseEvent::Error(e) => soft_error = Some(e),
            ResponseEvent::Done => break,
        }
    }

    if response.content.is_empty() && response.tool_calls.is_empty() {
        if let Some(e) = soft_error {
            anyhow::bail!("provider stream failed: {e}");
        }
    }
    Ok(response)
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
