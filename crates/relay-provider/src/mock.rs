// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: MIT
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream;

use crate::{
    chat::ResponseStream, ChatProvider, ChatRequest, ProviderError, ResponseEvent, Role, Usage,
};

/// Deterministic mock provider for tests.  Echoes the last user message
/// back as the assistant response.
#[derive(Default)]
pub struct EchoChat;

#[async_trait]
impl ChatProvider for EchoChat {
    fn name(&self) -> &str {
        "mock"
    }
    fn model_name(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, req: ChatRequest) -> Result<ResponseStream, ProviderError> {
        let reply = req
            .messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, Role::User))
            .map(|m| m.text())
            .unwrap_or_else(|| "[no input]".into());

        let events: Vec<anyhow::Result<ResponseEvent>> = vec![
            Ok(ResponseEvent::TextDelta(format!("MOCK: {reply}"))),
            Ok(ResponseEvent::Usage(Usage {
                input_tokens: 10,
                output_tokens: 10,
            })),
            Ok(ResponseEvent::Done),
        ];
        Ok(Box::pin(stream::iter(events)))
    }
}

/// A pre-scripted mock provider.  Each call to `complete` pops the next
/// response script from the front of the queue, letting tests specify exact
/// event sequences – including tool calls – without network access.
pub struct ScriptedChat {
    scripts: Arc<Mutex<Vec<Vec<ResponseEvent>>>>,
    name: String,
    model: String,
    /// The last request seen, for assertions on what was sent.
    pub last_request: Arc<Mutex<Option<ChatRequest>>>,
    /// Number of `complete` calls served so far.
    pub calls: Arc<Mutex<usize>>,
}

impl ScriptedChat {
    pub fn new(scripts: Vec<Vec<ResponseEvent>>) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(scripts)),
            name: "mock".into(),
            model: "scripted-mock".into(),
            last_request: Arc::new(Mutex::new(None)),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_identity(mut self, name: impl Into<String>, model: impl Into<String>) -> Self {
        self.name = name.into();
        self.model = model.into();
        self
    }

    /// Convenience: provider that always returns a single text reply.
    pub fn always_text(reply: impl Into<String>) -> Self {
        let r = reply.into();
        Self::new(vec![vec![
            ResponseEvent::TextDelta(r),
            ResponseEvent::Usage(Usage {
                input_tokens: 5,
                output_tokens: 5,
            }),
            ResponseEvent::Done,
        ]])
    }

    /// Convenience: provider that returns a tool call followed by a text reply.
    pub fn tool_then_text(
        tool_id: impl Into<String>,
        tool_name: impl Into<String>,
        args_json: impl Into<String>,
        final_text: impl Into<String>,
    ) -> Self {
        Self::new(vec![
            vec![
                ResponseEvent::ToolCall {
                    id: tool_id.into(),
                    name: tool_name.into(),
                    arguments: args_json.into(),
                },
                ResponseEvent::Done,
            ],
            vec![
                ResponseEvent::TextDelta(final_text.into()),
                ResponseEvent::Done,
            ],
        ])
    }
}

#[async_trait]
impl ChatProvider for ScriptedChat {
    fn name(&self) -> &str {
        &self.name
    }
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, req: ChatRequest) -> Result<ResponseStream, ProviderError> {
        *self.last_request.lock().unwrap() = Some(req);
        *self.calls.lock().unwrap() += 1;
        let events = {
            let mut scripts = self.scripts.lock().unwrap();
            if scripts.is_empty() {
                // Default fallback when all scripts are consumed.
                vec![
                    ResponseEvent::TextDelta("[no more scripts]".into()),
                    ResponseEvent::Done,
                ]
            } else {
                scripts.remove(0)
            }
        };
        let wrapped: Vec<anyhow::Result<ResponseEvent>> = events.into_iter().map(Ok).collect();
        Ok(Box::pin(stream::iter(wrapped)))
    }
}

/// A provider whose first `n` completions fail, for failover tests.
pub struct FlakyChat {
    failures_left: Arc<Mutex<usize>>,
    inner: ScriptedChat,
}

impl FlakyChat {
    pub fn failing(n: usize, then: ScriptedChat) -> Self {
        Self {
            failures_left: Arc::new(Mutex::new(n)),
            inner: then,
        }
    }
}

#[async_trait]
impl ChatProvider for FlakyChat {
    fn name(&self) -> &str {
        self.inner.name()
    }
    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    async fn complete(&self, req: ChatRequest) -> Result<ResponseStream, ProviderError> {
        {
            let mut left = self.failures_left.lock().unwrap();
            if *left > 0 {
                *left -= 1;
                return Err(ProviderError::Upstream {
                    provider: self.inner.name().to_string(),
                    status: 503,
                    message: "synthetic outage".into(),
                });
            }
        }
        self.inner.complete(req).await
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{collect_response, ChatMessage};

    fn req(text: &str) -> ChatRequest {
        ChatRequest {
            messages: vec![ChatMessage::user(text)],
            stream: true,
            ..ChatRequest::default()
        }
    }

    #[tokio::test]
    async fn echo_replies_with_last_user_message() {
        let p = EchoChat;
        let r = collect_response(p.complete(req("hi")).await.unwrap())
            .await
            .unwrap();
        assert_eq!(r.content, "MOCK: hi");
        assert!(r.usage.is_some());
    }

    #[tokio::test]
    async fn scripted_pops_scripts_in_order() {
        let p = ScriptedChat::new(vec![
            vec![ResponseEvent::TextDelta("one".into()), ResponseEvent::Done],
            vec![ResponseEvent::TextDelta("two".into()), ResponseEvent::Done],
        ]);
        let r1 = collect_response(p.complete(req("a")).await.unwrap())
            .await
            .unwrap();
        let r2 = collect_response(p.complete(req("b")).await.unwrap())
            .await
            .unwrap();
        assert_eq!((r1.content.as_str(), r2.content.as_str()), ("one", "two"));
        assert_eq!(*p.calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn scripted_records_last_request() {
        let p = ScriptedChat::always_text("ok");
        p.complete(req("inspect me")).await.unwrap();
        let last = p.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(last.messages[0].text(), "inspect me");
    }

    #[tokio::test]
    async fn scripted_falls_back_when_exhausted() {
        let p = ScriptedChat::new(vec![]);
        let r = collect_response(p.complete(req("x")).await.unwrap())
            .await
            .unwrap();
        assert!(r.content.contains("no more scripts"));
    }

    #[tokio::test]
    async fn flaky_fails_then_recovers() {
        let p = FlakyChat::failing(1, ScriptedChat::always_text("recovered"));
        assert!(p.complete(req("x")).await.is_err());
        let r = collect_response(p.complete(req("x")).await.unwrap())
            .await
            .unwrap();
        assert_eq!(r.content, "recovered");
    }
}
