// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! The chat pipeline: validate → prepare → usage check → augment → invoke
//! → guardrails → tool loop → persist.
//!
//! Degradation points are deliberate and local: routing falls back to the
//! default model, augmentation falls back to the raw query, guardrail
//! violations substitute the safe response, and accounting failures are
//! swallowed.  Everything else terminates the request with a typed error.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, error, warn};
use uuid::Uuid;

use relay_catalog::{filter_models_for_user_access, get_model_config_by_matching_model};
use relay_config::Config;
use relay_convo::ConversationManager;
use relay_metrics::{emit, Metric, MetricStatus, MetricType, MetricsSink};
use relay_provider::{
    collect_response, complete_chat, record_usage, resolve_chat_target, track_provider_metrics,
    ChatMessage, ChatProvider, ChatRequest, ChatTarget, ContentPart, ProviderCall, ProviderEnv,
    Role, SamplingSettings, ToolCallRequest,
};
use relay_retrieval::{augment_prompt, AugmentDeps, AugmentOptions, EmbeddingService};
use relay_router::{analyze_prompt, select_model};
use relay_store::{Cache, MessageRecord, MessageRole, Repository, StoredContent};
use relay_tools::{
    mcp::McpRegistry, Dispatcher, ToolCall, ToolContext, ToolError, ToolRegistry, ToolResult,
};

use crate::{
    guardrails::Guardrails, AssistantReply, ChatCompletionRequest, ChatCompletionResponse,
    ChatError, IncomingMessage,
};

const ALLOWED_ATTACHMENT_KINDS: &[&str] = &["image", "document", "audio"];

pub struct ChatOrchestrator {
    pub(crate) repo: Arc<dyn Repository>,
    pub(crate) cache: Arc<dyn Cache>,
    pub(crate) cfg: Config,
    pub(crate) env: ProviderEnv,
    pub(crate) sink: Option<Arc<dyn MetricsSink>>,
    pub(crate) retrieval: Option<Arc<dyn EmbeddingService>>,
    pub(crate) auxiliary: Arc<dyn ChatProvider>,
    pub(crate) registry: Arc<ToolRegistry>,
    pub(crate) mcp: Arc<McpRegistry>,
    pub(crate) guardrails: Arc<dyn Guardrails>,
    /// Test/CLI injection point: bypass the provider factories entirely.
    pub(crate) chat_override: Option<Arc<dyn ChatProvider>>,
}

impl ChatOrchestrator {
    /// Run one chat completion end to end.
    pub async fn complete(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ChatError> {
        validate(&request)?;

        let completion_id = if request.completion_id.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            request.completion_id.clone()
        };

        let manager = ConversationManager::new(
            self.repo.clone(),
            self.cfg.limits.clone(),
            request.user.clone(),
            request.store,
        );

        manager.check_usage_limits(None).await?;

        let target = self.resolve_target(&request).await;
        debug!(model = %target.model, provider = %target.provider, explicit = target.explicit, "chat target");

        let mut transcript = self.build_transcript(&request).await;
        let schemas = self.registry.schemas_for(request.tools.as_deref());

        let dispatcher = Dispatcher::new(self.registry.clone(), self.mcp.clone());
        let request_value = request.as_value();
        let supports_streaming = get_model_config_by_matching_model(&*self.cache, &target.model)
            .await
            .map(|d| d.supports_streaming)
            .unwrap_or(false);

        let mut tool_responses: Vec<ToolResult> = Vec::new();
        let mut served = target.clone();
        let mut reply = AssistantReply::default();
        let mut rounds = 0usize;

        loop {
            let chat_request = ChatRequest {
                messages: transcript.clone(),
                tools: schemas.clone(),
                stream: supports_streaming,
                settings: SamplingSettings::default(),
            };
            let (response, used) = self
                .invoke_model(&served, chat_request, &completion_id, request.user.as_ref())
                .await?;
            served = used;

            if response.tool_calls.is_empty() || rounds >= self.cfg.limits.max_tool_rounds {
                if !response.tool_calls.is_empty() {
                    warn!(rounds, "tool round bound reached; returning unresolved calls");
                }
                reply = AssistantReply {
                    content: response.content,
                    tool_calls: response.tool_calls,
                    usage: response.usage,
                    log_id: response.log_id,
                    system_fingerprint: response.system_fingerprint,
                };
                break;
            }
            rounds += 1;

            // Record the assistant's tool request in the transcript.
            transcript.push(assistant_tool_call_message(&response.content, &response.tool_calls));

            let mut pending = false;
            for call in &response.tool_calls {
                let result = self
                    .run_tool(&dispatcher, &manager, &request, &request_value, &completion_id, call)
                    .await?;
                transcript.push(ChatMessage::tool_result(
                    call.id.clone(),
                    tool_result_text(&result),
                ));
                if result.is_pending() {
                    pending = true;
                }
                tool_responses.push(result);
            }

            if pending {
                // Human-in-the-loop: stop here; the resolution arrives as a
                // `tool` message in a later turn bound by the tool-call id.
                reply = AssistantReply {
                    content: response.content,
                    tool_calls: response.tool_calls,
                    usage: response.usage,
                    log_id: response.log_id,
                    system_fingerprint: response.system_fingerprint,
                };
                break;
            }
        }

        // Guardrails: violations become the safe templated response.
        if let Some(violation) = self.guardrails.check(&reply.content) {
            emit(
                self.sink.as_deref(),
                Metric::new(MetricType::Guardrail, "guardrail.violation", 1.0)
                    .with_status(MetricStatus::Error)
                    .with_trace_id(completion_id.clone())
                    .with_metadata(json!({ "reason": violation.reason })),
            );
            warn!(reason = %violation.reason, "guardrail violation; substituting safe response");
            reply.content = self.guardrails.safe_response();
        }

        if request.user.is_some() && request.store {
            self.persist_turn(&manager, &completion_id, &request, &reply, &tool_responses, &served)
                .await?;
        }
        manager.increment_usage_by_model(&served.model).await;

        Ok(ChatCompletionResponse {
            response: reply,
            tool_responses,
            selected_model: served.model.clone(),
            completion_id,
        })
    }

    /// Explicit model/provider wins; otherwise analyse and route.  Routing
    /// never fails the request: every error path lands on the default model.
    async fn resolve_target(&self, request: &ChatCompletionRequest) -> ChatTarget {
        if request.model.is_some() || request.provider.is_some() {
            return resolve_chat_target(
                &self.env,
                &*self.cache,
                request.model.as_deref(),
                request.provider.as_deref(),
                &self.cfg.router.default_model,
            )
            .await;
        }

        let selected = self.route(request).await;
        let provider = get_model_config_by_matching_model(&*self.cache, &selected)
            .await
            .map(|d| d.provider)
            .unwrap_or_else(|| self.env.cfg.default_chat.clone());
        ChatTarget {
            provider,
            model: selected,
            explicit: false,
        }
    }

    async fn route(&self, request: &ChatCompletionRequest) -> String {
        let prompt = request.last_user_text().unwrap_or_default();
        let tool_names = self.registry.names();
        let requirements = match analyze_prompt(
            self.auxiliary.as_ref(),
            prompt,
            &request.attachments,
            request.budget_constraint,
            &tool_names,
        )
        .await
        {
            Ok(r) => r,
            Err(e) => {
                error!(error = %e, "prompt analysis failed; routing to default model");
                return self.cfg.router.default_model.clone();
            }
        };

        let models = filter_models_for_user_access(
            &self.cfg.providers,
            &*self.repo,
            &*self.cache,
            request.user.as_ref().map(|u| u.id),
        )
        .await;
        select_model(&models, &requirements, &self.cfg.router)
    }

    async fn build_transcript(&self, request: &ChatCompletionRequest) -> Vec<ChatMessage> {
        let mut transcript = Vec::with_capacity(request.messages.len() + 1);
        let system = request.system_prompt.clone().unwrap_or_else(|| {
            "You are a helpful assistant. Use the available tools when they \
             produce a better answer than recall alone."
                .to_string()
        });
        transcript.push(ChatMessage::system(system));

        let last_user_index = request
            .messages
            .iter()
            .rposition(|m| m.role == Role::User);

        for (index, message) in request.messages.iter().enumerate() {
            let is_final_user = Some(index) == last_user_index;
            transcript.push(self.convert_message(request, message, is_final_user).await);
        }
        transcript
    }

    /// Convert one incoming message; the final user message receives the
    /// retrieval rewrite and the request attachments.
    async fn convert_message(
        &self,
        request: &ChatCompletionRequest,
        message: &IncomingMessage,
        is_final_user: bool,
    ) -> ChatMessage {
        match message.role {
            Role::Tool => ChatMessage::tool_result(
                message.tool_call_id.clone().unwrap_or_default(),
                message.content.clone(),
            ),
            Role::User if is_final_user => {
                let mut text = message.content.clone();
                if request.use_rag {
                    if let Some(retrieval) = &self.retrieval {
                        let deps = AugmentDeps {
                            service: retrieval.as_ref(),
                            auxiliary: self.auxiliary.as_ref(),
                            cfg: &self.cfg.retrieval,
                        };
                        let options = AugmentOptions {
                            namespace: request.rag_namespace.clone(),
                            ..AugmentOptions::default()
                        };
                        text = augment_prompt(
                            &text,
                            &options,
                            &deps,
                            request.user.as_ref().map(|u| u.id),
                        )
                        .await;
                    }
                }
                let mut parts = vec![ContentPart::text(text)];
                for attachment in &request.attachments {
                    match attachment.kind.as_str() {
                        "image" => parts.push(ContentPart::image(attachment.url.clone())),
                        "document" => parts.push(ContentPart::document(attachment.url.clone())),
                        _ => {}
                    }
                }
                ChatMessage::user_with_parts(parts)
            }
            Role::User => ChatMessage::user(message.content.clone()),
            Role::Assistant => ChatMessage::assistant(message.content.clone()),
            Role::System => ChatMessage::system(message.content.clone()),
        }
    }

    async fn invoke_model(
        &self,
        target: &ChatTarget,
        chat_request: ChatRequest,
        completion_id: &str,
        user: Option<&relay_store::User>,
    ) -> Result<(relay_provider::ChatResponse, ChatTarget), ChatError> {
        let call = ProviderCall {
            provider: target.provider.clone(),
            model: target.model.clone(),
            operation: "chat".into(),
            user_id: user.map(|u| u.id),
            completion_id: Some(completion_id.to_string()),
            settings: chat_request.settings.clone(),
        };

        let outcome = track_provider_metrics(&call, self.sink.as_deref(), async {
            if let Some(provider) = &self.chat_override {
                let stream = provider.complete(chat_request).await?;
                Ok((stream, target.clone()))
            } else {
                complete_chat(&self.env, target, chat_request).await
            }
        })
        .await;

        let (stream, served) = outcome.map_err(ChatError::from)?;
        let response = collect_response(stream)
            .await
            .map_err(|e| ChatError::UpstreamTransient(e.to_string()))?;
        if let Some(usage) = response.usage {
            record_usage(&call, self.sink.as_deref(), usage);
        }
        Ok((response, served))
    }

    /// Dispatch one tool call.  Authorisation failures terminate the
    /// request; execution failures become error results the model can see.
    async fn run_tool(
        &self,
        dispatcher: &Dispatcher,
        manager: &ConversationManager,
        request: &ChatCompletionRequest,
        request_value: &Value,
        completion_id: &str,
        call: &ToolCallRequest,
    ) -> Result<ToolResult, ChatError> {
        let args: Value = if call.arguments.trim().is_empty() {
            json!({})
        } else {
            serde_json::from_str(&call.arguments).unwrap_or_else(|_| json!({}))
        };
        let ctx = ToolContext {
            completion_id,
            user: request.user.as_ref(),
            app_url: request.app_url.as_deref(),
            request: request_value,
            conversation: Some(manager),
            invoker: dispatcher,
        };
        let tool_call = ToolCall::new(call.id.clone(), call.name.clone(), args);
        match dispatcher.dispatch(&ctx, &tool_call).await {
            Ok(result) => Ok(result),
            Err(e @ ToolError::Quota(_)) => Err(e.into()),
            Err(e @ ToolError::PremiumRequired(_)) => Err(e.into()),
            Err(e) => Ok(ToolResult::error(call.name.clone(), e.to_string())),
        }
    }

    async fn persist_turn(
        &self,
        manager: &ConversationManager,
        completion_id: &str,
        request: &ChatCompletionRequest,
        reply: &AssistantReply,
        tool_responses: &[ToolResult],
        served: &ChatTarget,
    ) -> Result<(), ChatError> {
        let user_text = request.last_user_text().unwrap_or_default().to_string();
        let user_message = manager
            .add(completion_id, new_record(MessageRole::User, StoredContent::Text(user_text)))
            .await?;

        for result in tool_responses {
            let mut record = new_record(
                MessageRole::Tool,
                StoredContent::Text(result.content.clone()),
            );
            record.parent_message_id = Some(user_message.id.clone());
            record.name = Some(result.name.clone());
            record.status = Some(
                serde_json::to_value(result.status)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_default(),
            );
            record.data = result.data.clone();
            manager.add(completion_id, record).await?;
        }

        let mut assistant = new_record(
            MessageRole::Assistant,
            StoredContent::Text(reply.content.clone()),
        );
        assistant.parent_message_id = Some(user_message.id.clone());
        assistant.model = Some(served.model.clone());
        assistant.log_id = reply.log_id.clone();
        assistant.usage = reply
            .usage
            .and_then(|u| serde_json::to_value(u).ok());
        assistant.status = Some("completed".into());
        if !reply.tool_calls.is_empty() {
            assistant.tool_calls = serde_json::to_value(&reply.tool_calls).ok();
        }
        manager.add(completion_id, assistant).await?;
        Ok(())
    }
}

fn validate(request: &ChatCompletionRequest) -> Result<(), ChatError> {
    if request.messages.is_empty() {
        return Err(ChatError::Validation("messages must not be empty".into()));
    }
    if request
        .messages
        .iter()
        .all(|m| m.content.trim().is_empty())
    {
        return Err(ChatError::Validation("all messages are empty".into()));
    }
    for attachment in &request.attachments {
        if !ALLOWED_ATTACHMENT_KINDS.contains(&attachment.kind.as_str()) {
            return Err(ChatError::Validation(format!(
                "unsupported attachment type: {}",
                attachment.kind
            )));
        }
        if attachment.url.is_empty() {
            return Err(ChatError::Validation("attachment url is empty".into()));
        }
    }
    for message in &request.messages {
        if message.role == Role::Tool && message.tool_call_id.is_none() {
            return Err(ChatError::Validation(
                "tool messages must carry tool_call_id".into(),
            ));
        }
    }
    Ok(())
}

fn new_record(role: MessageRole, content: StoredContent) -> MessageRecord {
    MessageRecord {
        id: String::new(),
        conversation_id: String::new(),
        parent_message_id: None,
        role,
        content,
        name: None,
        tool_calls: None,
        citations: None,
        model: None,
        status: None,
        timestamp: 0,
        platform: "api".into(),
        mode: "chat".into(),
        log_id: None,
        data: None,
        usage: None,
        created_at: 0,
        updated_at: 0,
    }
}

fn assistant_tool_call_message(content: &str, calls: &[ToolCallRequest]) -> ChatMessage {
    ChatMessage {
        role: Role::Assistant,
        content: relay_provider::MessageContent::Text(content.to_string()),
        tool_call_id: None,
        tool_calls: Some(calls.to_vec()),
        name: None,
    }
}

/// Text view of a tool result for the transcript: content plus data when
/// the data adds information the model needs.
fn tool_result_text(result: &ToolResult) -> String {
    match &result.data {
        Some(data) if !data.is_null() => {
            format!("{}\n{}", result.content, data)
        }
        _ => result.content.clone(),
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
