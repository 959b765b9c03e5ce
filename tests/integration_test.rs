// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: MIT
/// End-to-end pipeline tests over the mock provider layer: routing,
/// augmentation, the tool loop, human-in-the-loop pauses, delegation
/// bounds, and persistence.
use std::sync::Arc;

use relay_config::{Config, ProvidersConfig};
use relay_core::{ChatCompletionRequest, ChatError, CoreBuilder, IncomingMessage};
use relay_provider::{
    Attachment, MockEmbedding, ResponseEvent, Role, ScriptedChat, Usage,
};
use relay_retrieval::{EmbeddingService, MemoryVectorStore};
use relay_store::{MemoryRepository, Plan, Repository, User};

fn mock_config() -> Config {
    Config {
        providers: ProvidersConfig {
            default_chat: "mock".into(),
            default_embedding: "mock".into(),
            always_enabled: "workers".into(),
            ..ProvidersConfig::default()
        },
        ..Config::default()
    }
}

fn user_message(text: &str) -> IncomingMessage {
    IncomingMessage {
        role: Role::User,
        content: text.into(),
        tool_call_id: None,
        name: None,
    }
}

fn request(text: &str, user: Option<User>) -> ChatCompletionRequest {
    ChatCompletionRequest {
        completion_id: format!("conv-{}", text.len()),
        messages: vec![user_message(text)],
        user,
        ..ChatCompletionRequest::default()
    }
}

/// An analyzer reply the scripted auxiliary model returns for routing.
const ANALYSIS: &str = r#"{"expectedComplexity": 2, "requiredCapabilities": ["general_knowledge"],
    "estimatedInputTokens": 50, "estimatedOutputTokens": 100,
    "needsFunctions": false, "benefitsFromMultipleModels": false,
    "modelComparisonReason": ""}"#;

fn text_events(text: &str) -> Vec<ResponseEvent> {
    vec![
        ResponseEvent::TextDelta(text.to_string()),
        ResponseEvent::Usage(Usage {
            input_tokens: 5,
            output_tokens: 7,
        }),
        ResponseEvent::Done,
    ]
}

#[tokio::test]
async fn anonymous_turn_routes_and_replies() {
    let core = CoreBuilder::new(mock_config())
        .auxiliary(Arc::new(ScriptedChat::new(vec![vec![
            ResponseEvent::TextDelta(ANALYSIS.into()),
            ResponseEvent::Done,
        ]])))
        .chat_provider(Arc::new(ScriptedChat::always_text("hello there")))
        .build();

    let response = core.complete(request("hi", None)).await.unwrap();
    assert_eq!(response.response.content, "hello there");
    assert!(!response.selected_model.is_empty(), "router must be total");
    assert!(response.tool_responses.is_empty());
}

#[tokio::test]
async fn explicit_model_bypasses_router() {
    // No auxiliary script: analysis would fail, so a successful turn
    // proves the router was never consulted.
    let core = CoreBuilder::new(mock_config())
        .chat_provider(Arc::new(ScriptedChat::always_text("direct")))
        .build();

    let mut req = request("hello", None);
    req.model = Some("gpt-4o".into());
    let response = core.complete(req).await.unwrap();
    assert_eq!(response.selected_model, "gpt-4o");
    assert_eq!(response.response.content, "direct");
}

#[tokio::test]
async fn empty_messages_are_rejected() {
    let core = CoreBuilder::new(mock_config())
        .chat_provider(Arc::new(ScriptedChat::always_text("x")))
        .build();
    let mut req = request("x", None);
    req.messages.clear();
    assert!(matches!(
        core.complete(req).await,
        Err(ChatError::Validation(_))
    ));
}

#[tokio::test]
async fn tool_loop_runs_and_persists() {
    let repo = Arc::new(MemoryRepository::new());
    let chat = Arc::new(ScriptedChat::tool_then_text(
        "call-1",
        "request_approval",
        r#"{"message": "proceed?"}"#,
        "unused",
    ));
    let core = CoreBuilder::new(mock_config())
        .repository(repo.clone())
        .chat_provider(chat)
        .build();

    let user = User::new(9, "u@x.com", Plan::Pro);
    let mut req = request("do the thing", Some(user));
    req.completion_id = "conv-tools".into();
    let response = core.complete(req).await.unwrap();

    // The pending approval pauses the loop and surfaces the HITL payload.
    assert_eq!(response.tool_responses.len(), 1);
    let hitl = &response.tool_responses[0].data.as_ref().unwrap()["humanInTheLoop"];
    assert_eq!(hitl["status"], "pending");
    assert_eq!(hitl["requires_user_action"], true);

    // Persistence: user turn + tool result + assistant message.
    let messages = repo.list_messages("conv-tools").await.unwrap();
    assert_eq!(messages.len(), 3);
    let conversation = repo.get_conversation("conv-tools").await.unwrap();
    assert_eq!(conversation.title, "New Conversation");
    assert_eq!(conversation.owner_user_id, 9);
    assert_eq!(conversation.message_count, 3);
}

#[tokio::test]
async fn tool_results_feed_the_next_round() {
    let chat = Arc::new(ScriptedChat::new(vec![
        vec![
            ResponseEvent::ToolCall {
                id: "c1".into(),
                name: "call_api".into(),
                // Refused by the SSRF guard → error tool result → next round.
                arguments: r#"{"url": "http://127.0.0.1/x"}"#.into(),
            },
            ResponseEvent::Done,
        ],
        text_events("could not reach that service"),
    ]));
    let core = CoreBuilder::new(mock_config())
        .chat_provider(chat.clone())
        .build();

    let response = core.complete(request("call my api", None)).await.unwrap();
    assert_eq!(response.response.content, "could not reach that service");
    assert_eq!(response.tool_responses.len(), 1);
    assert_eq!(
        response.tool_responses[0].content,
        "Private or local network URLs are not allowed"
    );

    // The second model round saw the tool result in its transcript.
    let last = chat.last_request.lock().unwrap().clone().unwrap();
    let texts: Vec<String> = last.messages.iter().map(|m| m.text()).collect();
    assert!(
        texts.iter().any(|t| t.contains("not allowed")),
        "tool result must be appended as a tool message: {texts:?}"
    );
}

#[tokio::test]
async fn delegation_cycle_is_refused_without_nested_turn() {
    let repo = Arc::new(MemoryRepository::new());
    repo.put_agent(relay_store::AgentRecord {
        id: "agent-a".into(),
        user_id: 5,
        name: "A".into(),
        role: "lead".into(),
        description: None,
        model: None,
    })
    .await
    .unwrap();

    let chat = Arc::new(ScriptedChat::new(vec![
        vec![
            ResponseEvent::ToolCall {
                id: "c1".into(),
                name: "delegate_to_team_member".into(),
                arguments: r#"{"agent_id": "agent-a", "task_description": "loop"}"#.into(),
            },
            ResponseEvent::Done,
        ],
        text_events("delegation was refused"),
    ]));
    let core = CoreBuilder::new(mock_config())
        .repository(repo)
        .chat_provider(chat.clone())
        .build();

    let mut req = request("please delegate", Some(User::new(5, "u@x.com", Plan::Pro)));
    req.current_agent_id = Some("agent-a".into());
    req.delegation_stack = vec!["agent-a".into()];
    let response = core.complete(req).await.unwrap();

    assert_eq!(response.tool_responses.len(), 1);
    assert!(response.tool_responses[0].is_error());
    assert!(response.tool_responses[0]
        .content
        .contains("delegation chain"));
    // Exactly the two scripted calls ran: no nested chat invocation.
    assert_eq!(*chat.calls.lock().unwrap(), 2);
}

#[tokio::test]
async fn rag_rewrites_the_final_user_message() {
    let store = MemoryVectorStore::new(Arc::new(MockEmbedding));
    let records = store
        .generate(
            "note",
            "Relay is deployed in the eu-central region",
            "doc-1",
            serde_json::json!({}),
        )
        .await
        .unwrap();
    store.insert(records, "kb").await.unwrap();

    let chat = Arc::new(ScriptedChat::always_text("grounded answer"));
    let mut config = mock_config();
    // Mock embeddings are histogram-based; keep the gate permissive so the
    // test asserts the pipeline shape, not embedding quality.
    config.retrieval.score_threshold = 0.0;
    let core = CoreBuilder::new(config)
        .retrieval(Arc::new(store))
        .chat_provider(chat.clone())
        .auxiliary(Arc::new(ScriptedChat::new(vec![])))
        .build();

    let mut req = request("where is relay deployed in production", None);
    req.model = Some("gpt-4o".into());
    req.use_rag = true;
    core.complete(req).await.unwrap();

    let last = chat.last_request.lock().unwrap().clone().unwrap();
    let final_user = last
        .messages
        .iter()
        .rev()
        .find(|m| matches!(m.role, Role::User))
        .unwrap()
        .text();
    assert!(
        final_user.starts_with("Contexts (JSON array):"),
        "final user message must be augmented: {final_user}"
    );
    assert!(final_user.contains("eu-central"));
}

#[tokio::test]
async fn guardrail_violation_substitutes_safe_response() {
    let mut config = mock_config();
    config.guardrails.deny_patterns = vec!["secret sauce".into()];
    let core = CoreBuilder::new(config)
        .chat_provider(Arc::new(ScriptedChat::always_text(
            "here is the SECRET SAUCE recipe",
        )))
        .build();

    let mut req = request("tell me", None);
    req.model = Some("gpt-4o".into());
    let response = core.complete(req).await.unwrap();
    assert!(!response.response.content.to_lowercase().contains("secret"));
    assert!(!response.response.content.is_empty());
}

#[tokio::test]
async fn free_plan_quota_blocks_before_invoke() {
    let mut config = mock_config();
    config.limits.free_monthly_messages = 0;
    let core = CoreBuilder::new(config)
        .chat_provider(Arc::new(ScriptedChat::always_text("never served")))
        .build();

    let err = core
        .complete(request("hi", Some(User::new(2, "free@x.com", Plan::Free))))
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::QuotaExceeded(_)));
}

#[tokio::test]
async fn image_attachment_reaches_provider_as_part() {
    let chat = Arc::new(ScriptedChat::always_text("a nice photo"));
    let core = CoreBuilder::new(mock_config())
        .chat_provider(chat.clone())
        .build();

    let mut req = request("what is in this image", None);
    req.model = Some("gpt-4o".into());
    req.attachments = vec![Attachment::image("data:image/png;base64,AAAA")];
    core.complete(req).await.unwrap();

    let last = chat.last_request.lock().unwrap().clone().unwrap();
    let has_image_part = last.messages.iter().any(|m| {
        matches!(
            &m.content,
            relay_provider::MessageContent::Parts(parts)
                if parts.iter().any(|p| matches!(p, relay_provider::ContentPart::Image { .. }))
        )
    });
    assert!(has_image_part, "attachment must become an image part");
}

#[tokio::test]
async fn hitl_resolution_arrives_as_tool_message() {
    // Follow-up turn: the client supplies the approval as a tool message
    // bound to the original call id; the pipeline treats it as transcript.
    let chat = Arc::new(ScriptedChat::always_text("continuing after approval"));
    let core = CoreBuilder::new(mock_config())
        .chat_provider(chat.clone())
        .build();

    let mut req = request("continue", None);
    req.model = Some("gpt-4o".into());
    req.messages = vec![
        user_message("do the thing"),
        IncomingMessage {
            role: Role::Tool,
            content: "approved".into(),
            tool_call_id: Some("call-1".into()),
            name: None,
        },
        user_message("continue"),
    ];
    let response = core.complete(req).await.unwrap();
    assert_eq!(response.response.content, "continuing after approval");
}
