// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: MIT
use serde::{Deserialize, Serialize};

// ─── Content part types ───────────────────────────────────────────────────────

/// A single content part in a multi-part message.
///
/// Attachments are represented as data URLs (`data:<mime>;base64,<b64>`) or
/// HTTPS URLs for providers that accept remote references.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    Image { image_url: String },
    Document { document_url: String },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn image(image_url: impl Into<String>) -> Self {
        Self::Image {
            image_url: image_url.into(),
        }
    }

    pub fn document(document_url: impl Into<String>) -> Self {
        Self::Document {
            document_url: document_url.into(),
        }
    }
}

/// An attachment on an incoming chat turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Attachment {
    /// `image` | `document` | `audio`
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Attachment {
    pub fn image(url: impl Into<String>) -> Self {
        Self {
            kind: "image".into(),
            url: url.into(),
            name: None,
        }
    }

    pub fn document(url: impl Into<String>) -> Self {
        Self {
            kind: "document".into(),
            url: url.into(),
            name: None,
        }
    }

    pub fn is_image(&self) -> bool {
        self.kind == "image"
    }

    pub fn is_document(&self) -> bool {
        self.kind == "document"
    }
}

// ─── Message types ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// The content of a wire message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// A single message in the provider-facing transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
    /// Present on `role = tool` messages: the id of the call being answered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Present on assistant messages that requested tool calls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallRequest>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(text.into()),
            tool_call_id: None,
            tool_calls: None,
            name: None,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
            tool_call_id: None,
            tool_calls: None,
            name: None,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Text(text.into()),
            tool_call_id: None,
            tool_calls: None,
            name: None,
        }
    }

    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: MessageContent::Text(content.into()),
            tool_call_id: Some(call_id.into()),
            tool_calls: None,
            name: None,
        }
    }

    pub fn user_with_parts(parts: Vec<ContentPart>) -> Self {
        let content = if parts.len() == 1 {
            if let ContentPart::Text { text } = &parts[0] {
                MessageContent::Text(text.clone())
            } else {
                MessageContent::Parts(parts)
            }
        } else {
            MessageContent::Parts(parts)
        };
        Self {
            role: Role::User,
            content,
            tool_call_id: None,
            tool_calls: None,
            name: None,
        }
    }

    /// Plain text view; multi-part content concatenates its text parts.
    pub fn text(&self) -> String {
        match &self.content {
            MessageContent::Text(t) => t.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    /// JSON-encoded argument object, accumulated across stream deltas.
    pub arguments: String,
}

/// A tool schema surfaced to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    /// JSON Schema of the parameters object.
    pub parameters: serde_json::Value,
}

// ─── Requests and streamed responses ──────────────────────────────────────────

/// Sampling settings forwarded to the upstream API and recorded by the
/// provider metrics wrapper.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SamplingSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// Request sent to a chat provider.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolSchema>,
    pub stream: bool,
    pub settings: SamplingSettings,
}

/// Token usage from one completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// A single streamed event from a chat provider.
#[derive(Debug, Clone)]
pub enum ResponseEvent {
    /// A text delta streamed from the model.
    TextDelta(String),
    /// The model wants to call a tool.
    ToolCall {
        id: String,
        name: String,
        arguments: String,
    },
    /// Final usage statistics.
    Usage(Usage),
    /// Upstream bookkeeping surfaced to the caller verbatim.
    Meta {
        log_id: Option<String>,
        system_fingerprint: Option<String>,
    },
    /// The stream finished normally.
    Done,
    /// A recoverable in-stream error (non-fatal warning).
    Error(String),
}

/// A fully-aggregated completion, built from a drained event stream.
#[derive(Debug, Clone, Default)]
pub struct ChatResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCallRequest>,
    pub usage: Option<Usage>,
    pub log_id: Option<String>,
    pub system_fingerprint: Option<String>,
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_has_text() {
        let m = ChatMessage::user("hello");
        assert_eq!(m.role, Role::User);
        assert_eq!(m.text(), "hello");
    }

    #[test]
    fn single_text_part_collapses_to_text() {
        let m = ChatMessage::user_with_parts(vec![ContentPart::text("hi")]);
        assert!(matches!(m.content, MessageContent::Text(_)));
    }

    #[test]
    fn mixed_parts_keep_structure_and_join_text() {
        let m = ChatMessage::user_with_parts(vec![
            ContentPart::text("what is this?"),
            ContentPart::image("data:image/png;base64,AAA"),
        ]);
        assert!(matches!(m.content, MessageContent::Parts(_)));
        assert_eq!(m.text(), "what is this?");
    }

    #[test]
    fn tool_result_carries_call_id() {
        let m = ChatMessage::tool_result("call-1", "42");
        assert_eq!(m.role, Role::Tool);
        assert_eq!(m.tool_call_id.as_deref(), Some("call-1"));
    }

    #[test]
    fn attachment_kind_predicates() {
        assert!(Attachment::image("u").is_image());
        assert!(Attachment::document("u").is_document());
        assert!(!Attachment::image("u").is_document());
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Tool).unwrap(), "\"tool\"");
    }
}
