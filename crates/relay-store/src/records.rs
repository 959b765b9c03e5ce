// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! Stored record types shared across the core.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Subscription plan of a user principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Free,
    Pro,
}

impl Plan {
    pub fn is_pro(self) -> bool {
        matches!(self, Plan::Pro)
    }
}

/// Authenticated user principal.  Immutable for the life of a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub email: String,
    #[serde(default)]
    pub plan: Plan,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_username: Option<String>,
}

impl User {
    pub fn new(id: u64, email: impl Into<String>, plan: Plan) -> Self {
        Self {
            id,
            email: email.into(),
            plan,
            github_username: None,
        }
    }
}

/// An authenticated session token row.  The auth middleware owns the
/// lifecycle; the core only stores and resolves them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: u64,
    pub expires_at: i64,
}

/// Arbitrary per-user settings blob (UI preferences, feature flags).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserSettings {
    pub user_id: u64,
    #[serde(default)]
    pub settings: Value,
}

/// Per-user, per-provider credential state.  `enabled = false` hides every
/// model of that provider from the router for this user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSetting {
    pub provider_id: String,
    pub enabled: bool,
    pub has_credentials: bool,
}

/// A conversation row.  The owner is set at create time and never changes;
/// `share_id` is present iff `is_public`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub owner_user_id: u64,
    pub title: String,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_at: Option<i64>,
    /// Count of non-deleted child messages, bumped atomically with each append.
    #[serde(default)]
    pub message_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_conversation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_message_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Role of a stored message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    Tool,
    System,
}

/// Message content: plain text or provider-structured parts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredContent {
    Text(String),
    Structured(Value),
}

impl StoredContent {
    /// Plain text view; structured content renders as compact JSON.
    pub fn as_display_text(&self) -> String {
        match self {
            StoredContent::Text(t) => t.clone(),
            StoredContent::Structured(v) => v.to_string(),
        }
    }
}

/// A stored message.  Messages form a forest rooted at user turns;
/// `parent_message_id` links assistant and tool messages to the user turn
/// that caused them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    pub conversation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_message_id: Option<String>,
    pub role: MessageRole,
    pub content: StoredContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Server-assigned insert timestamp (ms); monotonic per conversation.
    pub timestamp: i64,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Value>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A team-member agent owned by a user.  Targets of delegation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: String,
    pub user_id: u64,
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Monthly usage counters for one user.  `period` is `YYYY-MM`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageRecord {
    pub user_id: u64,
    pub period: String,
    #[serde(default)]
    pub message_count: u64,
    #[serde(default)]
    pub premium_function_calls: u64,
    #[serde(default)]
    pub normal_function_calls: u64,
    /// Accumulated per-call tool cost in credits.
    #[serde(default)]
    pub function_cost: f64,
    /// Per-model completion counts, keyed by matching model id.
    #[serde(default)]
    pub model_counts: std::collections::HashMap<String, u64>,
}

/// An issued API key (hash only; the plaintext never reaches the core).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: String,
    pub user_id: u64,
    pub name: String,
    pub key_hash: String,
    pub created_at: i64,
    #[serde(default)]
    pub revoked: bool,
}

/// Single-use magic-link login nonce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MagicNonce {
    pub nonce: String,
    pub user_id: u64,
    pub expires_at: i64,
}

/// A registered WebAuthn passkey (opaque to the core).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passkey {
    pub credential_id: String,
    pub user_id: u64,
    pub public_key: String,
    pub created_at: i64,
}

/// Bookkeeping row for an embedding stored in the vector index, so user
/// documents can be listed and deleted without querying the index itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRow {
    pub id: String,
    pub user_id: Option<u64>,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub namespace: String,
    pub created_at: i64,
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
