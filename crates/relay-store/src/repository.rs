// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: Apache-2.0
use async_trait::async_trait;
use serde_json::Value;

use crate::{
    AgentRecord, ApiKey, Conversation, EmbeddingRow, MagicNonce, MessageRecord, Passkey,
    ProviderSetting, Session, StoreError, UsageRecord, User, UserSettings,
};

/// Uniform persistence surface.  One method per operation; every method is
/// total – it succeeds with the stated result or fails with a
/// [`StoreError`].  Implementations must not panic on malformed input.
#[async_trait]
pub trait Repository: Send + Sync {
    // ── Users ─────────────────────────────────────────────────────────────────
    async fn get_user(&self, id: u64) -> Result<User, StoreError>;
    async fn get_user_by_email(&self, email: &str) -> Result<User, StoreError>;
    async fn create_user(&self, user: User) -> Result<User, StoreError>;
    async fn update_user(&self, user: User) -> Result<User, StoreError>;

    // ── Sessions ──────────────────────────────────────────────────────────────
    async fn create_session(&self, session: Session) -> Result<(), StoreError>;
    async fn get_session(&self, id: &str) -> Result<Session, StoreError>;
    async fn delete_session(&self, id: &str) -> Result<bool, StoreError>;

    // ── User settings ─────────────────────────────────────────────────────────
    async fn get_user_settings(&self, user_id: u64) -> Result<UserSettings, StoreError>;
    async fn put_user_settings(&self, settings: UserSettings) -> Result<(), StoreError>;

    // ── Provider settings ─────────────────────────────────────────────────────
    async fn list_provider_settings(
        &self,
        user_id: u64,
    ) -> Result<Vec<ProviderSetting>, StoreError>;
    async fn put_provider_setting(
        &self,
        user_id: u64,
        setting: ProviderSetting,
    ) -> Result<(), StoreError>;

    // ── Conversations ─────────────────────────────────────────────────────────
    async fn create_conversation(&self, conversation: Conversation)
        -> Result<Conversation, StoreError>;
    async fn get_conversation(&self, id: &str) -> Result<Conversation, StoreError>;
    async fn get_conversation_by_share_id(
        &self,
        share_id: &str,
    ) -> Result<Conversation, StoreError>;
    async fn update_conversation(
        &self,
        conversation: Conversation,
    ) -> Result<Conversation, StoreError>;
    async fn list_conversations(&self, owner_user_id: u64) -> Result<Vec<Conversation>, StoreError>;
    async fn delete_conversation(&self, id: &str) -> Result<bool, StoreError>;

    // ── Messages ──────────────────────────────────────────────────────────────
    /// Insert a message and atomically update the parent conversation's
    /// `last_message_id`, `last_message_at` and `message_count`.
    ///
    /// The stored `timestamp` is server-assigned and strictly monotonic per
    /// conversation; the returned record carries the assigned value.
    async fn append_message(&self, message: MessageRecord) -> Result<MessageRecord, StoreError>;
    async fn get_message(&self, id: &str) -> Result<MessageRecord, StoreError>;
    /// Messages of one conversation in insertion order.
    async fn list_messages(&self, conversation_id: &str)
        -> Result<Vec<MessageRecord>, StoreError>;

    // ── Embedding bookkeeping ─────────────────────────────────────────────────
    async fn insert_embedding_rows(&self, rows: Vec<EmbeddingRow>) -> Result<(), StoreError>;
    async fn delete_embedding_rows(&self, ids: &[String]) -> Result<u64, StoreError>;
    async fn list_embedding_rows(&self, user_id: u64) -> Result<Vec<EmbeddingRow>, StoreError>;

    // ── API keys ──────────────────────────────────────────────────────────────
    async fn create_api_key(&self, key: ApiKey) -> Result<ApiKey, StoreError>;
    async fn list_api_keys(&self, user_id: u64) -> Result<Vec<ApiKey>, StoreError>;
    async fn revoke_api_key(&self, id: &str) -> Result<bool, StoreError>;

    // ── Magic-link nonces ─────────────────────────────────────────────────────
    async fn put_magic_nonce(&self, nonce: MagicNonce) -> Result<(), StoreError>;
    /// Atomically fetch-and-consume; a second take of the same nonce fails
    /// with `NotFound`.
    async fn take_magic_nonce(&self, nonce: &str) -> Result<MagicNonce, StoreError>;

    // ── Passkeys ──────────────────────────────────────────────────────────────
    async fn add_passkey(&self, passkey: Passkey) -> Result<(), StoreError>;
    async fn list_passkeys(&self, user_id: u64) -> Result<Vec<Passkey>, StoreError>;

    // ── Agents ────────────────────────────────────────────────────────────────
    async fn get_agent(&self, id: &str) -> Result<AgentRecord, StoreError>;
    async fn list_agents(&self, user_id: u64) -> Result<Vec<AgentRecord>, StoreError>;
    async fn put_agent(&self, agent: AgentRecord) -> Result<(), StoreError>;

    // ── Usage ─────────────────────────────────────────────────────────────────
    async fn get_usage(&self, user_id: u64, period: &str) -> Result<UsageRecord, StoreError>;
    async fn put_usage(&self, usage: UsageRecord) -> Result<(), StoreError>;

    // ── Diagnostics ───────────────────────────────────────────────────────────
    /// Implementation-defined health blob for monitoring endpoints.
    async fn health(&self) -> Result<Value, StoreError> {
        Ok(Value::Null)
    }
}
