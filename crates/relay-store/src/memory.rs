// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! In-process repository backed by hash maps behind an async `RwLock`.
//!
//! Used by the CLI binary and the test suite.  Single-writer semantics per
//! call give the same atomicity the relational backend provides per
//! statement: `append_message` updates the message table and the parent
//! conversation row under one write lock.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::RwLock;

use crate::{
    AgentRecord, ApiKey, Conversation, EmbeddingRow, MagicNonce, MessageRecord, Passkey,
    ProviderSetting, Repository, Session, StoreError, UsageRecord, User, UserSettings,
};

pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[derive(Default)]
struct Inner {
    users: HashMap<u64, User>,
    sessions: HashMap<String, Session>,
    user_settings: HashMap<u64, UserSettings>,
    provider_settings: HashMap<u64, Vec<ProviderSetting>>,
    conversations: HashMap<String, Conversation>,
    messages: HashMap<String, MessageRecord>,
    /// Ordered message ids per conversation (insertion order).
    message_order: HashMap<String, Vec<String>>,
    /// Highest timestamp handed out per conversation, for monotonicity.
    last_timestamp: HashMap<String, i64>,
    embedding_rows: HashMap<String, EmbeddingRow>,
    api_keys: HashMap<String, ApiKey>,
    magic_nonces: HashMap<String, MagicNonce>,
    passkeys: HashMap<String, Passkey>,
    agents: HashMap<String, AgentRecord>,
    usage: HashMap<(u64, String), UsageRecord>,
}

#[derive(Default)]
pub struct MemoryRepository {
    inner: RwLock<Inner>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn get_user(&self, id: u64) -> Result<User, StoreError> {
        self.inner
            .read()
            .await
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User, StoreError> {
        self.inner
            .read()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("user {email}")))
    }

    async fn create_user(&self, user: User) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.users.contains_key(&user.id) {
            return Err(StoreError::Conflict(format!("user {} exists", user.id)));
        }
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, user: User) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&user.id) {
            return Err(StoreError::NotFound(format!("user {}", user.id)));
        }
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn create_session(&self, session: Session) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .sessions
            .insert(session.id.clone(), session);
        Ok(())
    }

    async fn get_session(&self, id: &str) -> Result<Session, StoreError> {
        self.inner
            .read()
            .await
            .sessions
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("session {id}")))
    }

    async fn delete_session(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.inner.write().await.sessions.remove(id).is_some())
    }

    async fn get_user_settings(&self, user_id: u64) -> Result<UserSettings, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .user_settings
            .get(&user_id)
            .cloned()
            .unwrap_or(UserSettings {
                user_id,
                settings: Value::Null,
            }))
    }

    async fn put_user_settings(&self, settings: UserSettings) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .user_settings
            .insert(settings.user_id, settings);
        Ok(())
    }

    async fn list_provider_settings(
        &self,
        user_id: u64,
    ) -> Result<Vec<ProviderSetting>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .provider_settings
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn put_provider_setting(
        &self,
        user_id: u64,
        setting: ProviderSetting,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let settings = inner.provider_settings.entry(user_id).or_default();
        match settings
            .iter_mut()
            .find(|s| s.provider_id == setting.provider_id)
        {
            Some(existing) => *existing = setting,
            None => settings.push(setting),
        }
        Ok(())
    }

    async fn create_conversation(
        &self,
        conversation: Conversation,
    ) -> Result<Conversation, StoreError> {
        if conversation.id.is_empty() {
            return Err(StoreError::Validation("conversation id is empty".into()));
        }
        let mut inner = self.inner.write().await;
        if inner.conversations.contains_key(&conversation.id) {
            return Err(StoreError::Conflict(format!(
                "conversation {} exists",
                conversation.id
            )));
        }
        inner
            .conversations
            .insert(conversation.id.clone(), conversation.clone());
        Ok(conversation)
    }

    async fn get_conversation(&self, id: &str) -> Result<Conversation, StoreError> {
        self.inner
            .read()
            .await
            .conversations
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("conversation {id}")))
    }

    async fn get_conversation_by_share_id(
        &self,
        share_id: &str,
    ) -> Result<Conversation, StoreError> {
        self.inner
            .read()
            .await
            .conversations
            .values()
            .find(|c| c.share_id.as_deref() == Some(share_id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("share {share_id}")))
    }

    async fn update_conversation(
        &self,
        conversation: Conversation,
    ) -> Result<Conversation, StoreError> {
        let mut inner = self.inner.write().await;
        let existing = inner
            .conversations
            .get(&conversation.id)
            .ok_or_else(|| StoreError::NotFound(format!("conversation {}", conversation.id)))?;
        // The owner column is immutable after create.
        if existing.owner_user_id != conversation.owner_user_id {
            return Err(StoreError::Validation(
                "conversation owner cannot change".into(),
            ));
        }
        let mut updated = conversation;
        updated.updated_at = now_ms();
        inner
            .conversations
            .insert(updated.id.clone(), updated.clone());
        Ok(updated)
    }

    async fn list_conversations(
        &self,
        owner_user_id: u64,
    ) -> Result<Vec<Conversation>, StoreError> {
        let mut out: Vec<Conversation> = self
            .inner
            .read()
            .await
            .conversations
            .values()
            .filter(|c| c.owner_user_id == owner_user_id)
            .cloned()
            .collect();
        out.sort_by_key(|c| std::cmp::Reverse(c.updated_at));
        Ok(out)
    }

    async fn delete_conversation(&self, id: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let removed = inner.conversations.remove(id).is_some();
        if removed {
            if let Some(ids) = inner.message_order.remove(id) {
                for mid in ids {
                    inner.messages.remove(&mid);
                }
            }
            inner.last_timestamp.remove(id);
        }
        Ok(removed)
    }

    async fn append_message(&self, message: MessageRecord) -> Result<MessageRecord, StoreError> {
        if message.id.is_empty() {
            return Err(StoreError::Validation("message id is empty".into()));
        }
        let mut inner = self.inner.write().await;
        if !inner.conversations.contains_key(&message.conversation_id) {
            return Err(StoreError::NotFound(format!(
                "conversation {}",
                message.conversation_id
            )));
        }
        if inner.messages.contains_key(&message.id) {
            return Err(StoreError::Conflict(format!("message {} exists", message.id)));
        }

        // Server-assigned timestamp, strictly monotonic per conversation.
        let last = inner
            .last_timestamp
            .get(&message.conversation_id)
            .copied()
            .unwrap_or(0);
        let ts = now_ms().max(last + 1);
        inner
            .last_timestamp
            .insert(message.conversation_id.clone(), ts);

        let mut stored = message;
        stored.timestamp = ts;
        stored.created_at = ts;
        stored.updated_at = ts;

        inner
            .message_order
            .entry(stored.conversation_id.clone())
            .or_default()
            .push(stored.id.clone());
        inner.messages.insert(stored.id.clone(), stored.clone());

        // Same-lock conversation bookkeeping: count, tail pointer, recency.
        if let Some(conv) = inner.conversations.get_mut(&stored.conversation_id) {
            conv.message_count += 1;
            conv.last_message_id = Some(stored.id.clone());
            conv.last_message_at = Some(ts);
            conv.updated_at = ts;
        }
        Ok(stored)
    }

    async fn get_message(&self, id: &str) -> Result<MessageRecord, StoreError> {
        self.inner
            .read()
            .await
            .messages
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("message {id}")))
    }

    async fn list_messages(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<MessageRecord>, StoreError> {
        let inner = self.inner.read().await;
        if !inner.conversations.contains_key(conversation_id) {
            return Err(StoreError::NotFound(format!(
                "conversation {conversation_id}"
            )));
        }
        let ids = inner
            .message_order
            .get(conversation_id)
            .cloned()
            .unwrap_or_default();
        Ok(ids
            .iter()
            .filter_map(|id| inner.messages.get(id).cloned())
            .collect())
    }

    async fn insert_embedding_rows(&self, rows: Vec<EmbeddingRow>) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        for row in rows {
            inner.embedding_rows.insert(row.id.clone(), row);
        }
        Ok(())
    }

    async fn delete_embedding_rows(&self, ids: &[String]) -> Result<u64, StoreError> {
        let mut inner = self.inner.write().await;
        let mut removed = 0;
        for id in ids {
            if inner.embedding_rows.remove(id).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn list_embedding_rows(&self, user_id: u64) -> Result<Vec<EmbeddingRow>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .embedding_rows
            .values()
            .filter(|r| r.user_id == Some(user_id))
            .cloned()
            .collect())
    }

    async fn create_api_key(&self, key: ApiKey) -> Result<ApiKey, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.api_keys.contains_key(&key.id) {
            return Err(StoreError::Conflict(format!("api key {} exists", key.id)));
        }
        inner.api_keys.insert(key.id.clone(), key.clone());
        Ok(key)
    }

    async fn list_api_keys(&self, user_id: u64) -> Result<Vec<ApiKey>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .api_keys
            .values()
            .filter(|k| k.user_id == user_id && !k.revoked)
            .cloned()
            .collect())
    }

    async fn revoke_api_key(&self, id: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        match inner.api_keys.get_mut(id) {
            Some(k) => {
                k.revoked = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn put_magic_nonce(&self, nonce: MagicNonce) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .magic_nonces
            .insert(nonce.nonce.clone(), nonce);
        Ok(())
    }

    async fn take_magic_nonce(&self, nonce: &str) -> Result<MagicNonce, StoreError> {
        self.inner
            .write()
            .await
            .magic_nonces
            .remove(nonce)
            .ok_or_else(|| StoreError::NotFound("magic nonce".into()))
    }

    async fn add_passkey(&self, passkey: Passkey) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .passkeys
            .insert(passkey.credential_id.clone(), passkey);
        Ok(())
    }

    async fn list_passkeys(&self, user_id: u64) -> Result<Vec<Passkey>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .passkeys
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_agent(&self, id: &str) -> Result<AgentRecord, StoreError> {
        self.inner
            .read()
            .await
            .agents
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("agent {id}")))
    }

    async fn list_agents(&self, user_id: u64) -> Result<Vec<AgentRecord>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .agents
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn put_agent(&self, agent: AgentRecord) -> Result<(), StoreError> {
        self.inner.write().await.agents.insert(agent.id.clone(), agent);
        Ok(())
    }

    async fn get_usage(&self, user_id: u64, period: &str) -> Result<UsageRecord, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .usage
            .get(&(user_id, period.to_string()))
            .cloned()
            .unwrap_or(UsageRecord {
                user_id,
                period: period.to_string(),
                ..UsageRecord::default()
            }))
    }

    async fn put_usage(&self, usage: UsageRecord) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .usage
            .insert((usage.user_id, usage.period.clone()), usage);
        Ok(())
    }

    async fn health(&self) -> Result<Value, StoreError> {
        let inner = self.inner.read().await;
        Ok(json!({
            "users": inner.users.len(),
            "conversations": inner.conversations.len(),
            "messages": inner.messages.len(),
        }))
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
