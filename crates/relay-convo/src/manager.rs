// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! The conversation manager: the single write path for dialogue state.
//!
//! Ownership is enforced here, not in the repository – the repository is a
//! dumb store, the manager is the policy layer.  Share-id reads are the one
//! ownership exemption and are read-only by construction.

use std::sync::Arc;

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use relay_config::LimitsConfig;
use relay_store::{
    Conversation, MessageRecord, Repository, StoreError, User,
};

use crate::{ConvoError, ToolKind, UsageManager};

#[derive(Debug, Clone, Default)]
pub struct ConversationUpdate {
    pub title: Option<String>,
    pub archived: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShareInfo {
    pub share_id: String,
}

pub struct ConversationManager {
    repo: Arc<dyn Repository>,
    usage: UsageManager,
    user: Option<User>,
    /// When `false`, the manager is ephemeral: `history` with an inline
    /// message returns just that message and nothing is persisted by `get`.
    store: bool,
}

impl ConversationManager {
    pub fn new(
        repo: Arc<dyn Repository>,
        limits: LimitsConfig,
        user: Option<User>,
        store: bool,
    ) -> Self {
        Self {
            usage: UsageManager::new(repo.clone(), limits),
            repo,
            user,
            store,
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    fn require_user(&self) -> Result<&User, ConvoError> {
        self.user
            .as_ref()
            .ok_or_else(|| ConvoError::Forbidden("a user principal is required".into()))
    }

    /// Fetch a conversation and verify the caller owns it.
    async fn owned_conversation(&self, id: &str) -> Result<Conversation, ConvoError> {
        let user = self.require_user()?;
        let conversation = self.repo.get_conversation(id).await?;
        if conversation.owner_user_id != user.id {
            return Err(ConvoError::Forbidden(format!(
                "user {} does not own conversation {id}",
                user.id
            )));
        }
        Ok(conversation)
    }

    /// Append a message, creating the conversation on first touch.
    ///
    /// A missing conversation is created with the default title and owned
    /// by the caller; an existing one must belong to the caller.  The
    /// message id is assigned when unset; the stored timestamp is
    /// server-assigned by the repository.
    pub async fn add(
        &self,
        conversation_id: &str,
        mut message: MessageRecord,
    ) -> Result<MessageRecord, ConvoError> {
        let user = self.require_user()?;

        match self.repo.get_conversation(conversation_id).await {
            Ok(existing) => {
                if existing.owner_user_id != user.id {
                    return Err(ConvoError::Forbidden(format!(
                        "user {} does not own conversation {conversation_id}",
                        user.id
                    )));
                }
            }
            Err(StoreError::NotFound(_)) => {
                let now = chrono::Utc::now().timestamp_millis();
                self.repo
                    .create_conversation(Conversation {
                        id: conversation_id.to_string(),
                        owner_user_id: user.id,
                        title: "New Conversation".into(),
                        is_archived: false,
                        is_public: false,
                        share_id: None,
                        last_message_id: None,
                        last_message_at: None,
                        message_count: 0,
                        parent_conversation_id: None,
                        parent_message_id: None,
                        created_at: now,
                        updated_at: now,
                    })
                    .await?;
            }
            Err(e) => return Err(e.into()),
        }

        if message.id.is_empty() {
            message.id = Uuid::new_v4().to_string();
        }
        message.conversation_id = conversation_id.to_string();
        Ok(self.repo.append_message(message).await?)
    }

    /// Messages of an owned conversation in insertion order.
    ///
    /// Ephemeral managers (`store = false`) given an inline message return
    /// just that message without touching the store.
    pub async fn history(
        &self,
        conversation_id: &str,
        inline: Option<MessageRecord>,
    ) -> Result<Vec<MessageRecord>, ConvoError> {
        if !self.store {
            if let Some(message) = inline {
                return Ok(vec![message]);
            }
        }
        self.owned_conversation(conversation_id).await?;
        Ok(self.repo.list_messages(conversation_id).await?)
    }

    /// Read-only access to a publicly shared conversation; no principal
    /// required, no ownership check.
    pub async fn shared_history(
        &self,
        share_id: &str,
    ) -> Result<Vec<MessageRecord>, ConvoError> {
        let conversation = self.repo.get_conversation_by_share_id(share_id).await?;
        if !conversation.is_public {
            return Err(StoreError::NotFound(format!("share {share_id}")).into());
        }
        Ok(self.repo.list_messages(&conversation.id).await?)
    }

    /// Owner-only metadata update; `archived` maps onto `is_archived`.
    pub async fn update_conversation(
        &self,
        conversation_id: &str,
        update: ConversationUpdate,
    ) -> Result<Conversation, ConvoError> {
        let mut conversation = self.owned_conversation(conversation_id).await?;
        if let Some(title) = update.title {
            conversation.title = title;
        }
        if let Some(archived) = update.archived {
            conversation.is_archived = archived;
        }
        Ok(self.repo.update_conversation(conversation).await?)
    }

    /// Issue (or return the existing) share link id and mark the
    /// conversation public.
    pub async fn share_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<ShareInfo, ConvoError> {
        let mut conversation = self.owned_conversation(conversation_id).await?;
        if let Some(existing) = &conversation.share_id {
            return Ok(ShareInfo {
                share_id: existing.clone(),
            });
        }
        let share_id = Uuid::new_v4().simple().to_string();
        conversation.share_id = Some(share_id.clone());
        conversation.is_public = true;
        self.repo.update_conversation(conversation).await?;
        Ok(ShareInfo { share_id })
    }

    /// Quota gate.  Passes silently without a principal (anonymous traffic
    /// is rate-limited upstream); fail-closed otherwise.
    pub async fn check_usage_limits(&self, tool: Option<ToolKind>) -> Result<(), ConvoError> {
        match &self.user {
            Some(user) => self.usage.check(user, tool).await,
            None => Ok(()),
        }
    }

    /// Best-effort accounting after a successful completion.
    pub async fn increment_usage_by_model(&self, model: &str) {
        if let Some(user) = &self.user {
            self.usage.increment_message(user.id, model).await;
        } else {
            warn!("usage increment skipped: no user principal");
        }
    }

    /// Best-effort accounting after a successful tool call.
    pub async fn increment_function_usage(&self, kind: ToolKind, cost_per_call: f64) {
        if let Some(user) = &self.user {
            self.usage
                .increment_function(user.id, kind, cost_per_call)
                .await;
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use relay_store::{MemoryRepository, MessageRole, Plan, StoredContent};

    fn message(text: &str) -> MessageRecord {
        MessageRecord {
            id: String::new(),
            conversation_id: String::new(),
            parent_message_id: None,
            role: MessageRole::User,
            content: StoredContent::Text(text.into()),
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

    fn manager_for(repo: Arc<MemoryRepository>, user: Option<User>) -> ConversationManager {
        ConversationManager::new(repo, LimitsConfig::default(), user, true)
    }

    #[tokio::test]
    async fn add_creates_conversation_on_first_touch() {
        let repo = Arc::new(MemoryRepository::new());
        let manager = manager_for(repo.clone(), Some(User::new(1, "a@x.com", Plan::Free)));

        let stored = manager.add("c-1", message("hello")).await.unwrap();
        assert!(!stored.id.is_empty(), "id must be assigned");

        let conversation = repo.get_conversation("c-1").await.unwrap();
        assert_eq!(conversation.title, "New Conversation");
        assert_eq!(conversation.owner_user_id, 1);
        assert_eq!(conversation.message_count, 1);
        assert_eq!(conversation.last_message_id, Some(stored.id));
    }

    #[tokio::test]
    async fn add_without_user_is_forbidden() {
        let repo = Arc::new(MemoryRepository::new());
        let manager = manager_for(repo, None);
        assert!(matches!(
            manager.add("c-1", message("x")).await,
            Err(ConvoError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn non_owner_mutations_are_forbidden() {
        let repo = Arc::new(MemoryRepository::new());
        let owner = manager_for(repo.clone(), Some(User::new(1, "a@x.com", Plan::Free)));
        owner.add("c-1", message("mine")).await.unwrap();

        let intruder = manager_for(repo, Some(User::new(2, "b@x.com", Plan::Free)));
        assert!(matches!(
            intruder.add("c-1", message("sneaky")).await,
            Err(ConvoError::Forbidden(_))
        ));
        assert!(matches!(
            intruder.history("c-1", None).await,
            Err(ConvoError::Forbidden(_))
        ));
        assert!(matches!(
            intruder
                .update_conversation("c-1", ConversationUpdate::default())
                .await,
            Err(ConvoError::Forbidden(_))
        ));
        assert!(matches!(
            intruder.share_conversation("c-1").await,
            Err(ConvoError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn history_returns_messages_in_order() {
        let repo = Arc::new(MemoryRepository::new());
        let manager = manager_for(repo, Some(User::new(1, "a@x.com", Plan::Free)));
        manager.add("c-1", message("one")).await.unwrap();
        manager.add("c-1", message("two")).await.unwrap();

        let history = manager.history("c-1", None).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].timestamp < history[1].timestamp);
    }

    #[tokio::test]
    async fn ephemeral_manager_passes_inline_message_through() {
        let repo = Arc::new(MemoryRepository::new());
        let manager = ConversationManager::new(
            repo,
            LimitsConfig::default(),
            Some(User::new(1, "a@x.com", Plan::Free)),
            false,
        );
        let inline = message("inline");
        let history = manager.history("missing", Some(inline)).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content.as_display_text(), "inline");
    }

    #[tokio::test]
    async fn update_maps_archived_onto_is_archived() {
        let repo = Arc::new(MemoryRepository::new());
        let manager = manager_for(repo.clone(), Some(User::new(1, "a@x.com", Plan::Free)));
        manager.add("c-1", message("x")).await.unwrap();

        manager
            .update_conversation(
                "c-1",
                ConversationUpdate {
                    title: Some("Renamed".into()),
                    archived: Some(true),
                },
            )
            .await
            .unwrap();
        let conversation = repo.get_conversation("c-1").await.unwrap();
        assert_eq!(conversation.title, "Renamed");
        assert!(conversation.is_archived);
    }

    #[tokio::test]
    async fn share_is_idempotent_and_enables_public_reads() {
        let repo = Arc::new(MemoryRepository::new());
        let manager = manager_for(repo.clone(), Some(User::new(1, "a@x.com", Plan::Free)));
        manager.add("c-1", message("shared")).await.unwrap();

        let first = manager.share_conversation("c-1").await.unwrap();
        let second = manager.share_conversation("c-1").await.unwrap();
        assert_eq!(first.share_id, second.share_id);

        // Anonymous reader through the share id.
        let reader = manager_for(repo, None);
        let history = reader.shared_history(&first.share_id).await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn anonymous_usage_check_is_a_noop() {
        let repo = Arc::new(MemoryRepository::new());
        let manager = manager_for(repo, None);
        manager.check_usage_limits(None).await.unwrap();
        manager.increment_usage_by_model("gpt-4o").await;
    }
}
