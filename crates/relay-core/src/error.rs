// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

use relay_convo::ConvoError;
use relay_provider::ProviderError;
use relay_store::StoreError;
use relay_tools::ToolError;

/// Request-terminating errors, tagged by kind for the transport layer.
///
/// The orchestrator catches only at component seams (router, augmentation,
/// guardrails, monitoring, usage increments); everything else maps onto one
/// of these and ends the pipeline.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("validation: {0}")]
    Validation(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("premium required: {0}")]
    PremiumRequired(String),

    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Upstream 5xx / timeout / network trouble; retryable by the caller.
    #[error("upstream transient: {0}")]
    UpstreamTransient(String),

    /// Upstream 4xx; not retryable.
    #[error("upstream permanent: {0}")]
    UpstreamPermanent(String),

    /// Logged with a synthetic id; the caller sees only the id.
    #[error("internal error (ref {reference})")]
    Internal { reference: String },
}

impl ChatError {
    /// Wrap an unexpected failure, logging the detail under a synthetic
    /// reference id the user can quote back.
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        let reference = uuid::Uuid::new_v4().simple().to_string();
        tracing::error!(%reference, detail = %detail, "internal error");
        ChatError::Internal { reference }
    }
}

impl From<ConvoError> for ChatError {
    fn from(e: ConvoError) -> Self {
        match e {
            ConvoError::Forbidden(m) => ChatError::Forbidden(m),
            ConvoError::QuotaExceeded(m) => ChatError::QuotaExceeded(m),
            ConvoError::Store(s) => s.into(),
        }
    }
}

impl From<StoreError> for ChatError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(m) => ChatError::NotFound(m),
            StoreError::Validation(m) => ChatError::Validation(m),
            other => ChatError::internal(other),
        }
    }
}

impl From<ProviderError> for ChatError {
    fn from(e: ProviderError) -> Self {
        match &e {
            ProviderError::Upstream { .. } | ProviderError::Network { .. } => {
                if e.is_transient() {
                    ChatError::UpstreamTransient(e.to_string())
                } else {
                    ChatError::UpstreamPermanent(e.to_string())
                }
            }
            ProviderError::UnknownProvider(_) | ProviderError::UnsupportedCapability { .. } => {
                ChatError::Validation(e.to_string())
            }
            ProviderError::MissingApiKey(_) => ChatError::UpstreamPermanent(e.to_string()),
        }
    }
}

impl From<ToolError> for ChatError {
    fn from(e: ToolError) -> Self {
        match e {
            ToolError::NotFound(m) => ChatError::NotFound(format!("tool {m}")),
            ToolError::PremiumRequired(m) => ChatError::PremiumRequired(m),
            ToolError::Quota(q) => q.into(),
            ToolError::InvalidArguments { tool, message } => {
                ChatError::Validation(format!("{tool}: {message}"))
            }
            ToolError::Mcp(m) => ChatError::Validation(m),
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
