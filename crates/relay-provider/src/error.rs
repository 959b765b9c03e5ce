// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: MIT
use thiserror::Error;

/// Failures of the provider abstraction layer.
///
/// `Upstream` distinguishes transient trouble (5xx, timeout, connection
/// reset – retryable) from permanent rejections (4xx – surfaced as-is).
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error("provider {provider} does not support {capability}")]
    UnsupportedCapability {
        provider: String,
        capability: &'static str,
    },

    #[error("missing API key for provider {0}")]
    MissingApiKey(String),

    #[error("provider {provider} returned {status}: {message}")]
    Upstream {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("provider {provider} unreachable: {message}")]
    Network { provider: String, message: String },
}

impl ProviderError {
    /// Transient errors are worth a retry; permanent ones are not.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Upstream { status, .. } => *status >= 500 || *status == 429,
            ProviderError::Network { .. } => true,
            _ => false,
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
