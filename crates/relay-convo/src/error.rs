// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

use relay_store::StoreError;

#[derive(Debug, Error)]
pub enum ConvoError {
    /// The caller is not the owner of the target conversation, or no user
    /// principal was supplied where one is required.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The caller's plan has exhausted its monthly allowance.
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_pass_through_transparently() {
        let e: ConvoError = StoreError::NotFound("conversation x".into()).into();
        assert_eq!(e.to_string(), "not found: conversation x");
    }

    #[test]
    fn forbidden_formats_with_detail() {
        let e = ConvoError::Forbidden("user 2 is not the owner".into());
        assert!(e.to_string().starts_with("forbidden"));
    }
}
