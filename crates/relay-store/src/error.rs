// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

/// Failure modes of the persistence and cache surface.
///
/// Every repository method is total: it either succeeds with its stated
/// result or fails with one of these kinds.  Callers map them onto the
/// 4xx/5xx-equivalent surface at the orchestrator seam.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The target entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A uniqueness or concurrent-update conflict.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Malformed input rejected before touching the backend.
    #[error("validation: {0}")]
    Validation(String),

    /// The backend itself failed (connection, timeout, corruption).
    #[error("backend: {0}")]
    Backend(String),
}

impl StoreError {
    /// `true` for errors the cache layer may swallow (backend trouble),
    /// `false` for errors that must surface (bad input, missing entity).
    pub fn is_backend(&self) -> bool {
        matches!(self, StoreError::Backend(_))
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
