// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! Vector-store namespace derivation.
//!
//! Namespaces bound what a similarity search may return:
//! `user_kb_{id}` for a user's knowledge base, `memory_user_{id}` for a
//! user's memory, `kb` for shared public knowledge.  A user-scoped
//! namespace may never leak across users: a caller asking for someone
//! else's partition is silently downgraded to the shared one.

/// The shared public-knowledge namespace.
pub const NAMESPACE_SHARED: &str = "kb";

fn user_scope_owner(namespace: &str) -> Option<u64> {
    for prefix in ["user_kb_", "memory_user_"] {
        if let Some(suffix) = namespace.strip_prefix(prefix) {
            return suffix.parse::<u64>().ok();
        }
    }
    None
}

/// Resolve the effective namespace for a request.
///
/// An explicit namespace wins when it is either unscoped or scoped to the
/// calling user; a user-scoped namespace naming anyone else downgrades to
/// [`NAMESPACE_SHARED`].  Without an explicit namespace, an authenticated
/// caller gets their own `user_kb_{id}` and anonymous callers share `kb`.
pub fn get_namespace(explicit: Option<&str>, user_id: Option<u64>) -> String {
    if let Some(ns) = explicit {
        match user_scope_owner(ns) {
            Some(owner) if Some(owner) == user_id => ns.to_string(),
            Some(_) => NAMESPACE_SHARED.to_string(),
            None if ns.starts_with("user_kb_") || ns.starts_with("memory_user_") => {
                // Malformed user scope (non-numeric id): refuse the scope.
                NAMESPACE_SHARED.to_string()
            }
            None => ns.to_string(),
        }
    } else {
        match user_id {
            Some(id) => format!("user_kb_{id}"),
            None => NAMESPACE_SHARED.to_string(),
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_user_namespace_is_kept() {
        assert_eq!(get_namespace(Some("user_kb_42"), Some(42)), "user_kb_42");
        assert_eq!(
            get_namespace(Some("memory_user_42"), Some(42)),
            "memory_user_42"
        );
    }

    #[test]
    fn foreign_user_namespace_downgrades_to_shared() {
        assert_eq!(get_namespace(Some("user_kb_41"), Some(42)), "kb");
        assert_eq!(get_namespace(Some("memory_user_7"), Some(42)), "kb");
    }

    #[test]
    fn anonymous_cannot_claim_user_scope() {
        assert_eq!(get_namespace(Some("user_kb_42"), None), "kb");
    }

    #[test]
    fn malformed_user_scope_downgrades() {
        assert_eq!(get_namespace(Some("user_kb_abc"), Some(42)), "kb");
        assert_eq!(get_namespace(Some("user_kb_"), Some(42)), "kb");
    }

    #[test]
    fn unscoped_explicit_namespace_is_kept() {
        assert_eq!(get_namespace(Some("docs"), Some(42)), "docs");
        assert_eq!(get_namespace(Some("kb"), None), "kb");
    }

    #[test]
    fn default_derivation_uses_caller_identity() {
        assert_eq!(get_namespace(None, Some(9)), "user_kb_9");
        assert_eq!(get_namespace(None, None), "kb");
    }
}
