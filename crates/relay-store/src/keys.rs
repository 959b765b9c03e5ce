// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: Apache-2.0
/// Build a cache key as `prefix:part1:part2:…`.
///
/// Parts are joined in the order given; callers are expected to pass them
/// in a stable order so the same logical query always produces the same key.
pub fn cache_key(prefix: &str, parts: &[&str]) -> String {
    if parts.is_empty() {
        return prefix.to_string();
    }
    let mut key = String::with_capacity(prefix.len() + parts.iter().map(|p| p.len() + 1).sum::<usize>());
    key.push_str(prefix);
    for part in parts {
        key.push(':');
        key.push_str(part);
    }
    key
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
