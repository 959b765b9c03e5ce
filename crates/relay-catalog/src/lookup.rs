// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! Per-model lookups that cache-through on the shared cache.
//!
//! The catalog itself is in-process, but these lookups sit on hot request
//! paths shared with other processes, so results are published under stable
//! keys (`model-config:{m}`, `model-by-model:{m}`, `matching-model:{m}`,
//! `model-by-matching:{m}`).  Cache trouble degrades to the live catalog.

use relay_store::{cache_query, Cache, CacheQueryOptions, StoreError};

use crate::{find_descriptor, static_catalog, ModelDescriptor};

async fn cached_descriptor(
    cache: &dyn Cache,
    key: &str,
    find: impl FnOnce() -> Option<ModelDescriptor>,
) -> Option<ModelDescriptor> {
    let result: Result<Option<ModelDescriptor>, StoreError> =
        cache_query(cache, key, CacheQueryOptions::default(), || async {
            Ok(find())
        })
        .await;
    // The query closure is infallible; only impossible plumbing errors land here.
    result.unwrap_or(None)
}

/// Descriptor by `matching_model` id.
pub async fn get_model_config(cache: &dyn Cache, model: &str) -> Option<ModelDescriptor> {
    let key = relay_store::cache_key("model-config", &[model]);
    cached_descriptor(cache, &key, || {
        static_catalog()
            .iter()
            .find(|m| m.matching_model == model)
            .cloned()
    })
    .await
}

/// Descriptor by display name or `matching_model` id.
pub async fn get_model_config_by_model(cache: &dyn Cache, model: &str) -> Option<ModelDescriptor> {
    let key = relay_store::cache_key("model-by-model", &[model]);
    cached_descriptor(cache, &key, || find_descriptor(model).cloned()).await
}

/// Resolve a display name to its `matching_model` id.
pub async fn get_matching_model(cache: &dyn Cache, name: &str) -> Option<String> {
    let key = relay_store::cache_key("matching-model", &[name]);
    let result: Result<Option<String>, StoreError> =
        cache_query(cache, &key, CacheQueryOptions::default(), || async {
            Ok(find_descriptor(name).map(|m| m.matching_model.clone()))
        })
        .await;
    result.unwrap_or(None)
}

/// Descriptor by `matching_model` id, under its own key space.
pub async fn get_model_config_by_matching_model(
    cache: &dyn Cache,
    matching_model: &str,
) -> Option<ModelDescriptor> {
    let key = relay_store::cache_key("model-by-matching", &[matching_model]);
    cached_descriptor(cache, &key, || {
        static_catalog()
            .iter()
            .find(|m| m.matching_model == matching_model)
            .cloned()
    })
    .await
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
