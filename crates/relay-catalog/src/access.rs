// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! Per-user model access filtering.
//!
//! Anonymous callers see free models plus anything from the always-enabled
//! provider set.  Authenticated callers additionally see providers they
//! have enabled with credentials on file; that enabled set is cached per
//! user.  Store trouble never blocks a request – it degrades to the
//! anonymous rule.

use std::collections::HashSet;
use std::sync::OnceLock;
use std::time::Duration;

use tracing::warn;

use relay_config::ProvidersConfig;
use relay_store::{cache_key, cache_query, Cache, CacheQueryOptions, Repository};

use crate::{get_included_in_router_models, ModelDescriptor};

const USER_MODELS_TTL: Duration = Duration::from_secs(300);

/// The always-enabled provider set, parsed once per process.
fn always_enabled(cfg: &ProvidersConfig) -> &'static HashSet<String> {
    static SET: OnceLock<HashSet<String>> = OnceLock::new();
    SET.get_or_init(|| {
        cfg.always_enabled
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}

fn anonymous_models(always: &HashSet<String>) -> Vec<ModelDescriptor> {
    get_included_in_router_models()
        .iter()
        .filter(|m| m.is_free || always.contains(&m.provider))
        .cloned()
        .collect()
}

/// Router-eligible models the caller may use.
///
/// With no `user_id` this is the anonymous rule and touches neither the
/// repository nor the cache.  With a `user_id` the enabled-provider set is
/// resolved through the cache under `user-models:{id}`; a repository error
/// during the live fetch degrades to the anonymous rule.
pub async fn filter_models_for_user_access(
    cfg: &ProvidersConfig,
    repo: &dyn Repository,
    cache: &dyn Cache,
    user_id: Option<u64>,
) -> Vec<ModelDescriptor> {
    let always = always_enabled(cfg);

    let Some(user_id) = user_id else {
        return anonymous_models(always);
    };

    let key = cache_key("user-models", &[&user_id.to_string()]);
    let opts = CacheQueryOptions {
        ttl: Some(USER_MODELS_TTL),
        skip_if_none: true,
    };
    let enabled: Option<Vec<String>> = cache_query(cache, &key, opts, || async {
        match repo.list_provider_settings(user_id).await {
            Ok(settings) => {
                let mut providers: Vec<String> = always.iter().cloned().collect();
                for s in settings {
                    if s.enabled && s.has_credentials && !providers.contains(&s.provider_id) {
                        providers.push(s.provider_id);
                    }
                }
                providers.sort();
                Ok(Some(providers))
            }
            Err(e) => {
                warn!(user_id, error = %e, "provider settings unavailable; using anonymous model set");
                Ok(None)
            }
        }
    })
    .await
    .unwrap_or(None);

    match enabled {
        Some(providers) => {
            let provider_set: HashSet<&str> = providers.iter().map(|s| s.as_str()).collect();
            get_included_in_router_models()
                .iter()
                .filter(|m| m.is_free || provider_set.contains(m.provider.as_str()))
                .cloned()
                .collect()
        }
        None => anonymous_models(always),
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
