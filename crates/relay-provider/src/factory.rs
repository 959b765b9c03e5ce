// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: MIT
//! Capability factories and the chat failover policy.
//!
//! Name resolution for every capability: an explicit model maps to its
//! catalog provider; else an explicit provider is used; else the
//! capability default.  When a chat call fails and the caller named
//! neither model nor provider, the call is retried once against the
//! default provider – any explicitly requested target propagates its error.

use tracing::warn;

use relay_config::ProvidersConfig;
use relay_store::Cache;

use crate::{
    chat::ResponseStream,
    media::{JsonEndpoint, MockMedia},
    registry::{get_driver, Capability, DriverMeta},
    research::MockResearch,
    ChatProvider, ChatRequest, EchoChat, EmbeddingBackend, HttpEmbedding, ImageProvider,
    MockEmbedding, MusicProvider, OcrProvider, OpenAiCompatChat, ProviderError, ResearchProvider,
    SpeechProvider, VideoProvider,
};

/// Environment handed to every factory call: provider config plus key
/// resolution.  Cheap to clone; carried in the request context.
#[derive(Debug, Clone, Default)]
pub struct ProviderEnv {
    pub cfg: ProvidersConfig,
}

impl ProviderEnv {
    pub fn new(cfg: ProvidersConfig) -> Self {
        Self { cfg }
    }

    fn resolve_api_key(&self, driver: &DriverMeta) -> Option<String> {
        if let Some(k) = &self.cfg.api_key {
            return Some(k.clone());
        }
        if let Some(env) = &self.cfg.api_key_env {
            return std::env::var(env).ok();
        }
        driver
            .default_api_key_env
            .and_then(|env| std::env::var(env).ok())
    }

    fn base_url(&self, driver: &DriverMeta) -> Option<String> {
        self.cfg
            .base_url
            .clone()
            .or_else(|| driver.default_base_url.map(str::to_string))
    }
}

fn require_capability(
    driver: &'static DriverMeta,
    capability: Capability,
    label: &'static str,
) -> Result<&'static DriverMeta, ProviderError> {
    if driver.capabilities.contains(&capability) {
        Ok(driver)
    } else {
        Err(ProviderError::UnsupportedCapability {
            provider: driver.id.to_string(),
            capability: label,
        })
    }
}

fn lookup(name: &str) -> Result<&'static DriverMeta, ProviderError> {
    get_driver(name).ok_or_else(|| ProviderError::UnknownProvider(name.to_string()))
}

/// Default provider id for a capability: the first registered driver
/// serving it (excluding the mock).
pub fn default_provider_for(capability: Capability) -> &'static str {
    crate::registry::drivers_for(capability)
        .find(|d| d.id != "mock")
        .map(|d| d.id)
        .unwrap_or("mock")
}

// ─── Chat ─────────────────────────────────────────────────────────────────────

/// The provider/model pair a chat call runs against.  `explicit` records
/// whether the caller named the model or provider themselves – explicit
/// targets never fail over.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatTarget {
    pub provider: String,
    pub model: String,
    pub explicit: bool,
}

/// Resolve the chat target from an optional explicit model/provider pair.
///
/// Explicit model → catalog lookup decides the provider.  Explicit provider
/// without model → the configured default model on that provider.  Neither →
/// the configured chat default (caller substitutes a routed model first).
pub async fn resolve_chat_target(
    env: &ProviderEnv,
    cache: &dyn Cache,
    model: Option<&str>,
    provider: Option<&str>,
    default_model: &str,
) -> ChatTarget {
    if let Some(model) = model {
        if let Some(descriptor) = relay_catalog::get_model_config_by_model(cache, model).await {
            return ChatTarget {
                provider: descriptor.provider,
                model: descriptor.matching_model,
                explicit: true,
            };
        }
        // Unknown model id: trust the caller's provider, else the default.
        return ChatTarget {
            provider: provider
                .unwrap_or(env.cfg.default_chat.as_str())
                .to_string(),
            model: model.to_string(),
            explicit: true,
        };
    }
    if let Some(provider) = provider {
        return ChatTarget {
            provider: provider.to_string(),
            model: default_model.to_string(),
            explicit: true,
        };
    }
    ChatTarget {
        provider: env.cfg.default_chat.clone(),
        model: default_model.to_string(),
        explicit: false,
    }
}

/// Construct a chat provider for one provider/model pair.
pub fn get_chat_provider(
    name: &str,
    model: &str,
    env: &ProviderEnv,
) -> Result<Box<dyn ChatProvider>, ProviderError> {
    let driver = require_capability(lookup(name)?, Capability::Chat, "chat")?;
    if driver.id == "mock" {
        return Ok(Box::new(EchoChat));
    }
    let key = env.resolve_api_key(driver);
    if key.is_none() && driver.requires_api_key {
        return Err(ProviderError::MissingApiKey(driver.id.to_string()));
    }
    let base = env
        .base_url(driver)
        .ok_or_else(|| ProviderError::UnknownProvider(format!("{name}: no base URL")))?;
    Ok(Box::new(OpenAiCompatChat::new(
        driver.id,
        model,
        key,
        &base,
        crate::AuthStyle::Bearer,
        vec![],
    )))
}

/// Run a chat completion with the single-retry failover policy.
///
/// Returns the stream plus the target that actually served it, so callers
/// can stamp the true provider/model on the persisted assistant message.
pub async fn complete_chat(
    env: &ProviderEnv,
    target: &ChatTarget,
    req: ChatRequest,
) -> Result<(ResponseStream, ChatTarget), ProviderError> {
    let provider = get_chat_provider(&target.provider, &target.model, env)?;
    match provider.complete(req.clone()).await {
        Ok(stream) => Ok((stream, target.clone())),
        Err(e) if !target.explicit && target.provider != env.cfg.default_chat => {
            warn!(
                provider = %target.provider,
                error = %e,
                "primary chat provider failed; retrying against default"
            );
            let fallback = ChatTarget {
                provider: env.cfg.default_chat.clone(),
                model: target.model.clone(),
                explicit: false,
            };
            let retry = get_chat_provider(&fallback.provider, &fallback.model, env)?;
            retry.complete(req).await.map(|s| (s, fallback))
        }
        Err(e) => Err(e),
    }
}

// ─── Other capabilities ───────────────────────────────────────────────────────

macro_rules! media_factory {
    ($fn_name:ident, $cap:expr, $label:literal, $trait_obj:ident) => {
        pub fn $fn_name(
            name: Option<&str>,
            env: &ProviderEnv,
        ) -> Result<Box<dyn $trait_obj>, ProviderError> {
            let id = name.unwrap_or_else(|| default_provider_for($cap));
            let driver = require_capability(lookup(id)?, $cap, $label)?;
            if driver.id == "mock" {
                return Ok(Box::new(MockMedia));
            }
            let key = env.resolve_api_key(driver);
            if key.is_none() && driver.requires_api_key {
                return Err(ProviderError::MissingApiKey(driver.id.to_string()));
            }
            let base = env
                .base_url(driver)
                .ok_or_else(|| ProviderError::UnknownProvider(format!("{id}: no base URL")))?;
            Ok(Box::new(JsonEndpoint::new(driver.id, base, key)))
        }
    };
}

media_factory!(get_image_provider, Capability::Image, "image", ImageProvider);
media_factory!(get_speech_provider, Capability::Speech, "speech", SpeechProvider);
media_factory!(get_music_provider, Capability::Music, "music", MusicProvider);
media_factory!(get_video_provider, Capability::Video, "video", VideoProvider);
media_factory!(get_ocr_provider, Capability::Ocr, "ocr", OcrProvider);

pub fn get_research_provider(
    name: Option<&str>,
    env: &ProviderEnv,
) -> Result<Box<dyn ResearchProvider>, ProviderError> {
    let id = name.unwrap_or_else(|| default_provider_for(Capability::Research));
    let driver = require_capability(lookup(id)?, Capability::Research, "research")?;
    if driver.id == "mock" {
        return Ok(Box::new(MockResearch));
    }
    let key = env.resolve_api_key(driver);
    if key.is_none() && driver.requires_api_key {
        return Err(ProviderError::MissingApiKey(driver.id.to_string()));
    }
    let base = env
        .base_url(driver)
        .ok_or_else(|| ProviderError::UnknownProvider(format!("{id}: no base URL")))?;
    Ok(Box::new(crate::research::HttpResearch::new(driver.id, base, key)))
}

fn default_embedding_model(provider: &str) -> &'static str {
    match provider {
        "openai" => "text-embedding-3-small",
        "google" => "text-embedding-004",
        "mistral" => "mistral-embed",
        "workers" => "bge-base-en",
        _ => "default-embedding",
    }
}

pub fn get_embedding_backend(
    name: Option<&str>,
    env: &ProviderEnv,
) -> Result<Box<dyn EmbeddingBackend>, ProviderError> {
    let id = name.unwrap_or(env.cfg.default_embedding.as_str());
    let driver = require_capability(lookup(id)?, Capability::Embedding, "embedding")?;
    if driver.id == "mock" {
        return Ok(Box::new(MockEmbedding));
    }
    let key = env.resolve_api_key(driver);
    if key.is_none() && driver.requires_api_key {
        return Err(ProviderError::MissingApiKey(driver.id.to_string()));
    }
    let base = env
        .base_url(driver)
        .ok_or_else(|| ProviderError::UnknownProvider(format!("{id}: no base URL")))?;
    Ok(Box::new(HttpEmbedding::new(
        driver.id,
        default_embedding_model(driver.id),
        base,
        key,
    )))
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{collect_response, ChatMessage};
    use relay_store::MemoryCache;

    fn mock_env() -> ProviderEnv {
        ProviderEnv::new(ProvidersConfig {
            default_chat: "mock".into(),
            default_embedding: "mock".into(),
            // Pin key resolution to a variable that never exists so tests do
            // not pick up real credentials from the host environment.
            api_key_env: Some("RELAY_TEST_NO_SUCH_KEY".into()),
            ..ProvidersConfig::default()
        })
    }

    fn req(text: &str) -> ChatRequest {
        ChatRequest {
            messages: vec![ChatMessage::user(text)],
            ..ChatRequest::default()
        }
    }

    #[tokio::test]
    async fn explicit_model_resolves_catalog_provider() {
        let cache = MemoryCache::default();
        let target =
            resolve_chat_target(&mock_env(), &cache, Some("gpt-4o"), None, "mistral-small").await;
        assert_eq!(target.provider, "openai");
        assert_eq!(target.model, "gpt-4o");
        assert!(target.explicit);
    }

    #[tokio::test]
    async fn explicit_provider_without_model_uses_default_model() {
        let cache = MemoryCache::default();
        let target =
            resolve_chat_target(&mock_env(), &cache, None, Some("groq"), "mistral-small").await;
        assert_eq!(target.provider, "groq");
        assert_eq!(target.model, "mistral-small");
        assert!(target.explicit);
    }

    #[tokio::test]
    async fn no_explicit_choice_targets_default_provider() {
        let cache = MemoryCache::default();
        let target = resolve_chat_target(&mock_env(), &cache, None, None, "mistral-small").await;
        assert_eq!(target.provider, "mock");
        assert!(!target.explicit);
    }

    #[tokio::test]
    async fn unknown_model_keeps_caller_provider() {
        let cache = MemoryCache::default();
        let target = resolve_chat_target(
            &mock_env(),
            &cache,
            Some("custom-finetune"),
            Some("openrouter"),
            "mistral-small",
        )
        .await;
        assert_eq!(target.provider, "openrouter");
        assert_eq!(target.model, "custom-finetune");
    }

    #[tokio::test]
    async fn mock_chat_provider_completes() {
        let env = mock_env();
        let target = ChatTarget {
            provider: "mock".into(),
            model: "mock-model".into(),
            explicit: false,
        };
        let (stream, served) = complete_chat(&env, &target, req("ping")).await.unwrap();
        let r = collect_response(stream).await.unwrap();
        assert_eq!(r.content, "MOCK: ping");
        assert_eq!(served.provider, "mock");
    }

    #[tokio::test]
    async fn explicit_target_does_not_fail_over() {
        let env = mock_env();
        let target = ChatTarget {
            provider: "openai".into(),
            model: "gpt-4o".into(),
            explicit: true,
        };
        // No OPENAI_API_KEY in the test environment → MissingApiKey, surfaced.
        let result = complete_chat(&env, &target, req("x")).await;
        assert!(matches!(result, Err(ProviderError::MissingApiKey(_))));
    }

    #[tokio::test]
    async fn non_explicit_target_fails_over_to_default() {
        let env = mock_env();
        let target = ChatTarget {
            provider: "openai".into(),
            model: "gpt-4o".into(),
            explicit: false,
        };
        let (stream, served) = complete_chat(&env, &target, req("hello")).await.unwrap();
        let r = collect_response(stream).await.unwrap();
        assert_eq!(served.provider, "mock", "must fall back to the default");
        assert!(r.content.contains("hello"));
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let env = mock_env();
        assert!(matches!(
            get_chat_provider("nope", "m", &env),
            Err(ProviderError::UnknownProvider(_))
        ));
    }

    #[test]
    fn capability_mismatch_is_rejected() {
        let env = mock_env();
        // elevenlabs serves speech, not chat
        assert!(matches!(
            get_chat_provider("elevenlabs", "m", &env),
            Err(ProviderError::UnsupportedCapability { .. })
        ));
    }

    #[test]
    fn media_factories_serve_mock() {
        let env = mock_env();
        assert!(get_image_provider(Some("mock"), &env).is_ok());
        assert!(get_speech_provider(Some("mock"), &env).is_ok());
        assert!(get_music_provider(Some("mock"), &env).is_ok());
        assert!(get_video_provider(Some("mock"), &env).is_ok());
        assert!(get_ocr_provider(Some("mock"), &env).is_ok());
        assert!(get_research_provider(Some("mock"), &env).is_ok());
        assert!(get_embedding_backend(Some("mock"), &env).is_ok());
    }

    #[test]
    fn capability_defaults_skip_the_mock() {
        assert_ne!(default_provider_for(Capability::Image), "mock");
        assert_ne!(default_provider_for(Capability::Research), "mock");
    }
}
