// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: MIT
//! Driver registry: static metadata for every supported upstream provider.
//!
//! This module is the single source of truth for which provider ids exist,
//! what their defaults are, and which capabilities each one serves.  It
//! contains no construction logic – that lives in the capability factories.

/// A media/ability class served by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Chat,
    Embedding,
    Image,
    Speech,
    Music,
    Video,
    Ocr,
    Research,
}

/// Metadata describing a registered provider driver.
#[derive(Debug, Clone)]
pub struct DriverMeta {
    /// Unique provider id used in requests and settings (e.g. `"openai"`).
    pub id: &'static str,
    /// Human-readable display name.
    pub name: &'static str,
    /// One-line description shown by `relay list-providers`.
    pub description: &'static str,
    /// Default environment variable that holds the API key.
    /// `None` for providers that require no key.
    pub default_api_key_env: Option<&'static str>,
    /// Default base URL when config does not override it.
    pub default_base_url: Option<&'static str>,
    pub requires_api_key: bool,
    /// Capabilities this provider serves.
    pub capabilities: &'static [Capability],
}

use Capability::*;

/// Complete registry of supported drivers.
pub static DRIVERS: &[DriverMeta] = &[
    DriverMeta {
        id: "workers",
        name: "Workers AI",
        description: "Edge-hosted open models; the free tier and router default",
        default_api_key_env: Some("WORKERS_API_KEY"),
        default_base_url: Some("https://api.workers-ai.example.com/v1"),
        requires_api_key: false,
        capabilities: &[Chat, Embedding, Image, Speech, Ocr],
    },
    DriverMeta {
        id: "openai",
        name: "OpenAI",
        description: "GPT and o-series chat models, DALL-E images, Whisper",
        default_api_key_env: Some("OPENAI_API_KEY"),
        default_base_url: Some("https://api.openai.com/v1"),
        requires_api_key: true,
        capabilities: &[Chat, Embedding, Image, Speech],
    },
    DriverMeta {
        id: "anthropic",
        name: "Anthropic",
        description: "Claude chat models",
        default_api_key_env: Some("ANTHROPIC_API_KEY"),
        default_base_url: Some("https://api.anthropic.com/v1"),
        requires_api_key: true,
        capabilities: &[Chat],
    },
    DriverMeta {
        id: "google",
        name: "Google Gemini",
        description: "Gemini chat and multimodal models",
        default_api_key_env: Some("GEMINI_API_KEY"),
        default_base_url: Some("https://generativelanguage.googleapis.com/v1beta/openai"),
        requires_api_key: true,
        capabilities: &[Chat, Embedding, Ocr],
    },
    DriverMeta {
        id: "mistral",
        name: "Mistral AI",
        description: "Mistral chat models including Codestral",
        default_api_key_env: Some("MISTRAL_API_KEY"),
        default_base_url: Some("https://api.mistral.ai/v1"),
        requires_api_key: true,
        capabilities: &[Chat, Embedding, Ocr],
    },
    DriverMeta {
        id: "groq",
        name: "Groq",
        description: "LPU fast inference for open chat models",
        default_api_key_env: Some("GROQ_API_KEY"),
        default_base_url: Some("https://api.groq.com/openai/v1"),
        requires_api_key: true,
        capabilities: &[Chat, Speech],
    },
    DriverMeta {
        id: "openrouter",
        name: "OpenRouter",
        description: "Gateway to 200+ models from many providers",
        default_api_key_env: Some("OPENROUTER_API_KEY"),
        default_base_url: Some("https://openrouter.ai/api/v1"),
        requires_api_key: true,
        capabilities: &[Chat],
    },
    DriverMeta {
        id: "perplexity",
        name: "Perplexity",
        description: "Online search-grounded models and deep research",
        default_api_key_env: Some("PERPLEXITY_API_KEY"),
        default_base_url: Some("https://api.perplexity.ai"),
        requires_api_key: true,
        capabilities: &[Chat, Research],
    },
    DriverMeta {
        id: "xai",
        name: "xAI",
        description: "Grok chat models",
        default_api_key_env: Some("XAI_API_KEY"),
        default_base_url: Some("https://api.x.ai/v1"),
        requires_api_key: true,
        capabilities: &[Chat],
    },
    DriverMeta {
        id: "replicate",
        name: "Replicate",
        description: "Hosted open models for image, music and video generation",
        default_api_key_env: Some("REPLICATE_API_TOKEN"),
        default_base_url: Some("https://api.replicate.com/v1"),
        requires_api_key: true,
        capabilities: &[Image, Music, Video],
    },
    DriverMeta {
        id: "elevenlabs",
        name: "ElevenLabs",
        description: "Speech synthesis voices",
        default_api_key_env: Some("ELEVENLABS_API_KEY"),
        default_base_url: Some("https://api.elevenlabs.io/v1"),
        requires_api_key: true,
        capabilities: &[Speech],
    },
    DriverMeta {
        id: "vectorize",
        name: "Vectorize",
        description: "Managed vector index for embeddings storage and matching",
        default_api_key_env: Some("VECTORIZE_API_KEY"),
        default_base_url: Some("https://api.vectorize.example.com/v2"),
        requires_api_key: false,
        capabilities: &[Embedding],
    },
    DriverMeta {
        id: "mock",
        name: "Mock",
        description: "Deterministic mock driver for tests (no network)",
        default_api_key_env: None,
        default_base_url: None,
        requires_api_key: false,
        capabilities: &[Chat, Embedding, Image, Speech, Music, Video, Ocr, Research],
    },
];

/// Returns all registered drivers in declaration order.
pub fn list_drivers() -> &'static [DriverMeta] {
    DRIVERS
}

/// Look up a driver by its id.  Returns `None` for unknown ids.
pub fn get_driver(id: &str) -> Option<&'static DriverMeta> {
    DRIVERS.iter().find(|d| d.id == id)
}

/// Drivers serving a given capability, in declaration order.
pub fn drivers_for(capability: Capability) -> impl Iterator<Item = &'static DriverMeta> {
    DRIVERS
        .iter()
        .filter(move |d| d.capabilities.contains(&capability))
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
