// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: MIT
//! Uniform invocation surface over heterogeneous upstream AI APIs.
//!
//! One trait per capability (chat, embedding, image, speech, music, video,
//! OCR, research), a static driver registry describing every supported
//! provider, a shared OpenAI-compatible wire implementation, and factories
//! that resolve provider names with single-retry failover for chat.

mod chat;
mod embedding;
mod error;
mod factory;
mod media;
pub mod metrics;
mod mock;
mod openai_compat;
pub mod registry;
mod research;
mod types;

pub use chat::{collect_response, ChatProvider, ResponseStream};
pub use embedding::{EmbeddingBackend, HttpEmbedding, MockEmbedding, MOCK_EMBEDDING_DIM};
pub use error::ProviderError;
pub use factory::{
    complete_chat, default_provider_for, get_chat_provider, get_embedding_backend,
    get_image_provider, get_music_provider, get_ocr_provider, get_research_provider,
    get_speech_provider, get_video_provider, resolve_chat_target, ChatTarget, ProviderEnv,
};
pub use media::{
    ImageProvider, ImageRequest, JsonEndpoint, MediaResult, MockMedia, MusicProvider,
    MusicRequest, OcrProvider, OcrRequest, OcrResult, SpeechProvider, SpeechRequest,
    VideoProvider, VideoRequest,
};
pub use metrics::{record_usage, track_provider_metrics, ProviderCall};
pub use mock::{EchoChat, FlakyChat, ScriptedChat};
pub use openai_compat::{AuthStyle, OpenAiCompatChat};
pub use registry::{drivers_for, get_driver, list_drivers, Capability, DriverMeta};
pub use research::{
    AsyncInvocation, HttpResearch, MockResearch, PollTarget, ResearchOutcome, ResearchProvider,
};
pub use types::*;
