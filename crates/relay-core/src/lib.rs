// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! The chat orchestrator: one call per incoming user turn, pulling the
//! router, providers, retrieval, tools, and conversation management into a
//! single pipeline with a typed error surface.

mod captcha;
mod context;
mod error;
mod guardrails;
mod orchestrator;
mod request;

pub use captcha::{outcome_from_response, verify_captcha, CaptchaOutcome};
pub use context::{CoreBuilder, OrchestratorInvoker};
pub use error::ChatError;
pub use guardrails::{Guardrails, PatternGuardrails, Violation};
pub use orchestrator::ChatOrchestrator;
pub use request::{
    AssistantReply, ChatCompletionRequest, ChatCompletionResponse, IncomingMessage,
};
