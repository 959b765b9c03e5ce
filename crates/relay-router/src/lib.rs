// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! Model routing: classify a prompt into requirements, score accessible
//! models against them, and pick the model (or small comparison set) that
//! serves the turn.  Routing is total – every failure path degrades to the
//! configured default model rather than failing the request.

mod analyzer;
mod requirements;
mod scoring;
mod selection;

pub use analyzer::{analyze_prompt, AnalyzerError};
pub use requirements::{keyword_hits, PromptRequirements, CAPABILITY_LEXICONS};
pub use scoring::score_model;
pub use selection::{select_model, select_multiple_models};
