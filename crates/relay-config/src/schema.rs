// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: Apache-2.0
use serde::{Deserialize, Serialize};

/// Serde default helper – returns `true`.
///
/// `#[serde(default)]` on a `bool` always falls back to `bool::default()`
/// (i.e. `false`), so fields that should be enabled unless explicitly
/// disabled need a named function.
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub router: RouterConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub guardrails: GuardrailsConfig,
    #[serde(default)]
    pub captcha: CaptchaConfig,
}

/// Provider-layer configuration shared by the catalog access filter and the
/// capability factories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Comma-separated provider ids whose models every user may access
    /// without bringing their own credentials (e.g. `"workers,mistral"`).
    /// Parsed once per process by the catalog's access filter.
    #[serde(default)]
    pub always_enabled: String,
    /// Default provider id for the chat capability when neither an explicit
    /// model nor an explicit provider was requested.
    #[serde(default = "default_chat_provider")]
    pub default_chat: String,
    /// Default provider id for embedding generation and vector matching.
    #[serde(default = "default_embedding_provider")]
    pub default_embedding: String,
    /// Base URL override for OpenAI-compatible providers.  Useful for
    /// gateways and local inference servers; hosted defaults come from the
    /// driver registry.
    pub base_url: Option<String>,
    /// Explicit API key; prefer per-provider env vars (the driver registry
    /// knows the canonical variable for each provider id).
    pub api_key: Option<String>,
    /// Environment variable holding the API key, overriding the registry
    /// default for the selected provider.
    pub api_key_env: Option<String>,
}

fn default_chat_provider() -> String {
    "workers".into()
}
fn default_embedding_provider() -> String {
    "vectorize".into()
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            always_enabled: String::new(),
            default_chat: default_chat_provider(),
            default_embedding: default_embedding_provider(),
            base_url: None,
            api_key: None,
            api_key_env: None,
        }
    }
}

/// Model-router tunables.  The scoring weights mirror the documented ranking
/// function; changing them changes which model serves a prompt, so defaults
/// are part of the routing contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Fallback model (matching_model id) returned whenever routing cannot
    /// produce a positive-score candidate.  Routing never fails a request.
    #[serde(default = "default_router_model")]
    pub default_model: String,
    /// Small, cheap model used for internal work: prompt analysis,
    /// reranking, summarisation.
    #[serde(default = "default_aux_model")]
    pub auxiliary_model: String,
    #[serde(default = "default_weight_complexity")]
    pub weight_complexity: f64,
    #[serde(default = "default_weight_budget")]
    pub weight_budget: f64,
    #[serde(default = "default_weight_cost_efficiency")]
    pub weight_cost_efficiency: f64,
    #[serde(default = "default_weight_reliability")]
    pub weight_reliability: f64,
    #[serde(default = "default_weight_speed")]
    pub weight_speed: f64,
    #[serde(default = "default_weight_multimodal")]
    pub weight_multimodal: f64,
    #[serde(default = "default_weight_capability")]
    pub weight_capability: f64,
    /// Upper bound on the number of models returned for comparison mode.
    #[serde(default = "default_max_comparison_models")]
    pub max_comparison_models: usize,
    /// A second model qualifies for comparison when its score is within this
    /// distance of the top score.
    #[serde(default = "default_comparison_score_threshold")]
    pub comparison_score_threshold: f64,
}

fn default_router_model() -> String {
    "mistral-small".into()
}
fn default_aux_model() -> String {
    "mistral-small".into()
}
fn default_weight_complexity() -> f64 {
    2.0
}
fn default_weight_budget() -> f64 {
    3.0
}
fn default_weight_cost_efficiency() -> f64 {
    2.0
}
fn default_weight_reliability() -> f64 {
    1.0
}
fn default_weight_speed() -> f64 {
    1.0
}
fn default_weight_multimodal() -> f64 {
    5.0
}
fn default_weight_capability() -> f64 {
    4.0
}
fn default_max_comparison_models() -> usize {
    2
}
fn default_comparison_score_threshold() -> f64 {
    3.0
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            default_model: default_router_model(),
            auxiliary_model: default_aux_model(),
            weight_complexity: 2.0,
            weight_budget: 3.0,
            weight_cost_efficiency: 2.0,
            weight_reliability: 1.0,
            weight_speed: 1.0,
            weight_multimodal: 5.0,
            weight_capability: 4.0,
            max_comparison_models: 2,
            comparison_score_threshold: 3.0,
        }
    }
}

/// Retrieval-augmented prompting tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Minimum dense-similarity score for a match to be considered.
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f64,
    /// Number of candidate documents fetched before reranking.
    #[serde(default = "default_rerank_candidates")]
    pub rerank_candidates: usize,
    /// Context documents longer than this many characters are summarised by
    /// the auxiliary model before prompt injection.
    #[serde(default = "default_summary_threshold")]
    pub summary_threshold: usize,
    /// Attempt LLM reranking of candidates.  Disabled → dense-score order.
    #[serde(default = "default_true")]
    pub rerank: bool,
}

fn default_score_threshold() -> f64 {
    0.7
}
fn default_rerank_candidates() -> usize {
    10
}
fn default_summary_threshold() -> usize {
    750
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            score_threshold: 0.7,
            rerank_candidates: 10,
            summary_threshold: 750,
            rerank: true,
        }
    }
}

/// Quota, delegation, and tool-loop bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Monthly chat completions for the free plan.  Pro is uncapped here;
    /// per-call tool pricing still applies.
    #[serde(default = "default_free_monthly_messages")]
    pub free_monthly_messages: u64,
    /// Monthly premium tool invocations for the pro plan.
    #[serde(default = "default_pro_monthly_premium_calls")]
    pub pro_monthly_premium_calls: u64,
    /// Maximum nested delegation depth across a call chain.
    #[serde(default = "default_max_delegation_depth")]
    pub max_delegation_depth: usize,
    /// Sliding-window length for the delegation rate limit.
    #[serde(default = "default_delegation_window_ms")]
    pub delegation_window_ms: u64,
    /// Maximum delegations a user may start within one window.
    #[serde(default = "default_delegations_per_window")]
    pub max_delegations_per_window: usize,
    /// Maximum model↔tool rounds per chat turn before the orchestrator
    /// stops and returns what it has.
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,
}

fn default_free_monthly_messages() -> u64 {
    200
}
fn default_pro_monthly_premium_calls() -> u64 {
    500
}
fn default_max_delegation_depth() -> usize {
    3
}
fn default_delegation_window_ms() -> u64 {
    60_000
}
fn default_delegations_per_window() -> usize {
    10
}
fn default_max_tool_rounds() -> usize {
    10
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            free_monthly_messages: 200,
            pro_monthly_premium_calls: 500,
            max_delegation_depth: 3,
            delegation_window_ms: 60_000,
            max_delegations_per_window: 10,
            max_tool_rounds: 10,
        }
    }
}

/// Output guardrail policy.  Deliberately small: a deny-pattern list plus an
/// output length cap, behind a trait so hosts can plug a real policy engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardrailsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Case-insensitive substrings that must not appear in assistant output.
    #[serde(default)]
    pub deny_patterns: Vec<String>,
    /// Hard cap on assistant output length in characters (0 = unlimited).
    #[serde(default)]
    pub max_output_chars: usize,
    /// Message returned to the caller when a violation is detected.
    #[serde(default = "default_violation_message")]
    pub violation_message: String,
}

fn default_violation_message() -> String {
    "I can't help with that request. Please rephrase and try again.".into()
}

impl Default for GuardrailsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            deny_patterns: Vec::new(),
            max_output_chars: 0,
            violation_message: default_violation_message(),
        }
    }
}

/// Outbound captcha verification contract.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaptchaConfig {
    /// Verifier endpoint; empty disables verification.
    #[serde(default)]
    pub verify_url: String,
    #[serde(default)]
    pub secret: String,
    #[serde(default)]
    pub site_key: String,
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
