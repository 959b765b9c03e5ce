// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: Apache-2.0
use serde::{Deserialize, Serialize};

/// Input/output modality lists, lowercase strings (`text`, `image`,
/// `audio`, `video`, `document`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Modalities {
    #[serde(default)]
    pub input: Vec<String>,
    #[serde(default)]
    pub output: Vec<String>,
}

/// Metadata for a single model, static for the process lifetime.
///
/// `matching_model` is the provider-facing identifier used for request
/// routing and as the cache key; `name` is the display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub matching_model: String,
    pub name: String,
    pub provider: String,
    #[serde(default)]
    pub modalities: Modalities,
    pub context_window: u32,
    pub max_tokens: u32,
    #[serde(default)]
    pub cost_per_1k_input_tokens: f64,
    #[serde(default)]
    pub cost_per_1k_output_tokens: f64,
    #[serde(default)]
    pub strengths: Vec<String>,
    /// 1..5 – how much prompt complexity the model comfortably absorbs.
    pub context_complexity: u8,
    /// 1..5 – observed upstream reliability.
    pub reliability: u8,
    /// 1..5 – 1 is fastest.
    pub speed: u8,
    #[serde(default)]
    pub multimodal: bool,
    #[serde(default)]
    pub supports_tool_calls: bool,
    #[serde(default)]
    pub supports_streaming: bool,
    #[serde(default)]
    pub supports_documents: bool,
    #[serde(default)]
    pub supports_search_grounding: bool,
    #[serde(default)]
    pub supports_code_execution: bool,
    #[serde(default)]
    pub is_free: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub included_in_router: bool,
    #[serde(default)]
    pub is_beta: bool,
}

impl ModelDescriptor {
    /// Combined per-1k token cost, the router's cost-efficiency input.
    pub fn combined_cost(&self) -> f64 {
        self.cost_per_1k_input_tokens + self.cost_per_1k_output_tokens
    }

    pub fn has_strength(&self, capability: &str) -> bool {
        self.strengths.iter().any(|s| s == capability)
    }

    pub fn accepts_modality(&self, modality: &str) -> bool {
        self.modalities.input.iter().any(|m| m == modality)
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combined_cost_sums_both_directions() {
        let mut d = crate::static_catalog()[0].clone();
        d.cost_per_1k_input_tokens = 0.1;
        d.cost_per_1k_output_tokens = 0.2;
        assert!((d.combined_cost() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn strength_lookup_is_exact_match() {
        let d = crate::find_descriptor("gpt-4o").unwrap();
        assert!(d.has_strength("reasoning"));
        assert!(!d.has_strength("reason"));
    }
}
