// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! The ranking function.
//!
//! Score components, in weight order: budget fit, capability coverage,
//! complexity match, cost efficiency, multimodal bonus, reliability, speed.
//! Two hard gates sit outside the weighted sum: a missing critical
//! capability vetoes the model (−∞) and a blown budget zeroes it.

use relay_catalog::ModelDescriptor;
use relay_config::RouterConfig;

use crate::PromptRequirements;

/// Estimated spend for running `r` against `m`, in USD.
fn estimated_cost(r: &PromptRequirements, m: &ModelDescriptor) -> f64 {
    (r.estimated_input_tokens as f64 / 1000.0) * m.cost_per_1k_input_tokens
        + (r.estimated_output_tokens as f64 / 1000.0) * m.cost_per_1k_output_tokens
}

/// Score one candidate model against the requirements.
///
/// Returns `f64::NEG_INFINITY` when a critical capability is missing and
/// `0.0` when the requirements are empty or the budget is exceeded.
pub fn score_model(m: &ModelDescriptor, r: &PromptRequirements, cfg: &RouterConfig) -> f64 {
    if r.critical_capabilities
        .iter()
        .any(|c| !m.has_strength(c))
    {
        return f64::NEG_INFINITY;
    }
    if r.required_capabilities.is_empty() {
        return 0.0;
    }

    let cost = estimated_cost(r, m);
    if let Some(budget) = r.budget_constraint {
        if cost > budget {
            return 0.0;
        }
    }

    let mut score = 0.0;

    let complexity_distance = (r.expected_complexity as f64 - m.context_complexity as f64).abs();
    score += cfg.weight_complexity * (5.0 - complexity_distance).max(0.0);

    if let Some(budget) = r.budget_constraint {
        if budget > 0.0 {
            score += cfg.weight_budget * (1.0 - cost / budget).max(0.0);
        }
    }

    score += cfg.weight_cost_efficiency / (1.0 + 10.0 * m.combined_cost());
    score += cfg.weight_reliability * m.reliability as f64;
    score += cfg.weight_speed * (6.0 - m.speed as f64);

    if r.has_images && m.multimodal {
        score += cfg.weight_multimodal;
    }

    let covered = r
        .required_capabilities
        .iter()
        .filter(|c| m.has_strength(c))
        .count();
    score += cfg.weight_capability * covered as f64 / r.required_capabilities.len() as f64;

    score
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn model(id: &str) -> ModelDescriptor {
        let mut m = relay_catalog::static_catalog()[0].clone();
        m.matching_model = id.to_string();
        m.name = id.to_string();
        m.provider = "workers".into();
        m.strengths = vec!["general_knowledge".into(), "chat".into()];
        m.context_complexity = 3;
        m.reliability = 4;
        m.speed = 2;
        m.multimodal = false;
        m.cost_per_1k_input_tokens = 0.001;
        m.cost_per_1k_output_tokens = 0.002;
        m.included_in_router = true;
        m
    }

    fn requirements() -> PromptRequirements {
        PromptRequirements {
            expected_complexity: 3,
            required_capabilities: vec!["general_knowledge".into()],
            estimated_input_tokens: 1000,
            estimated_output_tokens: 1000,
            ..PromptRequirements::default()
        }
    }

    #[test]
    fn empty_requirements_score_zero() {
        let m = model("m");
        let r = PromptRequirements::default();
        assert_eq!(score_model(&m, &r, &RouterConfig::default()), 0.0);
    }

    #[test]
    fn missing_critical_capability_is_vetoed() {
        let m = model("m");
        let mut r = requirements();
        r.critical_capabilities = vec!["vision".into()];
        assert_eq!(
            score_model(&m, &r, &RouterConfig::default()),
            f64::NEG_INFINITY
        );
    }

    #[test]
    fn blown_budget_scores_zero() {
        let mut m = model("pricey");
        m.cost_per_1k_input_tokens = 10.0;
        m.cost_per_1k_output_tokens = 10.0;
        let mut r = requirements();
        r.budget_constraint = Some(0.001);
        assert_eq!(score_model(&m, &r, &RouterConfig::default()), 0.0);
    }

    #[test]
    fn multimodal_bonus_applies_only_with_images() {
        let cfg = RouterConfig::default();
        let mut mm = model("mm");
        mm.multimodal = true;
        let plain = model("plain");

        let mut r = requirements();
        r.has_images = true;
        let boost = score_model(&mm, &r, &cfg) - score_model(&plain, &r, &cfg);
        assert!((boost - cfg.weight_multimodal).abs() < 1e-9);

        r.has_images = false;
        assert!((score_model(&mm, &r, &cfg) - score_model(&plain, &r, &cfg)).abs() < 1e-9);
    }

    #[test]
    fn cheaper_model_wins_under_binding_budget() {
        let cfg = RouterConfig::default();
        let mut cheap = model("cheap");
        cheap.cost_per_1k_input_tokens = 0.001;
        cheap.cost_per_1k_output_tokens = 0.002;
        let mut expensive = model("expensive");
        expensive.cost_per_1k_input_tokens = 0.1;
        expensive.cost_per_1k_output_tokens = 0.2;

        let mut r = requirements();
        r.budget_constraint = Some(50.0);
        assert!(
            score_model(&cheap, &r, &cfg) > score_model(&expensive, &r, &cfg),
            "budget and cost-efficiency terms must prefer the cheap model"
        );
    }

    #[test]
    fn complexity_match_beats_mismatch() {
        let cfg = RouterConfig::default();
        let matched = model("matched"); // complexity 3
        let mut mismatched = model("mismatched");
        mismatched.context_complexity = 5;
        let r = requirements(); // expected 3
        assert!(score_model(&matched, &r, &cfg) > score_model(&mismatched, &r, &cfg));
    }

    #[test]
    fn capability_coverage_is_proportional() {
        let cfg = RouterConfig::default();
        let full = model("full"); // has general_knowledge + chat
        let mut partial = model("partial");
        partial.strengths = vec!["chat".into()];

        let mut r = requirements();
        r.required_capabilities = vec!["general_knowledge".into(), "chat".into()];
        let diff = score_model(&full, &r, &cfg) - score_model(&partial, &r, &cfg);
        assert!((diff - cfg.weight_capability * 0.5).abs() < 1e-9);
    }
}
