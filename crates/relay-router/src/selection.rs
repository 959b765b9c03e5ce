// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! Model selection on top of the ranking function.

use std::cmp::Ordering;

use tracing::error;

use relay_catalog::ModelDescriptor;
use relay_config::RouterConfig;

use crate::{score_model, PromptRequirements};

/// Capabilities whose presence (with enough complexity) makes a second
/// opinion worthwhile.
const COMPARISON_CAPABILITIES: &[&str] = &["general_knowledge", "creative", "reasoning"];

struct Scored<'a> {
    model: &'a ModelDescriptor,
    score: f64,
}

/// Deterministic candidate order: score, router membership, lower cost,
/// then name.  Keeps selection stable when scores tie.
fn rank<'a>(
    models: &'a [ModelDescriptor],
    r: &PromptRequirements,
    cfg: &RouterConfig,
) -> Vec<Scored<'a>> {
    let mut scored: Vec<Scored<'a>> = models
        .iter()
        .map(|m| Scored {
            model: m,
            score: score_model(m, r, cfg),
        })
        .collect();
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.model.included_in_router.cmp(&a.model.included_in_router))
            .then_with(|| {
                a.model
                    .combined_cost()
                    .partial_cmp(&b.model.combined_cost())
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| a.model.matching_model.cmp(&b.model.matching_model))
    });
    scored
}

/// Pick the single best model.  Total: any empty/zero-score outcome – or a
/// panicking scorer upstream – resolves to the configured default model.
pub fn select_model(
    models: &[ModelDescriptor],
    r: &PromptRequirements,
    cfg: &RouterConfig,
) -> String {
    let ranked = rank(models, r, cfg);
    match ranked.first() {
        Some(top) if top.score > 0.0 => top.model.matching_model.clone(),
        _ => {
            if models.is_empty() {
                error!("no candidate models; routing to default");
            }
            cfg.default_model.clone()
        }
    }
}

fn should_compare(r: &PromptRequirements) -> bool {
    r.expected_complexity >= 3
        && r.required_capabilities
            .iter()
            .any(|c| COMPARISON_CAPABILITIES.contains(&c.as_str()))
}

/// Pick up to `cfg.max_comparison_models` models.
///
/// The top model always comes first.  A second model joins only when
/// comparison fires, it scores within `cfg.comparison_score_threshold` of
/// the top, and – preferentially – it comes from a different provider.
/// With no qualifying peer the result stays `[top]`.
pub fn select_multiple_models(
    models: &[ModelDescriptor],
    r: &PromptRequirements,
    cfg: &RouterConfig,
) -> Vec<String> {
    let ranked = rank(models, r, cfg);
    let Some(top) = ranked.first().filter(|t| t.score > 0.0) else {
        return vec![cfg.default_model.clone()];
    };

    let mut selected = vec![top.model.matching_model.clone()];
    if !should_compare(r) {
        return selected;
    }

    let threshold = top.score - cfg.comparison_score_threshold;
    // Different-provider candidates first, same-provider as fallback.
    let peer = ranked[1..]
        .iter()
        .filter(|s| s.score > 0.0 && s.score >= threshold)
        .find(|s| s.model.provider != top.model.provider)
        .or_else(|| {
            ranked[1..]
                .iter()
                .find(|s| s.score > 0.0 && s.score >= threshold)
        });

    if let Some(peer) = peer {
        selected.push(peer.model.matching_model.clone());
    }
    selected.truncate(cfg.max_comparison_models.max(1));
    selected
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn model(id: &str, provider: &str) -> ModelDescriptor {
        let mut m = relay_catalog::static_catalog()[0].clone();
        m.matching_model = id.to_string();
        m.name = id.to_string();
        m.provider = provider.to_string();
        m.strengths = vec!["general_knowledge".into(), "reasoning".into()];
        m.context_complexity = 3;
        m.reliability = 4;
        m.speed = 2;
        m.multimodal = false;
        m.cost_per_1k_input_tokens = 0.001;
        m.cost_per_1k_output_tokens = 0.002;
        m.included_in_router = true;
        m.is_free = false;
        m
    }

    fn requirements() -> PromptRequirements {
        PromptRequirements {
            expected_complexity: 3,
            required_capabilities: vec!["general_knowledge".into()],
            estimated_input_tokens: 500,
            estimated_output_tokens: 500,
            ..PromptRequirements::default()
        }
    }

    #[test]
    fn returns_default_when_no_candidates() {
        let cfg = RouterConfig::default();
        let picked = select_model(&[], &requirements(), &cfg);
        assert_eq!(picked, cfg.default_model);
    }

    #[test]
    fn returns_default_when_nothing_scores_positive() {
        let cfg = RouterConfig::default();
        let models = vec![model("a", "workers")];
        let r = PromptRequirements::default(); // empty requirements → score 0
        assert_eq!(select_model(&models, &r, &cfg), cfg.default_model);
    }

    #[test]
    fn critical_capability_filters_candidates() {
        let cfg = RouterConfig::default();
        let mut seeing = model("seeing", "openai");
        seeing.strengths.push("vision".into());
        let blind = model("blind", "workers");

        let mut r = requirements();
        r.critical_capabilities = vec!["vision".into()];
        assert_eq!(select_model(&[blind, seeing], &r, &cfg), "seeing");
    }

    #[test]
    fn multimodal_preferred_for_image_prompts() {
        let cfg = RouterConfig::default();
        let mut mm = model("mm", "openai");
        mm.multimodal = true;
        let plain = model("plain", "workers");

        let mut r = requirements();
        r.has_images = true;
        assert_eq!(select_model(&[plain, mm], &r, &cfg), "mm");
    }

    #[test]
    fn budget_prefers_cheap_model() {
        let cfg = RouterConfig::default();
        let mut cheap = model("cheap", "workers");
        cheap.cost_per_1k_input_tokens = 0.001;
        cheap.cost_per_1k_output_tokens = 0.002;
        let mut expensive = model("expensive", "openai");
        expensive.cost_per_1k_input_tokens = 0.1;
        expensive.cost_per_1k_output_tokens = 0.2;

        let mut r = requirements();
        r.budget_constraint = Some(50.0);
        assert_eq!(select_model(&[expensive, cheap], &r, &cfg), "cheap");
    }

    #[test]
    fn tie_breaks_are_deterministic() {
        let cfg = RouterConfig::default();
        // Identical models except the name: alphabetical order decides.
        let a = model("aaa", "workers");
        let b = model("bbb", "workers");
        assert_eq!(select_model(&[b.clone(), a.clone()], &requirements(), &cfg), "aaa");
        assert_eq!(select_model(&[a, b], &requirements(), &cfg), "aaa");
    }

    #[test]
    fn tie_prefers_router_membership_then_cost() {
        let cfg = RouterConfig::default();
        let mut outside = model("outside", "workers");
        outside.included_in_router = false;
        let inside = model("zzz-inside", "workers");
        assert_eq!(
            select_model(&[outside, inside], &requirements(), &cfg),
            "zzz-inside"
        );
    }

    #[test]
    fn comparison_fires_for_complex_reasoning() {
        let cfg = RouterConfig::default();
        let a = model("a", "workers");
        let b = model("b", "openai");

        let mut r = requirements();
        r.expected_complexity = 4;
        r.required_capabilities = vec!["reasoning".into()];
        let picked = select_multiple_models(&[a, b], &r, &cfg);
        assert_eq!(picked.len(), 2);
        assert_eq!(picked[0], "a");
        assert_eq!(picked[1], "b", "second pick should come from another provider");
    }

    #[test]
    fn comparison_does_not_fire_for_simple_prompts() {
        let cfg = RouterConfig::default();
        let a = model("a", "workers");
        let b = model("b", "openai");

        let mut r = requirements();
        r.expected_complexity = 2;
        assert_eq!(select_multiple_models(&[a, b], &r, &cfg).len(), 1);
    }

    #[test]
    fn comparison_without_close_peer_returns_top_only() {
        let cfg = RouterConfig::default();
        let a = model("a", "workers");
        let mut far = model("far", "openai");
        // Bad complexity match and partial capability coverage push the
        // peer's score well below the 3.0 threshold window.
        far.context_complexity = 1;
        far.strengths = vec!["chat".into()];
        far.cost_per_1k_input_tokens = 0.3;
        far.cost_per_1k_output_tokens = 0.3;
        far.reliability = 1;
        far.speed = 5;

        let mut r = requirements();
        r.expected_complexity = 4;
        r.required_capabilities = vec!["reasoning".into(), "general_knowledge".into()];
        let picked = select_multiple_models(&[a, far], &r, &cfg);
        assert_eq!(picked, vec!["a".to_string()]);
    }

    #[test]
    fn same_provider_peer_is_fallback_choice() {
        let cfg = RouterConfig::default();
        let a = model("a", "workers");
        let b = model("b", "workers");

        let mut r = requirements();
        r.expected_complexity = 4;
        r.required_capabilities = vec!["reasoning".into()];
        let picked = select_multiple_models(&[a, b], &r, &cfg);
        // Both from "workers": still allowed as fallback within threshold.
        assert_eq!(picked.len(), 2);
    }

    #[test]
    fn selection_never_returns_empty() {
        let cfg = RouterConfig::default();
        let picked = select_multiple_models(&[], &PromptRequirements::default(), &cfg);
        assert_eq!(picked, vec![cfg.default_model]);
    }
}
