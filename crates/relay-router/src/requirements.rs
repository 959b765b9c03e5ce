// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: Apache-2.0
use serde::{Deserialize, Serialize};

/// What a prompt needs from a model, as classified by the analyser.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptRequirements {
    /// 1..5
    pub expected_complexity: u8,
    /// Capabilities that improve the answer.
    pub required_capabilities: Vec<String>,
    /// Capabilities the answer is impossible without; models lacking any of
    /// these are vetoed outright.
    #[serde(default)]
    pub critical_capabilities: Vec<String>,
    pub estimated_input_tokens: u32,
    pub estimated_output_tokens: u32,
    #[serde(default)]
    pub needs_functions: bool,
    #[serde(default)]
    pub has_images: bool,
    #[serde(default)]
    pub has_documents: bool,
    #[serde(default)]
    pub benefits_from_multiple_models: bool,
    #[serde(default)]
    pub model_comparison_reason: Option<String>,
    /// Maximum spend the caller allows for this turn, in USD.
    #[serde(default)]
    pub budget_constraint: Option<f64>,
}

/// Capability categories and the keywords that hint at them.
///
/// The analyser uses these twice: as the keyword filter input and, when the
/// filter finds nothing, for the naive token-matching fallback.
pub const CAPABILITY_LEXICONS: &[(&str, &[&str])] = &[
    (
        "coding",
        &[
            "code", "function", "bug", "compile", "rust", "python", "javascript", "sql",
            "refactor", "debug", "api", "regex",
        ],
    ),
    (
        "math",
        &[
            "calculate", "equation", "integral", "derivative", "probability", "algebra",
            "geometry", "sum", "percentage",
        ],
    ),
    (
        "creative",
        &[
            "story", "poem", "lyrics", "brainstorm", "slogan", "fiction", "creative",
            "imagine", "write me",
        ],
    ),
    (
        "reasoning",
        &[
            "why", "explain", "analyze", "compare", "evaluate", "pros and cons", "logic",
            "step by step", "reason",
        ],
    ),
    (
        "general_knowledge",
        &[
            "what is", "who is", "when did", "where is", "history", "define", "capital",
            "fact",
        ],
    ),
    (
        "vision",
        &["image", "picture", "photo", "screenshot", "diagram", "chart"],
    ),
    (
        "search_grounding",
        &["latest", "today", "current", "news", "recent", "price now"],
    ),
    (
        "summarization",
        &["summarize", "summarise", "tl;dr", "shorten", "key points", "digest"],
    ),
    (
        "multilingual",
        &["translate", "translation", "french", "german", "spanish", "japanese"],
    ),
];

/// Count lexicon keyword hits per capability for a prompt.
///
/// Matching is case-insensitive substring search.  When no category scores
/// a hit, the naive fallback tokenises the prompt and matches single-word
/// keywords exactly.
pub fn keyword_hits(prompt: &str) -> Vec<(String, usize)> {
    let lowered = prompt.to_lowercase();
    let mut hits: Vec<(String, usize)> = CAPABILITY_LEXICONS
        .iter()
        .map(|(category, keywords)| {
            let count = keywords.iter().filter(|k| lowered.contains(*k)).count();
            (category.to_string(), count)
        })
        .filter(|(_, count)| *count > 0)
        .collect();

    if hits.is_empty() {
        let tokens: Vec<&str> = lowered.split_whitespace().collect();
        hits = CAPABILITY_LEXICONS
            .iter()
            .map(|(category, keywords)| {
                let count = keywords
                    .iter()
                    .filter(|k| !k.contains(' ') && tokens.contains(k))
                    .count();
                (category.to_string(), count)
            })
            .filter(|(_, count)| *count > 0)
            .collect();
    }

    hits.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    hits
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coding_prompt_hits_coding_category() {
        let hits = keyword_hits("please debug this rust function");
        assert_eq!(hits[0].0, "coding");
    }

    #[test]
    fn hits_are_sorted_by_count_descending() {
        let hits = keyword_hits("write a story: a poem about code");
        assert!(hits.len() >= 2);
        for pair in hits.windows(2) {
            assert!(pair[0].1 >= pair[1].1);
        }
    }

    #[test]
    fn unmatched_prompt_yields_no_hits() {
        assert!(keyword_hits("qwerty asdf zxcv").is_empty());
    }

    #[test]
    fn requirements_deserialize_with_defaults() {
        let r: PromptRequirements = serde_json::from_str(
            r#"{"expected_complexity":3,"required_capabilities":["coding"],
                "estimated_input_tokens":10,"estimated_output_tokens":20}"#,
        )
        .unwrap();
        assert!(!r.has_images);
        assert!(r.critical_capabilities.is_empty());
        assert!(r.budget_constraint.is_none());
    }
}
