// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! Output guardrails.
//!
//! The policy engine is deliberately swappable: the orchestrator only
//! knows the [`Guardrails`] trait.  The bundled implementation checks a
//! configured deny-pattern list (regular expressions, matched
//! case-insensitively) and an output length cap.

use regex::RegexBuilder;
use tracing::warn;

use relay_config::GuardrailsConfig;

/// A policy violation found in assistant output.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub reason: String,
}

pub trait Guardrails: Send + Sync {
    /// `Some(violation)` when the text breaches policy.
    fn check(&self, text: &str) -> Option<Violation>;

    /// The safe templated response substituted on violation.
    fn safe_response(&self) -> String;
}

/// Deny-pattern guardrails driven by configuration.
pub struct PatternGuardrails {
    cfg: GuardrailsConfig,
    patterns: Vec<(String, regex::Regex)>,
}

impl PatternGuardrails {
    pub fn new(cfg: GuardrailsConfig) -> Self {
        let patterns = cfg
            .deny_patterns
            .iter()
            .filter(|p| !p.is_empty())
            .filter_map(|p| {
                // A pattern that fails to compile as a regex is matched as a
                // literal instead of being silently dropped.
                let compiled = RegexBuilder::new(p)
                    .case_insensitive(true)
                    .build()
                    .or_else(|e| {
                        warn!(pattern = %p, error = %e, "deny pattern is not a valid regex; matching literally");
                        RegexBuilder::new(&regex::escape(p))
                            .case_insensitive(true)
                            .build()
                    })
                    .ok()?;
                Some((p.clone(), compiled))
            })
            .collect();
        Self { cfg, patterns }
    }
}

impl Guardrails for PatternGuardrails {
    fn check(&self, text: &str) -> Option<Violation> {
        if !self.cfg.enabled {
            return None;
        }
        if self.cfg.max_output_chars > 0 && text.len() > self.cfg.max_output_chars {
            return Some(Violation {
                reason: format!(
                    "output length {} exceeds cap {}",
                    text.len(),
                    self.cfg.max_output_chars
                ),
            });
        }
        for (source, pattern) in &self.patterns {
            if pattern.is_match(text) {
                return Some(Violation {
                    reason: format!("matched deny pattern: {source}"),
                });
            }
        }
        None
    }

    fn safe_response(&self) -> String {
        self.cfg.violation_message.clone()
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn guard(patterns: &[&str], max_chars: usize) -> PatternGuardrails {
        PatternGuardrails::new(GuardrailsConfig {
            enabled: true,
            deny_patterns: patterns.iter().map(|s| s.to_string()).collect(),
            max_output_chars: max_chars,
            violation_message: "blocked".into(),
        })
    }

    #[test]
    fn clean_text_passes() {
        assert!(guard(&["forbidden"], 0).check("a pleasant reply").is_none());
    }

    #[test]
    fn deny_pattern_matches_case_insensitively() {
        let v = guard(&["forbidden phrase"], 0)
            .check("this contains the FORBIDDEN phrase indeed")
            .unwrap();
        assert!(v.reason.contains("deny pattern"));
    }

    #[test]
    fn regex_patterns_are_supported() {
        let g = guard(&[r"\bssn:\s*\d{3}-\d{2}-\d{4}\b"], 0);
        assert!(g.check("here: ssn: 123-45-6789").is_some());
        assert!(g.check("no identifiers here").is_none());
    }

    #[test]
    fn invalid_regex_falls_back_to_literal_match() {
        // "c++ (unclosed" is not a valid regex; it must still match literally.
        let g = guard(&["c++ (unclosed"], 0);
        assert!(g.check("about c++ (unclosed parens").is_some());
    }

    #[test]
    fn length_cap_trips() {
        let v = guard(&[], 10).check("a very long reply indeed").unwrap();
        assert!(v.reason.contains("exceeds cap"));
    }

    #[test]
    fn disabled_guardrails_pass_everything() {
        let g = PatternGuardrails::new(GuardrailsConfig {
            enabled: false,
            deny_patterns: vec!["bad".into()],
            ..GuardrailsConfig::default()
        });
        assert!(g.check("bad bad bad").is_none());
    }

    #[test]
    fn safe_response_comes_from_config() {
        assert_eq!(guard(&[], 0).safe_response(), "blocked");
    }
}
