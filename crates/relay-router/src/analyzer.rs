// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! LLM-assisted prompt classification.
//!
//! The auxiliary model turns a prompt into a [`PromptRequirements`] JSON
//! object.  Model output is parsed tolerantly (fences stripped, envelope
//! fields unwrapped, balanced-brace extraction as a last resort) and then
//! normalised; only a reply with no usable capability lists is an error.

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use relay_provider::{collect_response, Attachment, ChatMessage, ChatProvider, ChatRequest};

use crate::{keyword_hits, PromptRequirements, CAPABILITY_LEXICONS};

#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// The auxiliary model's reply had no usable capability analysis.
    #[error("invalid AI analysis: {0}")]
    InvalidAiAnalysis(String),

    #[error("auxiliary model call failed: {0}")]
    Aux(String),
}

fn system_prompt(available_tools: &[String]) -> String {
    let capabilities: Vec<&str> = CAPABILITY_LEXICONS.iter().map(|(c, _)| *c).collect();
    format!(
        "You classify a user prompt for model routing.\n\
         Reply with a single JSON object, no prose, with exactly these fields:\n\
         expectedComplexity (integer 1-5), requiredCapabilities (array of strings),\n\
         estimatedInputTokens (integer), estimatedOutputTokens (integer),\n\
         needsFunctions (boolean), benefitsFromMultipleModels (boolean),\n\
         modelComparisonReason (string).\n\
         Available capabilities: {}.\n\
         Available tools: {}.",
        capabilities.join(", "),
        if available_tools.is_empty() {
            "none".to_string()
        } else {
            available_tools.join(", ")
        }
    )
}

/// Classify `prompt` into routing requirements.
pub async fn analyze_prompt(
    auxiliary: &dyn ChatProvider,
    prompt: &str,
    attachments: &[Attachment],
    budget: Option<f64>,
    available_tools: &[String],
) -> Result<PromptRequirements, AnalyzerError> {
    let has_images = attachments.iter().any(|a| a.is_image());
    let has_documents = attachments.iter().any(|a| a.is_document());

    let hits = keyword_hits(prompt);
    debug!(?hits, "keyword category hits");
    let hint = if hits.is_empty() {
        String::new()
    } else {
        let categories: Vec<&str> = hits.iter().map(|(c, _)| c.as_str()).collect();
        format!("\n\nKeyword analysis suggests: {}", categories.join(", "))
    };

    let req = ChatRequest {
        messages: vec![
            ChatMessage::system(system_prompt(available_tools)),
            ChatMessage::user(format!("Prompt to classify:\n{prompt}{hint}")),
        ],
        stream: false,
        ..ChatRequest::default()
    };
    let stream = auxiliary
        .complete(req)
        .await
        .map_err(|e| AnalyzerError::Aux(e.to_string()))?;
    let reply = collect_response(stream)
        .await
        .map_err(|e| AnalyzerError::Aux(e.to_string()))?
        .content;

    let parsed = parse_analysis_json(&reply)
        .ok_or_else(|| AnalyzerError::InvalidAiAnalysis("no JSON object in reply".into()))?;

    let mut requirements = normalise(&parsed)?;
    requirements.has_images = has_images;
    requirements.has_documents = has_documents;
    requirements.budget_constraint = budget;
    Ok(requirements)
}

/// Tolerant JSON extraction: strip code fences, unwrap common envelope
/// fields, and fall back to the first balanced `{…}` substring.
pub(crate) fn parse_analysis_json(reply: &str) -> Option<Value> {
    let cleaned = reply
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let direct: Option<Value> = serde_json::from_str(cleaned).ok();
    if let Some(v) = direct {
        // Accept either the object itself or a chat-completion envelope.
        if let Some(content) = v
            .pointer("/choices/0/message/content")
            .and_then(|c| c.as_str())
        {
            return parse_analysis_json(content);
        }
        if let Some(content) = v.get("response").and_then(|c| c.as_str()) {
            return parse_analysis_json(content);
        }
        if v.is_object() {
            return Some(v);
        }
    }

    // Last resort: first balanced object substring.
    let start = cleaned.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, ch) in cleaned[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    let candidate = &cleaned[start..=start + i];
                    return serde_json::from_str(candidate).ok();
                }
            }
            _ => {}
        }
    }
    None
}

fn string_list(v: &Value, key: &str) -> Option<Vec<String>> {
    v.get(key).and_then(|x| x.as_array()).map(|a| {
        a.iter()
            .filter_map(|x| x.as_str())
            .map(str::to_string)
            .collect()
    })
}

fn normalise(v: &Value) -> Result<PromptRequirements, AnalyzerError> {
    let required = string_list(v, "requiredCapabilities")
        .or_else(|| string_list(v, "required_capabilities"));
    let critical = string_list(v, "criticalCapabilities")
        .or_else(|| string_list(v, "critical_capabilities"));
    // One usable list is enough; both missing means the model ignored the
    // schema and the caller must fall back.
    let (required, critical) = match (required, critical) {
        (None, None) => {
            return Err(AnalyzerError::InvalidAiAnalysis(
                "capability lists missing".into(),
            ))
        }
        (r, c) => (r.unwrap_or_default(), c.unwrap_or_default()),
    };

    let complexity = v
        .get("expectedComplexity")
        .and_then(|x| x.as_i64())
        .unwrap_or(1)
        .clamp(1, 5) as u8;
    let input_tokens = v
        .get("estimatedInputTokens")
        .and_then(|x| x.as_i64())
        .unwrap_or(0)
        .max(0) as u32;
    let output_tokens = v
        .get("estimatedOutputTokens")
        .and_then(|x| x.as_i64())
        .unwrap_or(0)
        .max(0) as u32;

    Ok(PromptRequirements {
        expected_complexity: complexity,
        required_capabilities: required,
        critical_capabilities: critical,
        estimated_input_tokens: input_tokens,
        estimated_output_tokens: output_tokens,
        needs_functions: v
            .get("needsFunctions")
            .and_then(|x| x.as_bool())
            .unwrap_or(false),
        has_images: false,
        has_documents: false,
        benefits_from_multiple_models: v
            .get("benefitsFromMultipleModels")
            .and_then(|x| x.as_bool())
            .unwrap_or(false),
        model_comparison_reason: v
            .get("modelComparisonReason")
            .and_then(|x| x.as_str())
            .map(str::to_string),
        budget_constraint: None,
    })
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
