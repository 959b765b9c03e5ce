// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! Prompt augmentation: retrieve candidate contexts, optionally rerank with
//! the auxiliary model, summarise over-long contexts, and rewrite the query
//! into a grounded prompt.
//!
//! Augmentation is strictly best-effort: every failure path – retrieval,
//! rerank, summarisation, formatting – degrades toward returning the
//! original query untouched.  A chat request must never fail because its
//! retrieval garnish did.

use serde_json::{json, Value};
use tracing::warn;

use relay_config::RetrievalConfig;
use relay_provider::{collect_response, ChatMessage, ChatProvider, ChatRequest};

use crate::{get_namespace, Doc, EmbeddingService, MatchQuery};

/// Per-request overrides; unset fields fall back to [`RetrievalConfig`].
#[derive(Debug, Clone, Default)]
pub struct AugmentOptions {
    pub top_k: Option<usize>,
    pub score_threshold: Option<f64>,
    pub rerank_candidates: Option<usize>,
    pub namespace: Option<String>,
}

/// Handles the pipeline needs: the vector service and the auxiliary model.
pub struct AugmentDeps<'a> {
    pub service: &'a dyn EmbeddingService,
    pub auxiliary: &'a dyn ChatProvider,
    pub cfg: &'a RetrievalConfig,
}

/// Rewrite `query` into a context-grounded prompt.
///
/// Returns the original query unchanged when there are no matches or when
/// anything unexpected goes wrong.
pub async fn augment_prompt(
    query: &str,
    opts: &AugmentOptions,
    deps: &AugmentDeps<'_>,
    user_id: Option<u64>,
) -> String {
    match try_augment(query, opts, deps, user_id).await {
        Ok(Some(prompt)) => prompt,
        Ok(None) => query.to_string(),
        Err(e) => {
            warn!(error = %e, "prompt augmentation failed; using original query");
            query.to_string()
        }
    }
}

async fn try_augment(
    query: &str,
    opts: &AugmentOptions,
    deps: &AugmentDeps<'_>,
    user_id: Option<u64>,
) -> anyhow::Result<Option<String>> {
    // Short queries rarely benefit from more than one context.
    let top_k = opts.top_k.unwrap_or(if query.len() < 20 { 1 } else { 3 });
    let score_threshold = opts.score_threshold.unwrap_or(deps.cfg.score_threshold);
    let candidates = opts
        .rerank_candidates
        .unwrap_or(deps.cfg.rerank_candidates)
        .max(top_k);
    let namespace = get_namespace(opts.namespace.as_deref(), user_id);

    let mut docs = deps
        .service
        .search_similar(
            query,
            &MatchQuery {
                top_k: candidates,
                score_threshold,
                namespace,
                kind: None,
            },
        )
        .await?;

    if docs.is_empty() {
        return Ok(None);
    }

    if docs.len() > top_k && deps.cfg.rerank {
        docs = rerank(query, docs, deps).await;
    }
    docs.truncate(top_k);

    for doc in &mut docs {
        if doc.content.len() > deps.cfg.summary_threshold {
            if let Some(summary) = summarise(&doc.content, deps).await {
                doc.content = summary;
            }
        }
    }

    let contexts: Vec<Value> = docs
        .iter()
        .map(|d| {
            let mut ctx = json!({ "id": d.id, "content": d.content });
            if let Some(title) = &d.title {
                ctx["title"] = json!(title);
            }
            ctx
        })
        .collect();

    Ok(Some(format!(
        "Contexts (JSON array):\n{}\n\nAnswer the query \"{query}\" using *only* these contexts.",
        serde_json::to_string_pretty(&contexts)?
    )))
}

/// Ask the auxiliary model to reorder candidates by relevance.  Any failure
/// – transport, parse, or an id we did not send – keeps the dense order.
async fn rerank(query: &str, docs: Vec<Doc>, deps: &AugmentDeps<'_>) -> Vec<Doc> {
    let pairs: Vec<Value> = docs
        .iter()
        .map(|d| json!({ "id": d.id, "content": d.content }))
        .collect();
    let system = "You rank context snippets by relevance to a query. \
                  Reply with a JSON array of snippet ids, most relevant first. \
                  Reply with the JSON array only.";
    let user = format!(
        "Query: {query}\n\nSnippets:\n{}",
        serde_json::to_string(&pairs).unwrap_or_default()
    );

    let reply = match aux_complete(deps, system, &user).await {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "rerank call failed; keeping dense order");
            return docs;
        }
    };

    match parse_id_array(&reply) {
        Some(ids) if ids.iter().all(|id| docs.iter().any(|d| &d.id == id)) => {
            let mut reordered: Vec<Doc> = ids
                .iter()
                .filter_map(|id| docs.iter().find(|d| &d.id == id).cloned())
                .collect();
            // Ids the model dropped keep their dense order at the tail.
            for doc in docs {
                if !reordered.iter().any(|d| d.id == doc.id) {
                    reordered.push(doc);
                }
            }
            reordered
        }
        _ => {
            warn!("rerank reply unparseable or referenced unknown ids; keeping dense order");
            docs
        }
    }
}

async fn summarise(content: &str, deps: &AugmentDeps<'_>) -> Option<String> {
    let system = "Summarise the given content in at most 100 words. \
                  Keep concrete facts, names and numbers. Reply with the summary only.";
    match aux_complete(deps, system, content).await {
        Ok(summary) if !summary.trim().is_empty() => Some(summary.trim().to_string()),
        Ok(_) => None,
        Err(e) => {
            warn!(error = %e, "context summarisation failed; keeping original content");
            None
        }
    }
}

async fn aux_complete(
    deps: &AugmentDeps<'_>,
    system: &str,
    user: &str,
) -> anyhow::Result<String> {
    let req = ChatRequest {
        messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
        stream: false,
        ..ChatRequest::default()
    };
    let stream = deps.auxiliary.complete(req).await?;
    Ok(collect_response(stream).await?.content)
}

/// Extract an ordered array of string ids from a model reply, tolerating
/// code fences and surrounding prose.
fn parse_id_array(reply: &str) -> Option<Vec<String>> {
    let cleaned = reply
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    let candidate = if cleaned.starts_with('[') {
        cleaned.to_string()
    } else {
        let start = cleaned.find('[')?;
        let end = cleaned.rfind(']')?;
        if end <= start {
            return None;
        }
        cleaned[start..=end].to_string()
    };
    let parsed: Value = serde_json::from_str(&candidate).ok()?;
    let items = parsed.as_array()?;
    let ids: Vec<String> = items
        .iter()
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect();
    if ids.is_empty() {
        None
    } else {
        Some(ids)
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
