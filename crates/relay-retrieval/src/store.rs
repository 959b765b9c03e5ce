// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! In-process vector store with cosine ranking.
//!
//! Backs the CLI and the test suite; a managed vector index implements the
//! same [`EmbeddingService`] trait remotely.  Vectors come from whichever
//! [`EmbeddingBackend`] the store was built with, so the matching logic is
//! identical for mock and live embeddings.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use relay_provider::EmbeddingBackend;

use crate::{
    EmbeddingService, InsertStatus, MatchQuery, MatchResult, RetrievalError, VectorMatch,
    VectorRecord,
};

pub struct MemoryVectorStore {
    backend: Arc<dyn EmbeddingBackend>,
    namespaces: RwLock<HashMap<String, Vec<VectorRecord>>>,
}

impl MemoryVectorStore {
    pub fn new(backend: Arc<dyn EmbeddingBackend>) -> Self {
        Self {
            backend,
            namespaces: RwLock::new(HashMap::new()),
        }
    }

    pub async fn len(&self, namespace: &str) -> usize {
        self.namespaces
            .read()
            .await
            .get(namespace)
            .map(|v| v.len())
            .unwrap_or(0)
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    (dot / (na * nb)) as f64
}

#[async_trait]
impl EmbeddingService for MemoryVectorStore {
    async fn generate(
        &self,
        kind: &str,
        content: &str,
        id: &str,
        metadata: Value,
    ) -> Result<Vec<VectorRecord>, RetrievalError> {
        if content.is_empty() {
            return Err(RetrievalError::Validation("content is empty".into()));
        }
        let vectors = self.backend.embed(&[content.to_string()]).await?;
        let vector = vectors.into_iter().next().unwrap_or_default();
        Ok(vec![VectorRecord {
            id: id.to_string(),
            kind: kind.to_string(),
            title: metadata
                .get("title")
                .and_then(|t| t.as_str())
                .map(str::to_string),
            content: content.to_string(),
            metadata,
            vector,
        }])
    }

    async fn insert(
        &self,
        records: Vec<VectorRecord>,
        namespace: &str,
    ) -> Result<InsertStatus, RetrievalError> {
        let mut namespaces = self.namespaces.write().await;
        let bucket = namespaces.entry(namespace.to_string()).or_default();
        let inserted = records.len();
        for record in records {
            // Same-id insert replaces the previous record.
            bucket.retain(|r| r.id != record.id);
            bucket.push(record);
        }
        Ok(InsertStatus {
            inserted,
            status: "ok".into(),
        })
    }

    async fn delete(&self, ids: &[String]) -> Result<usize, RetrievalError> {
        let mut namespaces = self.namespaces.write().await;
        let mut removed = 0;
        for bucket in namespaces.values_mut() {
            let before = bucket.len();
            bucket.retain(|r| !ids.contains(&r.id));
            removed += before - bucket.len();
        }
        Ok(removed)
    }

    async fn get_query(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        let vectors = self.backend.embed(&[text.to_string()]).await?;
        Ok(vectors.into_iter().next().unwrap_or_default())
    }

    async fn get_matches(
        &self,
        vector: &[f32],
        query: &MatchQuery,
    ) -> Result<MatchResult, RetrievalError> {
        let namespaces = self.namespaces.read().await;
        let Some(bucket) = namespaces.get(&query.namespace) else {
            return Ok(MatchResult::default());
        };
        let mut scored: Vec<VectorMatch> = bucket
            .iter()
            .filter(|r| query.kind.as_deref().map_or(true, |k| r.kind == k))
            .map(|r| VectorMatch {
                id: r.id.clone(),
                score: cosine(vector, &r.vector),
                title: r.title.clone(),
                content: r.content.clone(),
                metadata: r.metadata.clone(),
            })
            .filter(|m| m.score >= query.score_threshold)
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(query.top_k.max(1));
        Ok(MatchResult {
            count: scored.len(),
            matches: scored,
        })
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
