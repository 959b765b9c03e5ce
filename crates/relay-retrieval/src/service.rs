// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: Apache-2.0
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("embedding backend: {0}")]
    Backend(String),

    #[error("validation: {0}")]
    Validation(String),
}

impl From<relay_provider::ProviderError> for RetrievalError {
    fn from(e: relay_provider::ProviderError) -> Self {
        RetrievalError::Backend(e.to_string())
    }
}

/// One embedded record as stored in the vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    /// Record kind (`note`, `document`, `memory`, …); filterable at match time.
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub content: String,
    #[serde(default)]
    pub metadata: Value,
    pub vector: Vec<f32>,
}

/// One similarity match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorMatch {
    pub id: String,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub content: String,
    #[serde(default)]
    pub metadata: Value,
}

#[derive(Debug, Clone, Default)]
pub struct MatchQuery {
    pub top_k: usize,
    pub score_threshold: f64,
    pub namespace: String,
    /// Restrict matches to one record kind.
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MatchResult {
    pub matches: Vec<VectorMatch>,
    pub count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct InsertStatus {
    pub inserted: usize,
    pub status: String,
}

/// A retrieved document, the unit the augmentation pipeline works with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doc {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub content: String,
    pub score: f64,
    #[serde(default)]
    pub metadata: Value,
}

/// Provider-abstracted embedding service: generate vectors, maintain the
/// index, and answer similarity queries.  All writes are namespace-scoped;
/// callers derive the namespace through [`crate::get_namespace`].
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Embed `content` into one or more records ready for insertion.
    async fn generate(
        &self,
        kind: &str,
        content: &str,
        id: &str,
        metadata: Value,
    ) -> Result<Vec<VectorRecord>, RetrievalError>;

    /// Insert records under a namespace.
    async fn insert(
        &self,
        records: Vec<VectorRecord>,
        namespace: &str,
    ) -> Result<InsertStatus, RetrievalError>;

    /// Delete records by id across all namespaces.  Returns the number removed.
    async fn delete(&self, ids: &[String]) -> Result<usize, RetrievalError>;

    /// Embed a query string.
    async fn get_query(&self, text: &str) -> Result<Vec<f32>, RetrievalError>;

    /// Rank stored records against a query vector.
    async fn get_matches(
        &self,
        vector: &[f32],
        query: &MatchQuery,
    ) -> Result<MatchResult, RetrievalError>;

    /// Convenience: embed `query` and return matches as documents.
    async fn search_similar(
        &self,
        query: &str,
        match_query: &MatchQuery,
    ) -> Result<Vec<Doc>, RetrievalError> {
        let vector = self.get_query(query).await?;
        let result = self.get_matches(&vector, match_query).await?;
        Ok(result
            .matches
            .into_iter()
            .map(|m| Doc {
                id: m.id,
                title: m.title,
                content: m.content,
                score: m.score,
                metadata: m.metadata,
            })
            .collect())
    }
}
