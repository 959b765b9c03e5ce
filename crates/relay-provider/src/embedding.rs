// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: MIT
//! Embedding generation backend.
//!
//! Vector storage and matching live in the retrieval crate; this trait only
//! turns text into vectors.  The mock derives deterministic pseudo-vectors
//! from character histograms so similarity is stable across runs and loosely
//! tracks lexical overlap.

use async_trait::async_trait;

use crate::ProviderError;

pub const MOCK_EMBEDDING_DIM: usize = 64;

#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    fn name(&self) -> &str;
    /// Embed each input text into one vector, preserving order.
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ProviderError>;
}

/// Deterministic embedding mock.
#[derive(Default)]
pub struct MockEmbedding;

fn pseudo_embed(text: &str) -> Vec<f32> {
    let mut v = vec![0f32; MOCK_EMBEDDING_DIM];
    for (i, b) in text.bytes().enumerate() {
        let idx = (b as usize + i / 7) % MOCK_EMBEDDING_DIM;
        v[idx] += 1.0;
    }
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

#[async_trait]
impl EmbeddingBackend for MockEmbedding {
    fn name(&self) -> &str {
        "mock"
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        Ok(inputs.iter().map(|t| pseudo_embed(t)).collect())
    }
}

/// OpenAI-compatible `/embeddings` endpoint backend.
pub struct HttpEmbedding {
    provider: String,
    model: String,
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpEmbedding {
    pub fn new(
        provider: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            base_url: base_url.into(),
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl EmbeddingBackend for HttpEmbedding {
    fn name(&self) -> &str {
        &self.provider
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let url = format!("{}/embeddings", self.base_url.trim_end_matches('/'));
        let mut req = self.client.post(&url).json(&serde_json::json!({
            "model": self.model,
            "input": inputs,
        }));
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().await.map_err(|e| ProviderError::Network {
            provider: self.provider.clone(),
            message: e.to_string(),
        })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ProviderError::Upstream {
                provider: self.provider.clone(),
                status: status.as_u16(),
                message: resp.text().await.unwrap_or_default(),
            });
        }
        let body: serde_json::Value =
            resp.json().await.map_err(|e| ProviderError::Network {
                provider: self.provider.clone(),
                message: e.to_string(),
            })?;
        let mut vectors = Vec::with_capacity(inputs.len());
        if let Some(rows) = body["data"].as_array() {
            for row in rows {
                let v: Vec<f32> = row["embedding"]
                    .as_array()
                    .map(|a| {
                        a.iter()
                            .filter_map(|x| x.as_f64())
                            .map(|x| x as f32)
                            .collect()
                    })
                    .unwrap_or_default();
                vectors.push(v);
            }
        }
        Ok(vectors)
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
