// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: MIT
//! Deep-research capability.
//!
//! Research runs are long: a provider may answer synchronously or hand back
//! an async handle the client polls through the host's HTTP surface.  The
//! core only formats the handle – it never blocks waiting for completion.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::ProviderError;

/// Polling descriptor for an in-progress research run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsyncInvocation {
    pub provider: String,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "pollIntervalMs")]
    pub poll_interval_ms: u64,
    pub poll: PollTarget,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollTarget {
    pub url: String,
    pub method: String,
}

impl AsyncInvocation {
    pub fn research(provider: impl Into<String>, id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            provider: provider.into(),
            kind: "research".into(),
            poll_interval_ms: 5_000,
            poll: PollTarget {
                url: format!("/apps/retrieval/research/{id}"),
                method: "GET".into(),
            },
            id,
        }
    }
}

/// Outcome of starting or polling a research run.
#[derive(Debug, Clone)]
pub enum ResearchOutcome {
    Completed { content: String, data: Value },
    InProgress(AsyncInvocation),
}

#[async_trait]
pub trait ResearchProvider: Send + Sync {
    fn name(&self) -> &str;
    /// Start a research run.  May complete synchronously.
    async fn begin(&self, query: &str, depth: Option<&str>) -> Result<ResearchOutcome, ProviderError>;
    /// Poll a previously returned handle.
    async fn poll(&self, id: &str) -> Result<ResearchOutcome, ProviderError>;
}

/// HTTP research provider over a `/research` JSON endpoint.
///
/// The upstream decides sync vs async: a body with `status: "completed"`
/// carries the findings, anything else yields a poll handle built from the
/// upstream run id.
pub struct HttpResearch {
    provider: String,
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpResearch {
    pub fn new(
        provider: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            base_url: base_url.into(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    fn outcome_from(&self, body: Value) -> ResearchOutcome {
        if body["status"].as_str() == Some("completed") {
            return ResearchOutcome::Completed {
                content: body["content"].as_str().unwrap_or_default().to_string(),
                data: body,
            };
        }
        let id = body["id"].as_str().unwrap_or_default().to_string();
        ResearchOutcome::InProgress(AsyncInvocation::research(self.provider.clone(), id))
    }

    async fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ProviderError> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        let mut req = self.client.request(method, &url);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        if let Some(body) = body {
            req = req.json(&body);
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
        resp.json().await.map_err(|e| ProviderError::Network {
            provider: self.provider.clone(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl ResearchProvider for HttpResearch {
    fn name(&self) -> &str {
        &self.provider
    }

    async fn begin(&self, query: &str, depth: Option<&str>) -> Result<ResearchOutcome, ProviderError> {
        let body = self
            .request(
                reqwest::Method::POST,
                "/research",
                Some(json!({ "query": query, "depth": depth })),
            )
            .await?;
        Ok(self.outcome_from(body))
    }

    async fn poll(&self, id: &str) -> Result<ResearchOutcome, ProviderError> {
        let body = self
            .request(reqwest::Method::GET, &format!("/research/{id}"), None)
            .await?;
        Ok(self.outcome_from(body))
    }
}

/// Mock research provider: short queries complete synchronously, longer
/// ones return an async handle whose poll completes immediately.
#[derive(Default)]
pub struct MockResearch;

#[async_trait]
impl ResearchProvider for MockResearch {
    fn name(&self) -> &str {
        "mock"
    }

    async fn begin(&self, query: &str, depth: Option<&str>) -> Result<ResearchOutcome, ProviderError> {
        if depth == Some("deep") {
            return Ok(ResearchOutcome::InProgress(AsyncInvocation::research(
                "mock",
                format!("res-{}", query.len()),
            )));
        }
        Ok(ResearchOutcome::Completed {
            content: format!("[research summary for: {query}]"),
            data: json!({ "sources": [] }),
        })
    }

    async fn poll(&self, id: &str) -> Result<ResearchOutcome, ProviderError> {
        Ok(ResearchOutcome::Completed {
            content: format!("[completed research {id}]"),
            data: json!({ "id": id }),
        })
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_poll_url_embeds_id() {
        let inv = AsyncInvocation::research("perplexity", "res-42");
        assert_eq!(inv.poll.url, "/apps/retrieval/research/res-42");
        assert_eq!(inv.poll.method, "GET");
        assert_eq!(inv.kind, "research");
    }

    #[test]
    fn handle_serializes_camel_case_wire_names() {
        let v = serde_json::to_value(AsyncInvocation::research("p", "x")).unwrap();
        assert!(v.get("pollIntervalMs").is_some());
        assert_eq!(v["type"], "research");
    }

    #[tokio::test]
    async fn mock_shallow_completes_synchronously() {
        let outcome = MockResearch.begin("what is rust", None).await.unwrap();
        assert!(matches!(outcome, ResearchOutcome::Completed { .. }));
    }

    #[tokio::test]
    async fn mock_deep_returns_async_handle() {
        let outcome = MockResearch.begin("long question", Some("deep")).await.unwrap();
        match outcome {
            ResearchOutcome::InProgress(inv) => assert_eq!(inv.provider, "mock"),
            other => panic!("expected in-progress handle, got {other:?}"),
        }
    }
}
