// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: MIT
//! Non-chat media capabilities: image, speech, music, video, OCR.
//!
//! Upstream wire protocols are opaque JSON contracts here: the generic
//! [`JsonEndpoint`] posts a request body to a capability-specific path and
//! hands the parsed response back inside a [`MediaResult`].  Anything that
//! needs provider-specific shaping does it in its own impl.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::ProviderError;

/// Result of a media generation/extraction call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaResult {
    /// Remote URL of the produced asset, when the upstream returns one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Inline base64 payload, when the upstream returns one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Raw upstream response, forwarded verbatim.
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, Default)]
pub struct ImageRequest {
    pub prompt: String,
    pub size: Option<String>,
    pub count: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct SpeechRequest {
    pub text: String,
    pub voice: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MusicRequest {
    pub prompt: String,
    pub duration_secs: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct VideoRequest {
    pub prompt: String,
    pub duration_secs: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct OcrRequest {
    /// URL or data URL of the source image/document.
    pub source: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrResult {
    pub text: String,
    #[serde(default)]
    pub data: Value,
}

#[async_trait]
pub trait ImageProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn generate_image(&self, req: ImageRequest) -> Result<MediaResult, ProviderError>;
}

#[async_trait]
pub trait SpeechProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn synthesize(&self, req: SpeechRequest) -> Result<MediaResult, ProviderError>;
}

#[async_trait]
pub trait MusicProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn compose(&self, req: MusicRequest) -> Result<MediaResult, ProviderError>;
}

#[async_trait]
pub trait VideoProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn render(&self, req: VideoRequest) -> Result<MediaResult, ProviderError>;
}

#[async_trait]
pub trait OcrProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn extract(&self, req: OcrRequest) -> Result<OcrResult, ProviderError>;
}

// ─── Generic JSON endpoint ────────────────────────────────────────────────────

/// POSTs a JSON body to `{base_url}{path}` with bearer auth and returns the
/// parsed response.  The concrete request/response mapping per capability
/// lives in the impls below.
pub struct JsonEndpoint {
    provider: String,
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl JsonEndpoint {
    pub fn new(provider: impl Into<String>, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            provider: provider.into(),
            base_url: base_url.into(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, ProviderError> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        let mut req = self.client.post(&url).json(&body);
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
        resp.json().await.map_err(|e| ProviderError::Network {
            provider: self.provider.clone(),
            message: e.to_string(),
        })
    }
}

fn media_result_from(data: Value) -> MediaResult {
    MediaResult {
        url: data["url"]
            .as_str()
            .or_else(|| data["output"].get(0).and_then(|v| v.as_str()))
            .map(str::to_string),
        b64: data["b64"].as_str().map(str::to_string),
        content_type: data["content_type"].as_str().map(str::to_string),
        data,
    }
}

#[async_trait]
impl ImageProvider for JsonEndpoint {
    fn name(&self) -> &str {
        &self.provider
    }
    async fn generate_image(&self, req: ImageRequest) -> Result<MediaResult, ProviderError> {
        let body = json!({
            "prompt": req.prompt,
            "size": req.size,
            "n": req.count.unwrap_or(1),
        });
        Ok(media_result_from(self.post("/images/generations", body).await?))
    }
}

#[async_trait]
impl SpeechProvider for JsonEndpoint {
    fn name(&self) -> &str {
        &self.provider
    }
    async fn synthesize(&self, req: SpeechRequest) -> Result<MediaResult, ProviderError> {
        let body = json!({ "input": req.text, "voice": req.voice });
        Ok(media_result_from(self.post("/audio/speech", body).await?))
    }
}

#[async_trait]
impl MusicProvider for JsonEndpoint {
    fn name(&self) -> &str {
        &self.provider
    }
    async fn compose(&self, req: MusicRequest) -> Result<MediaResult, ProviderError> {
        let body = json!({ "prompt": req.prompt, "duration": req.duration_secs });
        Ok(media_result_from(self.post("/audio/music", body).await?))
    }
}

#[async_trait]
impl VideoProvider for JsonEndpoint {
    fn name(&self) -> &str {
        &self.provider
    }
    async fn render(&self, req: VideoRequest) -> Result<MediaResult, ProviderError> {
        let body = json!({ "prompt": req.prompt, "duration": req.duration_secs });
        Ok(media_result_from(self.post("/video/generations", body).await?))
    }
}

#[async_trait]
impl OcrProvider for JsonEndpoint {
    fn name(&self) -> &str {
        &self.provider
    }
    async fn extract(&self, req: OcrRequest) -> Result<OcrResult, ProviderError> {
        let data = self.post("/ocr", json!({ "source": req.source })).await?;
        Ok(OcrResult {
            text: data["text"].as_str().unwrap_or_default().to_string(),
            data,
        })
    }
}

// ─── Mocks ────────────────────────────────────────────────────────────────────

/// Serves every media capability with canned results.
#[derive(Default)]
pub struct MockMedia;

#[async_trait]
impl ImageProvider for MockMedia {
    fn name(&self) -> &str {
        "mock"
    }
    async fn generate_image(&self, req: ImageRequest) -> Result<MediaResult, ProviderError> {
        Ok(MediaResult {
            url: Some(format!("mock://image/{}", req.prompt.len())),
            data: json!({ "prompt": req.prompt }),
            ..MediaResult::default()
        })
    }
}

#[async_trait]
impl SpeechProvider for MockMedia {
    fn name(&self) -> &str {
        "mock"
    }
    async fn synthesize(&self, req: SpeechRequest) -> Result<MediaResult, ProviderError> {
        Ok(MediaResult {
            b64: Some("bW9jaw==".into()),
            content_type: Some("audio/mpeg".into()),
            data: json!({ "chars": req.text.len() }),
            ..MediaResult::default()
        })
    }
}

#[async_trait]
impl MusicProvider for MockMedia {
    fn name(&self) -> &str {
        "mock"
    }
    async fn compose(&self, req: MusicRequest) -> Result<MediaResult, ProviderError> {
        Ok(MediaResult {
            url: Some("mock://music/track".into()),
            data: json!({ "duration": req.duration_secs }),
            ..MediaResult::default()
        })
    }
}

#[async_trait]
impl VideoProvider for MockMedia {
    fn name(&self) -> &str {
        "mock"
    }
    async fn render(&self, req: VideoRequest) -> Result<MediaResult, ProviderError> {
        Ok(MediaResult {
            url: Some("mock://video/clip".into()),
            data: json!({ "duration": req.duration_secs }),
            ..MediaResult::default()
        })
    }
}

#[async_trait]
impl OcrProvider for MockMedia {
    fn name(&self) -> &str {
        "mock"
    }
    async fn extract(&self, req: OcrRequest) -> Result<OcrResult, ProviderError> {
        Ok(OcrResult {
            text: format!("[text extracted from {}]", req.source),
            data: Value::Null,
        })
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_result_prefers_url_then_output_array() {
        let r = media_result_from(json!({ "url": "https://cdn/x.png" }));
        assert_eq!(r.url.as_deref(), Some("https://cdn/x.png"));

        let r = media_result_from(json!({ "output": ["https://cdn/y.png"] }));
        assert_eq!(r.url.as_deref(), Some("https://cdn/y.png"));
    }

    #[tokio::test]
    async fn mock_media_serves_all_capabilities() {
        let m = MockMedia;
        assert!(m
            .generate_image(ImageRequest {
                prompt: "cat".into(),
                ..ImageRequest::default()
            })
            .await
            .unwrap()
            .url
            .is_some());
        assert!(m
            .synthesize(SpeechRequest {
                text: "hello".into(),
                voice: None
            })
            .await
            .unwrap()
            .b64
            .is_some());
        let ocr = m
            .extract(OcrRequest {
                source: "doc.png".into(),
            })
            .await
            .unwrap();
        assert!(ocr.text.contains("doc.png"));
    }
}
