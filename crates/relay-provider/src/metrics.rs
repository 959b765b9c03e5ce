// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: MIT
//! Provider-call monitoring wrapper.

use std::future::Future;

use serde_json::json;

use relay_metrics::{
    emit, track_operation, Metric, MetricStatus, MetricType, MetricsSink, OperationDetails,
};

use crate::{SamplingSettings, Usage};

/// Identifying context for one provider call.
#[derive(Debug, Clone, Default)]
pub struct ProviderCall {
    pub provider: String,
    pub model: String,
    /// `chat` | `image` | `speech` | `music` | `video` | `ocr` | `embedding` | `research`
    pub operation: String,
    pub user_id: Option<u64>,
    pub completion_id: Option<String>,
    pub settings: SamplingSettings,
}

impl ProviderCall {
    fn details(&self) -> OperationDetails {
        OperationDetails {
            trace_id: self.completion_id.clone().unwrap_or_default(),
            user_id: self.user_id,
            completion_id: self.completion_id.clone(),
            metadata: json!({
                "provider": self.provider,
                "model": self.model,
                "settings": serde_json::to_value(&self.settings).unwrap_or_default(),
            }),
        }
    }

    fn metric_name(&self) -> String {
        format!("provider.{}", self.operation)
    }
}

/// Wrap a provider call: latency on success, error text on failure, both
/// tagged with provider/model/settings.  The result passes through.
pub async fn track_provider_metrics<T, E, F>(
    call: &ProviderCall,
    sink: Option<&dyn MetricsSink>,
    fut: F,
) -> Result<T, E>
where
    E: std::fmt::Display,
    F: Future<Output = Result<T, E>>,
{
    track_operation(&call.metric_name(), sink, &call.details(), fut).await
}

/// Record token usage once the response stream has been drained.  Usage is
/// only known after aggregation, so it cannot ride on the latency record.
pub fn record_usage(call: &ProviderCall, sink: Option<&dyn MetricsSink>, usage: Usage) {
    let total = (usage.input_tokens + usage.output_tokens) as f64;
    emit(
        sink,
        Metric::new(MetricType::Usage, call.metric_name(), total)
            .with_status(MetricStatus::Info)
            .with_trace_id(call.completion_id.clone().unwrap_or_default())
            .with_metadata(json!({
                "provider": call.provider,
                "model": call.model,
                "input_tokens": usage.input_tokens,
                "output_tokens": usage.output_tokens,
            })),
    );
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
