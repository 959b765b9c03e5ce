// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: Apache-2.0
use std::future::Future;
use std::time::Instant;

use serde_json::{json, Value};

use crate::{sink::emit, Metric, MetricStatus, MetricType, MetricsSink};

/// Identifying context attached to a tracked operation's records.
#[derive(Debug, Clone, Default)]
pub struct OperationDetails {
    pub trace_id: String,
    pub user_id: Option<u64>,
    pub completion_id: Option<String>,
    /// Free-form extra fields merged into the metric metadata.
    pub metadata: Value,
}

fn build_metadata(details: &OperationDetails, latency_ms: f64) -> Value {
    let mut metadata = json!({
        "latency_ms": latency_ms,
    });
    if let Some(user_id) = details.user_id {
        metadata["user_id"] = json!(user_id);
    }
    if let Some(completion_id) = &details.completion_id {
        metadata["completion_id"] = json!(completion_id);
    }
    if let Value::Object(extra) = &details.metadata {
        for (k, v) in extra {
            metadata[k.as_str()] = v.clone();
        }
    }
    metadata
}

/// Run `op`, timing it against the wall clock.
///
/// On success a `performance/success` record with the observed latency is
/// emitted; on failure an `error/error` record carrying the error text.
/// The operation's result is returned unchanged either way – monitoring
/// wraps the call, it never alters it.
pub async fn track_operation<T, E, F>(
    name: &str,
    sink: Option<&dyn MetricsSink>,
    details: &OperationDetails,
    op: F,
) -> Result<T, E>
where
    E: std::fmt::Display,
    F: Future<Output = Result<T, E>>,
{
    let started = Instant::now();
    let result = op.await;
    let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

    match &result {
        Ok(_) => emit(
            sink,
            Metric::new(MetricType::Performance, name, latency_ms)
                .with_status(MetricStatus::Success)
                .with_trace_id(details.trace_id.clone())
                .with_metadata(build_metadata(details, latency_ms)),
        ),
        Err(e) => emit(
            sink,
            Metric::new(MetricType::Error, name, latency_ms)
                .with_status(MetricStatus::Error)
                .with_trace_id(details.trace_id.clone())
                .with_metadata(build_metadata(details, latency_ms))
                .with_error(e.to_string()),
        ),
    }
    result
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
