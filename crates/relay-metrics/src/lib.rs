// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! Validated metric sink and timed-operation wrappers.
//!
//! The analytics backend is external; this crate owns the record shape, the
//! validation rules, and the helper that wraps an async operation with
//! latency measurement.  Monitoring must never break the request path:
//! invalid records are silently dropped and a missing sink is a no-op.

mod sink;
mod track;

pub use sink::{emit, MemorySink, MetricsSink, NoopSink};
pub use track::{track_operation, OperationDetails};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Classification of a metric record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    Performance,
    Error,
    Usage,
    Guardrail,
}

/// Outcome tag carried by each record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricStatus {
    Success,
    Error,
    Info,
}

/// One metric record.
///
/// `trace_id` groups the records of a single request; when a caller leaves
/// it empty the sink fills in a generated id so downstream joins still work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metric {
    #[serde(default)]
    pub trace_id: String,
    /// Unix epoch milliseconds.
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub metric_type: MetricType,
    pub name: String,
    pub value: f64,
    #[serde(default)]
    pub metadata: Value,
    pub status: MetricStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Metric {
    pub fn new(metric_type: MetricType, name: impl Into<String>, value: f64) -> Self {
        Self {
            trace_id: String::new(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            metric_type,
            name: name.into(),
            value,
            metadata: Value::Null,
            status: MetricStatus::Info,
            error: None,
        }
    }

    pub fn with_status(mut self, status: MetricStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = trace_id.into();
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// A record is valid when it has a non-empty name and a finite value.
    /// Invalid records are discarded by the sink rather than surfaced.
    pub fn is_valid(&self) -> bool {
        !self.name.is_empty() && self.value.is_finite() && self.timestamp > 0
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_metric_is_valid() {
        assert!(Metric::new(MetricType::Performance, "latency", 12.0).is_valid());
    }

    #[test]
    fn empty_name_is_invalid() {
        assert!(!Metric::new(MetricType::Usage, "", 1.0).is_valid());
    }

    #[test]
    fn non_finite_value_is_invalid() {
        assert!(!Metric::new(MetricType::Usage, "tokens", f64::NAN).is_valid());
        assert!(!Metric::new(MetricType::Usage, "tokens", f64::INFINITY).is_valid());
    }

    #[test]
    fn type_serializes_with_wire_name() {
        let m = Metric::new(MetricType::Guardrail, "violation", 1.0);
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v["type"], "guardrail");
        assert_eq!(v["status"], "info");
    }
}
