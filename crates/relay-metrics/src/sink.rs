// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: Apache-2.0
use std::sync::Mutex;

use tracing::debug;
use uuid::Uuid;

use crate::Metric;

/// Append-only metric sink.
///
/// Implementations must be cheap and infallible from the caller's point of
/// view: a sink that cannot deliver drops records, it never errors.
pub trait MetricsSink: Send + Sync {
    fn record(&self, metric: Metric);
}

/// Validate, stamp, and forward a record to an optional sink.
///
/// A missing sink is a no-op.  Invalid records (empty name, non-finite
/// value) are dropped with a debug log.  An empty `trace_id` is replaced
/// with a generated id so downstream grouping still works.
pub fn emit(sink: Option<&dyn MetricsSink>, mut metric: Metric) {
    let Some(sink) = sink else { return };
    if !metric.is_valid() {
        debug!(name = %metric.name, "dropping invalid metric record");
        return;
    }
    if metric.trace_id.is_empty() {
        metric.trace_id = Uuid::new_v4().to_string();
    }
    sink.record(metric);
}

/// Discards every record.
#[derive(Default)]
pub struct NoopSink;

impl MetricsSink for NoopSink {
    fn record(&self, _metric: Metric) {}
}

/// Collects records in memory for test assertions.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<Metric>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<Metric> {
        self.records.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MetricsSink for MemorySink {
    fn record(&self, metric: Metric) {
        self.records.lock().unwrap().push(metric);
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
