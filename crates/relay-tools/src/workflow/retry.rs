// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::{Tool, ToolCall, ToolContext, ToolResult};

use super::run_step;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BACKOFF_FACTOR: f64 = 1.0;
const DEFAULT_MAX_BACKOFF_SECS: f64 = 30.0;

/// Re-invoke a tool with exponential backoff until it succeeds or the
/// attempt budget is spent.
pub struct RetryWithBackoffTool;

fn backoff_delay(attempt: u32, factor: f64, max_backoff: f64) -> Duration {
    let exp = factor * 2f64.powi(attempt.saturating_sub(1) as i32);
    Duration::from_secs_f64(exp.min(max_backoff).max(0.0))
}

#[async_trait]
impl Tool for RetryWithBackoffTool {
    fn name(&self) -> &str {
        "retry_with_backoff"
    }

    fn description(&self) -> &str {
        "Invoke a tool, retrying on failure with exponential backoff \
         (delay = backoff_factor * 2^(attempt-1) seconds, capped at \
         max_backoff). max_attempts is clamped to 1..10."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "function": { "type": "string" },
                "args": { "type": "object" },
                "max_attempts": { "type": "integer", "minimum": 1, "maximum": 10 },
                "backoff_factor": { "type": "number" },
                "max_backoff": { "type": "number" }
            },
            "required": ["function"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, ctx: &ToolContext<'_>, call: &ToolCall) -> ToolResult {
        let Some(function) = call.args.get("function").and_then(|f| f.as_str()) else {
            return ToolResult::error(self.name(), "missing 'function'");
        };
        let args = call
            .args
            .get("args")
            .cloned()
            .unwrap_or(Value::Object(Default::default()));
        let max_attempts = call
            .args
            .get("max_attempts")
            .and_then(|v| v.as_u64())
            .unwrap_or(DEFAULT_MAX_ATTEMPTS as u64)
            .clamp(1, 10) as u32;
        let backoff_factor = call
            .args
            .get("backoff_factor")
            .and_then(|v| v.as_f64())
            .unwrap_or(DEFAULT_BACKOFF_FACTOR);
        let max_backoff = call
            .args
            .get("max_backoff")
            .and_then(|v| v.as_f64())
            .unwrap_or(DEFAULT_MAX_BACKOFF_SECS);

        let mut attempts: Vec<Value> = Vec::new();
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                let delay = backoff_delay(attempt, backoff_factor, max_backoff);
                debug!(function, attempt, delay_ms = delay.as_millis() as u64, "retry backoff");
                tokio::time::sleep(delay).await;
            }
            let result = run_step(ctx, function, args.clone()).await;
            if !result.is_error() {
                attempts.push(json!({ "attempt": attempt, "status": "success" }));
                return ToolResult {
                    data: Some(json!({
                        "attempts": attempts,
                        "result": result.to_value(),
                    })),
                    ..result
                };
            }
            last_error = result.content.clone();
            attempts.push(json!({ "attempt": attempt, "status": "error", "error": last_error }));
        }

        ToolResult::error(
            self.name(),
            format!("{function} failed after {max_attempts} attempts: {last_error}"),
        )
        .with_data(json!({ "attempts": attempts }))
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{mcp::McpRegistry, Dispatcher, ToolRegistry};
    use std::sync::{Arc, Mutex};

    #[test]
    fn delay_grows_exponentially_and_caps() {
        assert_eq!(backoff_delay(1, 1.0, 30.0), Duration::from_secs_f64(1.0));
        assert_eq!(backoff_delay(2, 1.0, 30.0), Duration::from_secs_f64(2.0));
        assert_eq!(backoff_delay(3, 1.0, 30.0), Duration::from_secs_f64(4.0));
        assert_eq!(backoff_delay(10, 1.0, 30.0), Duration::from_secs_f64(30.0));
        assert_eq!(backoff_delay(3, 0.5, 30.0), Duration::from_secs_f64(2.0));
    }

    struct FailNTimes {
        failures: Arc<Mutex<usize>>,
    }

    #[async_trait]
    impl Tool for FailNTimes {
        fn name(&self) -> &str {
            "flaky"
        }
        fn description(&self) -> &str {
            "test"
        }
        fn parameters_schema(&self) -> Value {
            json!({ "type": "object" })
        }
        async fn execute(&self, _ctx: &ToolContext<'_>, _call: &ToolCall) -> ToolResult {
            let mut left = self.failures.lock().unwrap();
            if *left > 0 {
                *left -= 1;
                ToolResult::error("flaky", "transient failure")
            } else {
                ToolResult::success("flaky", "finally worked")
            }
        }
    }

    fn harness(failures: usize) -> Dispatcher {
        let mut registry = ToolRegistry::new();
        registry.register(FailNTimes {
            failures: Arc::new(Mutex::new(failures)),
        });
        registry.register(RetryWithBackoffTool);
        Dispatcher::new(Arc::new(registry), Arc::new(McpRegistry::new()))
    }

    async fn run(d: &Dispatcher, args: Value) -> ToolResult {
        let request = json!({});
        let ctx = ToolContext {
            completion_id: "cmp",
            user: None,
            app_url: None,
            request: &request,
            conversation: None,
            invoker: d,
        };
        d.dispatch(&ctx, &ToolCall::new("1", "retry_with_backoff", args))
            .await
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let d = harness(2);
        let result = run(
            &d,
            json!({
                "function": "flaky",
                "max_attempts": 5,
                "backoff_factor": 0.01,
            }),
        )
        .await;
        assert!(!result.is_error());
        assert_eq!(result.content, "finally worked");
        let attempts = result.data.unwrap()["attempts"].clone();
        assert_eq!(attempts.as_array().unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn surfaces_final_error_with_attempt_log() {
        let d = harness(10);
        let result = run(
            &d,
            json!({
                "function": "flaky",
                "max_attempts": 2,
                "backoff_factor": 0.01,
            }),
        )
        .await;
        assert!(result.is_error());
        assert!(result.content.contains("after 2 attempts"));
        let attempts = result.data.unwrap()["attempts"].clone();
        assert_eq!(attempts.as_array().unwrap().len(), 2);
        assert_eq!(attempts[1]["error"], "transient failure");
    }

    #[tokio::test(start_paused = true)]
    async fn attempts_are_clamped_to_ten() {
        let d = harness(usize::MAX);
        let result = run(
            &d,
            json!({
                "function": "flaky",
                "max_attempts": 99,
                "backoff_factor": 0.0,
            }),
        )
        .await;
        assert!(result.is_error());
        assert!(result.content.contains("after 10 attempts"));
    }

    #[tokio::test]
    async fn missing_function_is_an_error() {
        let d = harness(0);
        let result = run(&d, json!({})).await;
        assert!(result.is_error());
    }
}
