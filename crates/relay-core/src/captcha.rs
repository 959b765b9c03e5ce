// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! Captcha verification shim.
//!
//! The verifier is an external HTTP contract: a form-urlencoded POST with
//! `{secret, response, sitekey}`.  Outcome mapping is pure and fully
//! covered by tests; only [`verify_captcha`] touches the network.

use serde_json::Value;

use relay_config::CaptchaConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct CaptchaOutcome {
    pub verified: bool,
    pub error: Option<String>,
}

impl CaptchaOutcome {
    fn ok() -> Self {
        Self {
            verified: true,
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            verified: false,
            error: Some(error.into()),
        }
    }
}

/// Map an HTTP response (status + optional JSON body) to an outcome.
pub fn outcome_from_response(
    status: u16,
    status_text: &str,
    body: Option<&Value>,
) -> CaptchaOutcome {
    if !(200..300).contains(&status) {
        return CaptchaOutcome::failed(format!("HTTP error {status}: {status_text}"));
    }
    let Some(body) = body else {
        return CaptchaOutcome::failed("Unknown verification error");
    };
    if body["success"].as_bool() == Some(true) {
        return CaptchaOutcome::ok();
    }
    let joined = body["error-codes"]
        .as_array()
        .map(|codes| {
            codes
                .iter()
                .filter_map(|c| c.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default();
    if joined.is_empty() {
        CaptchaOutcome::failed("Unknown verification error")
    } else {
        CaptchaOutcome::failed(joined)
    }
}

/// POST the token to the configured verifier and map the response.
pub async fn verify_captcha(cfg: &CaptchaConfig, token: &str) -> CaptchaOutcome {
    if cfg.verify_url.is_empty() {
        // Verification disabled: treat as passed (the host gates elsewhere).
        return CaptchaOutcome::ok();
    }
    let client = reqwest::Client::new();
    let form = [
        ("secret", cfg.secret.as_str()),
        ("response", token),
        ("sitekey", cfg.site_key.as_str()),
    ];
    let response = match client.post(&cfg.verify_url).form(&form).send().await {
        Ok(r) => r,
        Err(e) => return CaptchaOutcome::failed(format!("verifier unreachable: {e}")),
    };
    let status = response.status();
    let status_text = status.canonical_reason().unwrap_or("").to_string();
    let body: Option<Value> = response.json().await.ok();
    outcome_from_response(status.as_u16(), &status_text, body.as_ref())
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_body_verifies() {
        let outcome = outcome_from_response(200, "OK", Some(&json!({"success": true})));
        assert_eq!(outcome, CaptchaOutcome::ok());
    }

    #[test]
    fn failure_joins_error_codes() {
        let outcome = outcome_from_response(
            200,
            "OK",
            Some(&json!({"success": false, "error-codes": ["invalid-input-response", "timeout-or-duplicate"]})),
        );
        assert!(!outcome.verified);
        assert_eq!(
            outcome.error.as_deref(),
            Some("invalid-input-response, timeout-or-duplicate")
        );
    }

    #[test]
    fn failure_without_codes_is_unknown() {
        let outcome = outcome_from_response(200, "OK", Some(&json!({"success": false})));
        assert_eq!(outcome.error.as_deref(), Some("Unknown verification error"));

        let outcome =
            outcome_from_response(200, "OK", Some(&json!({"success": false, "error-codes": []})));
        assert_eq!(outcome.error.as_deref(), Some("Unknown verification error"));
    }

    #[test]
    fn non_2xx_maps_to_http_error() {
        let outcome = outcome_from_response(502, "Bad Gateway", None);
        assert!(!outcome.verified);
        assert_eq!(outcome.error.as_deref(), Some("HTTP error 502: Bad Gateway"));
    }

    #[test]
    fn missing_body_on_2xx_is_unknown() {
        let outcome = outcome_from_response(204, "No Content", None);
        assert_eq!(outcome.error.as_deref(), Some("Unknown verification error"));
    }
}
