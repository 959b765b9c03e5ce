// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: MIT
//! Generic outbound REST/GraphQL call with an SSRF guard.
//!
//! The guard rejects URLs whose host is (or resolves to) loopback,
//! link-local, RFC 1918 private space, carrier-grade NAT, or an internal
//! suffix – before any request is built, so a refused URL never touches
//! the network.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::debug;
use url::Url;

use crate::{Tool, ToolCall, ToolContext, ToolResult};

const DEFAULT_TIMEOUT_SECS: u64 = 15;
const MAX_TIMEOUT_SECS: u64 = 60;
const SSRF_REFUSED: &str = "Private or local network URLs are not allowed";

#[derive(Default)]
pub struct CallApiTool;

fn ip_is_private(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                // Carrier-grade NAT, 100.64.0.0/10
                || (v4.octets()[0] == 100 && (64..128).contains(&v4.octets()[1]))
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                // Unique-local fc00::/7 and link-local fe80::/10
                || (v6.segments()[0] & 0xfe00) == 0xfc00
                || (v6.segments()[0] & 0xffc0) == 0xfe80
        }
    }
}

fn host_is_forbidden_name(host: &str) -> bool {
    let lowered = host.to_lowercase();
    lowered == "localhost"
        || lowered.ends_with(".localhost")
        || lowered.ends_with(".local")
        || lowered.ends_with(".internal")
}

/// Validate scheme and host before any request is made.
///
/// Name-based hosts are additionally resolved so a DNS entry pointing into
/// private space is refused just like a literal private IP.
async fn check_url(url: &Url) -> Result<(), String> {
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(format!("unsupported URL scheme: {other}")),
    }
    let Some(host) = url.host_str() else {
        return Err("URL has no host".into());
    };
    if host_is_forbidden_name(host) {
        return Err(SSRF_REFUSED.into());
    }
    if let Ok(ip) = host.trim_matches(['[', ']']).parse::<IpAddr>() {
        if ip_is_private(ip) {
            return Err(SSRF_REFUSED.into());
        }
        return Ok(());
    }
    // Pre-flight DNS: refuse names that resolve into private space.
    let port = url.port_or_known_default().unwrap_or(443);
    match tokio::net::lookup_host((host, port)).await {
        Ok(addrs) => {
            for addr in addrs {
                if ip_is_private(addr.ip()) {
                    return Err(SSRF_REFUSED.into());
                }
            }
            Ok(())
        }
        Err(e) => Err(format!("hostname resolution failed: {e}")),
    }
}

fn headers_from(args: &Value) -> Vec<(String, String)> {
    args.get("headers")
        .and_then(|h| h.as_object())
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl Tool for CallApiTool {
    fn name(&self) -> &str {
        "call_api"
    }

    fn description(&self) -> &str {
        "Perform a single outbound REST or GraphQL call to a public \
         http(s) endpoint. GraphQL requests POST {query, variables, \
         operationName}. GET requests may not carry a body."
    }

    fn is_default(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": { "type": "string" },
                "method": { "type": "string", "enum": ["GET", "POST", "PUT", "PATCH", "DELETE"] },
                "headers": { "type": "object", "additionalProperties": { "type": "string" } },
                "body": { "description": "JSON body for non-GET requests" },
                "graphql": {
                    "type": "object",
                    "properties": {
                        "query": { "type": "string" },
                        "variables": { "type": "object" },
                        "operationName": { "type": "string" }
                    },
                    "required": ["query"]
                },
                "timeout_secs": { "type": "integer", "minimum": 1, "maximum": 60 }
            },
            "required": ["url"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, _ctx: &ToolContext<'_>, call: &ToolCall) -> ToolResult {
        let Some(raw_url) = call.args.get("url").and_then(|u| u.as_str()) else {
            return ToolResult::error(self.name(), "missing 'url'");
        };
        let url = match Url::parse(raw_url) {
            Ok(u) => u,
            Err(e) => return ToolResult::error(self.name(), format!("invalid URL: {e}")),
        };
        if let Err(message) = check_url(&url).await {
            return ToolResult::error(self.name(), message);
        }

        let graphql = call.args.get("graphql").filter(|g| !g.is_null());
        let method = if graphql.is_some() {
            "POST".to_string()
        } else {
            call.args
                .get("method")
                .and_then(|m| m.as_str())
                .unwrap_or("GET")
                .to_uppercase()
        };
        let body = if let Some(graphql) = graphql {
            let mut envelope = Map::new();
            envelope.insert("query".into(), graphql["query"].clone());
            if let Some(variables) = graphql.get("variables") {
                envelope.insert("variables".into(), variables.clone());
            }
            if let Some(operation) = graphql.get("operationName") {
                envelope.insert("operationName".into(), operation.clone());
            }
            Some(Value::Object(envelope))
        } else {
            call.args.get("body").filter(|b| !b.is_null()).cloned()
        };

        if method == "GET" && body.is_some() {
            return ToolResult::error(self.name(), "GET requests may not carry a body");
        }

        let timeout = call
            .args
            .get("timeout_secs")
            .and_then(|t| t.as_u64())
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
            .min(MAX_TIMEOUT_SECS);

        let client = match reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout))
            .redirect(reqwest::redirect::Policy::none())
            .build()
        {
            Ok(c) => c,
            Err(e) => return ToolResult::error(self.name(), format!("client build failed: {e}")),
        };

        let reqwest_method = match reqwest::Method::from_bytes(method.as_bytes()) {
            Ok(m) => m,
            Err(_) => return ToolResult::error(self.name(), format!("invalid method: {method}")),
        };
        debug!(%url, %method, timeout, "outbound call_api request");

        let mut request = client.request(reqwest_method, url.clone());
        for (name, value) in headers_from(&call.args) {
            request = request.header(name, value);
        }
        if let Some(body) = &body {
            request = request
                .header("Content-Type", "application/json")
                .json(body);
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => return ToolResult::error(self.name(), format!("request failed: {e}")),
        };

        let status = response.status();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_lowercase();
        let text = response.text().await.unwrap_or_default();
        let parsed_body = if content_type.contains("json") {
            serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text.clone()))
        } else {
            Value::String(text.clone())
        };

        let data = json!({
            "status_code": status.as_u16(),
            "content_type": content_type,
            "body": parsed_body,
        });
        if status.is_success() {
            ToolResult::success(self.name(), format!("{} {}", status.as_u16(), url)).with_data(data)
        } else {
            ToolResult::error(self.name(), format!("HTTP {} from {}", status.as_u16(), url))
                .with_data(data)
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{mcp::McpRegistry, Dispatcher, ToolRegistry};
    use std::sync::Arc;

    async fn run(args: Value) -> ToolResult {
        let mut registry = ToolRegistry::new();
        registry.register(CallApiTool);
        let d = Dispatcher::new(Arc::new(registry), Arc::new(McpRegistry::new()));
        let request = json!({});
        let ctx = ToolContext {
            completion_id: "cmp",
            user: None,
            app_url: None,
            request: &request,
            conversation: None,
            invoker: &d,
        };
        d.dispatch(&ctx, &ToolCall::new("1", "call_api", args))
            .await
            .unwrap()
    }

    #[test]
    fn private_ranges_are_recognised() {
        for ip in [
            "127.0.0.1",
            "10.1.2.3",
            "172.16.0.9",
            "192.168.1.1",
            "169.254.0.5",
            "100.64.0.1",
            "100.127.255.255",
            "0.0.0.0",
            "::1",
            "fc00::1",
            "fe80::1",
        ] {
            assert!(
                ip_is_private(ip.parse().unwrap()),
                "{ip} must be refused"
            );
        }
        for ip in ["93.184.216.34", "1.1.1.1", "100.128.0.1", "2606:4700::1111"] {
            assert!(!ip_is_private(ip.parse().unwrap()), "{ip} must be allowed");
        }
    }

    #[test]
    fn forbidden_name_suffixes_are_recognised() {
        assert!(host_is_forbidden_name("localhost"));
        assert!(host_is_forbidden_name("printer.local"));
        assert!(host_is_forbidden_name("db.prod.internal"));
        assert!(!host_is_forbidden_name("example.com"));
        assert!(!host_is_forbidden_name("internal.example.com"));
    }

    #[tokio::test]
    async fn loopback_url_is_refused_without_fetch() {
        let result = run(json!({ "url": "http://127.0.0.1/x" })).await;
        assert!(result.is_error());
        assert_eq!(result.content, SSRF_REFUSED);
    }

    #[tokio::test]
    async fn private_and_cgnat_urls_are_refused() {
        for url in [
            "http://192.168.0.10/admin",
            "http://10.0.0.1/",
            "http://100.64.3.4/",
            "http://[::1]/",
            "http://service.internal/api",
            "http://nas.local/",
        ] {
            let result = run(json!({ "url": url })).await;
            assert!(result.is_error(), "{url} must be refused");
            assert_eq!(result.content, SSRF_REFUSED, "{url}");
        }
    }

    #[tokio::test]
    async fn non_http_scheme_is_refused() {
        let result = run(json!({ "url": "ftp://example.com/file" })).await;
        assert!(result.is_error());
        assert!(result.content.contains("unsupported URL scheme"));
    }

    #[tokio::test]
    async fn get_with_body_is_refused() {
        let result = run(json!({
            "url": "https://example.com/api",
            "method": "GET",
            "body": { "x": 1 },
        }))
        .await;
        assert!(result.is_error());
        assert!(result.content.contains("GET requests may not carry a body"));
    }

    #[test]
    fn timeout_is_capped() {
        let requested = 300u64;
        assert_eq!(requested.min(MAX_TIMEOUT_SECS), 60);
    }
}
