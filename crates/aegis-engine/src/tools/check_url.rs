//! `check_url` tool — lightweight HTTP GET to check reachability and status.

use async_trait::async_trait;
use serde_json::Value;

use super::{Tool, ToolResult};

const REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Default)]
pub struct CheckUrlTool;

#[async_trait]
impl Tool for CheckUrlTool {
    fn name(&self) -> &str {
        "check_url"
    }

    fn description(&self) -> &str {
        "Check whether a URL is reachable. Returns the final status code and \
         URL after following redirects. Use this before claiming a link is broken."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The URL to check."
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, input: Value) -> ToolResult {
        let url = match input.get("url").and_then(|v| v.as_str()) {
            Some(u) if !u.trim().is_empty() => u.trim().to_string(),
            _ => return ToolResult::error("missing required parameter: url"),
        };

        let client = match reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
        {
            Ok(c) => c,
            Err(e) => return ToolResult::error(e.to_string()),
        };

        match client.get(&url).send().await {
            Ok(resp) => ToolResult::success(format!(
                "{} {} (final URL: {})",
                resp.status().as_u16(),
                resp.status().canonical_reason().unwrap_or(""),
                resp.url()
            )),
            Err(e) => ToolResult::error(format!("check_url failed: {e}")),
        }
    }
}
