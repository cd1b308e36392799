//! `read_url` tool — fetch a page with a browser-like User-Agent, strip it
//! down to readable text, and cap it so it doesn't blow the context budget.

use async_trait::async_trait;
use serde_json::Value;

use super::{Tool, ToolResult};

const REQUEST_TIMEOUT_SECS: u64 = 20;
const MAX_CHARS: usize = 8000;
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/128.0 Safari/537.36";

#[derive(Default)]
pub struct ReadUrlTool;

#[async_trait]
impl Tool for ReadUrlTool {
    fn name(&self) -> &str {
        "read_url"
    }

    fn description(&self) -> &str {
        "Fetch a web page and return its readable text content, stripped of \
         HTML markup and truncated to 8000 characters."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The URL to fetch and read."
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

        match fetch_and_strip(&url).await {
            Ok(text) => ToolResult::success(text),
            Err(e) => ToolResult::error(format!("read_url failed: {e}")),
        }
    }
}

async fn fetch_and_strip(url: &str) -> Result<String, String> {
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .user_agent(BROWSER_USER_AGENT)
        .build()
        .map_err(|e| e.to_string())?;

    let resp = client.get(url).send().await.map_err(|e| e.to_string())?;
    if !resp.status().is_success() {
        return Err(format!("server returned status {}", resp.status()));
    }

    let body = resp.text().await.map_err(|e| e.to_string())?;
    let text = html2text::from_read(body.as_bytes(), 120).map_err(|e| e.to_string())?;
    let trimmed = text.trim();

    Ok(if trimmed.chars().count() > MAX_CHARS {
        let truncated: String = trimmed.chars().take(MAX_CHARS).collect();
        format!("{truncated}\n\n[truncated at {MAX_CHARS} characters]")
    } else {
        trimmed.to_string()
    })
}
