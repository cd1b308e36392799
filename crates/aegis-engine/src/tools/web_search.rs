//! `web_search` tool — queries a self-hosted SearXNG instance and returns the
//! top 5 aggregated results. No API key required; SearXNG fans the query out
//! to its configured upstream engines itself.

use async_trait::async_trait;
use serde_json::Value;

use super::{Tool, ToolResult};

const MAX_RESULTS: usize = 5;
const REQUEST_TIMEOUT_SECS: u64 = 15;

pub struct WebSearchTool {
    base_url: String,
}

impl WebSearchTool {
    pub fn new() -> Self {
        let base_url = std::env::var("AEGIS_SEARXNG_URL")
            .unwrap_or_else(|_| "http://localhost:8080".to_string());
        Self { base_url }
    }
}

impl Default for WebSearchTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web via a SearXNG aggregator. Returns up to 5 results with \
         title, URL, and snippet. Use this for anything that may have changed \
         since your training cutoff."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query."
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, input: Value) -> ToolResult {
        let query = match input.get("query").and_then(|v| v.as_str()) {
            Some(q) if !q.trim().is_empty() => q.to_string(),
            _ => return ToolResult::error("missing required parameter: query"),
        };

        match search(&self.base_url, &query).await {
            Ok(results) if results.is_empty() => {
                ToolResult::success(format!("No results found for: {query}"))
            }
            Ok(results) => ToolResult::success(results.join("\n\n")),
            Err(e) => ToolResult::error(format!("web_search failed: {e}")),
        }
    }
}

async fn search(base_url: &str, query: &str) -> Result<Vec<String>, String> {
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .map_err(|e| e.to_string())?;

    let url = format!("{base_url}/search");
    let resp = client
        .get(&url)
        .query(&[("q", query), ("format", "json")])
        .send()
        .await
        .map_err(|e| e.to_string())?;

    if !resp.status().is_success() {
        return Err(format!("SearXNG returned status {}", resp.status()));
    }

    let body: Value = resp.json().await.map_err(|e| e.to_string())?;
    let results = body
        .get("results")
        .and_then(|r| r.as_array())
        .cloned()
        .unwrap_or_default();

    Ok(results
        .iter()
        .take(MAX_RESULTS)
        .enumerate()
        .map(|(i, r)| {
            let title = r.get("title").and_then(|v| v.as_str()).unwrap_or("(no title)");
            let url = r.get("url").and_then(|v| v.as_str()).unwrap_or("");
            let content = r.get("content").and_then(|v| v.as_str()).unwrap_or("");
            format!("{}. **{}**\n   {}\n   {}", i + 1, title, url, content)
        })
        .collect())
}
