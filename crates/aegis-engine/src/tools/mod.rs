//! Tool system for AI agent tool calling.
//!
//! Defines the `Tool` trait that all tools implement, plus a registry
//! for managing available tools and converting them to LLM API format.

pub mod build;
pub mod check_url;
pub mod debate_tool;
pub mod exec;
pub mod invoke_model;
pub mod read_url;
pub mod save_config;
pub mod schedule;
pub mod send_image;
pub mod status_update;
pub mod tool_loop;
pub mod web_search;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::provider::ToolDefinition;

/// Result of executing a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Text content returned to the LLM.
    pub content: String,
    /// Whether the tool execution failed.
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: message.into(),
            is_error: true,
        }
    }
}

/// Trait that all tools must implement.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name for this tool (e.g. "read_file").
    fn name(&self) -> &str;
    /// Human-readable description of what this tool does.
    fn description(&self) -> &str;
    /// JSON Schema for the tool's input parameters.
    fn input_schema(&self) -> serde_json::Value;
    /// Execute the tool with the given input.
    async fn execute(&self, input: serde_json::Value) -> ToolResult;
}

/// Static catalog of all built-in tools (name, description).
///
/// Does not require instantiation or context — useful for `/tools` listing.
pub fn tool_catalog() -> Vec<(&'static str, &'static str)> {
    vec![
        ("exec", "Execute a shell command (one-shot, 60s timeout)"),
        ("web_search", "Search the web via a SearXNG aggregator"),
        ("check_url", "HTTP GET a URL and report its final status"),
        ("read_url", "Fetch a URL and return its text content"),
        ("schedule", "Create, list, or remove a scheduled job"),
        ("save_config", "Deep-merge a patch into the live config file"),
        ("send_image", "Send an image to the user's current channel"),
        ("status_update", "Push a mid-flight status message without ending the turn"),
        ("invoke_model", "Delegate a task to a reduced-tool-set sub-agent"),
        ("debate", "Run a multi-round two-perspective debate with synthesis"),
    ]
}

/// Convert a slice of tools to API-level tool definitions.
pub fn to_definitions(tools: &[Box<dyn Tool>]) -> Vec<ToolDefinition> {
    tools
        .iter()
        .map(|t| ToolDefinition {
            name: t.name().to_string(),
            description: t.description().to_string(),
            input_schema: t.input_schema(),
        })
        .collect()
}
