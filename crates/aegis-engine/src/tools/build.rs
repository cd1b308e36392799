//! Tool registry — builds the canonical tool list for any channel adapter.
//!
//! The catalog is fixed: `exec`, `web_search`, `check_url`, `read_url`,
//! `schedule`, `save_config`, `send_image`, `status_update`, `invoke_model`,
//! `debate`. Every tool is constructed fresh per request so channel-specific
//! delivery targets (`channel_name`/`channel_id`/`session_key`) are correct.

use std::path::PathBuf;
use std::sync::Arc;

use crate::pipeline::context::MessageContext;
use crate::provider::ToolDefinition;

use super::check_url::CheckUrlTool;
use super::debate_tool::DebateTool;
use super::exec::ExecTool;
use super::invoke_model::InvokeModelTool;
use super::read_url::ReadUrlTool;
use super::save_config::SaveConfigTool;
use super::schedule::ScheduleTool;
use super::send_image::SendImageTool;
use super::status_update::StatusUpdateTool;
use super::web_search::WebSearchTool;
use super::{to_definitions, Tool};

/// Result of building the tool catalog for one request: the tools
/// themselves plus any volatile-tier text they want injected into the
/// system prompt (currently unused — reserved for future plugin indices).
pub struct BuiltTools {
    pub tools: Vec<Box<dyn Tool>>,
    pub skill_index: String,
}

/// Build the full tool catalog available to the top-level loop for a given
/// request.
///
/// `channel_name`/`channel_id`/`session_key` are forwarded to the tools that
/// need to address a reply back at the right delivery target
/// (`schedule`, `send_image`, `status_update`).
pub fn build_tools<C: MessageContext + 'static>(
    ctx: Arc<C>,
    channel_name: &str,
    channel_id: Option<u64>,
    session_key: Option<&str>,
) -> BuiltTools {
    let config_path = PathBuf::from(aegis_core::config::resolve_config_path());

    let tools: Vec<Box<dyn Tool>> = vec![
        Box::new(ExecTool::new(Arc::clone(&ctx))),
        Box::new(WebSearchTool::new()),
        Box::new(CheckUrlTool::default()),
        Box::new(ReadUrlTool::default()),
        Box::new(ScheduleTool::new(
            Arc::clone(&ctx),
            channel_name,
            channel_id,
            session_key,
        )),
        Box::new(SaveConfigTool::new(config_path)),
        Box::new(SendImageTool::new(
            Arc::clone(&ctx),
            channel_name,
            channel_id,
            session_key,
        )),
        Box::new(StatusUpdateTool::new(
            Arc::clone(&ctx),
            channel_name,
            channel_id,
            session_key,
        )),
        Box::new(InvokeModelTool::new(Arc::clone(&ctx))),
        Box::new(DebateTool::new(Arc::clone(&ctx))),
    ];

    BuiltTools {
        tools,
        skill_index: String::new(),
    }
}

/// The reduced tool set given to sub-agents and debate participants
/// (§4.1): no scheduling, config, messaging, or recursive delegation.
pub fn build_subagent_tools<C: MessageContext + 'static>(ctx: Arc<C>) -> Vec<Box<dyn Tool>> {
    vec![
        Box::new(ExecTool::new(ctx)),
        Box::new(WebSearchTool::new()),
        Box::new(CheckUrlTool::default()),
        Box::new(ReadUrlTool::default()),
    ]
}

/// Convert a tool list to API-level definitions for the LLM request.
pub fn tool_definitions(tools: &[Box<dyn Tool>]) -> Vec<ToolDefinition> {
    to_definitions(tools)
}
