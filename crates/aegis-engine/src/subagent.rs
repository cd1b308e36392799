//! Sub-agent runner — the nested loop behind the `invoke_model` tool.
//!
//! Gives a parent tool-calling loop a way to delegate a sub-task to a fresh
//! model call with its own constrained tool set and system prompt, reusing
//! the same dispatch/compaction/retry machinery as the top-level loop
//! (`tools::tool_loop`) rather than duplicating it.

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::provider::{ChatRequest, LlmProvider, Message, ProviderError, Role};
use crate::tools::tool_loop::{self, DEFAULT_MAX_ROUNDS};
use crate::tools::Tool;

/// Round cap for a sub-agent's own inner loop, independent of the parent's.
pub const SUBAGENT_MAX_ROUNDS: usize = DEFAULT_MAX_ROUNDS;

fn dedicated_system_prompt() -> String {
    let today = chrono::Utc::now().format("%Y-%m-%d");
    let workspace = std::env::current_dir()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "/workspace".to_string());
    format!(
        "You are a sub-agent invoked by a parent AI assistant to carry out one \
         delegated task. Today's date is {today}. Your training data has a cutoff \
         well before today — never assume it reflects current events, prices, or \
         software versions; use your tools to check anything time-sensitive. You \
         are operating with root/sudo-equivalent access inside the workspace at \
         {workspace} — act carefully, the usual human-in-the-loop confirmations \
         are not present. Complete the task and report your result as plain text; \
         you will not get a chance to ask a follow-up question."
    )
}

/// Run a nested tool-calling loop for one delegated task and return its
/// final text answer.
///
/// Per the `invoke_model` contract, the result is always a single string:
/// the sub-agent's final content, or `"(no answer)"` if it returned nothing
/// visible. The sub-agent's own reasoning is not propagated into the
/// parent's visible content — only this returned string is.
pub async fn run_subagent(
    provider: &dyn LlmProvider,
    model: String,
    task: &str,
    tools: &[Box<dyn Tool>],
    cancel: Option<&CancellationToken>,
    fallback_models: &[String],
    num_ctx: u32,
    context_quota: f64,
) -> Result<String, ProviderError> {
    let system = dedicated_system_prompt();
    let request = ChatRequest {
        model,
        system,
        system_prompt: None,
        messages: vec![Message {
            role: Role::User,
            content: task.to_string(),
        }],
        max_tokens: 4096,
        stream: false,
        thinking: None,
        tools: crate::tools::to_definitions(tools),
        raw_messages: None,
    };

    let (response, _called_tools) = tool_loop::run_tool_loop_with(
        provider,
        request,
        tools,
        cancel,
        SUBAGENT_MAX_ROUNDS,
        fallback_models,
        num_ctx,
        context_quota,
    )
    .await?;

    let content = response.content.trim();
    if content.is_empty() {
        warn!("subagent: returned no visible content");
        Ok("(no answer)".to_string())
    } else {
        Ok(content.to_string())
    }
}
