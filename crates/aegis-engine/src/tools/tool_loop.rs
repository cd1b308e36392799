//! Tool execution loop — the core agentic state machine.
//!
//! Flow: trim history to budget → call model → detect tool calls → execute →
//! append results → re-enter, until the model stops calling tools, the round
//! cap is hit, or the caller cancels. See `pipeline::budget` for the token
//! accounting this loop trims against before every adapter call.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::pipeline::budget;
use crate::provider::{ChatRequest, ChatResponse, LlmProvider, ProviderError, SwitchInfo, ToolCall};

use super::{Tool, ToolResult};

/// Default round cap — the number of model-call/tool-execution rounds before
/// the loop forces a wrap-up.
pub const DEFAULT_MAX_ROUNDS: usize = 15;

/// Short backoff between in-adapter retry attempts for a retryable error.
const RETRY_BACKOFF: std::time::Duration = std::time::Duration::from_secs(2);
const RETRIES_PER_MODEL: u32 = 2;

const NUDGE_TEXT: &str =
    "Give your final answer now. Do not call any more tools — respond with the answer itself.";

const WRAP_UP_TEXT: &str = concat!(
    "You have run out of rounds for this task. Do not say the task is still ",
    "running or in progress. Reply now with a factual summary of what you ",
    "completed and what remains undone."
);

/// Run the full tool execution loop (non-streaming) with a default round cap.
///
/// Starts from `initial_request`, which must have `messages` or `raw_messages`
/// set. Returns the final `ChatResponse` plus the ordered list of tool names
/// invoked across every round (used for the Agent Actions Log).
pub async fn run_tool_loop(
    provider: &dyn LlmProvider,
    initial_request: ChatRequest,
    tools: &[Box<dyn Tool>],
    cancel: Option<&CancellationToken>,
) -> Result<(ChatResponse, Vec<String>), ProviderError> {
    run_tool_loop_with(
        provider,
        initial_request,
        tools,
        cancel,
        DEFAULT_MAX_ROUNDS,
        &[],
        0,
        0.85,
    )
    .await
}

/// Full form of the loop, parameterized by round cap, fallback model chain,
/// and the context budget (`num_ctx`/`context_quota`) used for the pre-call
/// hard trim. [`run_tool_loop`] calls this with the loop's defaults.
#[allow(clippy::too_many_arguments)]
pub async fn run_tool_loop_with(
    provider: &dyn LlmProvider,
    initial_request: ChatRequest,
    tools: &[Box<dyn Tool>],
    cancel: Option<&CancellationToken>,
    max_rounds: usize,
    fallback_models: &[String],
    num_ctx: u32,
    context_quota: f64,
) -> Result<(ChatResponse, Vec<String>), ProviderError> {
    let mut raw_messages: Vec<serde_json::Value> = if let Some(ref raw) = initial_request.raw_messages {
        raw.clone()
    } else {
        initial_request
            .messages
            .iter()
            .map(|m| serde_json::json!({ "role": m.role, "content": m.content }))
            .collect()
    };

    let mut called_tools: Vec<String> = Vec::new();
    let mut model = initial_request.model.clone();
    let mut switch_info: Option<SwitchInfo> = None;
    let mut nudged = false;
    let mut sent_image = false;

    let system_tokens = budget::estimate_text(&initial_request.system);
    let tools_tokens = initial_request
        .tools
        .iter()
        .map(|t| budget::estimate_text(&t.input_schema.to_string()) + budget::estimate_text(&t.description))
        .sum::<usize>();

    let mut round = 0usize;
    loop {
        if num_ctx > 0 {
            let dropped = budget::hard_trim(system_tokens, tools_tokens, &mut raw_messages, num_ctx);
            if dropped > 0 {
                debug!(dropped, round, "tool loop: hard-trimmed history to fit budget");
            }
        }

        let mut req = initial_request.clone();
        req.model = model.clone();
        req.raw_messages = Some(raw_messages.clone());

        debug!(round, model = %model, "tool loop round");

        let response = match send_with_retry(provider, &req).await {
            Ok(r) => r,
            Err(e) if e.should_fallback() => {
                match try_fallback(provider, &req, fallback_models, &model).await {
                    Some((r, next_model, reason)) => {
                        switch_info = Some(SwitchInfo { model: next_model.clone(), reason });
                        model = next_model;
                        r
                    }
                    None => return Err(e),
                }
            }
            Err(e) => return Err(e),
        };

        if response.tool_calls.is_empty() || response.stop_reason != "tool_use" {
            let mut final_response = response;
            if final_response.content.trim().is_empty() && !sent_image && !nudged {
                nudged = true;
                raw_messages.push(serde_json::json!({
                    "role": "assistant",
                    "content": final_response.content,
                }));
                raw_messages.push(serde_json::json!({
                    "role": "user",
                    "content": NUDGE_TEXT,
                }));
                let mut nudge_req = initial_request.clone();
                nudge_req.model = model.clone();
                nudge_req.raw_messages = Some(raw_messages.clone());
                match send_with_retry(provider, &nudge_req).await {
                    Ok(nudge_resp) => final_response = nudge_resp,
                    Err(e) => warn!(error = %e, "tool loop: nudge call failed, returning empty content"),
                }
            }
            if sent_image {
                final_response.content = String::new();
            }
            final_response.switch_info = switch_info;
            info!(round, "tool loop complete — no more tool calls");
            return Ok((final_response, called_tools));
        }

        // Assistant turn: visible text (if any) plus tool_use blocks.
        let mut assistant_content: Vec<serde_json::Value> = Vec::new();
        if !response.content.is_empty() {
            assistant_content.push(serde_json::json!({ "type": "text", "text": response.content }));
        }
        for call in &response.tool_calls {
            assistant_content.push(serde_json::json!({
                "type": "tool_use",
                "id": call.id,
                "name": call.name,
                "input": call.input,
            }));
        }
        raw_messages.push(serde_json::json!({ "role": "assistant", "content": assistant_content }));

        if let Some(token) = cancel {
            if token.is_cancelled() {
                raw_messages.push(serde_json::json!({
                    "role": "assistant",
                    "content": "(processing cancelled)",
                }));
                let cancelled = ChatResponse {
                    content: "(processing cancelled)".to_string(),
                    model,
                    tokens_in: response.tokens_in,
                    tokens_out: response.tokens_out,
                    stop_reason: "cancelled".to_string(),
                    tool_calls: Vec::new(),
                    switch_info,
                };
                return Ok((cancelled, called_tools));
            }
        }

        let mut tool_result_content: Vec<serde_json::Value> = Vec::new();
        for call in &response.tool_calls {
            called_tools.push(call.name.clone());
            let result = execute_tool(tools, call).await;
            if call.name == "send_image" && !result.is_error {
                sent_image = true;
            }
            tool_result_content.push(serde_json::json!({
                "type": "tool_result",
                "tool_use_id": call.id,
                "content": result.content,
                "is_error": result.is_error,
            }));
        }
        raw_messages.push(serde_json::json!({ "role": "user", "content": tool_result_content }));

        round += 1;
        if round >= max_rounds {
            raw_messages.push(serde_json::json!({ "role": "user", "content": WRAP_UP_TEXT }));
            let mut wrap_req = initial_request.clone();
            wrap_req.model = model.clone();
            wrap_req.raw_messages = Some(raw_messages.clone());
            warn!(max_rounds, "tool loop hit round cap, forcing wrap-up");
            let mut final_response = match send_with_retry(provider, &wrap_req).await {
                Ok(r) => r,
                Err(e) => {
                    return Err(e);
                }
            };
            if sent_image {
                final_response.content = String::new();
            }
            final_response.switch_info = switch_info;
            return Ok((final_response, called_tools));
        }
    }
}

/// Send with a short number of in-adapter-level retries for retryable errors.
async fn send_with_retry(provider: &dyn LlmProvider, req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
    let mut last_err = None;
    for attempt in 0..=RETRIES_PER_MODEL {
        match provider.send(req).await {
            Ok(r) => return Ok(r),
            Err(e) => {
                if !e.is_retryable() || attempt == RETRIES_PER_MODEL {
                    return Err(e);
                }
                warn!(attempt, error = %e, "tool loop: retryable error, backing off");
                tokio::time::sleep(RETRY_BACKOFF).await;
                last_err = Some(e);
            }
        }
    }
    Err(last_err.expect("loop always either returns or records an error"))
}

/// Try each fallback model in order (once each) after the active model's
/// retries are exhausted. Returns the successful response, the model id
/// that produced it, and a human-readable reason — or `None` if every
/// fallback also failed.
async fn try_fallback(
    provider: &dyn LlmProvider,
    req: &ChatRequest,
    fallback_models: &[String],
    failed_model: &str,
) -> Option<(ChatResponse, String, String)> {
    for candidate in fallback_models {
        if candidate == failed_model {
            continue;
        }
        let mut fallback_req = req.clone();
        fallback_req.model = candidate.clone();
        match provider.send(&fallback_req).await {
            Ok(r) => {
                info!(from = %failed_model, to = %candidate, "tool loop: switched to fallback model");
                return Some((
                    r,
                    candidate.clone(),
                    format!("{failed_model} was unavailable, switched to {candidate}"),
                ));
            }
            Err(e) => {
                warn!(model = %candidate, error = %e, "tool loop: fallback model also failed");
            }
        }
    }
    None
}

/// Find and execute the named tool. Returns an error ToolResult if not found.
async fn execute_tool(tools: &[Box<dyn Tool>], call: &ToolCall) -> ToolResult {
    match tools.iter().find(|t| t.name() == call.name) {
        Some(tool) => {
            debug!(tool = %call.name, "executing tool");
            tool.execute(call.input.clone()).await
        }
        None => ToolResult::error(format!("unknown tool: {}", call.name)),
    }
}
