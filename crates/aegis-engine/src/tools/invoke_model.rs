//! `invoke_model` tool — delegates to the sub-agent runner (`subagent.rs`).
//!
//! The sub-agent gets the reduced tool set from §4.1 of the tool catalog
//! (`exec`, `web_search`, `check_url`, `read_url`) rather than the full
//! catalog — it has no business scheduling jobs or recursing into another
//! `invoke_model`/`debate` call.

use std::sync::Arc;

use async_trait::async_trait;

use crate::pipeline::context::MessageContext;
use crate::subagent;

use super::build::build_subagent_tools;
use super::{Tool, ToolResult};

pub struct InvokeModelTool<C: MessageContext + 'static> {
    ctx: Arc<C>,
}

impl<C: MessageContext + 'static> InvokeModelTool<C> {
    pub fn new(ctx: Arc<C>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl<C: MessageContext + 'static> Tool for InvokeModelTool<C> {
    fn name(&self) -> &str {
        "invoke_model"
    }

    fn description(&self) -> &str {
        "Delegate a self-contained task to a fresh model call with a reduced \
         tool set (exec, web_search, check_url, read_url). Use this to offload \
         a sub-task — e.g. research a topic, draft a document — without \
         cluttering the current conversation's context. Returns the sub-agent's \
         final answer as plain text."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "task": {
                    "type": "string",
                    "description": "The task to delegate, written as a self-contained instruction."
                },
                "model": {
                    "type": "string",
                    "description": "Optional model override. Defaults to the current session's model."
                }
            },
            "required": ["task"]
        })
    }

    async fn execute(&self, input: serde_json::Value) -> ToolResult {
        let task = match input.get("task").and_then(|v| v.as_str()) {
            Some(t) if !t.trim().is_empty() => t,
            _ => return ToolResult::error("missing required parameter: task"),
        };
        let model = match input.get("model").and_then(|v| v.as_str()) {
            Some(m) => m.to_string(),
            None => self.ctx.agent().get_model().await,
        };

        let reduced_tools = build_subagent_tools(Arc::clone(&self.ctx));

        let result = subagent::run_subagent(
            self.ctx.agent().provider(),
            model,
            task,
            &reduced_tools,
            None,
            self.ctx.agent().fallback_models(),
            self.ctx.agent().num_ctx(),
            self.ctx.agent().context_quota(),
        )
        .await;

        match result {
            Ok(answer) => ToolResult::success(answer),
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}
