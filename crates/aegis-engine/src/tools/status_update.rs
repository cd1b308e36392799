//! `status_update` tool — push a mid-flight progress message without ending the turn.
//!
//! Useful for long tool-calling rounds (e.g. a `debate` or a slow `exec`)
//! where the user benefits from knowing the agent is still working. Unlike
//! every other tool, a `status_update` call never counts toward the round's
//! final content — the loop keeps going after it.

use std::sync::Arc;

use async_trait::async_trait;

use crate::pipeline::context::MessageContext;

use super::{Tool, ToolResult};

pub struct StatusUpdateTool<C: MessageContext + 'static> {
    ctx: Arc<C>,
    channel_name: String,
    channel_id: Option<u64>,
    session_key: Option<String>,
}

impl<C: MessageContext + 'static> StatusUpdateTool<C> {
    pub fn new(
        ctx: Arc<C>,
        channel_name: &str,
        channel_id: Option<u64>,
        session_key: Option<&str>,
    ) -> Self {
        Self {
            ctx,
            channel_name: channel_name.to_string(),
            channel_id,
            session_key: session_key.map(String::from),
        }
    }

    fn recipient(&self) -> String {
        self.channel_id
            .map(|id| id.to_string())
            .or_else(|| self.session_key.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl<C: MessageContext + 'static> Tool for StatusUpdateTool<C> {
    fn name(&self) -> &str {
        "status_update"
    }

    fn description(&self) -> &str {
        "Push a short progress update to the user while you keep working on a \
         multi-step task. This does not end your turn — continue calling tools \
         or give your final answer afterward."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "message": {
                    "type": "string",
                    "description": "Short status text, e.g. 'still searching, found 2 of 5 sources so far'."
                }
            },
            "required": ["message"]
        })
    }

    async fn execute(&self, input: serde_json::Value) -> ToolResult {
        let message = match input.get("message").and_then(|v| v.as_str()) {
            Some(m) if !m.trim().is_empty() => m.trim(),
            _ => return ToolResult::error("missing required parameter: message"),
        };

        match self
            .ctx
            .send_to_channel(&self.channel_name, &self.recipient(), message)
        {
            Ok(()) => ToolResult::success("status update sent"),
            Err(e) => ToolResult::error(e),
        }
    }
}
