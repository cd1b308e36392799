//! `send_image` tool — deliver an image to the user's current channel.
//!
//! Per the tool-calling loop's contract, a successful `send_image` call
//! suppresses the model's subsequent final text reply for this turn: the
//! image *is* the answer, so the loop drops the round's closing content
//! rather than sending a redundant "here's your image" message on top of it.

use std::sync::Arc;

use async_trait::async_trait;

use crate::pipeline::context::MessageContext;

use super::{Tool, ToolResult};

pub struct SendImageTool<C: MessageContext + 'static> {
    ctx: Arc<C>,
    channel_name: String,
    channel_id: Option<u64>,
    session_key: Option<String>,
}

impl<C: MessageContext + 'static> SendImageTool<C> {
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
impl<C: MessageContext + 'static> Tool for SendImageTool<C> {
    fn name(&self) -> &str {
        "send_image"
    }

    fn description(&self) -> &str {
        "Send an image to the user on their current channel. Pass either a URL \
         or a caption-only message. Calling this successfully counts as your \
         final answer for this turn — don't also write a closing text reply."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "URL of the image to send."
                },
                "caption": {
                    "type": "string",
                    "description": "Optional caption to send alongside the image."
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, input: serde_json::Value) -> ToolResult {
        let url = match input.get("url").and_then(|v| v.as_str()) {
            Some(u) if !u.trim().is_empty() => u.trim(),
            _ => return ToolResult::error("missing required parameter: url"),
        };
        let caption = input.get("caption").and_then(|v| v.as_str()).unwrap_or("");

        let message = if caption.is_empty() {
            url.to_string()
        } else {
            format!("{caption}\n{url}")
        };

        match self
            .ctx
            .send_to_channel(&self.channel_name, &self.recipient(), &message)
        {
            Ok(()) => ToolResult::success(format!("Image sent: {url}")),
            Err(e) => ToolResult::error(e),
        }
    }
}
