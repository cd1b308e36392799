//! `debate` tool — delegates to the debate orchestrator (`debate.rs`).

use std::sync::Arc;

use async_trait::async_trait;

use crate::debate;
use crate::pipeline::context::MessageContext;

use super::build::build_subagent_tools;
use super::{Tool, ToolResult};

pub struct DebateTool<C: MessageContext + 'static> {
    ctx: Arc<C>,
}

impl<C: MessageContext + 'static> DebateTool<C> {
    pub fn new(ctx: Arc<C>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl<C: MessageContext + 'static> Tool for DebateTool<C> {
    fn name(&self) -> &str {
        "debate"
    }

    fn description(&self) -> &str {
        "Run a structured multi-round debate between two named perspectives on \
         a topic, writing a Markdown transcript to the workspace, then produce \
         a neutral synthesis. Use this when a question genuinely benefits from \
         arguing both sides rather than a single answer."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "topic": {"type": "string", "description": "The debate topic or question."},
                "side_a": {"type": "string", "description": "Side A's perspective or position to argue."},
                "side_b": {"type": "string", "description": "Side B's perspective or position to argue."},
                "rounds": {"type": "integer", "description": "Number of rounds (default 3)."},
                "model": {"type": "string", "description": "Optional model override for all participants."}
            },
            "required": ["topic", "side_a", "side_b"]
        })
    }

    async fn execute(&self, input: serde_json::Value) -> ToolResult {
        let topic = match input.get("topic").and_then(|v| v.as_str()) {
            Some(t) if !t.trim().is_empty() => t,
            _ => return ToolResult::error("missing required parameter: topic"),
        };
        let side_a = match input.get("side_a").and_then(|v| v.as_str()) {
            Some(s) if !s.trim().is_empty() => s,
            _ => return ToolResult::error("missing required parameter: side_a"),
        };
        let side_b = match input.get("side_b").and_then(|v| v.as_str()) {
            Some(s) if !s.trim().is_empty() => s,
            _ => return ToolResult::error("missing required parameter: side_b"),
        };
        let rounds = input.get("rounds").and_then(|v| v.as_u64()).map(|r| r as u32);
        let model = match input.get("model").and_then(|v| v.as_str()) {
            Some(m) => m.to_string(),
            None => self.ctx.agent().get_model().await,
        };

        let tools = build_subagent_tools(Arc::clone(&self.ctx));

        let result = debate::run_debate(
            self.ctx.agent().provider(),
            model,
            topic,
            side_a,
            side_b,
            rounds,
            &tools,
            None,
            self.ctx.agent().fallback_models(),
            self.ctx.agent().num_ctx(),
            self.ctx.agent().context_quota(),
            None,
        )
        .await;

        match result {
            Ok(outcome) => ToolResult::success(format!(
                "Debate complete after {} round(s). Transcript: {}\n\n{}",
                outcome.rounds_completed,
                outcome.transcript_path.display(),
                outcome.conclusion
            )),
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}
