//! `exec` tool — one-shot shell command via TerminalManager.
//!
//! Generic over `C: MessageContext` so it can be used by any channel adapter
//! (gateway, discord, future telegram) without duplication. `GH_TOKEN` and
//! any other host environment variables are inherited automatically since
//! the underlying `tokio::process::Command` doesn't clear the environment.

use std::sync::Arc;

use async_trait::async_trait;

use crate::pipeline::context::MessageContext;

use super::{Tool, ToolResult};

/// Timeout applied to every `exec` invocation, per the tool's contract.
const EXEC_TIMEOUT_SECS: u64 = 60;

/// Tool that executes shell commands via the terminal subsystem.
///
/// Respects the safety checker (denylist/allowlist) built into
/// `TerminalManager` and is available to sub-agents as well as the top-level loop.
pub struct ExecTool<C: MessageContext + 'static> {
    ctx: Arc<C>,
}

impl<C: MessageContext + 'static> ExecTool<C> {
    pub fn new(ctx: Arc<C>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl<C: MessageContext + 'static> Tool for ExecTool<C> {
    fn name(&self) -> &str {
        "exec"
    }

    fn description(&self) -> &str {
        "Execute a shell command and return its stdout and stderr. \
         Commands are safety-checked (dangerous commands like rm -rf, sudo, etc. \
         are blocked). Timeout is 60 seconds."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to execute via sh -c."
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, input: serde_json::Value) -> ToolResult {
        let command = match input.get("command").and_then(|v| v.as_str()) {
            Some(c) => c,
            None => return ToolResult::error("missing required parameter: command"),
        };

        let opts = aegis_exec::ExecOptions {
            timeout_secs: EXEC_TIMEOUT_SECS,
            ..aegis_exec::ExecOptions::default()
        };
        match self.ctx.terminal().lock().await.exec(command, opts).await {
            Ok(result) => {
                let mut output = String::new();

                if !result.stdout.is_empty() {
                    output.push_str(&result.stdout);
                }
                if !result.stderr.is_empty() {
                    if !output.is_empty() {
                        output.push('\n');
                    }
                    output.push_str("[stderr]\n");
                    output.push_str(&result.stderr);
                }
                if result.exit_code != 0 {
                    output.push_str(&format!("\n[exit code: {}]", result.exit_code));
                }
                if output.is_empty() {
                    output = "(no output)".to_string();
                }

                ToolResult::success(output)
            }
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}
