//! Debate orchestrator — the engine behind the `debate` tool.
//!
//! Runs two sub-agent perspectives against each other for N rounds, writing
//! a running Markdown transcript to disk, then produces a neutral synthesis.
//! Each side and the summarizer are themselves just `subagent::run_subagent`
//! calls with a role-scoped system prompt folded into the task text — the
//! orchestrator's only real job is bookkeeping the transcript and round loop.

use std::path::PathBuf;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::provider::{LlmProvider, ProviderError};
use crate::subagent;
use crate::tools::Tool;

const DEFAULT_ROUNDS: u32 = 3;

/// Outcome of a completed (or cancelled) debate.
pub struct DebateOutcome {
    pub rounds_completed: u32,
    pub transcript_path: PathBuf,
    pub conclusion: String,
}

#[allow(clippy::too_many_arguments)]
pub async fn run_debate(
    provider: &dyn LlmProvider,
    model: String,
    topic: &str,
    side_a: &str,
    side_b: &str,
    rounds: Option<u32>,
    tools: &[Box<dyn Tool>],
    cancel: Option<&CancellationToken>,
    fallback_models: &[String],
    num_ctx: u32,
    context_quota: f64,
    on_round_start: Option<&(dyn Fn() + Send + Sync)>,
) -> Result<DebateOutcome, ProviderError> {
    let rounds = rounds.unwrap_or(DEFAULT_ROUNDS).max(1);
    let transcript_path = transcript_path_for(topic);

    let mut transcript = format!(
        "# Debate: {topic}\n\n- Side A: {side_a}\n- Side B: {side_b}\n\n"
    );
    write_transcript(&transcript_path, &transcript);

    let mut context_so_far = String::new();
    let mut completed = 0u32;

    for round in 1..=rounds {
        if let Some(cb) = on_round_start {
            cb();
        }
        if is_cancelled(cancel) {
            transcript.push_str(&format!("\n_aborted at round {round}_\n"));
            write_transcript(&transcript_path, &transcript);
            return Ok(DebateOutcome {
                rounds_completed: completed,
                transcript_path,
                conclusion: "Debate aborted before completion.".to_string(),
            });
        }

        let a_task = format!(
            "Topic: {topic}\nYour role (Side A): {side_a}\nPrior rounds:\n{context_so_far}\n\n\
             Argue your position for this round. Be concise and substantive."
        );
        let a_reply = subagent::run_subagent(
            provider,
            model.clone(),
            &a_task,
            tools,
            cancel,
            fallback_models,
            num_ctx,
            context_quota,
        )
        .await?;
        transcript.push_str(&format!("## Round {round} — Side A\n{a_reply}\n\n"));
        write_transcript(&transcript_path, &transcript);

        if is_cancelled(cancel) {
            transcript.push_str(&format!("\n_aborted at round {round}_\n"));
            write_transcript(&transcript_path, &transcript);
            return Ok(DebateOutcome {
                rounds_completed: completed,
                transcript_path,
                conclusion: "Debate aborted before completion.".to_string(),
            });
        }

        let b_task = format!(
            "Topic: {topic}\nYour role (Side B): {side_b}\nSide A just argued:\n{a_reply}\n\n\
             Respond with your position for this round. Be concise and substantive."
        );
        let b_reply = subagent::run_subagent(
            provider,
            model.clone(),
            &b_task,
            tools,
            cancel,
            fallback_models,
            num_ctx,
            context_quota,
        )
        .await?;
        transcript.push_str(&format!("## Round {round} — Side B\n{b_reply}\n\n"));
        write_transcript(&transcript_path, &transcript);

        let summary_task = format!(
            "Neutrally summarise this debate round in 3-4 sentences, without taking a side:\n\n\
             Side A: {a_reply}\n\nSide B: {b_reply}"
        );
        let round_summary = subagent::run_subagent(
            provider,
            model.clone(),
            &summary_task,
            &[],
            cancel,
            fallback_models,
            num_ctx,
            context_quota,
        )
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, round, "debate: round summary call failed");
            String::new()
        });

        context_so_far.push_str(&format!("Round {round} summary: {round_summary}\n"));
        completed = round;
    }

    let synthesis_task = format!(
        "Topic: {topic}\nSide A's position: {side_a}\nSide B's position: {side_b}\n\n\
         Round-by-round summary:\n{context_so_far}\n\n\
         Write a final neutral synthesis: where the two sides agreed, where they \
         genuinely differed, and what a reasonable conclusion looks like."
    );
    let conclusion = subagent::run_subagent(
        provider,
        model,
        &synthesis_task,
        &[],
        cancel,
        fallback_models,
        num_ctx,
        context_quota,
    )
    .await?;

    transcript.push_str(&format!("## Conclusion\n{conclusion}\n"));
    write_transcript(&transcript_path, &transcript);

    info!(rounds = completed, path = %transcript_path.display(), "debate: completed");

    Ok(DebateOutcome {
        rounds_completed: completed,
        transcript_path,
        conclusion,
    })
}

fn is_cancelled(cancel: Option<&CancellationToken>) -> bool {
    cancel.map(|t| t.is_cancelled()).unwrap_or(false)
}

fn transcript_path_for(topic: &str) -> PathBuf {
    let slug = slugify(topic);
    let epoch = chrono::Utc::now().timestamp();
    let dir = std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("workspace");
    let _ = std::fs::create_dir_all(&dir);
    dir.join(format!("debate-{slug}-{epoch}.md"))
}

fn slugify(s: &str) -> String {
    let mut out = String::new();
    let mut last_was_dash = false;
    for c in s.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            last_was_dash = false;
        } else if !last_was_dash && !out.is_empty() {
            out.push('-');
            last_was_dash = true;
        }
    }
    let trimmed = out.trim_end_matches('-').to_string();
    if trimmed.is_empty() {
        "debate".to_string()
    } else {
        trimmed.chars().take(40).collect()
    }
}

fn write_transcript(path: &PathBuf, content: &str) {
    if let Err(e) = std::fs::write(path, content) {
        warn!(error = %e, path = %path.display(), "debate: failed to write transcript");
    }
}
