//! Session compaction — replaces the older half of a long conversation with
//! a short provider-generated summary so the context window stays bounded.
//!
//! Triggered as a fire-and-forget `tokio::spawn` after each assistant turn is
//! saved. Mirrors the tool-calling loop's own per-round budgeter
//! ([`super::budget`]): the trigger is a live token estimate against the
//! active model's `num_ctx`, not a flat turn count. When the summarizer call
//! fails, or its output is empty, compaction falls back to the loop's own
//! hard trim on the next round rather than leaving the session over budget.
//!
//! This is the single canonical implementation. Both `aegis-gateway` and
//! `aegis-discord` previously had their own copies — this replaces both.

use std::sync::Arc;

use tracing::{info, warn};

use aegis_memory::ConversationMessage;

use crate::provider::{ChatRequest, Message, Role};

use super::budget::{estimate_text, max_used};
use super::context::MessageContext;

/// Smart compaction only kicks in once a session has grown past this many
/// turns — below that, hard trim inside the loop is cheaper and sufficient.
const MIN_TURNS_FOR_SMART_COMPACTION: usize = 6;
const SUMMARY_WORD_LIMIT: usize = 400;
/// Fraction of `num_ctx` the newest-message retention window is allowed to use.
const RETENTION_QUOTA: f64 = 0.15;
/// Tool-call argument/result heads are capped to this many characters in the
/// rendered transcript handed to the summarizer.
const SIGNATURE_CAP: usize = 300;

const SUMMARIZER_SYSTEM_PROMPT: &str = concat!(
    "You compress the older half of a conversation into a short, faithful ",
    "summary so it can replace the raw turns in the context window. ",
    "Write plain bullet points covering: facts the user stated, preferences ",
    "and instructions given, decisions made, and any unresolved threads. ",
    "Ignore tool-call mechanics and filler. Keep it under ",
    "400 words. Do not add commentary about the summarization itself."
);

/// Compact a session's conversation history when the live token estimate
/// for its stored turns would exceed the model's budget.
///
/// Retains the newest messages whose cumulative estimate fits within
/// `num_ctx * 0.15`, renders the rest as a transcript, and asks the
/// session's current model for a bullet summary. The result replaces the
/// older half in the Memory Log as a `system_summary` turn — future history
/// reads treat it as the horizon. Idempotent: if the resulting history is
/// still over budget (e.g. the summary itself came back long), the caller's
/// next pass will trip this function again and compact further.
pub async fn compact_session_if_needed<C: MessageContext + 'static>(
    ctx: Arc<C>,
    session_key: String,
) {
    let history = match ctx.memory().get_history(&session_key, 200) {
        Ok(h) => h,
        Err(e) => {
            warn!(error = %e, session = %session_key, "compact: get_history failed");
            return;
        }
    };

    if history.len() < MIN_TURNS_FOR_SMART_COMPACTION {
        return;
    }

    let num_ctx = ctx.agent().num_ctx();
    let context_quota = ctx.agent().context_quota();
    let total_estimate: usize = history.iter().map(|m| estimate_text(&m.content)).sum();
    let budget = max_used(num_ctx, context_quota);

    if total_estimate <= budget {
        return;
    }

    info!(
        session = %session_key,
        turns = history.len(),
        total_estimate,
        budget,
        "compact: budget exceeded, summarizing older half"
    );

    // Walk backward from the newest turn, retaining whatever fits in the
    // retention quota; everything older gets summarized.
    let retention_budget = ((num_ctx as f64) * RETENTION_QUOTA).floor() as usize;
    let mut retained_tokens = 0usize;
    let mut split = history.len();
    for (i, m) in history.iter().enumerate().rev() {
        let cost = estimate_text(&m.content);
        if retained_tokens + cost > retention_budget {
            split = i + 1;
            break;
        }
        retained_tokens += cost;
        split = i;
    }

    let (older, _newer) = history.split_at(split);
    if older.is_empty() {
        return;
    }

    let transcript = render_transcript(older);
    let model = ctx.agent().get_model().await;
    let channel = older
        .last()
        .map(|m| m.channel.clone())
        .unwrap_or_else(|| "unknown".to_string());

    let req = ChatRequest {
        model,
        system: SUMMARIZER_SYSTEM_PROMPT.to_string(),
        system_prompt: None,
        messages: vec![Message {
            role: Role::User,
            content: format!("Summarize this conversation excerpt:\n\n{transcript}"),
        }],
        max_tokens: 1024,
        stream: false,
        thinking: None,
        tools: Vec::new(),
        raw_messages: None,
    };

    let response = match ctx.agent().provider().send(&req).await {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, session = %session_key, "compact: summarizer call failed, falling back to hard trim");
            return;
        }
    };

    let summary = cap_words(response.content.trim(), SUMMARY_WORD_LIMIT);
    if summary.is_empty() {
        warn!(session = %session_key, "compact: summarizer returned empty content, falling back to hard trim");
        return;
    }

    let content = format!("[summary of prior conversation]\n{summary}");
    match ctx.memory().save_summary(&session_key, &channel, &content) {
        Ok(()) => {
            info!(
                session = %session_key,
                turns_summarized = older.len(),
                "compact: session compacted"
            );
        }
        Err(e) => {
            warn!(error = %e, session = %session_key, "compact: save_summary failed");
        }
    }
}

/// Render turns as a readable transcript for the summarizer: `ROLE: content`,
/// one per line, with tool-call signatures/results head-capped so a single
/// verbose call doesn't dominate the excerpt.
fn render_transcript(turns: &[ConversationMessage]) -> String {
    turns
        .iter()
        .map(|m| format!("{}: {}", m.role.to_uppercase(), cap_chars(&m.content, SIGNATURE_CAP * 4)))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn cap_chars(s: &str, limit: usize) -> String {
    if s.chars().count() <= limit {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(limit).collect();
        format!("{truncated}... [truncated]")
    }
}

/// Truncate to at most `limit` whitespace-separated words.
fn cap_words(s: &str, limit: usize) -> String {
    let words: Vec<&str> = s.split_whitespace().collect();
    if words.len() <= limit {
        s.to_string()
    } else {
        words[..limit].join(" ")
    }
}
