//! Token estimation and the per-round context budgeter.
//!
//! Shared by the tool-calling loop (hard trim before every adapter call) and
//! session compaction (oldest-half summarization). The estimator is
//! deliberately crude — `len/3` — since the goal is a cheap, provider-agnostic
//! upper bound rather than an exact tokenizer match.

use serde_json::Value;

/// Tokens the budgeter reserves below `num_ctx` for the model's own reply.
pub const RESERVE_TOKENS: usize = 1024;

/// `max(1, floor(len(text)/3))`.
pub fn estimate_text(text: &str) -> usize {
    (text.len() / 3).max(1)
}

/// Estimate a raw (Anthropic content-block-shaped) message's token cost:
/// role + content + thinking + serialized tool-call/tool-result JSON.
pub fn estimate_raw_message(msg: &Value) -> usize {
    estimate_text(&msg.to_string())
}

fn estimate_raw_messages(messages: &[Value]) -> usize {
    messages.iter().map(estimate_raw_message).sum()
}

/// The maximum tokens a turn may spend: `floor(num_ctx * context_quota)`.
pub fn max_used(num_ctx: u32, context_quota: f64) -> usize {
    ((num_ctx as f64) * context_quota).floor().max(0.0) as usize
}

/// Whether the current turn would exceed budget if sent as-is.
pub fn exceeds_budget(
    system_tokens: usize,
    tools_tokens: usize,
    history: &[Value],
    num_ctx: u32,
    context_quota: f64,
) -> bool {
    let used = system_tokens + tools_tokens + estimate_raw_messages(history);
    used > max_used(num_ctx, context_quota)
}

/// Drop the oldest entries in `history` until `system + tools + history`
/// fits within `num_ctx - RESERVE_TOKENS`, always keeping the final
/// (current-turn) message pinned in place.
///
/// Returns the number of messages dropped.
pub fn hard_trim(
    system_tokens: usize,
    tools_tokens: usize,
    history: &mut Vec<Value>,
    num_ctx: u32,
) -> usize {
    let budget = (num_ctx as usize).saturating_sub(RESERVE_TOKENS);
    let mut dropped = 0;

    while history.len() > 1 {
        let used = system_tokens + tools_tokens + estimate_raw_messages(history);
        if used <= budget {
            break;
        }
        history.remove(0);
        dropped += 1;
    }

    dropped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_never_zero() {
        assert_eq!(estimate_text(""), 1);
        assert_eq!(estimate_text("abc"), 1);
        assert_eq!(estimate_text(&"a".repeat(30)), 10);
    }

    #[test]
    fn max_used_applies_quota() {
        assert_eq!(max_used(100_000, 0.85), 85_000);
    }

    #[test]
    fn hard_trim_keeps_last_message_and_stops_under_budget() {
        let mut history: Vec<Value> = (0..50)
            .map(|i| serde_json::json!({"role": "user", "content": "x".repeat(300), "i": i}))
            .collect();
        let dropped = hard_trim(10, 10, &mut history, 2_000);
        assert!(dropped > 0);
        assert_eq!(history.last().unwrap()["i"], 49);
    }

    #[test]
    fn hard_trim_never_drops_the_only_message() {
        let mut history = vec![serde_json::json!({"role": "user", "content": "x".repeat(100_000)})];
        let dropped = hard_trim(0, 0, &mut history, 10);
        assert_eq!(dropped, 0);
        assert_eq!(history.len(), 1);
    }
}
