use std::io::Write;
use std::path::PathBuf;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MemoryError;
use crate::types::ConversationMessage;

/// Append-only daily Memory Log: `<dir>/YYYY-MM-DD.md`, one JSON line per turn.
///
/// Each line is a single-turn record rather than free-form markdown prose, so
/// history can be rebuilt exactly; rendering to prose only happens when
/// building a compressed excerpt for prompt injection.
pub struct MemoryManager {
    dir: PathBuf,
    max_chars_per_line: usize,
    days: u32,
    max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LogLine {
    session_key: String,
    channel: String,
    role: String,
    content: String,
    model_used: Option<String>,
    tokens_in: u32,
    tokens_out: u32,
    created_at: String,
}

impl MemoryManager {
    pub fn new(
        dir: impl Into<PathBuf>,
        max_chars_per_line: usize,
        days: u32,
        max_tokens: u32,
    ) -> Result<Self, MemoryError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            max_chars_per_line,
            days,
            max_tokens,
        })
    }

    fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("{}.md", date.format("%Y-%m-%d")))
    }

    /// Append one turn (user or assistant) to today's file.
    pub fn save_message(&self, msg: &ConversationMessage) -> Result<(), MemoryError> {
        let path = self.path_for(Utc::now().date_naive());
        let line = LogLine {
            session_key: msg.session_key.clone(),
            channel: msg.channel.clone(),
            role: msg.role.clone(),
            content: msg.content.clone(),
            model_used: msg.model_used.clone(),
            tokens_in: msg.tokens_in,
            tokens_out: msg.tokens_out,
            created_at: msg.created_at.clone(),
        };
        let json =
            serde_json::to_string(&line).map_err(|e| MemoryError::Serialization(e.to_string()))?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        writeln!(file, "{json}")?;
        Ok(())
    }

    /// Rebuild recent (user, assistant) history for a session by scanning the
    /// last `days` daily files, newest first, until `limit` messages are found.
    /// Returned oldest-first, matching the shape the tool loop expects.
    ///
    /// A `system_summary` line (written by [`Self::save_summary`]) acts as a
    /// horizon: everything older than it, in that file and in older files, is
    /// dropped from the rebuilt window, and the summary itself becomes the
    /// oldest entry returned.
    pub fn get_history(
        &self,
        session_key: &str,
        limit: usize,
    ) -> Result<Vec<ConversationMessage>, MemoryError> {
        let mut out = Vec::new();
        let today = Utc::now().date_naive();
        for offset in 0..self.days {
            let date = today - chrono::Duration::days(offset as i64);
            let path = self.path_for(date);
            let Ok(text) = std::fs::read_to_string(&path) else {
                continue;
            };
            let day_msgs: Vec<ConversationMessage> = text
                .lines()
                .filter_map(|l| serde_json::from_str::<LogLine>(l).ok())
                .filter(|l| l.session_key == session_key)
                .map(line_to_message)
                .collect(); // chronological within the day

            let horizon_idx = day_msgs
                .iter()
                .rposition(|m| m.role == "system_summary" || m.role == "system_clear");
            let mut kept = match horizon_idx {
                Some(i) => day_msgs[i..]
                    .iter()
                    .filter(|m| m.role != "system_clear")
                    .cloned()
                    .collect(),
                None => day_msgs,
            };
            kept.reverse(); // newest-first within the day
            out.extend(kept);

            if horizon_idx.is_some() {
                break; // summary/clear marker is the horizon — older files are stale
            }
            if out.len() >= limit {
                break;
            }
        }
        out.truncate(limit);
        out.reverse(); // oldest first overall
        Ok(out)
    }

    /// Append a `system_clear` marker, resetting the session's history
    /// horizon. Future [`Self::get_history`] calls return nothing from
    /// before this point — the equivalent of a `/clear` command against an
    /// append-only log that can't delete prior lines.
    pub fn clear_session(&self, session_key: &str, channel: &str) -> Result<(), MemoryError> {
        self.save_message(&ConversationMessage {
            id: 0,
            user_id: None,
            session_key: session_key.to_string(),
            channel: channel.to_string(),
            role: "system_clear".to_string(),
            content: String::new(),
            model_used: None,
            tokens_in: 0,
            tokens_out: 0,
            cost_usd: 0.0,
            created_at: Utc::now().to_rfc3339(),
        })
    }

    /// Append a synthetic `system_summary` turn — the result of compacting
    /// the older half of a session's history into a short transcript summary.
    /// Future [`Self::get_history`] calls treat this as the oldest entry and
    /// drop everything that came before it.
    pub fn save_summary(
        &self,
        session_key: &str,
        channel: &str,
        summary: &str,
    ) -> Result<(), MemoryError> {
        self.save_message(&ConversationMessage {
            id: 0,
            user_id: None,
            session_key: session_key.to_string(),
            channel: channel.to_string(),
            role: "system_summary".to_string(),
            content: summary.to_string(),
            model_used: None,
            tokens_in: 0,
            tokens_out: 0,
            cost_usd: 0.0,
            created_at: Utc::now().to_rfc3339(),
        })
    }

    /// Render a compressed excerpt of this session's recent history for
    /// prompt injection — the per-user tier's "memory excerpt" in the layered
    /// system-prompt assembly. Capped at `max_tokens` (len/3 estimate) and
    /// `max_chars_per_line` per line.
    pub fn build_user_context(&self, session_key: &str) -> Result<String, MemoryError> {
        let history = self.get_history(session_key, 200)?;
        if history.is_empty() {
            return Ok(String::new());
        }

        let budget_chars = self.max_tokens as usize * 3;
        let mut lines: Vec<String> = Vec::new();
        let mut total = 0usize;
        for m in history.iter().rev() {
            let content = truncate_chars(&m.content, self.max_chars_per_line);
            let line = format!("{}: {}", m.role, content);
            if total + line.len() > budget_chars {
                break;
            }
            total += line.len();
            lines.push(line);
        }
        lines.reverse(); // restore chronological order
        Ok(lines.join("\n"))
    }
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars).collect();
    out.push('…');
    out
}

fn line_to_message(l: LogLine) -> ConversationMessage {
    ConversationMessage {
        id: 0,
        user_id: None,
        session_key: l.session_key,
        channel: l.channel,
        role: l.role,
        content: l.content,
        model_used: l.model_used,
        tokens_in: l.tokens_in,
        tokens_out: l.tokens_out,
        cost_usd: 0.0,
        created_at: l.created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(session_key: &str, role: &str, content: &str) -> ConversationMessage {
        ConversationMessage {
            id: 0,
            user_id: None,
            session_key: session_key.to_string(),
            channel: "discord".to_string(),
            role: role.to_string(),
            content: content.to_string(),
            model_used: None,
            tokens_in: 0,
            tokens_out: 0,
            cost_usd: 0.0,
            created_at: Utc::now().to_rfc3339(),
        }
    }

    #[test]
    fn round_trips_a_turn_pair() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = MemoryManager::new(dir.path(), 500, 7, 2000).unwrap();
        mgr.save_message(&msg("user:u1:discord:1", "user", "hi"))
            .unwrap();
        mgr.save_message(&msg("user:u1:discord:1", "assistant", "hello"))
            .unwrap();

        let history = mgr.get_history("user:u1:discord:1", 10).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, "user");
        assert_eq!(history[1].role, "assistant");
    }

    #[test]
    fn history_is_scoped_to_session_key() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = MemoryManager::new(dir.path(), 500, 7, 2000).unwrap();
        mgr.save_message(&msg("user:a", "user", "a says hi")).unwrap();
        mgr.save_message(&msg("user:b", "user", "b says hi")).unwrap();

        let history = mgr.get_history("user:a", 10).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "a says hi");
    }

    #[test]
    fn excerpt_is_empty_for_unknown_session() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = MemoryManager::new(dir.path(), 500, 7, 2000).unwrap();
        let excerpt = mgr.build_user_context("user:nobody").unwrap();
        assert!(excerpt.is_empty());
    }

    #[test]
    fn excerpt_respects_max_chars_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = MemoryManager::new(dir.path(), 5, 7, 2000).unwrap();
        mgr.save_message(&msg("user:u1", "user", "a much longer message than five"))
            .unwrap();

        let excerpt = mgr.build_user_context("user:u1").unwrap();
        assert!(excerpt.contains('…'));
    }
}
