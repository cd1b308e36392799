use serde::{Deserialize, Serialize};

/// Single conversation message, read from or appended to a daily Memory Log file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    /// Present for API parity with the previous SQLite-backed shape; the flat
    /// log has no row id, so this is always `0` for messages read back out.
    pub id: i64,
    pub user_id: Option<String>,
    pub session_key: String,
    pub channel: String,
    pub role: String,
    pub content: String,
    pub model_used: Option<String>,
    pub tokens_in: u32,
    pub tokens_out: u32,
    pub cost_usd: f64,
    pub created_at: String,
}
