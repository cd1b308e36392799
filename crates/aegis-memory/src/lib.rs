//! `aegis-memory` — the Memory Log: append-only daily files holding
//! (user turn, assistant turn) pairs, rendered into a compressed excerpt
//! for prompt injection and used to rebuild recent conversation history.
//!
//! Files live at `<agent_dir>/memory/YYYY-MM-DD.md`, one per UTC date.
//! Nothing here is a live in-memory session — the session itself (current
//! model, bound system prompt, ordered message list) is never persisted;
//! this crate only owns the durable trace those sessions are reseeded from.

pub mod error;
pub mod manager;
pub mod types;

pub use error::MemoryError;
pub use manager::MemoryManager;
pub use types::ConversationMessage;
