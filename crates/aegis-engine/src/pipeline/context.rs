//! Shared context interface for all channel adapters.
//!
//! `MessageContext` is the single trait that every channel host (gateway, discord,
//! future telegram, etc.) must implement. It replaces the old `DiscordAppContext`
//! and lets the pipeline crate stay channel-agnostic.

use aegis_memory::manager::MemoryManager;
use aegis_scheduler::SchedulerHandle;
use aegis_exec::manager::TerminalManager;

use crate::runtime::AgentRuntime;

/// Minimal context interface required by the shared message pipeline.
///
/// Implemented by `AppState` in `aegis-gateway` and any future channel host.
/// Defined here (in `aegis-engine`) to avoid circular dependency: all channel
/// crates depend on `aegis-engine`; `aegis-engine` depends only on `aegis-core`,
/// `aegis-memory`, `aegis-scheduler`, and `aegis-exec`.
pub trait MessageContext: Send + Sync {
    fn agent(&self) -> &AgentRuntime;
    fn memory(&self) -> &MemoryManager;
    fn terminal(&self) -> &tokio::sync::Mutex<TerminalManager>;
    fn scheduler(&self) -> &SchedulerHandle;
    fn users(&self) -> &aegis_users::resolver::UserResolver;

    /// Names of channel adapters currently connected, for the `send_message`
    /// and `notify` tools to validate a target against.
    fn connected_channels(&self) -> Vec<String>;

    /// Hand a message to a connected channel adapter's outbound queue.
    fn send_to_channel(&self, channel: &str, recipient: &str, message: &str) -> Result<(), String>;

    /// Port the HTTP/SSE façade is listening on, if running in-process.
    fn gateway_port(&self) -> Option<u16> {
        None
    }

    /// Path to the primary SQLite database, if this host uses one.
    fn database_path(&self) -> Option<&str> {
        None
    }
}
