use axum::{
    routing::{get, post},
    Router,
};
use dashmap::DashMap;
use aegis_engine::runtime::AgentRuntime;
use aegis_engine::CancellationRegistry;
use aegis_core::config::AegisConfig;
use aegis_core::types::ChannelOutbound;
use aegis_memory::manager::MemoryManager;
use aegis_scheduler::SchedulerHandle;
use aegis_sessions::SessionManager;
use aegis_exec::manager::TerminalManager;
use aegis_users::resolver::UserResolver;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::ws::broadcast::EventBroadcaster;

/// Central shared state — passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: AegisConfig,
    pub event_seq: AtomicU64,
    #[allow(dead_code)]
    pub presence_version: AtomicU64,
    pub broadcaster: EventBroadcaster,
    pub agent: AgentRuntime,
    pub users: UserResolver,
    pub memory: MemoryManager,
    pub sessions: SessionManager,
    pub scheduler: SchedulerHandle,
    /// Terminal subsystem — tokio::sync::Mutex because create_session, kill,
    /// exec_background, and job_kill are async and must be awaited while the
    /// lock is held.
    pub terminal: tokio::sync::Mutex<TerminalManager>,
    /// Active WS connections: conn_id -> message sender.
    pub ws_clients: DashMap<String, mpsc::Sender<String>>,
    /// Notification queue for HTTP/terminal clients: session_key -> pending messages.
    /// Drained by `GET /notifications`.
    pub notifications: DashMap<String, Vec<String>>,
    /// Active pipeline operations: session_key -> CancellationToken.
    /// `/stop` cancels all tokens to abort running tool loops.
    pub active_operations: DashMap<String, CancellationToken>,
    /// Process-wide user-id -> {stop, abort} flags, read at every loop-round
    /// boundary, sub-agent round, debate inter-round, and streaming pre-call.
    pub cancellation: CancellationRegistry,
    /// Outbound channel senders for cross-channel messaging.
    /// Key: channel name (e.g. "discord"), Value: sender for `ChannelOutbound` messages.
    pub channel_senders: DashMap<String, mpsc::Sender<ChannelOutbound>>,
}

impl AppState {
    pub fn new(
        config: AegisConfig,
        agent: AgentRuntime,
        users: UserResolver,
        memory: MemoryManager,
        sessions: SessionManager,
        scheduler: SchedulerHandle,
        terminal: TerminalManager,
    ) -> Self {
        Self {
            config,
            event_seq: AtomicU64::new(0),
            presence_version: AtomicU64::new(0),
            broadcaster: EventBroadcaster::new(),
            agent,
            users,
            memory,
            sessions,
            scheduler,
            terminal: tokio::sync::Mutex::new(terminal),
            ws_clients: DashMap::new(),
            notifications: DashMap::new(),
            active_operations: DashMap::new(),
            cancellation: CancellationRegistry::new(),
            channel_senders: DashMap::new(),
        }
    }

    /// Monotonically increasing sequence for broadcast events.
    pub fn next_seq(&self) -> u64 {
        self.event_seq.fetch_add(1, Ordering::Relaxed)
    }
}

impl aegis_engine::pipeline::MessageContext for AppState {
    fn agent(&self) -> &aegis_engine::runtime::AgentRuntime {
        &self.agent
    }

    fn memory(&self) -> &aegis_memory::manager::MemoryManager {
        &self.memory
    }

    fn terminal(&self) -> &tokio::sync::Mutex<aegis_exec::manager::TerminalManager> {
        &self.terminal
    }

    fn scheduler(&self) -> &aegis_scheduler::SchedulerHandle {
        &self.scheduler
    }

    fn users(&self) -> &aegis_users::resolver::UserResolver {
        &self.users
    }

    fn connected_channels(&self) -> Vec<String> {
        self.channel_senders
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    fn send_to_channel(&self, channel: &str, recipient: &str, message: &str) -> Result<(), String> {
        let sender = self
            .channel_senders
            .get(channel)
            .ok_or_else(|| format!("channel '{}' is not connected", channel))?;
        sender
            .try_send(ChannelOutbound {
                recipient: recipient.to_string(),
                message: message.to_string(),
            })
            .map_err(|e| format!("failed to send to '{}': {}", channel, e))
    }

    fn gateway_port(&self) -> Option<u16> {
        Some(self.config.gateway.port)
    }

    fn database_path(&self) -> Option<&str> {
        Some(&self.config.database.path)
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(crate::http::ui::ui_handler))
        .route("/health", get(crate::http::health::health_handler))
        .route("/chat", post(crate::http::chat::chat_handler))
        .route(
            "/notifications",
            get(crate::http::notifications::notifications_handler),
        )
        .route("/ws", get(crate::ws::connection::ws_handler))
        .route(
            "/v1/chat/completions",
            post(crate::http::openai_compat::chat_completions),
        )
        .route(
            "/webhooks/{source}",
            post(crate::http::webhooks::webhook_handler),
        )
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
