use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

// Protocol constants — must match OpenClaw wire protocol exactly
pub const PROTOCOL_VERSION: u32 = 3;
pub const DEFAULT_PORT: u16 = 18789;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const MAX_PAYLOAD_BYTES: usize = 128 * 1024; // 128 KB hard cap per frame
pub const MAX_BUFFERED_BYTES: usize = 1024 * 1024; // 1 MB: slow consumer threshold
pub const HANDSHAKE_TIMEOUT_MS: u64 = 10_000; // close if client doesn't auth in 10s
pub const HEARTBEAT_INTERVAL_SECS: u64 = 30; // tick event cadence

/// Top-level config (aegis.toml + AEGIS_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AegisConfig {
    pub gateway: GatewayConfig,
    pub agent: AgentConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub channels: ChannelsConfig,
    #[serde(default)]
    pub webhooks: WebhooksConfig,
    #[serde(default)]
    pub update: UpdateConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Tool-calling loop / context budgeter tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Fraction of a provider's `num_ctx` the budgeter is allowed to fill
    /// before hard-trim/compaction kicks in.
    #[serde(default = "default_context_quota")]
    pub context_quota: f64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            context_quota: default_context_quota(),
        }
    }
}

fn default_context_quota() -> f64 {
    0.85
}

/// Update subsystem configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateConfig {
    /// Check for updates on server start (default: true).
    /// Override with env var: AEGIS_UPDATE_CHECK_ON_START=false
    #[serde(default = "bool_true")]
    pub check_on_start: bool,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            check_on_start: true,
        }
    }
}

impl Default for AegisConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            gateway: GatewayConfig {
                port: DEFAULT_PORT,
                bind: DEFAULT_BIND.to_string(),
                auth: AuthConfig {
                    mode: AuthMode::Token,
                    token: Some("change-me".to_string()),
                    password: None,
                },
            },
            agent: AgentConfig {
                model: "claude-sonnet-4-6".to_string(),
                soul_path: None,
                agent_dir: default_agent_dir(),
            },
            providers: ProvidersConfig::default(),
            channels: ChannelsConfig::default(),
            webhooks: WebhooksConfig::default(),
            update: UpdateConfig::default(),
            memory: MemoryConfig::default(),
            chat: ChatConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub mode: AuthMode,
    pub token: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMode {
    Token,
    Password,
    Tailscale,
    DeviceToken,
    TrustedProxy,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_model")]
    pub model: String,
    pub soul_path: Option<String>,
    /// Directory holding persona/workspace files and the `memory/` subdirectory
    /// of daily Memory Log files. Created on first use.
    #[serde(default = "default_agent_dir")]
    pub agent_dir: String,
}

/// Memory Log settings: append-only daily `<agent_dir>/memory/YYYY-MM-DD.md`
/// files holding (user turn, assistant turn) pairs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Truncate each rendered excerpt line to this many characters.
    #[serde(default = "default_max_chars_per_line")]
    pub max_chars_per_line: usize,
    /// How many trailing daily files to consider when rebuilding history/excerpt.
    #[serde(default = "default_memory_days")]
    pub days: u32,
    /// Token budget (len/3 estimate) for the rendered memory excerpt.
    #[serde(default = "default_memory_max_tokens")]
    pub max_tokens: u32,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_chars_per_line: default_max_chars_per_line(),
            days: default_memory_days(),
            max_tokens: default_memory_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProvidersConfig {
    pub anthropic: Option<AnthropicConfig>,
    pub openai: Option<OpenAiProviderConfig>,
    pub ollama: Option<OllamaConfig>,
    pub deepseek: Option<DeepseekConfig>,
    pub google: Option<GoogleConfig>,
    pub claude_cli: Option<ClaudeCliConfig>,
    /// Additional OpenAI-compatible providers. Each entry can reference a
    /// well-known provider ID (e.g. "groq", "deepseek") or define a fully
    /// custom endpoint. Providers are tried in order after the primary slots.
    #[serde(default)]
    pub openai_compat: Vec<OpenAiCompatEntry>,
}

/// Per-model knobs that override a provider's defaults for one model id.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ModelOverlay {
    pub num_ctx: Option<u32>,
    pub thinking: Option<bool>,
    pub options: Option<serde_json::Value>,
}

/// Model catalog shared by every provider kind: which models it exposes,
/// the default when none is named, alias → model-id resolution, the
/// fallback chain the tool-calling loop escalates through on retryable
/// failure, and the reduced subset sub-agent invocations may pick from.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderModels {
    #[serde(default)]
    pub list: Vec<String>,
    pub default: Option<String>,
    #[serde(default)]
    pub aliases: std::collections::HashMap<String, String>,
    #[serde(default)]
    pub fallbacks: Vec<String>,
    #[serde(default)]
    pub subagents: Vec<String>,
    #[serde(default)]
    pub overlays: std::collections::HashMap<String, ModelOverlay>,
}

/// A single OpenAI-compatible provider entry.
///
/// Well-known provider IDs are resolved automatically:
/// `groq`, `deepseek`, `openrouter`, `xai`, `mistral`, `perplexity`,
/// `together`, `fireworks`, `cerebras`, `sambanova`, `hyperbolic`,
/// `novita`, `lepton`, `corethink`, `featherless`, `requesty`, `glama`,
/// `chutes`, `cohere`, `moonshot`, `glm`, `doubao`, `qwen`, `zai`,
/// `yi`, `minimax`, `hunyuan`, `stepfun`, `lmstudio`, `llamacpp`,
/// `localai`, `litellm`.
///
/// For unknown IDs, `base_url` is required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiCompatEntry {
    /// Provider identifier — matches a known ID or a custom label.
    pub id: String,
    /// API key for this provider.
    pub api_key: String,
    /// Base URL (without trailing slash). Auto-filled from registry for known IDs.
    /// Required for custom/unknown providers.
    pub base_url: Option<String>,
    /// Override the chat completions path. Auto-filled from registry.
    /// Defaults to "/v1/chat/completions" when not in registry.
    pub chat_path: Option<String>,
    /// Override the model for requests routed to this provider.
    /// Falls back to `agent.model` when not set.
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiProviderConfig {
    pub api_key: String,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default = "default_num_ctx")]
    pub num_ctx: u32,
    #[serde(default)]
    pub models: ProviderModels,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,
    #[serde(default = "default_num_ctx")]
    pub num_ctx: u32,
    #[serde(default)]
    pub models: ProviderModels,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    pub api_key: String,
    #[serde(default = "default_anthropic_base_url")]
    pub base_url: String,
    #[serde(default = "default_num_ctx")]
    pub num_ctx: u32,
    #[serde(default)]
    pub models: ProviderModels,
}

/// DeepSeek's OpenAI-compatible chat completions API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeepseekConfig {
    pub api_key: String,
    #[serde(default = "default_deepseek_base_url")]
    pub base_url: String,
    #[serde(default = "default_num_ctx")]
    pub num_ctx: u32,
    #[serde(default)]
    pub models: ProviderModels,
}

/// Google Gemini via the `generativelanguage` REST API (contents[].parts,
/// functionCall/functionResponse for tools).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    pub api_key: String,
    #[serde(default = "default_google_base_url")]
    pub base_url: String,
    #[serde(default = "default_num_ctx")]
    pub num_ctx: u32,
    #[serde(default)]
    pub models: ProviderModels,
}

/// Claude Code CLI provider — shells out to an installed `claude` binary
/// with a single `--print` invocation per turn. Handles tools internally,
/// so the tool-calling loop never sees tool_use blocks from this adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaudeCliConfig {
    #[serde(default = "default_claude_command")]
    pub command: String,
    /// Path to the aegis-gateway binary, registered as an MCP server.
    pub mcp_bridge: Option<String>,
}

fn default_claude_command() -> String {
    "claude".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChannelsConfig {
    pub matrix: Option<MatrixConfig>,
    pub discord: Option<DiscordConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixConfig {
    pub homeserver_url: String,
    pub user_id: String,
    pub password: String,
    /// Persisted across restarts so the same device keeps its E2EE identity.
    #[serde(default)]
    pub device_id: Option<String>,
    /// Directory for the sqlite-backed client/crypto store (session state,
    /// room keys). Defaults to `<config_dir>/matrix/store`.
    pub store_path: std::path::PathBuf,
    #[serde(default = "bool_true")]
    pub dm_allowed: bool,
    #[serde(default)]
    pub require_mention: bool,
    #[serde(default = "default_max_attachment_bytes")]
    pub max_attachment_bytes: u64,
}

fn default_max_attachment_bytes() -> u64 {
    20 * 1024 * 1024
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub bot_token: String,
    /// When true, guild messages are only processed when the bot is @mentioned.
    /// Defaults to false (respond to all messages in channels).
    #[serde(default)]
    pub require_mention: bool,
    /// When true, direct messages (DMs) are accepted.
    /// Defaults to true.
    #[serde(default = "bool_true")]
    pub dm_allowed: bool,
}

fn bool_true() -> bool {
    true
}

/// Authentication mode for an incoming webhook source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum WebhookAuthMode {
    /// HMAC-SHA256 over the raw request body (GitHub-style X-Hub-Signature-256).
    HmacSha256,
    /// Static bearer token in the Authorization header.
    BearerToken,
    /// No authentication — use only for internal/trusted networks.
    None,
}

/// Configuration for a single webhook source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookSourceConfig {
    /// Identifier used in the route, e.g. "github" → POST /webhooks/github.
    pub name: String,
    /// HMAC signing secret or bearer token value.
    pub secret: Option<String>,
    /// How the incoming request should be authenticated.
    pub auth_mode: WebhookAuthMode,
}

/// Top-level webhooks subsystem configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WebhooksConfig {
    /// When false the /webhooks/:source route returns 404.
    #[serde(default)]
    pub enabled: bool,
    /// List of allowed webhook sources and their auth settings.
    #[serde(default)]
    pub sources: Vec<WebhookSourceConfig>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_model() -> String {
    "claude-sonnet-4-6".to_string()
}
fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com".to_string()
}
fn default_openai_base_url() -> String {
    "https://api.openai.com".to_string()
}
fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_deepseek_base_url() -> String {
    "https://api.deepseek.com".to_string()
}
fn default_google_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}
fn default_num_ctx() -> u32 {
    128_000
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.aegis/aegis.db", home)
}
fn default_agent_dir() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.aegis/agent", home)
}
fn default_max_chars_per_line() -> usize {
    500
}
fn default_memory_days() -> u32 {
    7
}
fn default_memory_max_tokens() -> u32 {
    2000
}

impl AegisConfig {
    /// Load config from a TOML file with AEGIS_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.aegis/aegis.toml  (native)
    ///   3. ~/.openclaw/openclaw.json  (migration path — Phase 2)
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: AegisConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("AEGIS_").split("_"))
            .extract()
            .map_err(|e| crate::error::AegisError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.aegis/aegis.toml", home)
}

/// Resolve the config file path the same way [`AegisConfig::load`] does:
/// `AEGIS_CONFIG` env var if set, else `~/.aegis/aegis.toml`. Exposed so
/// tools that need to write back to the live config file (e.g. `save_config`)
/// resolve the same path the process was loaded from.
pub fn resolve_config_path() -> String {
    std::env::var("AEGIS_CONFIG").unwrap_or_else(|_| default_config_path())
}
