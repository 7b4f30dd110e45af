use config::{Config as ConfigLoader, ConfigError, File};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub storage: StorageConfig,
    pub completion: CompletionConfig,
    pub relay: RelayConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    pub logging: LoggingConfig,

    // Secrets (from ENV only)
    #[serde(default)]
    pub completion_api_key: String,
    #[serde(default)]
    pub upstream_api_key: String,
    #[serde(default)]
    pub mongodb_uri: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound for producing response headers. Once an event stream
    /// has started its body is not cut off.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    300
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub enabled: bool,
    pub origins: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Mongodb,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub database: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionConfig {
    /// Streaming chat function the sessions talk to
    pub endpoint: String,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    pub enabled: bool,
    /// OpenAI-compatible chat completions URL
    pub upstream_url: String,
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// Default size of the recent conversations list
    #[serde(default = "default_recent_limit")]
    pub recent_limit: i64,
    /// Sessions untouched for this long are closed
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
}

fn default_recent_limit() -> i64 {
    10
}

fn default_session_idle_secs() -> u64 {
    3600
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            recent_limit: default_recent_limit(),
            session_idle_secs: default_session_idle_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

/// Environment variables that override single keys
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("SERVER_HOST", "server.host"),
    ("SERVER_PORT", "server.port"),
    ("SERVER_TIMEOUT_SECS", "server.timeout_secs"),
    ("STORAGE_BACKEND", "storage.backend"),
    ("STORAGE_DATABASE", "storage.database"),
    ("COMPLETION_ENDPOINT", "completion.endpoint"),
    ("COMPLETION_MODEL", "completion.model"),
    ("RELAY_ENABLED", "relay.enabled"),
    ("RELAY_UPSTREAM_URL", "relay.upstream_url"),
    ("RELAY_MODEL", "relay.model"),
    ("CHAT_SESSION_IDLE_SECS", "chat.session_idle_secs"),
    ("LOG_LEVEL", "logging.level"),
    ("LOG_FORMAT", "logging.format"),
];

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. Environment variables (SERVER_, STORAGE_, COMPLETION_, RELAY_, CHAT_, LOG_ prefixes)
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let mut builder = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false));

        for (var, key) in ENV_OVERRIDES {
            builder = builder.set_override_option(*key, std::env::var(var).ok())?;
        }

        let mut cfg: Config = builder.build()?.try_deserialize()?;

        // Secrets come from ENV only
        cfg.completion_api_key = required_env("COMPLETION_API_KEY")?;
        if cfg.relay.enabled {
            cfg.upstream_api_key = required_env("UPSTREAM_API_KEY")?;
        }
        if cfg.storage.backend == StorageBackend::Mongodb {
            cfg.mongodb_uri = required_env("MONGODB_URI")?;
        }

        Ok(cfg)
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        ConfigLoader::builder()
            .add_source(File::from(path.as_ref()))
            .build()?
            .try_deserialize()
    }
}

fn required_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ConfigError::Message(format!("{} environment variable is required", name)))
}
