use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;
use validator::Validate;

use crate::services::did_client::DEFAULT_DID_BASE_URL;
use crate::services::llm_client::{DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};
use crate::services::video_renderer::{default_backup_avatars, RenderSettings, DEFAULT_AVATAR_URL};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}

/// Main configuration for the talking agent relay
#[derive(Debug, Deserialize, Validate, Clone)]
pub struct Config {
    /// Interface the HTTP server binds to
    pub server_host: String,

    /// HTTP server port
    #[validate(range(min = 1024, max = 65535))]
    pub server_port: u16,

    /// Database URL (SeaORM / SQLite)
    pub database_url: String,

    /// Maximum database connections
    #[validate(range(min = 1, max = 100))]
    pub max_connections: u32,

    /// Log level (e.g., info, debug, trace)
    pub log_level: String,

    /// Allow cross-origin requests from the browser frontend
    pub cors_enabled: bool,

    /// Gemini API key; required at startup
    pub gemini_api_key: Option<String>,

    #[validate(url)]
    pub gemini_base_url: String,

    pub gemini_model: String,

    /// D-ID API key (already Basic-encoded); required at startup
    pub did_api_key: Option<String>,

    #[validate(url)]
    pub did_base_url: String,

    /// Avatar image used when a render request names none
    #[validate(url)]
    pub default_avatar_url: String,

    /// Avatar images tried in order when the primary one fails
    pub backup_avatar_urls: Vec<String>,

    /// Longest script sent to the video API, in characters
    #[validate(range(min = 1, max = 10000))]
    pub video_script_max_chars: usize,

    #[validate(range(min = 1))]
    pub video_poll_interval_ms: u64,

    /// Wall-clock ceiling for one render job
    #[validate(range(min = 1, max = 3600))]
    pub video_timeout_secs: u64,

    /// Prior messages included in the reply prompt
    #[validate(range(min = 1, max = 50))]
    pub history_window: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: 8000,
            database_url: "sqlite://talking_agent.db".to_string(),
            max_connections: 10,
            log_level: "info".to_string(),
            cors_enabled: true,
            gemini_api_key: None,
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            did_api_key: None,
            did_base_url: DEFAULT_DID_BASE_URL.to_string(),
            default_avatar_url: DEFAULT_AVATAR_URL.to_string(),
            backup_avatar_urls: default_backup_avatars(),
            video_script_max_chars: 150,
            video_poll_interval_ms: 3000,
            video_timeout_secs: 60,
            history_window: 5,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let mut builder = config::Config::builder()
            // Core defaults
            .set_default("server_host", defaults.server_host)?
            .set_default("server_port", 8000)?
            .set_default("database_url", defaults.database_url)?
            .set_default("max_connections", 10)?
            .set_default("log_level", defaults.log_level)?
            .set_default("cors_enabled", true)?
            // Upstream services
            .set_default("gemini_base_url", defaults.gemini_base_url)?
            .set_default("gemini_model", defaults.gemini_model)?
            .set_default("did_base_url", defaults.did_base_url)?
            .set_default("default_avatar_url", defaults.default_avatar_url)?
            .set_default("backup_avatar_urls", defaults.backup_avatar_urls)?
            // Render + prompt policy
            .set_default("video_script_max_chars", 150)?
            .set_default("video_poll_interval_ms", 3000)?
            .set_default("video_timeout_secs", 60)?
            .set_default("history_window", 5)?;

        // Conventional provider variable names, overridable below
        if let Ok(key) = std::env::var("GOOGLE_API_KEY") {
            builder = builder.set_default("gemini_api_key", key)?;
        }
        if let Ok(key) = std::env::var("DID_API_KEY") {
            builder = builder.set_default("did_api_key", key)?;
        }

        let settings = builder
            // Load from ~/.talking-agent/config.toml (if present)
            .add_source(
                config::File::with_name(&format!(
                    "{}/.talking-agent/config",
                    std::env::var("HOME").unwrap_or_else(|_| ".".to_string())
                ))
                .required(false),
            )
            // Environment overrides: TALKING_AGENT__SERVER_PORT, TALKING_AGENT__DID_API_KEY, etc.
            .add_source(
                config::Environment::with_prefix("TALKING_AGENT")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("backup_avatar_urls")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: Config = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.server_host, self.server_port).parse()
    }

    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            default_avatar: self.default_avatar_url.clone(),
            backup_avatars: self.backup_avatar_urls.clone(),
            script_max_chars: self.video_script_max_chars,
            poll_interval: Duration::from_millis(self.video_poll_interval_ms),
            timeout: Duration::from_secs(self.video_timeout_secs),
        }
    }
}
