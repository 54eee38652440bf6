use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub media: MediaConfig,
    pub turn: TurnConfig,
    pub comments: CommentsConfig,
    pub lobby: LobbyConfig,
    pub chat: ChatConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            cors_origin: "*".to_string(),
        }
    }
}

/// SFU worker / transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Number of mediasoup workers spawned at startup
    pub num_workers: usize,
    /// Local address the WebRTC servers bind to
    pub listen_ip: String,
    /// Public address advertised in ICE candidates (unset for local use)
    pub announced_ip: Option<String>,
    /// Base UDP+TCP port; worker i listens on `port + i`
    pub port: u16,
    /// Initial outgoing bitrate estimate handed to new transports (bps)
    pub initial_available_outgoing_bitrate: u32,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            num_workers: 2,
            listen_ip: "0.0.0.0".to_string(),
            announced_ip: None,
            port: 40000,
            initial_available_outgoing_bitrate: 600_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnConfig {
    pub url: Option<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
    /// STUN servers always included in the ICE server list
    pub stun_servers: Vec<String>,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            url: None,
            username: None,
            credential: None,
            stun_servers: vec![
                "stun:stun.l.google.com:19302".to_string(),
                "stun:stun1.l.google.com:19302".to_string(),
            ],
        }
    }
}

/// Upstream instances for the comments proxy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentsConfig {
    pub instances: Vec<String>,
    pub cache_ttl_seconds: u64,
    pub request_timeout_seconds: u64,
}

impl Default for CommentsConfig {
    fn default() -> Self {
        Self {
            instances: vec![
                "https://inv.nadeko.net".to_string(),
                "https://invidious.nerdvpn.de".to_string(),
                "https://yewtu.be".to_string(),
            ],
            cache_ttl_seconds: 300,
            request_timeout_seconds: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LobbyConfig {
    /// Whether `GET /rooms` exposes the public room listing
    pub enabled: bool,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub max_message_len: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_message_len: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

impl Config {
    /// Load configuration from multiple sources with priority:
    /// 1. Well-known flat environment variables (highest priority)
    /// 2. `WATCHPARTY_`-prefixed environment variables
    /// 3. Config file (if provided)
    /// 4. Defaults (lowest priority)
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        // Load config file if provided
        if let Some(path) = config_file {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
            }
        }

        // Override with environment variables (WATCHPARTY_SERVER_HOST, etc.)
        builder = builder.add_source(
            Environment::with_prefix("WATCHPARTY")
                .separator("_")
                .try_parsing(true),
        );

        // Flat deployment variables take precedence over everything else
        builder = builder
            .set_override_option("server.port", env_i64("PORT"))?
            .set_override_option("server.cors_origin", env_str("CORS_ORIGIN"))?
            .set_override_option("media.announced_ip", env_str("MEDIASOUP_ANNOUNCED_IP"))?
            .set_override_option("media.port", env_i64("MEDIASOUP_PORT"))?
            .set_override_option("media.num_workers", env_i64("MEDIASOUP_NUM_WORKERS"))?
            .set_override_option("turn.url", env_str("TURN_URL"))?
            .set_override_option("turn.username", env_str("TURN_USERNAME"))?
            .set_override_option("turn.credential", env_str("TURN_CREDENTIAL"))?
            .set_override_option("comments.instances", env_csv("INVIDIOUS_INSTANCES"))?;

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Load from environment variables only (for Docker/K8s)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Get HTTP bind address
    #[must_use]
    pub fn http_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Validate configuration; returns all problems found
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.media.num_workers == 0 {
            errors.push("media.num_workers must be at least 1".to_string());
        }
        if self.media.listen_ip.parse::<std::net::IpAddr>().is_err() {
            errors.push(format!("media.listen_ip is not an IP address: {}", self.media.listen_ip));
        }
        if self.turn.url.is_some() != self.turn.username.is_some()
            || self.turn.url.is_some() != self.turn.credential.is_some()
        {
            errors.push("turn.url, turn.username and turn.credential must be set together".to_string());
        }
        if self.chat.max_message_len == 0 {
            errors.push("chat.max_message_len must be at least 1".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn env_str(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_i64(name: &str) -> Option<i64> {
    env_str(name).and_then(|v| v.parse::<i64>().ok())
}

fn env_csv(name: &str) -> Option<Vec<config::Value>> {
    env_str(name).map(|v| {
        v.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(config::Value::from)
            .collect()
    })
}
