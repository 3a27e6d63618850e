//! Server configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Voice-agent endpoint settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Stale-call reconciler settings.
    #[serde(default)]
    pub reconciler: ReconcilerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Public base URL the telephony carrier can reach. The webhook derives
    /// the media-stream WebSocket URL from this.
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Maximum pooled connections.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

/// Voice-agent socket configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// WebSocket endpoint of the cloud voice agent.
    #[serde(default = "default_agent_endpoint")]
    pub endpoint: String,

    /// API key sent as a bearer token when dialing the agent.
    #[serde(default)]
    pub api_key: String,
}

/// Stale-call reconciler configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconcilerConfig {
    /// Seconds between sweeps.
    #[serde(default = "default_reconcile_interval")]
    pub interval_seconds: u64,

    /// Age in minutes past which an in-progress call is considered stuck.
    #[serde(default = "default_stale_threshold")]
    pub threshold_minutes: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "hostline_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3000
}

fn default_public_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_db_path() -> String {
    "hostline.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    8
}

fn default_agent_endpoint() -> String {
    "wss://agent.deepgram.com/v1/agent/converse".to_string()
}

fn default_reconcile_interval() -> u64 {
    60
}

fn default_stale_threshold() -> u32 {
    3
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_url: default_public_url(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            endpoint: default_agent_endpoint(),
            api_key: String::new(),
        }
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_reconcile_interval(),
            threshold_minutes: default_stale_threshold(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `HOSTLINE_HOST` overrides `server.host`
/// - `HOSTLINE_PORT` overrides `server.port`
/// - `HOSTLINE_PUBLIC_URL` overrides `server.public_url`
/// - `HOSTLINE_DB_PATH` overrides `database.path`
/// - `HOSTLINE_AGENT_ENDPOINT` overrides `agent.endpoint`
/// - `HOSTLINE_AGENT_API_KEY` overrides `agent.api_key`
/// - `HOSTLINE_LOG_LEVEL` overrides `logging.level`
/// - `HOSTLINE_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    // Environment variable overrides
    if let Ok(host) = std::env::var("HOSTLINE_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Ok(port) = std::env::var("HOSTLINE_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Ok(url) = std::env::var("HOSTLINE_PUBLIC_URL") {
        config.server.public_url = url;
    }
    if let Ok(db_path) = std::env::var("HOSTLINE_DB_PATH") {
        config.database.path = db_path;
    }
    if let Ok(endpoint) = std::env::var("HOSTLINE_AGENT_ENDPOINT") {
        config.agent.endpoint = endpoint;
    }
    if let Ok(key) = std::env::var("HOSTLINE_AGENT_API_KEY") {
        config.agent.api_key = key;
    }
    if let Ok(level) = std::env::var("HOSTLINE_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(json) = std::env::var("HOSTLINE_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.pool_max_size, 8);
        assert_eq!(config.reconciler.interval_seconds, 60);
        assert_eq!(config.reconciler.threshold_minutes, 3);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn partial_file_fills_missing_sections_with_defaults() {
        let parsed: Config = toml::from_str(
            r#"
            [server]
            port = 8080

            [agent]
            endpoint = "wss://example.test/agent"
            api_key = "secret"
            "#,
        )
        .expect("parse");
        assert_eq!(parsed.server.port, 8080);
        assert_eq!(parsed.agent.endpoint, "wss://example.test/agent");
        assert_eq!(parsed.database.path, "hostline.db");
        assert_eq!(parsed.reconciler.threshold_minutes, 3);
    }
}
