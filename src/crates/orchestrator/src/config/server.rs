//! Static topology configuration for orchestrator-server: renderer
//! paths, media/temp directories, and provider base URLs. Secrets (API
//! keys) and per-deployment overrides live in environment variables, not
//! this file; see `ServerConfig::load`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(toml::de::Error),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Server identification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfoConfig {
    #[serde(default = "default_server_name")]
    pub name: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerInfoConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_server_name() -> String {
    "orchestrator-server".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Filesystem paths the renderer dispatch and pipeline read from / write
/// to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_media_dir")]
    pub media_dir: PathBuf,
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,
    #[serde(default)]
    pub renderer_preference: Option<String>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            media_dir: default_media_dir(),
            temp_dir: default_temp_dir(),
            renderer_preference: None,
        }
    }
}

fn default_media_dir() -> PathBuf {
    PathBuf::from("media")
}

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir().join("orchestrator")
}

/// Base URLs for the four remote LLM vendors. API keys are always read
/// from the environment, never from this file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default = "default_anthropic_base_url")]
    pub anthropic_base_url: String,
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,
    #[serde(default = "default_deepseek_base_url")]
    pub deepseek_base_url: String,
    #[serde(default)]
    pub cost_optimize: bool,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            anthropic_base_url: default_anthropic_base_url(),
            openai_base_url: default_openai_base_url(),
            gemini_base_url: default_gemini_base_url(),
            deepseek_base_url: default_deepseek_base_url(),
            cost_optimize: false,
        }
    }
}

fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_deepseek_base_url() -> String {
    "https://api.deepseek.com".to_string()
}

/// Complete server configuration, layered over environment-variable
/// overrides and CLI flags per the ambient configuration design.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerInfoConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl ServerConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ServerConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ServerConfigError::ReadError)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self, ServerConfigError> {
        toml::from_str(content).map_err(ServerConfigError::ParseError)
    }

    /// Load configuration, preferring (in order):
    /// 1. `CONFIG_PATH` environment variable
    /// 2. `config/orchestrator-server.toml`
    /// 3. `../config/orchestrator-server.toml` (development layout)
    /// 4. built-in defaults, if no file is found anywhere
    pub fn load() -> Result<Self, ServerConfigError> {
        if let Ok(config_path) = std::env::var("CONFIG_PATH") {
            return Self::from_file(config_path);
        }

        let paths = [
            PathBuf::from("config/orchestrator-server.toml"),
            PathBuf::from("../config/orchestrator-server.toml"),
            PathBuf::from("./orchestrator-server.toml"),
        ];

        for path in &paths {
            if path.exists() {
                return Self::from_file(path);
            }
        }

        Ok(Self::default())
    }

    /// Apply environment-variable overrides for per-deployment knobs.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Ok(cost_optimize) = std::env::var("COST_OPTIMIZE") {
            self.providers.cost_optimize = cost_optimize.eq_ignore_ascii_case("true");
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_toml() {
        let config = ServerConfig::from_str(
            r#"
            [server]
            name = "test-server"
            port = 9090
            "#,
        )
        .unwrap();

        assert_eq!(config.server.name, "test-server");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.providers.anthropic_base_url, default_anthropic_base_url());
    }

    #[test]
    fn default_config_is_usable() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn load_falls_back_to_defaults_with_no_file() {
        std::env::remove_var("CONFIG_PATH");
        let config = ServerConfig::load().unwrap();
        assert_eq!(config.server.name, "orchestrator-server");
    }
}
