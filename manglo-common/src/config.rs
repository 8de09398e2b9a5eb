//! Configuration loading for the Manglo service
//!
//! Resolution follows a fixed priority order:
//! 1. Command-line argument (highest priority)
//! 2. `MANGLO_CONFIG` environment variable
//! 3. Platform config file (`~/.config/manglo/config.toml` on Linux)
//! 4. Compiled defaults (fallback)
//!
//! The OpenRouter API key may additionally be supplied through
//! `MANGLO_OPENROUTER_API_KEY` or `OPENROUTER_API_KEY`, which override the
//! TOML value.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default ordered class-label list for the disease classifier.
///
/// Index order must match the output layer of the model artifact.
pub const DEFAULT_DISEASE_CLASSES: [&str; 8] = [
    "Healthy",
    "Anthracnose",
    "Bacterial_Canker",
    "Cutting_Weevil",
    "Die_Back",
    "Gall_Midge",
    "Powdery_Mildew",
    "Sooty_Mould",
];

/// Top-level service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Data directory holding the database and uploaded images
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub chat: ChatConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Classifier model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Path to the safetensors weight artifact
    #[serde(default = "default_artifact_path")]
    pub artifact_path: PathBuf,
    /// Square input resolution expected by the model
    #[serde(default = "default_input_size")]
    pub input_size: u32,
    /// Ordered class labels; index order must match the model output layer
    #[serde(default = "default_labels")]
    pub labels: Vec<String>,
}

/// Remote completion (OpenRouter) and fallback settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// API key; missing key means every remote call fails and the
    /// knowledge fallback serves all chat traffic
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_chat_model")]
    pub model: String,
    /// Upper bound on completion length, passed through to the API
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Remote call timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Number of prior exchanges included as conversation context
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,
    /// Fallback streaming chunk size in characters
    #[serde(default = "default_fallback_chunk_chars")]
    pub fallback_chunk_chars: usize,
    /// Pacing interval between fallback chunks, in milliseconds.
    /// Purely cosmetic; 0 disables pacing.
    #[serde(default = "default_fallback_chunk_interval_ms")]
    pub fallback_chunk_interval_ms: u64,
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("manglo"))
        .unwrap_or_else(|| PathBuf::from("./manglo_data"))
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_artifact_path() -> PathBuf {
    default_data_dir().join("model").join("manglo.safetensors")
}

fn default_input_size() -> u32 {
    224
}

fn default_labels() -> Vec<String> {
    DEFAULT_DISEASE_CLASSES
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_api_url() -> String {
    "https://openrouter.ai/api/v1/chat/completions".to_string()
}

fn default_chat_model() -> String {
    "deepseek/deepseek-chat".to_string()
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_history_limit() -> u32 {
    5
}

fn default_fallback_chunk_chars() -> usize {
    12
}

fn default_fallback_chunk_interval_ms() -> u64 {
    10
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            server: ServerConfig::default(),
            model: ModelConfig::default(),
            chat: ChatConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            artifact_path: default_artifact_path(),
            input_size: default_input_size(),
            labels: default_labels(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: None,
            model: default_chat_model(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            history_limit: default_history_limit(),
            fallback_chunk_chars: default_fallback_chunk_chars(),
            fallback_chunk_interval_ms: default_fallback_chunk_interval_ms(),
        }
    }
}

impl AppConfig {
    /// Load configuration with CLI → env → TOML → default priority
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = cli_path {
            info!("Loading config from command line: {}", path.display());
            Self::from_file(path)?
        } else if let Ok(path) = std::env::var("MANGLO_CONFIG") {
            info!("Loading config from MANGLO_CONFIG: {}", path);
            Self::from_file(Path::new(&path))?
        } else if let Some(path) = platform_config_path() {
            if path.exists() {
                info!("Loading config file: {}", path.display());
                Self::from_file(&path)?
            } else {
                info!("No config file found, using defaults");
                Self::default()
            }
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
    }

    /// Apply environment variable overrides (API key only)
    fn apply_env_overrides(&mut self) {
        for var in ["MANGLO_OPENROUTER_API_KEY", "OPENROUTER_API_KEY"] {
            if let Ok(key) = std::env::var(var) {
                if !key.trim().is_empty() {
                    if self.chat.api_key.is_some() {
                        warn!("OpenRouter API key in both config file and {}; using {}", var, var);
                    }
                    self.chat.api_key = Some(key);
                    return;
                }
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.model.labels.is_empty() {
            return Err(Error::Config("model.labels must not be empty".to_string()));
        }
        if self.model.input_size == 0 {
            return Err(Error::Config("model.input_size must be nonzero".to_string()));
        }
        Ok(())
    }

    /// Path of the SQLite database inside the data directory
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("manglo.db")
    }

    /// Directory for uploaded prediction images
    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }

    /// HTTP bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Default config file path for the platform
fn platform_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("manglo").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.model.input_size, 224);
        assert_eq!(config.model.labels.len(), 8);
        assert_eq!(config.chat.timeout_secs, 30);
        assert_eq!(config.chat.history_limit, 5);
        assert!(config.chat.api_key.is_none());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [server]
            port = 8080

            [chat]
            model = "test/model"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.chat.model, "test/model");
        assert_eq!(config.chat.max_tokens, 2000);
        assert_eq!(config.model.labels[0], "Healthy");
    }

    #[test]
    fn empty_labels_rejected() {
        let config: AppConfig = toml::from_str(
            r#"
            [model]
            labels = []
            "#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }
}
