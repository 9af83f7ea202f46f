//! Configuration management for crumbd.
//!
//! Loads settings from `$CRUMB_CONFIG`, then /etc/crumb/config.toml, or uses
//! defaults. The model provider key is never read from the file.

use crate::llm_client::LlmError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Config file path
pub const CONFIG_PATH: &str = "/etc/crumb/config.toml";

/// Environment variable overriding the config path
pub const CONFIG_ENV: &str = "CRUMB_CONFIG";

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Request body cap in bytes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_bind() -> String {
    "127.0.0.1:7870".to_string()
}

fn default_max_body_bytes() -> usize {
    256 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Model provider configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// OpenAI-compatible base URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Output token bound for both rounds
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_endpoint() -> String {
    "https://api.x.ai/v1".to_string()
}

fn default_model() -> String {
    "grok-2-1212".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_timeout() -> u64 {
    60
}

fn default_api_key_env() -> String {
    "XAI_API_KEY".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout(),
            api_key_env: default_api_key_env(),
        }
    }
}

impl LlmConfig {
    /// Resolve the API key through `lookup`, trying the configured name and
    /// then its lowercase spelling. Blank values count as missing.
    pub fn api_key_from<F>(&self, lookup: F) -> Result<String, LlmError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let names = [self.api_key_env.clone(), self.api_key_env.to_lowercase()];
        let key = names
            .iter()
            .filter_map(|name| lookup(name))
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty());
        key.ok_or_else(|| LlmError::MissingCredential(self.api_key_env.clone()))
    }

    /// Resolve the API key from the process environment
    pub fn api_key(&self) -> Result<String, LlmError> {
        self.api_key_from(|name| std::env::var(name).ok())
    }
}

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub llm: LlmConfig,
}

impl Config {
    /// Load config from file, or return defaults
    pub fn load() -> Self {
        let from_env = std::env::var(CONFIG_ENV).ok();
        let loaded = match from_env.as_deref() {
            Some(path) => Self::load_from_path(path).or_else(|e| {
                warn!("Could not load {}={}: {:#}", CONFIG_ENV, path, e);
                Self::load_from_path(CONFIG_PATH)
            }),
            None => Self::load_from_path(CONFIG_PATH),
        };

        loaded.unwrap_or_else(|e| {
            warn!("Config not found, using defaults: {:#}", e);
            Config::default()
        })
    }

    /// Load config from specific path
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }
}
