//! Application configuration with YAML support
//!
//! Distinct from the per-vault `config.json`: this file only says how to
//! reach the pinning service and how the CLI behaves.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which upload path to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadMode {
    /// Through the Etherith API gateway, which holds the pinning credentials
    #[default]
    Gateway,
    /// Straight to the pinning service with credentials stored in the vault
    Direct,
}

/// Remote pinning service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default)]
    pub mode: UploadMode,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_pinata_url")]
    pub pinata_url: String,

    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Search defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String, // 'error', 'warn', 'info', 'debug', 'trace'
}

// Default value functions
fn default_api_url() -> String {
    "https://etherith-api.carl-lewis.workers.dev".to_string()
}

fn default_pinata_url() -> String {
    "https://api.pinata.cloud".to_string()
}

fn default_gateway_url() -> String {
    "https://gateway.pinata.cloud/ipfs".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_limit() -> usize {
    10
}

fn default_level() -> String {
    "warn".to_string()
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            mode: UploadMode::default(),
            api_url: default_api_url(),
            pinata_url: default_pinata_url(),
            gateway_url: default_gateway_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    /// Searches in order:
    /// 1. Provided path
    /// 2. ./etherith.yaml (current directory)
    /// 3. ~/.config/etherith/etherith.yaml
    pub fn load(path: &str) -> Result<Self> {
        let mut search_paths = vec![
            PathBuf::from(shellexpand::tilde(path).to_string()),
            PathBuf::from("etherith.yaml"),
        ];
        if let Some(dir) = dirs::config_dir() {
            search_paths.push(dir.join("etherith/etherith.yaml"));
        }
        search_paths.push(PathBuf::from(
            shellexpand::tilde("~/.config/etherith/etherith.yaml").to_string(),
        ));

        for search_path in &search_paths {
            if search_path.is_file() {
                let content = std::fs::read_to_string(search_path)
                    .with_context(|| format!("reading {}", search_path.display()))?;
                let config: Config = serde_yaml::from_str(&content)
                    .with_context(|| format!("parsing {}", search_path.display()))?;
                return Ok(config);
            }
        }

        // No config file found, use defaults
        Ok(Config::default())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.remote.timeout_secs)
    }

    /// Gateway link for a content hash
    pub fn gateway_link(&self, content_hash: &str) -> String {
        format!(
            "{}/{}",
            self.remote.gateway_url.trim_end_matches('/'),
            content_hash
        )
    }
}
