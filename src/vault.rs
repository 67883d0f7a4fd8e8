//! Vault lifecycle: the per-directory `.etherith/config.json` record
//!
//! A vault root holds `.etherith/config.json` (this module) and
//! `.etherith/index.db` (owned by the archive index).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{Error, Result};

pub const VAULT_DIR: &str = ".etherith";
const CONFIG_FILE: &str = "config.json";
const INDEX_FILE: &str = "index.db";

/// Software version recorded in new vaults.
pub const VAULT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Per-vault configuration record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultConfig {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub version: String,
    #[serde(default)]
    pub credentials: Credentials,
}

/// Locally stored pinning-service credentials, for direct uploads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum Credentials {
    #[default]
    NotConfigured,
    #[serde(rename_all = "camelCase")]
    Configured { api_key: String, secret_key: String },
}

impl VaultConfig {
    /// The configured `(api_key, secret_key)` pair.
    pub fn credentials(&self) -> Result<(&str, &str)> {
        match &self.credentials {
            Credentials::Configured {
                api_key,
                secret_key,
            } => Ok((api_key.as_str(), secret_key.as_str())),
            Credentials::NotConfigured => Err(Error::CredentialsNotConfigured),
        }
    }
}

pub fn vault_dir(root: &Path) -> PathBuf {
    root.join(VAULT_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    vault_dir(root).join(CONFIG_FILE)
}

/// Location of the archive index for the vault at `root`.
pub fn storage_path(root: &Path) -> PathBuf {
    vault_dir(root).join(INDEX_FILE)
}

pub fn is_initialized(root: &Path) -> bool {
    config_path(root).is_file()
}

/// Display name used when none is given: the root directory's base name.
pub fn default_name(root: &Path) -> String {
    let absolute = fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
    absolute
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "vault".to_string())
}

/// Create the vault directory and write a fresh config.
///
/// An existing vault is only overwritten when `reinitialize` is set, and
/// even then the archive index is left alone.
pub fn initialize(root: &Path, name: Option<&str>, reinitialize: bool) -> Result<VaultConfig> {
    if is_initialized(root) && !reinitialize {
        return Err(Error::AlreadyExists(root.to_path_buf()));
    }

    let name = match name {
        Some(n) if !n.trim().is_empty() => n.to_string(),
        _ => default_name(root),
    };

    let config = VaultConfig {
        name,
        created_at: Utc::now(),
        version: VAULT_VERSION.to_string(),
        credentials: Credentials::NotConfigured,
    };
    save_config(root, &config)?;

    info!(root = %root.display(), name = %config.name, reinitialize, "vault initialized");
    Ok(config)
}

/// `None` when the vault has not been initialized.
pub fn load_config(root: &Path) -> Result<Option<VaultConfig>> {
    let path = config_path(root);
    if !path.is_file() {
        return Ok(None);
    }

    let content = fs::read_to_string(&path)?;
    let config = serde_json::from_str(&content).map_err(|source| Error::CorruptConfig {
        path: path.clone(),
        source,
    })?;
    Ok(Some(config))
}

/// Store direct-upload credentials in an existing vault.
pub fn set_credentials(root: &Path, api_key: &str, secret_key: &str) -> Result<VaultConfig> {
    let mut config = load_config(root)?.ok_or_else(|| {
        Error::InvalidArgument(format!("no vault initialized at {}", root.display()))
    })?;

    config.credentials = Credentials::Configured {
        api_key: api_key.to_string(),
        secret_key: secret_key.to_string(),
    };
    save_config(root, &config)?;

    info!(root = %root.display(), "vault credentials updated");
    Ok(config)
}

fn save_config(root: &Path, config: &VaultConfig) -> Result<()> {
    fs::create_dir_all(vault_dir(root))?;

    let content = serde_json::to_string_pretty(config).map_err(|source| Error::CorruptConfig {
        path: config_path(root),
        source,
    })?;

    // Write-then-rename so a crash never leaves a half-written config
    let path = config_path(root);
    let staging = path.with_extension("json.tmp");
    fs::write(&staging, content)?;
    fs::rename(&staging, &path)?;
    Ok(())
}
