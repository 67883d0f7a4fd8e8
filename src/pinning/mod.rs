//! Remote pinning service clients
//!
//! Two upload paths exist:
//! - Gateway: the Etherith API receives the file and pins it on our behalf
//! - Direct: the pinning service is called with credentials kept in the vault

mod gateway;
mod pinata;

pub use gateway::GatewayClient;
pub use pinata::PinataClient;

use std::path::Path;

use crate::config::{Config, UploadMode};
use crate::error::Result;
use crate::vault::VaultConfig;

/// Metadata sent alongside the file bytes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinMetadata {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
}

/// What the remote store reports back for a pinned file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinReceipt {
    pub content_hash: String,
    pub size: u64,
    /// Only set when the remote store reports one
    pub mime_type: Option<String>,
    pub gateway_url: String,
}

/// Content-addressed upload target
pub trait PinningService {
    /// Short name for diagnostics
    fn name(&self) -> &str;

    /// Upload the file at `path`; no retry is attempted on failure.
    fn upload(&self, path: &Path, metadata: &PinMetadata) -> Result<PinReceipt>;

    /// Verify that the service is reachable and accepts our credentials.
    fn check_connection(&self) -> Result<()>;
}

/// Build the client selected by `config.remote.mode`.
///
/// Direct mode needs credentials stored in the vault.
pub fn connect(config: &Config, vault: &VaultConfig) -> Result<Box<dyn PinningService>> {
    match config.remote.mode {
        UploadMode::Gateway => Ok(Box::new(GatewayClient::new(
            &config.remote.api_url,
            config.timeout(),
        )?)),
        UploadMode::Direct => {
            let (api_key, secret_key) = vault.credentials()?;
            Ok(Box::new(PinataClient::new(
                &config.remote.pinata_url,
                &config.remote.gateway_url,
                api_key,
                secret_key,
                config.timeout(),
            )?))
        }
    }
}
