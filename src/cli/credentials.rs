use anyhow::{bail, Result};
use std::path::Path;

use crate::vault;

pub fn set(root: &Path, api_key: &str, secret_key: &str) -> Result<()> {
    if api_key.trim().is_empty() || secret_key.trim().is_empty() {
        bail!("Both --api-key and --secret-key are required");
    }
    if !vault::is_initialized(root) {
        bail!(
            "No vault found in {}. Initialize one first: etherith init",
            root.display()
        );
    }

    let config = vault::set_credentials(root, api_key, secret_key)?;
    println!("🔑 Credentials stored for vault '{}'", config.name);
    println!("   Set `remote.mode: direct` in etherith.yaml to upload with them.");
    Ok(())
}
