//! Check command implementation

use anyhow::{bail, Context, Result};
use std::path::Path;

use crate::config::Config;
use crate::{pinning, vault};

pub fn run(root: &Path, config: &Config) -> Result<()> {
    let Some(vault_config) = vault::load_config(root)? else {
        bail!(
            "No vault found in {}. Initialize one first: etherith init",
            root.display()
        );
    };

    let service = pinning::connect(config, &vault_config)?;
    println!("Testing connection via {}...", service.name());
    service
        .check_connection()
        .with_context(|| format!("{} is unreachable", service.name()))?;

    println!("✅ Connected to the pinning service");
    Ok(())
}
