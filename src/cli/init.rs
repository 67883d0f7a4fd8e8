//! Init command implementation

use anyhow::{Context, Result};
use std::path::Path;

use crate::error::Error;
use crate::store::ArchiveIndex;
use crate::vault;

pub fn run(root: &Path, name: Option<&str>, force: bool) -> Result<()> {
    let config = match vault::initialize(root, name, force) {
        Ok(config) => config,
        Err(Error::AlreadyExists(_)) => {
            println!("⚠️  Vault already initialized in {}", root.display());
            println!("   Use --force to reinitialize (archived records are kept).");
            return Ok(());
        }
        Err(e) => return Err(e).context("initializing vault"),
    };

    let index = ArchiveIndex::open(&vault::storage_path(root)).context("creating archive index")?;
    index.close()?;

    println!("✅ Vault '{}' initialized", config.name);
    println!("📍 Location: {}", root.display());
    println!("\nNext steps:");
    println!("   • Preserve a file: etherith add <file>");
    println!("   • Find it again:   etherith search <query>");
    Ok(())
}
