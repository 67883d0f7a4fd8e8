use anyhow::Result;
use std::path::Path;

use crate::metadata::format_file_size;
use crate::vault;

pub fn run(root: &Path) -> Result<()> {
    let (config, index) = super::open_vault(root)?;
    let count = index.count();
    let total = index.total_size();
    index.close()?;

    println!("Vault:    {}", config.name);
    println!("Created:  {}", config.created_at.to_rfc3339());
    println!("Version:  {}", config.version);
    println!("Index:    {}", vault::storage_path(root).display());
    println!("Records:  {}", count?);
    println!("Archived: {}", format_file_size(total?));
    Ok(())
}
