//! Command implementations for the `etherith` binary

pub mod add;
pub mod check;
pub mod credentials;
pub mod init;
pub mod list;
pub mod search;
pub mod stats;

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::ValueEnum;
use std::path::Path;

use crate::config::Config;
use crate::metadata::format_file_size;
use crate::store::{ArchiveIndex, ArchiveRecord};
use crate::vault::{self, VaultConfig};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Load the vault config and open its index, refusing uninitialized roots.
pub fn open_vault(root: &Path) -> Result<(VaultConfig, ArchiveIndex)> {
    let Some(config) = vault::load_config(root)? else {
        bail!(
            "No vault found in {}. Initialize one first: etherith init",
            root.display()
        );
    };

    let index = ArchiveIndex::open(&vault::storage_path(root))
        .with_context(|| format!("opening archive index for vault '{}'", config.name))?;
    Ok((config, index))
}

pub fn format_date(record: &ArchiveRecord) -> String {
    record
        .created_at
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

/// Numbered multi-line listing used by `search` and `list`.
pub fn print_records(records: &[ArchiveRecord], config: &Config) {
    println!("{}", "━".repeat(80));

    for (i, record) in records.iter().enumerate() {
        println!("{:>2}. {}", i + 1, record.title);
        println!("    📄 File: {}", record.filename);
        println!("    📦 Hash: {}", record.content_hash);
        println!(
            "    📏 Size: {} | Type: {}",
            format_file_size(record.file_size),
            record.mime_type
        );
        if !record.description.is_empty() && record.description != record.title {
            println!("    📝 Description: {}", record.description);
        }
        if !record.tags.is_empty() {
            println!("    🏷️  Tags: {}", record.tags.join(", "));
        }
        println!("    📅 Added: {}", format_date(record));
        println!("    🔗 Gateway: {}", config.gateway_link(&record.content_hash));

        if i + 1 < records.len() {
            println!();
        }
    }

    println!("{}", "━".repeat(80));
}

pub fn print_json(records: &[ArchiveRecord]) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(records)?);
    Ok(())
}
