//! Add command implementation

use anyhow::{Context, Result};
use std::path::Path;

use crate::config::Config;
use crate::error::Error;
use crate::metadata::{self, format_file_size, FileMetadata};
use crate::pinning::{self, PinMetadata, PinningService};
use crate::store::{ArchiveIndex, ArchiveRecord, NewArchiveRecord};

/// User-supplied overrides for the derived metadata
#[derive(Debug, Clone, Default)]
pub struct AddOptions {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<String>,
}

/// Result of a preservation attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preserved {
    Archived {
        record: ArchiveRecord,
        gateway_url: String,
    },
    /// Same content was archived before; nothing was written.
    AlreadyArchived(ArchiveRecord),
}

fn normalize(path: &Path, options: &AddOptions) -> crate::Result<FileMetadata> {
    metadata::normalize(
        path,
        options.title.as_deref(),
        options.description.as_deref(),
        options.tags.as_deref(),
    )
}

/// Normalize, upload, then record the file in the index.
///
/// An upload failure stops before the index is touched.
pub fn preserve(
    index: &ArchiveIndex,
    service: &dyn PinningService,
    path: &Path,
    options: &AddOptions,
) -> crate::Result<Preserved> {
    let meta = normalize(path, options)?;
    preserve_normalized(index, service, path, meta)
}

/// Upload and record a file whose metadata was already derived by
/// [`metadata::normalize`].
pub fn preserve_normalized(
    index: &ArchiveIndex,
    service: &dyn PinningService,
    path: &Path,
    meta: FileMetadata,
) -> crate::Result<Preserved> {
    let receipt = service.upload(
        path,
        &PinMetadata {
            title: meta.title.clone(),
            description: meta.description.clone(),
            tags: meta.tags.clone(),
        },
    )?;

    let draft = NewArchiveRecord {
        filename: meta.filename,
        original_path: meta.original_path,
        content_hash: receipt.content_hash,
        title: meta.title,
        description: meta.description,
        tags: meta.tags,
        file_size: meta.file_size,
        mime_type: receipt.mime_type.unwrap_or(meta.mime_type),
    };

    match index.insert(&draft) {
        Ok(record) => Ok(Preserved::Archived {
            record,
            gateway_url: receipt.gateway_url,
        }),
        Err(Error::DuplicateContent(existing)) => Ok(Preserved::AlreadyArchived(*existing)),
        Err(e) => Err(e),
    }
}

pub fn run(root: &Path, config: &Config, file: &Path, options: &AddOptions) -> Result<()> {
    // Bad paths are reported before the vault is even opened
    let meta = normalize(file, options)?;

    let (vault, index) = super::open_vault(root)?;
    let service = pinning::connect(config, &vault)?;

    println!("Preserving {} via {}...", file.display(), service.name());
    let outcome = preserve_normalized(&index, service.as_ref(), file, meta)
        .with_context(|| format!("preserving {}", file.display()));
    index.close()?;

    match outcome? {
        Preserved::Archived {
            record,
            gateway_url,
        } => {
            println!("\n✅ Preserved successfully!");
            println!("{}", "━".repeat(60));
            println!("📄 File:  {}", record.filename);
            println!("📝 Title: {}", record.title);
            println!("📦 Hash:  {}", record.content_hash);
            println!(
                "🏷️  Tags:  {}",
                if record.tags.is_empty() {
                    "None".to_string()
                } else {
                    record.tags.join(", ")
                }
            );
            println!("📏 Size:  {}", format_file_size(record.file_size));
            println!("🔗 Link:  {}", gateway_url);
            println!("{}", "━".repeat(60));
            println!("\nFind it again: etherith search \"{}\"", record.title);
        }
        Preserved::AlreadyArchived(existing) => {
            println!("⚠️  Already preserved:");
            println!("   Title: {}", existing.title);
            println!("   Hash:  {}", existing.content_hash);
        }
    }

    Ok(())
}
