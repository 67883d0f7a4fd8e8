//! List command implementation

use anyhow::Result;
use std::path::Path;

use super::OutputFormat;

pub fn run(root: &Path, format: OutputFormat) -> Result<()> {
    let (vault, index) = super::open_vault(root)?;
    let records = index.list_all();
    index.close()?;
    let records = records?;

    if format == OutputFormat::Json {
        return super::print_json(&records);
    }

    if records.is_empty() {
        println!("Vault '{}' is empty. Run 'etherith add <file>' first.", vault.name);
        return Ok(());
    }

    println!(
        "{:<5} {:<17} {:<12} {:<30} {}",
        "ID", "Added", "Hash", "Title", "Tags"
    );
    println!("{}", "-".repeat(90));

    for record in records {
        let hash: String = record.content_hash.chars().take(10).collect();

        // Truncate title
        let title = if record.title.chars().count() > 30 {
            format!("{}...", record.title.chars().take(27).collect::<String>())
        } else {
            record.title.clone()
        };

        println!(
            "{:<5} {:<17} {:<12} {:<30} {}",
            record.id,
            super::format_date(&record),
            hash,
            title,
            record.tags.join(", "),
        );
    }

    Ok(())
}
