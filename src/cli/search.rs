//! Search command implementation

use anyhow::Result;
use std::path::Path;

use super::OutputFormat;
use crate::config::Config;

pub fn run(
    root: &Path,
    config: &Config,
    query: &str,
    limit: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let (_vault, index) = super::open_vault(root)?;
    let limit = limit.unwrap_or(config.search.default_limit);
    let results = index.search(query, limit);
    index.close()?;
    let results = results?;

    if format == OutputFormat::Json {
        return super::print_json(&results);
    }

    if results.is_empty() {
        println!("🔍 No files found matching \"{}\".", query);
        println!("   Search matches filename, title, description and tags;");
        println!("   try a shorter or partial word.");
        return Ok(());
    }

    println!("📋 Search results ({} found):", results.len());
    super::print_records(&results, config);
    Ok(())
}
