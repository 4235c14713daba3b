use anyhow::{Context, Result};
use std::path::PathBuf;

use molio::formats::Format;
use molio::task::ParseOptions;

use super::config::Config;
use super::load::{summarize, Input};

/// Print a summary of a file
pub fn run(
    file: PathBuf,
    format: Option<Format>,
    config: Option<PathBuf>,
    json: bool,
    chunk_size: Option<usize>,
) -> Result<()> {
    let config = Config::load(config.as_deref())?;
    let mut options = ParseOptions::new();
    if let Some(chunk_size) = chunk_size.or(config.parse.chunk_size) {
        options = options.with_chunk_size(chunk_size);
    }

    let input = Input::read(&file, format)?;
    let summary = summarize(&input, &options)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?
        );
        return Ok(());
    }

    println!("File: {}", summary.file);
    println!("Format: {}", summary.format);
    println!("Size: {} bytes", input.bytes.len());
    println!();
    println!("Contents:");
    for count in &summary.counts {
        println!("  {}: {}", count.name, count.value);
    }
    if !summary.details.is_empty() {
        println!();
        for detail in &summary.details {
            println!("  {}", detail);
        }
    }
    if !summary.warnings.is_empty() {
        println!();
        println!("Warnings ({}):", summary.warnings.len());
        for warning in &summary.warnings {
            println!("  {}", warning);
        }
    }
    Ok(())
}
