use anyhow::{bail, Context, Result};
use log::info;
use std::path::PathBuf;

use molio::cif::{parse_cif_binary, parse_cif_text_with};
use molio::export::BlockExporter;
use molio::formats::Format;
use molio::task::ParseOptions;

use super::config::Config;
use super::load::{logging_context, Input};
use super::Profile;

/// Export the categories of a CIF file to Parquet
pub fn run(
    input: PathBuf,
    output: Option<PathBuf>,
    profile: Profile,
    config: Option<PathBuf>,
    compression_level: Option<i32>,
    row_group_size: Option<usize>,
) -> Result<()> {
    let config = Config::load(config.as_deref())?;
    let profile = match config.export.profile.as_deref() {
        Some(name) if profile == Profile::default() => {
            name.parse::<Profile>().map_err(anyhow::Error::msg)?
        }
        _ => profile,
    };
    let export_config = profile.export_config(
        compression_level.or(config.export.compression_level),
        row_group_size.or(config.export.row_group_size),
    );
    let mut options = ParseOptions::new();
    if let Some(chunk_size) = config.parse.chunk_size {
        options = options.with_chunk_size(chunk_size);
    }

    let source = Input::read(&input, None)?;
    let output = output.unwrap_or_else(|| {
        let name = input.file_name().unwrap_or_default().to_string_lossy();
        let stem = name.split('.').next().unwrap_or("out");
        input.with_file_name(format!("{}.molio", stem))
    });

    info!("molio export - CIF to Parquet");
    info!("Input:  {}", input.display());
    info!("Output: {}", output.display());
    info!("Profile: {}", profile);
    info!("Compression: {:?}", export_config.compression);
    info!("Row group size: {}", export_config.row_group_size);

    let file_name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let exporter = BlockExporter::new(&output, export_config).with_source(file_name);

    let stats = match source.format {
        Format::CifText => {
            let parsed = parse_cif_text_with(source.text()?, &mut logging_context(), &options)
                .context("Failed to parse CIF")?;
            exporter.export_file(&parsed.result)
        }
        Format::CifBinary => {
            let parsed = parse_cif_binary(&source.bytes).context("Failed to parse BinaryCIF")?;
            exporter.export_file(&parsed.result)
        }
        other => bail!("Export reads CIF and BinaryCIF input, got {}", other),
    }
    .context("Export failed")?;

    info!("Export complete!");
    info!("  Blocks: {}", stats.blocks_written);
    info!("  Categories: {}", stats.categories_written);
    info!("  Rows: {}", stats.rows_written);
    info!("  Parquet bytes: {}", stats.bytes_written);
    println!("{}", stats);
    Ok(())
}
