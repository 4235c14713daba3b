use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use log::{debug, info};
use parquet::arrow::ArrowWriter;
use serde::{Deserialize, Serialize};

use crate::cif::{CifBlock, CifCategory, CifFile};

use super::batch::category_to_record_batch;
use super::{ExportConfig, ExportError};

/// Manifest format version
pub const MANIFEST_VERSION: &str = "1.0";

/// Name of the manifest written next to the category files
pub const MANIFEST_FILE: &str = "manifest.json";

/// A column of an exported category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnEntry {
    /// Column name
    pub name: String,
    /// Arrow type name (`Utf8`, `Int32` or `Float64`)
    #[serde(rename = "type")]
    pub data_type: String,
}

/// An exported category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEntry {
    /// Category name
    pub name: String,
    /// File name relative to the block directory
    pub file: String,
    /// Number of rows
    pub row_count: usize,
    /// Columns in source order
    pub columns: Vec<ColumnEntry>,
}

/// Contents of `manifest.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockManifest {
    /// Manifest format version
    pub format_version: String,
    /// Creation time (RFC 3339)
    pub created: String,
    /// Name and version of the writer
    pub converter: String,
    /// Block header
    pub block: String,
    /// Name of the source file, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Exported categories
    pub categories: Vec<CategoryEntry>,
}

/// Totals of an export run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportStats {
    /// Number of block directories written
    pub blocks_written: usize,
    /// Number of category files written
    pub categories_written: usize,
    /// Total rows over all categories
    pub rows_written: usize,
    /// Total size of the Parquet files in bytes
    pub bytes_written: u64,
}

impl fmt::Display for ExportStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Wrote {} categories ({} rows) from {} blocks, {} bytes",
            self.categories_written, self.rows_written, self.blocks_written, self.bytes_written
        )
    }
}

/// Replace characters that are not safe in file names
pub(crate) fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "unnamed".to_string()
    } else {
        cleaned.to_string()
    }
}

/// `name`, or `name_2`, `name_3`, ... if already taken
fn unique_name(taken: &mut HashSet<String>, name: String) -> String {
    let mut candidate = name.clone();
    let mut n = 2;
    while taken.contains(&candidate) {
        candidate = format!("{name}_{n}");
        n += 1;
    }
    taken.insert(candidate.clone());
    candidate
}

/// Writes CIF blocks to `<out_dir>/<block>/<category>.parquet`
#[derive(Debug, Clone)]
pub struct BlockExporter {
    out_dir: PathBuf,
    config: ExportConfig,
    source: Option<String>,
}

impl BlockExporter {
    /// Create an exporter writing below `out_dir`
    pub fn new(out_dir: impl Into<PathBuf>, config: ExportConfig) -> Self {
        Self {
            out_dir: out_dir.into(),
            config,
            source: None,
        }
    }

    /// Record the source file name in manifests
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Output directory
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Export every block of a file. Save frames are not exported.
    pub fn export_file(&self, file: &CifFile<'_>) -> Result<ExportStats, ExportError> {
        let mut stats = ExportStats::default();
        let mut taken = HashSet::new();
        for block in &file.blocks {
            let dir_name = unique_name(&mut taken, sanitize_file_name(&block.header));
            let (_, block_stats) = self.write_block(block, &self.out_dir.join(dir_name))?;
            stats.blocks_written += 1;
            stats.categories_written += block_stats.categories_written;
            stats.rows_written += block_stats.rows_written;
            stats.bytes_written += block_stats.bytes_written;
        }
        info!("{stats}");
        Ok(stats)
    }

    /// Export a single block into its own directory
    pub fn export_block(&self, block: &CifBlock<'_>) -> Result<BlockManifest, ExportError> {
        let dir = self.out_dir.join(sanitize_file_name(&block.header));
        Ok(self.write_block(block, &dir)?.0)
    }

    fn write_block(
        &self,
        block: &CifBlock<'_>,
        dir: &Path,
    ) -> Result<(BlockManifest, ExportStats), ExportError> {
        fs::create_dir_all(dir)?;
        let mut stats = ExportStats::default();
        let mut taken = HashSet::new();
        let mut categories = Vec::with_capacity(block.categories.len());

        for category in block.categories.iter() {
            if category.field_names.is_empty() {
                debug!("Skipping category '{}' without fields", category.name);
                continue;
            }
            let file_name = format!(
                "{}.parquet",
                unique_name(&mut taken, sanitize_file_name(&category.name))
            );
            let path = dir.join(&file_name);
            let entry = self.write_category(block, category, &path, file_name)?;

            stats.categories_written += 1;
            stats.rows_written += entry.row_count;
            stats.bytes_written += fs::metadata(&path)?.len();
            categories.push(entry);
        }

        let manifest = BlockManifest {
            format_version: MANIFEST_VERSION.to_string(),
            created: chrono::Utc::now().to_rfc3339(),
            converter: format!("molio v{}", env!("CARGO_PKG_VERSION")),
            block: block.header.clone(),
            source: self.source.clone(),
            categories,
        };
        fs::write(
            dir.join(MANIFEST_FILE),
            serde_json::to_string_pretty(&manifest)?,
        )?;
        debug!(
            "Exported block '{}' to {}: {} categories",
            block.header,
            dir.display(),
            stats.categories_written
        );
        Ok((manifest, stats))
    }

    fn write_category(
        &self,
        block: &CifBlock<'_>,
        category: &CifCategory<'_>,
        path: &Path,
        file_name: String,
    ) -> Result<CategoryEntry, ExportError> {
        let batch = category_to_record_batch(category)?;

        let mut metadata = HashMap::new();
        metadata.insert("molio:block".to_string(), block.header.clone());
        metadata.insert("molio:category".to_string(), category.name.clone());
        metadata.insert(
            "molio:version".to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
        );
        let props = self.config.to_writer_properties(&metadata);

        let file = File::create(path)?;
        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
        writer.write(&batch)?;
        writer.close()?;

        let columns = batch
            .schema()
            .fields()
            .iter()
            .map(|f| ColumnEntry {
                name: f.name().clone(),
                data_type: f.data_type().to_string(),
            })
            .collect();
        Ok(CategoryEntry {
            name: category.name.clone(),
            file: file_name,
            row_count: batch.num_rows(),
            columns,
        })
    }
}
