use std::collections::HashMap;

use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::{EnabledStatistics, WriterProperties};
use parquet::format::KeyValue;

/// Compression applied to exported Parquet files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    /// ZSTD at the given level
    Zstd(i32),
    /// Snappy
    Snappy,
    /// No compression
    Uncompressed,
}

impl Default for CompressionType {
    fn default() -> Self {
        Self::Zstd(3)
    }
}

impl CompressionType {
    /// ZSTD level 22
    pub fn max_compression() -> Self {
        Self::Zstd(22)
    }

    /// Snappy
    pub fn fast() -> Self {
        Self::Snappy
    }
}

/// Configuration for [`BlockExporter`](super::BlockExporter)
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Compression type to use
    pub compression: CompressionType,

    /// Maximum rows per Parquet row group
    pub row_group_size: usize,

    /// Data page size in bytes
    pub data_page_size: usize,

    /// Whether to write column chunk statistics
    pub write_statistics: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            compression: CompressionType::default(),
            row_group_size: 100_000,
            // 1MB data pages
            data_page_size: 1024 * 1024,
            write_statistics: true,
        }
    }
}

impl ExportConfig {
    /// Set the compression
    pub fn with_compression(mut self, compression: CompressionType) -> Self {
        self.compression = compression;
        self
    }

    /// Set the row group size; zero is treated as one
    pub fn with_row_group_size(mut self, rows: usize) -> Self {
        self.row_group_size = rows.max(1);
        self
    }

    /// Create writer properties carrying `metadata` in the file footer
    pub(super) fn to_writer_properties(
        &self,
        metadata: &HashMap<String, String>,
    ) -> WriterProperties {
        let compression = match self.compression {
            CompressionType::Zstd(level) => {
                Compression::ZSTD(ZstdLevel::try_new(level).unwrap_or(ZstdLevel::default()))
            }
            CompressionType::Snappy => Compression::SNAPPY,
            CompressionType::Uncompressed => Compression::UNCOMPRESSED,
        };

        let statistics = if self.write_statistics {
            EnabledStatistics::Chunk
        } else {
            EnabledStatistics::None
        };

        let mut kv_metadata: Vec<KeyValue> = metadata
            .iter()
            .map(|(k, v)| KeyValue {
                key: k.clone(),
                value: Some(v.clone()),
            })
            .collect();
        kv_metadata.sort_by(|a, b| a.key.cmp(&b.key));

        WriterProperties::builder()
            .set_compression(compression)
            .set_data_page_size_limit(self.data_page_size)
            .set_statistics_enabled(statistics)
            .set_max_row_group_size(self.row_group_size.max(1))
            .set_key_value_metadata(Some(kv_metadata))
            .build()
    }
}
