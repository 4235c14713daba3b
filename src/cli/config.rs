//! TOML configuration file support.
//!
//! Settings that would otherwise need several flags can live in a file:
//!
//! ```toml
//! # molio.toml
//! [parse]
//! chunk_size = 50000
//!
//! [export]
//! profile = "max-compression"
//! compression_level = 15
//! row_group_size = 200000
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Root configuration structure for molio.toml files.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Reader settings.
    #[serde(default)]
    pub parse: ParseConfig,

    /// Settings for the export command.
    #[serde(default)]
    pub export: ExportSettings,
}

/// Reader settings shared by all commands.
#[derive(Debug, Default, Deserialize)]
pub struct ParseConfig {
    /// Items processed between two progress checkpoints.
    pub chunk_size: Option<usize>,
}

/// Configuration for the export command.
#[derive(Debug, Default, Deserialize)]
pub struct ExportSettings {
    /// Profile name (fast, balanced, max-compression).
    pub profile: Option<String>,

    /// ZSTD compression level (1-22).
    pub compression_level: Option<i32>,

    /// Rows per Parquet row group.
    pub row_group_size: Option<usize>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }

    /// Load `path` if given, otherwise the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        path.map(Self::from_file).transpose().map(Option::unwrap_or_default)
    }
}
