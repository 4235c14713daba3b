//! Export profiles for common use cases.
//!
//! Profiles pick compression and row group size so users rarely need the
//! low-level Parquet flags.

use std::fmt;
use std::str::FromStr;

use molio::export::{CompressionType, ExportConfig};

/// Export profiles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Profile {
    /// Snappy compression, 50,000 rows per group.
    Fast,

    /// ZSTD level 3, 100,000 rows per group (default).
    #[default]
    Balanced,

    /// ZSTD level 19, 500,000 rows per group.
    MaxCompression,
}

impl Profile {
    /// Compression used by this profile.
    pub fn compression(&self) -> CompressionType {
        match self {
            Profile::Fast => CompressionType::Snappy,
            Profile::Balanced => CompressionType::Zstd(3),
            Profile::MaxCompression => CompressionType::Zstd(19),
        }
    }

    /// Rows per Parquet row group.
    pub fn row_group_size(&self) -> usize {
        match self {
            Profile::Fast => 50_000,
            Profile::Balanced => 100_000,
            Profile::MaxCompression => 500_000,
        }
    }

    /// Export configuration with overrides applied on top of the profile.
    pub fn export_config(
        &self,
        compression_level: Option<i32>,
        row_group_size: Option<usize>,
    ) -> ExportConfig {
        let compression = compression_level
            .map(CompressionType::Zstd)
            .unwrap_or_else(|| self.compression());
        ExportConfig::default()
            .with_compression(compression)
            .with_row_group_size(row_group_size.unwrap_or_else(|| self.row_group_size()))
    }

    /// Returns all available profile names.
    pub fn variants() -> &'static [&'static str] {
        &["fast", "balanced", "max-compression"]
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Profile::Fast => write!(f, "fast"),
            Profile::Balanced => write!(f, "balanced"),
            Profile::MaxCompression => write!(f, "max-compression"),
        }
    }
}

impl FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fast" => Ok(Profile::Fast),
            "balanced" | "default" => Ok(Profile::Balanced),
            "max-compression" | "maxcompression" | "max" => Ok(Profile::MaxCompression),
            _ => Err(format!(
                "Unknown profile '{}'. Valid options: {}",
                s,
                Profile::variants().join(", ")
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_defaults() {
        let balanced = Profile::default();
        assert_eq!(balanced, Profile::Balanced);
        assert_eq!(balanced.compression(), CompressionType::Zstd(3));
        assert_eq!(balanced.row_group_size(), 100_000);
    }

    #[test]
    fn test_profile_overrides() {
        let config = Profile::Fast.export_config(Some(12), None);
        assert_eq!(config.compression, CompressionType::Zstd(12));
        assert_eq!(config.row_group_size, 50_000);

        let config = Profile::MaxCompression.export_config(None, Some(10));
        assert_eq!(config.compression, CompressionType::Zstd(19));
        assert_eq!(config.row_group_size, 10);
    }

    #[test]
    fn test_profile_from_str() {
        assert_eq!(Profile::from_str("fast").unwrap(), Profile::Fast);
        assert_eq!(Profile::from_str("BALANCED").unwrap(), Profile::Balanced);
        assert_eq!(
            Profile::from_str("max-compression").unwrap(),
            Profile::MaxCompression
        );
        assert!(Profile::from_str("invalid").is_err());
    }
}
