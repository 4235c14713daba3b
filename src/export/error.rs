/// Errors that can occur during export
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// I/O error during file operations
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from the Arrow library while building arrays
    #[error("Arrow error: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),

    /// Error from the Parquet library during file writing
    #[error("Parquet error: {0}")]
    ParquetError(#[from] parquet::errors::ParquetError),

    /// Error writing the manifest
    #[error("JSON error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    /// Input that cannot be exported
    #[error("Invalid data: {0}")]
    InvalidData(String),
}
