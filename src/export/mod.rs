//! # Parquet export
//!
//! Writes parsed CIF blocks as one Parquet file per category, plus a JSON
//! manifest describing the block.
//!
//! Column types follow [`infer_field_type`](crate::cif::infer_field_type):
//! integer fields become `Int32`, decimal fields `Float64` and everything
//! else `Utf8`. Values that are not present (`.`) or unknown (`?`) are
//! written as nulls.
//!
//! ```text
//! out/
//!   1ABC/
//!     manifest.json
//!     atom_site.parquet
//!     entity.parquet
//! ```

mod batch;
mod bundle;
mod config;
mod error;


pub use batch::{category_schema, category_to_record_batch};
pub use bundle::{BlockExporter, BlockManifest, CategoryEntry, ColumnEntry, ExportStats};
pub use config::{CompressionType, ExportConfig};
pub use error::ExportError;
