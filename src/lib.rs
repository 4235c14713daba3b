//! # molio - readers for molecular file formats
//!
//! `molio` parses the file formats of structural biology and molecular
//! simulation into lazily evaluated, column-oriented data.
//!
//! ## Key Features
//!
//! - **Zero-copy text columns**: text readers record `(start, end)` ranges into
//!   the input and convert a value only when it is requested.
//!
//! - **One column contract**: token, fixed-width and array columns all implement
//!   [`data::Column`], including the present / not present (`.`) / unknown (`?`)
//!   distinction of CIF.
//!
//! - **Cooperative progress**: long loops run in chunks; between chunks the
//!   [`task::RuntimeContext`] reports progress and honors cancellation.
//!
//! - **Uniform results**: every reader returns [`result::ReaderResult`], either a
//!   [`result::ReaderError`] (syntax errors carry a line number) or a
//!   [`result::Parsed`] value with its warnings.
//!
//! - **Parquet export** (feature `export`): CIF categories become Parquet files
//!   with a JSON manifest.
//!
//! ## Quick Start
//!
//! ```rust
//! use molio::cif::parse_cif_text;
//!
//! let text = "data_1ABC
//! loop_
//! _atom_site.id
//! _atom_site.type_symbol
//! _atom_site.Cartn_x
//! 1 N 10.5
//! 2 C ?
//! ";
//! let parsed = parse_cif_text(text)?;
//! let block = &parsed.result.blocks[0];
//! let x = block.get_field("atom_site.Cartn_x").unwrap();
//! assert_eq!(x.float(0), 10.5);
//! assert_eq!(x.value_kind(1), molio::data::ValueKind::Unknown);
//! # Ok::<(), molio::result::ReaderError>(())
//! ```
//!
//! ## Supported Formats
//!
//! | Module | Formats |
//! |--------|---------|
//! | [`cif`] | CIF / mmCIF text, BinaryCIF |
//! | [`formats::pdb`] | PDB, PDBQT |
//! | [`formats::mol`], [`formats::sdf`], [`formats::mol2`] | MDL MOL, SD files, Tripos MOL2 |
//! | [`formats::psf`], [`formats::prmtop`], [`formats::top`], [`formats::gro`] | CHARMM PSF, AMBER and GROMACS topologies, GROMACS structures |
//! | [`formats::xyz`], [`formats::csv`], [`formats::ply`] | XYZ, CSV, ASCII PLY |
//! | [`formats::dcd`], [`formats::trr`] | DCD and TRR trajectories |

// Documentation lints
#![warn(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![allow(clippy::too_many_arguments)]

pub mod cif;
pub mod data;
#[cfg(feature = "export")]
pub mod export;
pub mod formats;
pub mod result;
pub mod task;
pub mod text;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::cif::{
        parse_cif_binary, parse_cif_text, parse_cif_text_with, CifBlock, CifCategory, CifField,
        CifFile,
    };
    pub use crate::data::{
        ArrayColumn, Column, FixedColumn, TextField, TokenColumn, ValueKind, ValueType,
    };
    #[cfg(feature = "export")]
    pub use crate::export::{BlockExporter, CompressionType, ExportConfig, ExportError};
    pub use crate::formats::{decompress, Format};
    pub use crate::result::{Parsed, ReaderError, ReaderResult};
    pub use crate::task::{chunked_subtask, CancellationToken, ParseOptions, Progress, RuntimeContext};
    pub use crate::text::{Tokenizer, Tokens};
}
