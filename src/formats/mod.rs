//! Readers for the non-CIF molecular file formats.
//!
//! Text readers borrow the input string and expose lazy columns; binary
//! trajectory readers ([`dcd`], [`trr`]) decode into owned arrays.
//!
//! - [`pdb`] - PDB / PDBQT
//! - [`mol`], [`sdf`], [`mol2`] - small molecules
//! - [`psf`], [`prmtop`], [`top`], [`gro`] - topologies and GROMACS structures
//! - [`xyz`], [`csv`], [`ply`] - generic coordinate, table and mesh files
//! - [`dcd`], [`trr`] - trajectories
//!
//! [`Format`] maps file names to readers.

use std::fmt;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use flate2::read::GzDecoder;

use crate::result::ReaderError;

pub mod csv;
pub mod dcd;
pub mod gro;
pub mod mol;
pub mod mol2;
pub mod pdb;
pub mod ply;
pub mod prmtop;
pub mod psf;
pub mod sdf;
pub mod top;
pub mod trr;
pub mod xyz;

pub use csv::{parse_csv, parse_csv_with, CsvFile, CsvOptions};
pub use dcd::{parse_dcd, parse_dcd_with, DcdFile};
pub use gro::{parse_gro, parse_gro_with, GroFile};
pub use mol::{parse_mol, MolFile};
pub use mol2::{parse_mol2, parse_mol2_with, Mol2File};
pub use pdb::{parse_pdb, parse_pdb_with, PdbFile};
pub use ply::{parse_ply, parse_ply_with, PlyFile};
pub use prmtop::{parse_prmtop, parse_prmtop_with, PrmtopFile};
pub use psf::{parse_psf, parse_psf_with, PsfFile};
pub use sdf::{parse_sdf, parse_sdf_with, SdfFile};
pub use top::{parse_top, parse_top_with, TopFile};
pub use trr::{parse_trr, parse_trr_with, TrrFile};
pub use xyz::{parse_xyz, parse_xyz_with, XyzFile};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Every format the crate reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// CIF / mmCIF text
    CifText,
    /// BinaryCIF
    CifBinary,
    /// PDB
    Pdb,
    /// PDBQT (PDB with AutoDock charges and types)
    Pdbqt,
    /// MDL MOL (V2000)
    Mol,
    /// SD file
    Sdf,
    /// Tripos MOL2
    Mol2,
    /// Protein structure file
    Psf,
    /// AMBER topology
    Prmtop,
    /// GROMACS topology
    Top,
    /// GROMACS structure
    Gro,
    /// XYZ coordinates
    Xyz,
    /// Comma separated values
    Csv,
    /// ASCII PLY mesh
    Ply,
    /// DCD trajectory
    Dcd,
    /// GROMACS TRR trajectory
    Trr,
}

impl Format {
    /// All formats, in the order [`Format::name`] lists them
    pub const ALL: [Format; 16] = [
        Format::CifText,
        Format::CifBinary,
        Format::Pdb,
        Format::Pdbqt,
        Format::Mol,
        Format::Sdf,
        Format::Mol2,
        Format::Psf,
        Format::Prmtop,
        Format::Top,
        Format::Gro,
        Format::Xyz,
        Format::Csv,
        Format::Ply,
        Format::Dcd,
        Format::Trr,
    ];

    /// Short name used on the command line
    pub fn name(self) -> &'static str {
        match self {
            Format::CifText => "cif",
            Format::CifBinary => "bcif",
            Format::Pdb => "pdb",
            Format::Pdbqt => "pdbqt",
            Format::Mol => "mol",
            Format::Sdf => "sdf",
            Format::Mol2 => "mol2",
            Format::Psf => "psf",
            Format::Prmtop => "prmtop",
            Format::Top => "top",
            Format::Gro => "gro",
            Format::Xyz => "xyz",
            Format::Csv => "csv",
            Format::Ply => "ply",
            Format::Dcd => "dcd",
            Format::Trr => "trr",
        }
    }

    /// Format of a file extension (without the dot, case-insensitive)
    pub fn from_extension(extension: &str) -> Option<Format> {
        Some(match extension.to_ascii_lowercase().as_str() {
            "cif" | "mmcif" | "mcif" => Format::CifText,
            "bcif" => Format::CifBinary,
            "pdb" | "ent" => Format::Pdb,
            "pdbqt" => Format::Pdbqt,
            "mol" => Format::Mol,
            "sdf" | "sd" => Format::Sdf,
            "mol2" => Format::Mol2,
            "psf" => Format::Psf,
            "prmtop" | "parm7" => Format::Prmtop,
            "top" => Format::Top,
            "gro" => Format::Gro,
            "xyz" => Format::Xyz,
            "csv" => Format::Csv,
            "ply" => Format::Ply,
            "dcd" => Format::Dcd,
            "trr" => Format::Trr,
            _ => return None,
        })
    }

    /// Format of a path, looking through a trailing `.gz`
    pub fn from_path(path: &Path) -> Option<Format> {
        let mut path = path.to_path_buf();
        if path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("gz"))
        {
            path.set_extension("");
        }
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Format::from_extension)
    }

    /// Whether the format is binary rather than text
    pub fn is_binary(self) -> bool {
        matches!(self, Format::CifBinary | Format::Dcd | Format::Trr)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Format::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(s))
            .or_else(|| Format::from_extension(s))
            .ok_or_else(|| {
                let names: Vec<&str> = Format::ALL.iter().map(|f| f.name()).collect();
                format!("unknown format '{s}', expected one of: {}", names.join(", "))
            })
    }
}

/// Whether `bytes` start with the gzip magic number
pub fn is_gzip(bytes: &[u8]) -> bool {
    bytes.starts_with(&GZIP_MAGIC)
}

/// Inflate gzip input; anything else is returned unchanged
pub fn decompress(bytes: Vec<u8>) -> Result<Vec<u8>, ReaderError> {
    if !is_gzip(&bytes) {
        return Ok(bytes);
    }
    let mut out = Vec::with_capacity(bytes.len() * 4);
    GzDecoder::new(bytes.as_slice()).read_to_end(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn test_from_path() {
        assert_eq!(Format::from_path(Path::new("1abc.cif")), Some(Format::CifText));
        assert_eq!(Format::from_path(Path::new("1abc.CIF.gz")), Some(Format::CifText));
        assert_eq!(Format::from_path(Path::new("a/b/1abc.bcif")), Some(Format::CifBinary));
        assert_eq!(Format::from_path(Path::new("lig.pdbqt")), Some(Format::Pdbqt));
        assert_eq!(Format::from_path(Path::new("top.parm7")), Some(Format::Prmtop));
        assert_eq!(Format::from_path(Path::new("x.sd")), Some(Format::Sdf));
        assert_eq!(Format::from_path(Path::new("system.top")), Some(Format::Top));
        assert_eq!(Format::from_path(Path::new("traj.dcd")), Some(Format::Dcd));
        assert_eq!(Format::from_path(Path::new("notes.txt")), None);
        assert_eq!(Format::from_path(Path::new("archive.gz")), None);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("mol2".parse::<Format>(), Ok(Format::Mol2));
        assert_eq!("mmcif".parse::<Format>(), Ok(Format::CifText));
        assert!("fasta".parse::<Format>().unwrap_err().contains("expected one of"));
        for format in Format::ALL {
            assert_eq!(format.name().parse::<Format>(), Ok(format));
        }
    }

    #[test]
    fn test_decompress() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"data_x\n").unwrap();
        let compressed = encoder.finish().unwrap();
        assert!(is_gzip(&compressed));
        assert_eq!(decompress(compressed).unwrap(), b"data_x\n");
        assert_eq!(decompress(b"plain".to_vec()).unwrap(), b"plain");
    }
}
