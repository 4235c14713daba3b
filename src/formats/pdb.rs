//! PDB and PDBQT reader.
//!
//! The file is kept as line tokens. [`PdbFile::atom_site`] builds a
//! fixed-column view over the `ATOM`/`HETATM` records, tagged with the model
//! number of the enclosing `MODEL` record.

use std::sync::Arc;

use log::debug;

use crate::data::FixedColumn;
use crate::result::{Parsed, ReaderResult};
use crate::task::{ParseOptions, Progress, RuntimeContext};
use crate::text::{number::parse_int, Tokenizer, Tokens, DEFAULT_LINE_CHUNK_SIZE};

/// A PDB or PDBQT file as a list of lines
#[derive(Debug, Clone)]
pub struct PdbFile<'a> {
    /// Identifier supplied by the caller
    pub id: Option<String>,
    /// Whether the file uses the PDBQT dialect (AutoDock charges and types)
    pub is_pdbqt: bool,
    /// Every line of the file, without line breaks
    pub lines: Arc<Tokens<'a>>,
}

/// Fixed-column view over the coordinate records of a PDB file
#[derive(Debug, Clone)]
pub struct PdbAtomSite<'a> {
    /// `ATOM` or `HETATM`
    pub record: FixedColumn<'a, &'a str>,
    /// Atom serial number
    pub serial: FixedColumn<'a, i32>,
    /// Atom name
    pub name: FixedColumn<'a, &'a str>,
    /// Alternate location indicator
    pub alt_loc: FixedColumn<'a, &'a str>,
    /// Residue name
    pub res_name: FixedColumn<'a, &'a str>,
    /// Chain identifier
    pub chain_id: FixedColumn<'a, &'a str>,
    /// Residue sequence number
    pub res_seq: FixedColumn<'a, i32>,
    /// Insertion code
    pub i_code: FixedColumn<'a, &'a str>,
    /// Orthogonal X coordinate in Angstrom
    pub x: FixedColumn<'a, f64>,
    /// Orthogonal Y coordinate in Angstrom
    pub y: FixedColumn<'a, f64>,
    /// Orthogonal Z coordinate in Angstrom
    pub z: FixedColumn<'a, f64>,
    /// Occupancy
    pub occupancy: FixedColumn<'a, f64>,
    /// Temperature factor
    pub temp_factor: FixedColumn<'a, f64>,
    /// Element symbol
    pub element: FixedColumn<'a, &'a str>,
    /// Formal charge as written, e.g. `2+`
    pub charge: FixedColumn<'a, &'a str>,
    /// PDBQT partial charge
    pub partial_charge: Option<FixedColumn<'a, f64>>,
    /// PDBQT AutoDock atom type
    pub autodock_type: Option<FixedColumn<'a, &'a str>>,
    /// `MODEL` serial each atom belongs to (1 when the file has no `MODEL` records)
    pub model_num: Vec<i32>,
}

impl PdbAtomSite<'_> {
    /// Number of coordinate records
    pub fn row_count(&self) -> usize {
        self.model_num.len()
    }
}

impl<'a> PdbFile<'a> {
    /// Number of lines in the file
    pub fn line_count(&self) -> usize {
        self.lines.count()
    }

    /// Coordinate records across all models
    pub fn atom_site(&self) -> PdbAtomSite<'a> {
        let data = self.lines.data();
        let mut atoms = Tokens::new(data, 2 * self.lines.count());
        let mut model_num = Vec::new();
        let mut model = 1;
        for i in 0..self.lines.count() {
            let line = self.lines.text(i);
            if line.starts_with("ATOM  ") || line.starts_with("HETATM") {
                let (start, end) = self.lines.range(i);
                atoms.add(start, end);
                model_num.push(model);
            } else if let Some(rest) = line.strip_prefix("MODEL") {
                let serial = parse_int_field(rest);
                if serial != 0 {
                    model = serial;
                }
            }
        }

        let lines = Arc::new(atoms);
        PdbAtomSite {
            record: FixedColumn::view(&lines, 0, 6),
            serial: FixedColumn::view(&lines, 6, 5),
            name: FixedColumn::view(&lines, 12, 4),
            alt_loc: FixedColumn::view(&lines, 16, 1),
            res_name: FixedColumn::view(&lines, 17, 3),
            chain_id: FixedColumn::view(&lines, 21, 1),
            res_seq: FixedColumn::view(&lines, 22, 4),
            i_code: FixedColumn::view(&lines, 26, 1),
            x: FixedColumn::view(&lines, 30, 8),
            y: FixedColumn::view(&lines, 38, 8),
            z: FixedColumn::view(&lines, 46, 8),
            occupancy: FixedColumn::view(&lines, 54, 6),
            temp_factor: FixedColumn::view(&lines, 60, 6),
            element: FixedColumn::view(&lines, 76, 2),
            charge: FixedColumn::view(&lines, 78, 2),
            partial_charge: self.is_pdbqt.then(|| FixedColumn::view(&lines, 70, 6)),
            autodock_type: self.is_pdbqt.then(|| FixedColumn::view(&lines, 77, 2)),
            model_num,
        }
    }
}

fn parse_int_field(text: &str) -> i32 {
    let trimmed = text.trim();
    parse_int(trimmed.as_bytes(), 0, trimmed.len())
}

/// Parse a PDB file with a default runtime context
pub fn parse_pdb(data: &str) -> ReaderResult<PdbFile<'_>> {
    parse_pdb_with(data, None, false, &mut RuntimeContext::new(), &ParseOptions::default())
}

/// Parse a PDB or PDBQT file, reporting progress every chunk of lines
pub fn parse_pdb_with<'a>(
    data: &'a str,
    id: Option<&str>,
    is_pdbqt: bool,
    ctx: &mut RuntimeContext,
    options: &ParseOptions,
) -> ReaderResult<PdbFile<'a>> {
    ctx.update(Progress::parsing(0, data.len()))?;
    let lines = Tokenizer::read_all_lines_chunked(
        data,
        ctx,
        options.chunk_size_or(DEFAULT_LINE_CHUNK_SIZE),
    )?;
    debug!("Read {} PDB lines", lines.count());
    Ok(Parsed::new(PdbFile {
        id: id.map(str::to_string),
        is_pdbqt,
        lines: Arc::new(lines),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Column, ValueKind};

    const PDB: &str = "\
HEADER    TEST
MODEL        1
ATOM      1  N   ALA A   1      11.104   6.134  -6.504  1.00  0.00           N
ATOM      2  CA  ALA A   1      11.639   6.071  -5.147  1.00  0.00           C
ENDMDL
MODEL        2
HETATM    3  O   HOH B 101       1.000   2.000   3.000  0.50 10.25           O1-
ENDMDL
END
";

    #[test]
    fn test_lines_and_atom_site() {
        let file = parse_pdb(PDB).unwrap().result;
        assert_eq!(file.line_count(), 9);

        let atoms = file.atom_site();
        assert_eq!(atoms.row_count(), 3);
        assert_eq!(atoms.record.value(2), "HETATM");
        assert_eq!(atoms.serial.value(1), 2);
        assert_eq!(atoms.name.value(1), "CA");
        assert_eq!(atoms.res_name.value(0), "ALA");
        assert_eq!(atoms.chain_id.value(2), "B");
        assert_eq!(atoms.res_seq.value(2), 101);
        assert!((atoms.x.value(0) - 11.104).abs() < 1e-9);
        assert!((atoms.z.value(1) + 5.147).abs() < 1e-9);
        assert!((atoms.occupancy.value(2) - 0.5).abs() < 1e-9);
        assert!((atoms.temp_factor.value(2) - 10.25).abs() < 1e-9);
        assert_eq!(atoms.element.value(0), "N");
        assert_eq!(atoms.charge.value(2), "1-");
        assert_eq!(atoms.alt_loc.value_kind(0), ValueKind::NotPresent);
        assert_eq!(atoms.model_num, vec![1, 1, 2]);
        assert!(atoms.partial_charge.is_none());
    }

    #[test]
    fn test_pdbqt_columns() {
        let data = "ATOM      1  C   LIG A   1       1.000   2.000   3.000  1.00  0.00    +0.123 C \n";
        let file = parse_pdb_with(
            data,
            Some("lig"),
            true,
            &mut RuntimeContext::new(),
            &ParseOptions::default(),
        )
        .unwrap()
        .result;
        let atoms = file.atom_site();
        assert_eq!(file.id.as_deref(), Some("lig"));
        assert!((atoms.partial_charge.as_ref().unwrap().value(0) - 0.123).abs() < 1e-9);
        assert_eq!(atoms.autodock_type.as_ref().unwrap().value(0), "C");
    }

    #[test]
    fn test_short_lines_read_as_empty() {
        let file = parse_pdb("ATOM      1  N\n").unwrap().result;
        let atoms = file.atom_site();
        assert_eq!(atoms.name.value(0), "N");
        assert_eq!(atoms.x.value(0), 0.0);
        assert_eq!(atoms.element.value_kind(0), ValueKind::NotPresent);
    }
}
