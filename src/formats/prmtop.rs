//! AMBER parameter/topology (PRMTOP) reader.
//!
//! The file is a sequence of `%FLAG NAME` sections, each followed by a
//! mandatory `%FORMAT(...)` line and fixed-width records. Section sizes come
//! from the `POINTERS` section, so it must precede the sections it sizes.

use log::debug;

use crate::data::TokenColumn;
use crate::result::{Parsed, ReaderError, ReaderResult};
use crate::task::{Progress, RuntimeContext};
use crate::text::{fixed_range, slice, Tokenizer, Tokens};

/// Names of the `POINTERS` entries, in file order
pub const POINTER_NAMES: [&str; 32] = [
    "NATOM", "NTYPES", "NBONH", "MBONA", "NTHETH", "MTHETA", "NPHIH", "MPHIA", "NHPARM", "NPARM",
    "NNB", "NRES", "NBONA", "NTHETA", "NPHIA", "NUMBND", "NUMANG", "NPTRA", "NATYP", "NPHB",
    "IFPERT", "NBPER", "NGPER", "NDPER", "MBPER", "MGPER", "MDPER", "IFBOX", "NMXRS", "IFCAP",
    "NUMEXTRA", "NCOPY",
];

/// `POINTERS` section
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrmtopPointers {
    values: [i32; 32],
}

impl PrmtopPointers {
    /// Pointer by name, e.g. `"NATOM"`
    pub fn get(&self, name: &str) -> Option<i32> {
        POINTER_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| self.values[i])
    }

    /// All pointers in file order
    pub fn values(&self) -> &[i32; 32] {
        &self.values
    }

    fn count(&self, index: usize) -> usize {
        usize::try_from(self.values[index]).unwrap_or(0)
    }

    /// Number of atoms
    pub fn natom(&self) -> usize {
        self.count(0)
    }

    /// Bonds containing hydrogen
    pub fn nbonh(&self) -> usize {
        self.count(2)
    }

    /// Number of residues
    pub fn nres(&self) -> usize {
        self.count(11)
    }

    /// Bonds without hydrogen
    pub fn nbona(&self) -> usize {
        self.count(12)
    }
}

/// A parsed PRMTOP file. Sections absent from the file are `None`.
#[derive(Debug, Clone, Default)]
pub struct PrmtopFile<'a> {
    /// Text after `%VERSION`
    pub version: String,
    /// Non-empty `TITLE` lines
    pub title: Vec<String>,
    /// Size pointers
    pub pointers: PrmtopPointers,
    /// Atom names
    pub atom_name: Option<TokenColumn<'a, &'a str>>,
    /// Charges in AMBER units (electron charge * 18.2223)
    pub charge: Option<TokenColumn<'a, f64>>,
    /// Atomic masses
    pub mass: Option<TokenColumn<'a, f64>>,
    /// Residue names
    pub residue_label: Option<TokenColumn<'a, &'a str>>,
    /// 1-based index of the first atom of each residue
    pub residue_pointer: Option<TokenColumn<'a, i32>>,
    /// Bond triplets (atom index * 3, atom index * 3, type) involving hydrogen
    pub bonds_inc_hydrogen: Option<TokenColumn<'a, i32>>,
    /// Bond triplets without hydrogen
    pub bonds_without_hydrogen: Option<TokenColumn<'a, i32>>,
    /// Generalized Born radii
    pub radii: Option<TokenColumn<'a, f64>>,
}

fn at_section_start(t: &Tokenizer<'_>) -> bool {
    t.data().as_bytes().get(t.position) == Some(&b'%')
}

fn read_title(t: &mut Tokenizer<'_>) -> Vec<String> {
    let mut title = Vec::new();
    while !t.at_end() && !at_section_start(t) {
        let line = t.read_line().trim();
        if !line.is_empty() {
            title.push(line.to_string());
        }
    }
    title
}

fn read_pointers(t: &mut Tokenizer<'_>) -> PrmtopPointers {
    let mut pointers = PrmtopPointers::default();
    let mut index = 0;
    while !t.at_end() && !at_section_start(t) {
        let line = t.read_line();
        let n = (index + 10).min(POINTER_NAMES.len());
        let mut i = 0;
        while index < n {
            pointers.values[index] = slice(line, i * 8, i * 8 + 8).trim().parse().unwrap_or(0);
            i += 1;
            index += 1;
        }
    }
    pointers
}

/// `count` items of `item_size` characters, `per_line` to a line
fn read_items<'a>(t: &mut Tokenizer<'a>, count: usize, per_line: usize, item_size: usize) -> Tokens<'a> {
    let data = t.data();
    let mut tokens = Tokens::new(data, count.saturating_mul(2));
    let mut index = 0;
    while !t.at_end() && !at_section_start(t) {
        t.mark_line();
        let (start, end) = (t.token_start, t.token_end);
        let n = (index + per_line).min(count);
        let mut i = 0;
        while index < n {
            let (s, e) = fixed_range(data, start, end, i * item_size, item_size);
            tokens.add(s, e);
            i += 1;
            index += 1;
        }
    }
    tokens
}

fn skip_section(t: &mut Tokenizer<'_>) {
    while !t.at_end() && !at_section_start(t) {
        t.mark_line();
    }
}

/// Parse a PRMTOP file with a default runtime context
pub fn parse_prmtop(data: &str) -> ReaderResult<PrmtopFile<'_>> {
    parse_prmtop_with(data, &mut RuntimeContext::new())
}

/// Parse a PRMTOP file, reporting progress after every section
pub fn parse_prmtop_with<'a>(data: &'a str, ctx: &mut RuntimeContext) -> ReaderResult<PrmtopFile<'a>> {
    let mut t = Tokenizer::new(data);
    let mut file = PrmtopFile::default();
    ctx.update(Progress::parsing(0, data.len()))?;

    while !t.at_end() {
        let line = t.read_line().trim();
        if let Some(version) = line.strip_prefix("%VERSION") {
            file.version = version.trim().to_string();
            continue;
        }
        let Some(flag) = line.strip_prefix("%FLAG") else {
            continue;
        };
        let flag = flag.trim();
        let format_line = t.line_number;
        if !t.read_line().trim().starts_with("%FORMAT") {
            return Err(ReaderError::syntax("expected %FORMAT", format_line));
        }

        let natom = file.pointers.natom();
        let nres = file.pointers.nres();
        match flag {
            "TITLE" => file.title = read_title(&mut t),
            "POINTERS" => file.pointers = read_pointers(&mut t),
            "ATOM_NAME" => file.atom_name = Some(TokenColumn::new(read_items(&mut t, natom, 20, 4))),
            "CHARGE" => file.charge = Some(TokenColumn::new(read_items(&mut t, natom, 5, 16))),
            "MASS" => file.mass = Some(TokenColumn::new(read_items(&mut t, natom, 5, 16))),
            "RESIDUE_LABEL" => {
                file.residue_label = Some(TokenColumn::new(read_items(&mut t, nres, 20, 4)))
            }
            "RESIDUE_POINTER" => {
                file.residue_pointer = Some(TokenColumn::new(read_items(&mut t, nres, 10, 8)))
            }
            "BONDS_INC_HYDROGEN" => {
                let count = file.pointers.nbonh().saturating_mul(3);
                file.bonds_inc_hydrogen = Some(TokenColumn::new(read_items(&mut t, count, 10, 8)))
            }
            "BONDS_WITHOUT_HYDROGEN" => {
                let count = file.pointers.nbona().saturating_mul(3);
                file.bonds_without_hydrogen =
                    Some(TokenColumn::new(read_items(&mut t, count, 10, 8)))
            }
            "RADII" => file.radii = Some(TokenColumn::new(read_items(&mut t, natom, 5, 16))),
            _ => skip_section(&mut t),
        }
        ctx.update(Progress::parsing(t.position, data.len()))?;
    }

    debug!(
        "Parsed PRMTOP with {} atoms and {} residues",
        file.pointers.natom(),
        file.pointers.nres()
    );
    Ok(Parsed::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Column;

    const PRMTOP: &str = "\
%VERSION  VERSION_STAMP = V0001.000  DATE = 01/01/22  00:00:00
%FLAG TITLE
%FORMAT(20a4)
default_name
%FLAG POINTERS
%FORMAT(10I8)
       3       2       2       0       1       0       0       0       0       0
       7       1       0       0       0       1       1       0       2       0
       0       0       0       0       0       0       0       1       3       0
       0       0
%FLAG ATOM_NAME
%FORMAT(20a4)
O   H1  H2
%FLAG CHARGE
%FORMAT(5E16.8)
 -1.51973982E+01  7.59869910E+00  7.59869910E+00
%FLAG MASS
%FORMAT(5E16.8)
  1.60000000E+01  1.00800000E+00  1.00800000E+00
%FLAG ATOM_TYPE_INDEX
%FORMAT(10I8)
       1       2       2
%FLAG RESIDUE_LABEL
%FORMAT(20a4)
WAT
%FLAG RESIDUE_POINTER
%FORMAT(10I8)
       1
%FLAG BONDS_INC_HYDROGEN
%FORMAT(10I8)
       0       3       1       0       6       1
%FLAG BONDS_WITHOUT_HYDROGEN
%FORMAT(10I8)

%FLAG RADII
%FORMAT(5E16.8)
  1.50000000E+00  8.00000000E-01  8.00000000E-01
";

    #[test]
    fn test_parse_water() {
        let file = parse_prmtop(PRMTOP).unwrap().result;
        assert!(file.version.starts_with("VERSION_STAMP"));
        assert_eq!(file.title, vec!["default_name"]);
        assert_eq!(file.pointers.natom(), 3);
        assert_eq!(file.pointers.nbonh(), 2);
        assert_eq!(file.pointers.nres(), 1);
        assert_eq!(file.pointers.get("IFBOX"), Some(1));
        assert_eq!(file.pointers.get("NMXRS"), Some(3));
        assert_eq!(file.pointers.get("NCOPY"), Some(0));
        assert_eq!(file.pointers.get("BOGUS"), None);

        let names = file.atom_name.unwrap();
        assert_eq!(names.row_count(), 3);
        assert_eq!(names.value(0), "O");
        assert_eq!(names.value(2), "H2");

        let charge = file.charge.unwrap();
        assert!((charge.value(0) + 15.1973982).abs() < 1e-6);
        assert!((file.mass.unwrap().value(1) - 1.008).abs() < 1e-9);

        assert_eq!(file.residue_label.unwrap().value(0), "WAT");
        assert_eq!(file.residue_pointer.unwrap().value(0), 1);

        let bonds = file.bonds_inc_hydrogen.unwrap();
        assert_eq!(bonds.row_count(), 6);
        assert_eq!(bonds.value(4), 6);
        assert_eq!(file.bonds_without_hydrogen.unwrap().row_count(), 0);
        assert!((file.radii.unwrap().value(1) - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_missing_format_line() {
        let err = parse_prmtop("%FLAG TITLE\ntitle\n").unwrap_err();
        assert_eq!(err.message(), "expected %FORMAT");
        assert_eq!(err.line(), Some(2));
    }

    #[test]
    fn test_oversized_pointers_read_available_items() {
        let data = "\
%FLAG POINTERS
%FORMAT(10I8)
99999999       1       0       0
%FLAG ATOM_NAME
%FORMAT(20a4)
O   H1
%FLAG BONDS_INC_HYDROGEN
%FORMAT(10I8)
       0       3
";
        let file = parse_prmtop(data).unwrap().result;
        assert_eq!(file.pointers.natom(), 99999999);
        let names = file.atom_name.unwrap();
        assert!(names.row_count() <= 20);
        assert_eq!(names.value(1), "H1");
        assert!(file.bonds_inc_hydrogen.unwrap().row_count() <= 10);
    }

    #[test]
    fn test_absent_sections_are_none() {
        let file = parse_prmtop("%VERSION x\n").unwrap().result;
        assert_eq!(file.version, "x");
        assert!(file.atom_name.is_none());
        assert_eq!(file.pointers.natom(), 0);
    }
}
