//! Tripos MOL2 reader.
//!
//! A file holds one or more `@<TRIPOS>MOLECULE` sections, each followed by
//! `@<TRIPOS>ATOM`, `@<TRIPOS>BOND` and optionally `@<TRIPOS>CRYSIN` records.
//! Atom and bond lines are whitespace separated; the number of columns is
//! taken from the first line and trailing optional columns become `None`.

use log::debug;

use crate::data::TokenColumn;
use crate::result::{Parsed, ReaderError, ReaderResult};
use crate::task::{chunked_subtask, ParseOptions, Progress, RuntimeContext};
use crate::text::{split_line, Tokenizer, Tokens, DEFAULT_LINE_CHUNK_SIZE};

const MOLECULE: &str = "@<TRIPOS>MOLECULE";
const ATOM: &str = "@<TRIPOS>ATOM";
const BOND: &str = "@<TRIPOS>BOND";
const CRYSIN: &str = "@<TRIPOS>CRYSIN";
const RECORD_PREFIX: &str = "@<TRIPOS>";

/// `@<TRIPOS>MOLECULE` record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mol2Molecule {
    /// Molecule name
    pub mol_name: String,
    /// Declared number of atoms
    pub num_atoms: usize,
    /// Declared number of bonds
    pub num_bonds: usize,
    /// Declared number of substructures
    pub num_subst: usize,
    /// Declared number of features
    pub num_feat: usize,
    /// Declared number of sets
    pub num_sets: usize,
    /// SMALL, BIOPOLYMER, PROTEIN, ...
    pub mol_type: String,
    /// Charge model, e.g. GASTEIGER
    pub charge_type: String,
    /// Internal SYBYL status bits
    pub status_bits: String,
    /// Free comment
    pub mol_comment: String,
}

/// `@<TRIPOS>ATOM` records
#[derive(Debug, Clone)]
pub struct Mol2Atoms<'a> {
    /// Number of atoms read
    pub count: usize,
    /// Atom id
    pub atom_id: TokenColumn<'a, i32>,
    /// Atom name
    pub atom_name: TokenColumn<'a, &'a str>,
    /// X coordinate
    pub x: TokenColumn<'a, f64>,
    /// Y coordinate
    pub y: TokenColumn<'a, f64>,
    /// Z coordinate
    pub z: TokenColumn<'a, f64>,
    /// SYBYL atom type
    pub atom_type: Option<TokenColumn<'a, &'a str>>,
    /// Substructure id
    pub subst_id: Option<TokenColumn<'a, i32>>,
    /// Substructure name
    pub subst_name: Option<TokenColumn<'a, &'a str>>,
    /// Partial charge
    pub charge: Option<TokenColumn<'a, f64>>,
    /// Status bits
    pub status_bit: Option<TokenColumn<'a, &'a str>>,
}

/// `@<TRIPOS>BOND` records
#[derive(Debug, Clone)]
pub struct Mol2Bonds<'a> {
    /// Number of bonds read
    pub count: usize,
    /// Bond id
    pub bond_id: TokenColumn<'a, i32>,
    /// First atom id
    pub origin_atom_id: TokenColumn<'a, i32>,
    /// Second atom id
    pub target_atom_id: TokenColumn<'a, i32>,
    /// 1, 2, 3, am, ar, du, un, nc
    pub bond_type: TokenColumn<'a, &'a str>,
    /// Status bits
    pub status_bits: Option<TokenColumn<'a, &'a str>>,
}

/// `@<TRIPOS>CRYSIN` record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mol2Crysin {
    /// Cell length a
    pub a: f64,
    /// Cell length b
    pub b: f64,
    /// Cell length c
    pub c: f64,
    /// Cell angle alpha
    pub alpha: f64,
    /// Cell angle beta
    pub beta: f64,
    /// Cell angle gamma
    pub gamma: f64,
    /// Space group number
    pub space_group: i32,
    /// Space group setting
    pub setting: i32,
}

/// One molecule of a MOL2 file
#[derive(Debug, Clone)]
pub struct Mol2Structure<'a> {
    /// Molecule record
    pub molecule: Mol2Molecule,
    /// Atoms
    pub atoms: Mol2Atoms<'a>,
    /// Bonds
    pub bonds: Mol2Bonds<'a>,
    /// Unit cell, if present
    pub crysin: Option<Mol2Crysin>,
}

/// A parsed MOL2 file
#[derive(Debug, Clone)]
pub struct Mol2File<'a> {
    /// Name supplied by the caller
    pub name: Option<String>,
    /// Molecules in file order
    pub structures: Vec<Mol2Structure<'a>>,
}

fn trimmed_line<'a>(t: &mut Tokenizer<'a>) -> &'a str {
    t.read_line().trim()
}

/// Advance until a line equal to `record` has been consumed; stops before a
/// line equal to any of `stop`. Returns whether `record` was found.
fn seek_record(t: &mut Tokenizer<'_>, record: &str, stop: &[&str]) -> bool {
    while !t.at_end() {
        let (position, line_number) = (t.position, t.line_number);
        let line = trimmed_line(t);
        if line == record {
            return true;
        }
        if stop.contains(&line) {
            t.position = position;
            t.line_number = line_number;
            return false;
        }
    }
    false
}

fn read_molecule(t: &mut Tokenizer<'_>) -> Mol2Molecule {
    let mut molecule = Mol2Molecule {
        mol_name: trimmed_line(t).to_string(),
        ..Default::default()
    };
    let counts: Vec<usize> = trimmed_line(t)
        .split_whitespace()
        .map(|v| v.parse().unwrap_or(0))
        .collect();
    let count = |i: usize| counts.get(i).copied().unwrap_or(0);
    molecule.num_atoms = count(0);
    molecule.num_bonds = count(1);
    molecule.num_subst = count(2);
    molecule.num_feat = count(3);
    molecule.num_sets = count(4);

    // the remaining lines are optional and end at the next record
    let optional = [
        &mut molecule.mol_type,
        &mut molecule.charge_type,
        &mut molecule.status_bits,
        &mut molecule.mol_comment,
    ];
    for target in optional {
        let (position, line_number) = (t.position, t.line_number);
        let line = trimmed_line(t);
        if line.starts_with(RECORD_PREFIX) {
            t.position = position;
            t.line_number = line_number;
            break;
        }
        *target = line.to_string();
    }
    molecule
}

struct TableState<'t, 'a> {
    tokenizer: &'t mut Tokenizer<'a>,
    columns: Vec<Tokens<'a>>,
    remaining: usize,
    fields: Vec<(usize, usize)>,
}

/// Read `count` lines of up to `columns` whitespace separated values.
/// Missing values are recorded as empty tokens so all columns have the same length.
fn read_table<'a>(
    t: &mut Tokenizer<'a>,
    count: usize,
    ctx: &mut RuntimeContext,
    chunk_size: usize,
) -> Result<(usize, Vec<Tokens<'a>>), ReaderError> {
    let data = t.data();
    let length = t.length;

    // column count of the first non-empty line
    let (position, line_number) = (t.position, t.line_number);
    let mut column_count = 0;
    while !t.at_end() && column_count == 0 {
        column_count = t.read_line().split_whitespace().count();
    }
    t.position = position;
    t.line_number = line_number;

    let mut state = TableState {
        tokenizer: t,
        columns: (0..column_count)
            .map(|_| Tokens::new(data, count.saturating_mul(2)))
            .collect(),
        remaining: count,
        fields: Vec::with_capacity(column_count),
    };
    chunked_subtask(
        ctx,
        chunk_size,
        &mut state,
        |size, state| {
            let mut read = 0;
            while read < size && state.remaining > 0 && state.tokenizer.mark_line() {
                let (start, end) = (state.tokenizer.token_start, state.tokenizer.token_end);
                split_line(data, start, end, state.columns.len(), &mut state.fields);
                for (i, column) in state.columns.iter_mut().enumerate() {
                    let (s, e) = state.fields.get(i).copied().unwrap_or((end, end));
                    column.add(s, e);
                }
                state.remaining -= 1;
                read += 1;
            }
            read
        },
        |ctx, state| ctx.update(Progress::parsing(state.tokenizer.position, length)),
    )?;
    Ok((column_count, state.columns))
}

fn take_column<'a>(columns: &mut std::vec::IntoIter<Tokens<'a>>, data: &'a str) -> Tokens<'a> {
    columns.next().unwrap_or_else(|| Tokens::new(data, 0))
}

fn read_atoms<'a>(
    t: &mut Tokenizer<'a>,
    count: usize,
    ctx: &mut RuntimeContext,
    chunk_size: usize,
) -> Result<Mol2Atoms<'a>, ReaderError> {
    let data = t.data();
    let (column_count, columns) = read_table(t, count, ctx, chunk_size)?;
    let mut columns = columns.into_iter();
    let atom_id = take_column(&mut columns, data);
    let rows = atom_id.count();
    let atom_name = take_column(&mut columns, data);
    let x = take_column(&mut columns, data);
    let y = take_column(&mut columns, data);
    let z = take_column(&mut columns, data);
    let mut optional = |min_columns: usize| {
        (column_count > min_columns).then(|| take_column(&mut columns, data))
    };
    Ok(Mol2Atoms {
        count: rows,
        atom_id: TokenColumn::new(atom_id),
        atom_name: TokenColumn::new(atom_name),
        x: TokenColumn::new(x),
        y: TokenColumn::new(y),
        z: TokenColumn::new(z),
        atom_type: optional(5).map(TokenColumn::new),
        subst_id: optional(6).map(TokenColumn::new),
        subst_name: optional(7).map(TokenColumn::new),
        charge: optional(8).map(TokenColumn::new),
        status_bit: optional(9).map(TokenColumn::new),
    })
}

fn read_bonds<'a>(
    t: &mut Tokenizer<'a>,
    count: usize,
    ctx: &mut RuntimeContext,
    chunk_size: usize,
) -> Result<Mol2Bonds<'a>, ReaderError> {
    let data = t.data();
    let (column_count, columns) = read_table(t, count, ctx, chunk_size)?;
    let mut columns = columns.into_iter();
    let bond_id = take_column(&mut columns, data);
    let rows = bond_id.count();
    let origin = take_column(&mut columns, data);
    let target = take_column(&mut columns, data);
    let bond_type = take_column(&mut columns, data);
    let status_bits = (column_count > 4).then(|| take_column(&mut columns, data));
    Ok(Mol2Bonds {
        count: rows,
        bond_id: TokenColumn::new(bond_id),
        origin_atom_id: TokenColumn::new(origin),
        target_atom_id: TokenColumn::new(target),
        bond_type: TokenColumn::new(bond_type),
        status_bits: status_bits.map(TokenColumn::new),
    })
}

fn read_crysin(t: &mut Tokenizer<'_>) -> Option<Mol2Crysin> {
    if !seek_record(t, CRYSIN, &[MOLECULE]) {
        return None;
    }
    let values: Vec<&str> = trimmed_line(t).split_whitespace().collect();
    let float = |i: usize| values.get(i).and_then(|v| v.parse().ok()).unwrap_or(0.0);
    let int = |i: usize| values.get(i).and_then(|v| v.parse().ok()).unwrap_or(0);
    Some(Mol2Crysin {
        a: float(0),
        b: float(1),
        c: float(2),
        alpha: float(3),
        beta: float(4),
        gamma: float(5),
        space_group: int(6),
        setting: int(7),
    })
}

/// Parse a MOL2 file with a default runtime context
pub fn parse_mol2(data: &str) -> ReaderResult<Mol2File<'_>> {
    parse_mol2_with(data, None, &mut RuntimeContext::new(), &ParseOptions::default())
}

/// Parse a MOL2 file, reporting progress every chunk of atom or bond lines
pub fn parse_mol2_with<'a>(
    data: &'a str,
    name: Option<&str>,
    ctx: &mut RuntimeContext,
    options: &ParseOptions,
) -> ReaderResult<Mol2File<'a>> {
    let chunk_size = options.chunk_size_or(DEFAULT_LINE_CHUNK_SIZE);
    let mut t = Tokenizer::new(data);
    let mut structures = Vec::new();
    ctx.update(Progress::parsing(0, data.len()))?;

    while seek_record(&mut t, MOLECULE, &[]) {
        let molecule = read_molecule(&mut t);

        let atoms = if seek_record(&mut t, ATOM, &[MOLECULE]) {
            read_atoms(&mut t, molecule.num_atoms, ctx, chunk_size)?
        } else {
            read_atoms(&mut t, 0, ctx, chunk_size)?
        };
        let bonds = if seek_record(&mut t, BOND, &[MOLECULE]) {
            read_bonds(&mut t, molecule.num_bonds, ctx, chunk_size)?
        } else {
            read_bonds(&mut t, 0, ctx, chunk_size)?
        };
        let crysin = read_crysin(&mut t);
        structures.push(Mol2Structure {
            molecule,
            atoms,
            bonds,
            crysin,
        });
    }

    debug!("Parsed {} MOL2 structure(s)", structures.len());
    Ok(Parsed::new(Mol2File {
        name: name.map(str::to_string),
        structures,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Column, ValueKind};

    const MOL2: &str = "\
# comment line
@<TRIPOS>MOLECULE
benzene
 3 2 1 0 0
SMALL
GASTEIGER

@<TRIPOS>ATOM
      1 C1          1.2070    0.6970    0.0000 C.ar      1  BEN1       -0.0618
      2 C2          1.2070   -0.6970    0.0000 C.ar      1  BEN1       -0.0618
      3 H1          2.1550    1.2470    0.0000 H         1  BEN1        0.0618
@<TRIPOS>BOND
     1     1     2   ar
     2     1     3    1
@<TRIPOS>CRYSIN
   10.0000   11.0000   12.0000   90.0000   90.0000   90.0000     1     1
@<TRIPOS>MOLECULE
second
2 0
SMALL
@<TRIPOS>ATOM
1 N 0.0 0.0 0.0
2 O 1.0 0.0 0.0
";

    #[test]
    fn test_parse_structures() {
        let file = parse_mol2(MOL2).unwrap().result;
        assert_eq!(file.structures.len(), 2);

        let benzene = &file.structures[0];
        assert_eq!(benzene.molecule.mol_name, "benzene");
        assert_eq!(benzene.molecule.num_atoms, 3);
        assert_eq!(benzene.molecule.num_subst, 1);
        assert_eq!(benzene.molecule.mol_type, "SMALL");
        assert_eq!(benzene.molecule.charge_type, "GASTEIGER");

        let atoms = &benzene.atoms;
        assert_eq!(atoms.count, 3);
        assert_eq!(atoms.atom_name.value(2), "H1");
        assert!((atoms.y.value(1) + 0.697).abs() < 1e-9);
        assert_eq!(atoms.atom_type.as_ref().unwrap().value(0), "C.ar");
        assert_eq!(atoms.subst_name.as_ref().unwrap().value(0), "BEN1");
        assert!((atoms.charge.as_ref().unwrap().value(2) - 0.0618).abs() < 1e-9);
        assert!(atoms.status_bit.is_none());

        let bonds = &benzene.bonds;
        assert_eq!(bonds.count, 2);
        assert_eq!(bonds.bond_type.value(0), "ar");
        assert_eq!(bonds.target_atom_id.value(1), 3);
        assert!(bonds.status_bits.is_none());

        let crysin = benzene.crysin.unwrap();
        assert_eq!(crysin.c, 12.0);
        assert_eq!(crysin.space_group, 1);
    }

    #[test]
    fn test_minimal_columns_and_missing_sections() {
        let file = parse_mol2(MOL2).unwrap().result;
        let second = &file.structures[1];
        assert_eq!(second.molecule.mol_type, "SMALL");
        assert_eq!(second.molecule.charge_type, "");
        assert_eq!(second.atoms.count, 2);
        assert!(second.atoms.atom_type.is_none());
        assert!(second.atoms.charge.is_none());
        assert_eq!(second.bonds.count, 0);
        assert!(second.crysin.is_none());
    }

    #[test]
    fn test_atom_count_beyond_data() {
        let data = "@<TRIPOS>MOLECULE\nhuge\n18446744073709551615 0\nSMALL\n@<TRIPOS>ATOM\n1 N 0.0 0.0 0.0\n";
        let file = parse_mol2(data).unwrap().result;
        let structure = &file.structures[0];
        assert_eq!(structure.molecule.num_atoms, usize::MAX);
        assert_eq!(structure.atoms.count, 1);
        assert_eq!(structure.atoms.atom_name.value(0), "N");
        assert_eq!(structure.bonds.count, 0);
    }

    #[test]
    fn test_short_rows_are_padded() {
        let data = "@<TRIPOS>MOLECULE\nm\n2 0\n@<TRIPOS>ATOM\n1 C 0 0 0 C.3\n2 H 1 0 0\n";
        let file = parse_mol2(data).unwrap().result;
        let atom_type = file.structures[0].atoms.atom_type.as_ref().unwrap();
        assert_eq!(atom_type.value(0), "C.3");
        assert_eq!(atom_type.value_kind(1), ValueKind::NotPresent);
    }
}
