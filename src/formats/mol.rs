//! MDL MOL (V2000) reader.
//!
//! Atom line layout (0-based byte offsets):
//!
//! ```text
//! xxxxx.xxxxyyyyy.yyyyzzzzz.zzzz aaaddcccssshhhbbbvvvHHHrrriiimmmnnneee
//!  x 0..10   y 10..20   z 20..30   symbol 31..34   charge code 36..39
//! ```
//!
//! Bond lines hold the two atom indices and the bond order in 3-wide columns.
//! The properties block is read up to `M  END`; only `M  CHG` is interpreted.

use log::{debug, warn};

use crate::data::{ArrayColumn, Column, TokenColumn};
use crate::result::{Parsed, ReaderError, ReaderResult};
use crate::text::{fixed_range, slice, Tokenizer, Tokens};

/// Atom block of a MOL record
#[derive(Debug, Clone)]
pub struct MolAtoms<'a> {
    /// Number of atom lines read
    pub count: usize,
    /// X coordinate
    pub x: TokenColumn<'a, f64>,
    /// Y coordinate
    pub y: TokenColumn<'a, f64>,
    /// Z coordinate
    pub z: TokenColumn<'a, f64>,
    /// Element or atom list symbol
    pub type_symbol: TokenColumn<'a, &'a str>,
    /// Charge code as written in the atom block (see [`formal_charge_from_code`])
    pub formal_charge: TokenColumn<'a, i32>,
}

/// Bond block of a MOL record
#[derive(Debug, Clone)]
pub struct MolBonds<'a> {
    /// Number of bond lines read
    pub count: usize,
    /// First atom, 1-based
    pub atom_idx_a: TokenColumn<'a, i32>,
    /// Second atom, 1-based
    pub atom_idx_b: TokenColumn<'a, i32>,
    /// Bond order code
    pub order: TokenColumn<'a, i32>,
}

/// Charges from `M  CHG` property lines
#[derive(Debug, Clone, Default)]
pub struct MolFormalCharges {
    /// Atom index, 1-based
    pub atom_idx: ArrayColumn<i32>,
    /// Formal charge
    pub charge: ArrayColumn<i32>,
}

/// A single MOL record
#[derive(Debug, Clone)]
pub struct MolFile<'a> {
    /// First header line
    pub title: &'a str,
    /// Program / timestamp line
    pub program: &'a str,
    /// Comment line
    pub comment: &'a str,
    /// Atom block
    pub atoms: MolAtoms<'a>,
    /// Bond block
    pub bonds: MolBonds<'a>,
    /// Charges declared in the properties block
    pub formal_charges: MolFormalCharges,
}

/// Map an atom block charge code to a formal charge.
///
/// Codes 1..=3 are +3..+1, 5..=7 are -1..-3; 0 and 4 (doublet radical) carry
/// no charge. Anything else is logged and read as 0.
pub fn formal_charge_from_code(code: i32) -> i32 {
    match code {
        7 => -3,
        6 => -2,
        5 => -1,
        0 | 4 => 0,
        3 => 1,
        2 => 2,
        1 => 3,
        other => {
            warn!("Charge code {other} is outside the 0-7 range, defaulting to 0");
            0
        }
    }
}

impl MolAtoms<'_> {
    /// Formal charge of `row` decoded from its charge code
    pub fn mapped_formal_charge(&self, row: usize) -> i32 {
        formal_charge_from_code(self.formal_charge.value(row))
    }
}

fn add_fixed(tokens: &mut Tokens<'_>, data: &str, line: (usize, usize), offset: usize, width: usize) {
    let (start, end) = fixed_range(data, line.0, line.1, offset, width);
    tokens.add(start, end);
}

fn read_atoms<'a>(t: &mut Tokenizer<'a>, count: usize) -> MolAtoms<'a> {
    let data = t.data();
    let mut x = Tokens::new(data, count.saturating_mul(2));
    let mut y = Tokens::new(data, count.saturating_mul(2));
    let mut z = Tokens::new(data, count.saturating_mul(2));
    let mut type_symbol = Tokens::new(data, count.saturating_mul(2));
    let mut formal_charge = Tokens::new(data, count.saturating_mul(2));
    for _ in 0..count {
        if !t.mark_line() {
            break;
        }
        let line = (t.token_start, t.token_end);
        add_fixed(&mut x, data, line, 0, 10);
        add_fixed(&mut y, data, line, 10, 10);
        add_fixed(&mut z, data, line, 20, 10);
        add_fixed(&mut type_symbol, data, line, 31, 3);
        add_fixed(&mut formal_charge, data, line, 36, 3);
    }
    MolAtoms {
        count: x.count(),
        x: TokenColumn::new(x),
        y: TokenColumn::new(y),
        z: TokenColumn::new(z),
        type_symbol: TokenColumn::new(type_symbol),
        formal_charge: TokenColumn::new(formal_charge),
    }
}

fn read_bonds<'a>(t: &mut Tokenizer<'a>, count: usize) -> MolBonds<'a> {
    let data = t.data();
    let mut atom_idx_a = Tokens::new(data, count.saturating_mul(2));
    let mut atom_idx_b = Tokens::new(data, count.saturating_mul(2));
    let mut order = Tokens::new(data, count.saturating_mul(2));
    for _ in 0..count {
        if !t.mark_line() {
            break;
        }
        let line = (t.token_start, t.token_end);
        add_fixed(&mut atom_idx_a, data, line, 0, 3);
        add_fixed(&mut atom_idx_b, data, line, 3, 3);
        add_fixed(&mut order, data, line, 6, 3);
    }
    MolBonds {
        count: order.count(),
        atom_idx_a: TokenColumn::new(atom_idx_a),
        atom_idx_b: TokenColumn::new(atom_idx_b),
        order: TokenColumn::new(order),
    }
}

fn parse_field<T: std::str::FromStr>(line: &str, start: usize, end: usize) -> Option<T> {
    slice(line, start, end).trim().parse().ok()
}

/// `M  CHG  n  aaa vvv  aaa vvv ...` with 8-wide entries starting at column 9
fn read_charge_line(line: &str, atom_idx: &mut Vec<i32>, charge: &mut Vec<i32>) {
    let n = parse_field::<usize>(line, 6, 9).unwrap_or(0);
    for i in 0..n {
        let offset = 9 + i * 8;
        match (
            parse_field(line, offset, offset + 4),
            parse_field(line, offset + 4, offset + 8),
        ) {
            (Some(a), Some(c)) => {
                atom_idx.push(a);
                charge.push(c);
            }
            _ => break,
        }
    }
}

/// Properties block up to and including `M  END`. A `$$$$` line is left unread.
fn read_properties(t: &mut Tokenizer<'_>) -> MolFormalCharges {
    let mut atom_idx = Vec::new();
    let mut charge = Vec::new();
    while !t.at_end() {
        let (position, line_number) = (t.position, t.line_number);
        let line = t.read_line();
        if line.starts_with("$$$$") {
            t.position = position;
            t.line_number = line_number;
            break;
        }
        match slice(line, 3, 6).trim() {
            "END" => break,
            "CHG" => read_charge_line(line, &mut atom_idx, &mut charge),
            _ => {}
        }
    }
    MolFormalCharges {
        atom_idx: ArrayColumn::new(atom_idx),
        charge: ArrayColumn::new(charge),
    }
}

/// Read one MOL record starting at the tokenizer position.
///
/// Fails without consuming more than the header and counts lines when the
/// counts line is not a V2000 counts line.
pub(crate) fn read_mol_record<'a>(t: &mut Tokenizer<'a>) -> Result<MolFile<'a>, ReaderError> {
    let title = t.read_line().trim();
    let program = t.read_line().trim();
    let comment = t.read_line().trim();
    let counts_line = t.line_number;
    let counts = t.read_line();

    if counts.contains("V3000") {
        return Err(ReaderError::Unsupported("V3000 molfiles".to_string()));
    }
    let (atom_count, bond_count) =
        match (parse_field::<usize>(counts, 0, 3), parse_field::<usize>(counts, 3, 6)) {
            (Some(a), Some(b)) => (a, b),
            _ => {
                return Err(ReaderError::syntax(
                    format!("Invalid atom/bond counts line '{}'.", counts.trim()),
                    counts_line,
                ))
            }
        };

    let atoms = read_atoms(t, atom_count);
    let bonds = read_bonds(t, bond_count);
    let formal_charges = read_properties(t);
    Ok(MolFile {
        title,
        program,
        comment,
        atoms,
        bonds,
        formal_charges,
    })
}

/// Parse a single MOL record
pub fn parse_mol(data: &str) -> ReaderResult<MolFile<'_>> {
    let mut t = Tokenizer::new(data);
    let mol = read_mol_record(&mut t)?;
    debug!(
        "Parsed MOL '{}' with {} atoms and {} bonds",
        mol.title, mol.atoms.count, mol.bonds.count
    );
    Ok(Parsed::new(mol))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ETHANOL_ION: &str = "\
ethanol
  test-program

  3  2  0  0  0  0  0  0  0  0999 V2000
   -0.0187    1.5258    0.0104 C   0  0  0  0  0  0  0  0  0  0  0  0
    0.0021   -0.0041    0.0020 C   0  0  0  0  0  0  0  0  0  0  0  0
    1.3230   -0.4990    0.0100 O   0  5  0  0  0  0  0  0  0  0  0  0
  1  2  1  0  0  0  0
  2  3  1  0  0  0  0
M  CHG  1   3  -1
M  END
";

    #[test]
    fn test_parse_mol() {
        let mol = parse_mol(ETHANOL_ION).unwrap().result;
        assert_eq!(mol.title, "ethanol");
        assert_eq!(mol.program, "test-program");
        assert_eq!(mol.comment, "");

        assert_eq!(mol.atoms.count, 3);
        assert!((mol.atoms.x.value(0) + 0.0187).abs() < 1e-9);
        assert!((mol.atoms.y.value(2) + 0.499).abs() < 1e-9);
        assert_eq!(mol.atoms.type_symbol.value(2), "O");
        assert_eq!(mol.atoms.formal_charge.value(2), 5);
        assert_eq!(mol.atoms.mapped_formal_charge(2), -1);

        assert_eq!(mol.bonds.count, 2);
        assert_eq!(mol.bonds.atom_idx_a.value(1), 2);
        assert_eq!(mol.bonds.atom_idx_b.value(1), 3);
        assert_eq!(mol.bonds.order.value(0), 1);

        assert_eq!(mol.formal_charges.atom_idx.values(), &[3]);
        assert_eq!(mol.formal_charges.charge.values(), &[-1]);
    }

    #[test]
    fn test_formal_charge_codes() {
        let expected = [(0, 0), (1, 3), (2, 2), (3, 1), (4, 0), (5, -1), (6, -2), (7, -3), (9, 0)];
        for (code, charge) in expected {
            assert_eq!(formal_charge_from_code(code), charge, "code {code}");
        }
    }

    #[test]
    fn test_bad_counts_line() {
        let err = parse_mol("t\np\nc\nxx yy\n").unwrap_err();
        assert_eq!(err.line(), Some(4));
    }

    #[test]
    fn test_v3000_is_unsupported() {
        let data = "t\np\nc\n  0  0  0     0  0            999 V3000\n";
        assert!(matches!(parse_mol(data), Err(ReaderError::Unsupported(_))));
    }

    #[test]
    fn test_multiple_charge_entries() {
        let mut idx = Vec::new();
        let mut charge = Vec::new();
        read_charge_line("M  CHG  2   1   1   4  -2", &mut idx, &mut charge);
        assert_eq!(idx, vec![1, 4]);
        assert_eq!(charge, vec![1, -2]);
    }
}
