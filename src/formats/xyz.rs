//! XYZ reader.
//!
//! A file is a sequence of molecules, each an atom count line, a free comment
//! line and `count` lines of `element x y z`. Values are read eagerly into
//! array-backed columns.

use log::debug;

use crate::data::ArrayColumn;
use crate::result::{Parsed, ReaderError, ReaderResult};
use crate::task::{Progress, RuntimeContext};
use crate::text::Tokenizer;

/// Atoms of one XYZ molecule
#[derive(Debug, Clone, Default)]
pub struct XyzAtoms {
    /// Number of atoms
    pub count: usize,
    /// Element symbol (or atom label) as written
    pub type_symbol: ArrayColumn<String>,
    /// X coordinate
    pub x: ArrayColumn<f64>,
    /// Y coordinate
    pub y: ArrayColumn<f64>,
    /// Z coordinate
    pub z: ArrayColumn<f64>,
}

/// One molecule of an XYZ file
#[derive(Debug, Clone, Default)]
pub struct XyzMolecule {
    /// Comment line
    pub comment: String,
    /// Atoms
    pub atoms: XyzAtoms,
}

/// A parsed XYZ file
#[derive(Debug, Clone, Default)]
pub struct XyzFile {
    /// Molecules in file order
    pub molecules: Vec<XyzMolecule>,
}

fn read_molecule(t: &mut Tokenizer<'_>, count: usize) -> Result<XyzMolecule, ReaderError> {
    let comment = t.read_line().trim().to_string();

    let mut type_symbol = Vec::with_capacity(count.min(t.length));
    let mut x = Vec::with_capacity(count.min(t.length));
    let mut y = Vec::with_capacity(count.min(t.length));
    let mut z = Vec::with_capacity(count.min(t.length));
    for _ in 0..count {
        if t.at_end() {
            return Err(ReaderError::syntax(
                format!("Expected {count} atom lines, found {}.", type_symbol.len()),
                t.line_number,
            ));
        }
        let line_number = t.line_number;
        let mut values = t.read_line().split_whitespace();
        let symbol = values.next().ok_or_else(|| {
            ReaderError::syntax("Expected element and coordinates.", line_number)
        })?;
        let mut coordinate = || -> Result<f64, ReaderError> {
            values
                .next()
                .and_then(|v| v.parse().ok())
                .ok_or_else(|| ReaderError::syntax("Invalid coordinate.", line_number))
        };
        x.push(coordinate()?);
        y.push(coordinate()?);
        z.push(coordinate()?);
        type_symbol.push(symbol.to_string());
    }

    Ok(XyzMolecule {
        comment,
        atoms: XyzAtoms {
            count,
            type_symbol: ArrayColumn::new(type_symbol),
            x: ArrayColumn::new(x),
            y: ArrayColumn::new(y),
            z: ArrayColumn::new(z),
        },
    })
}

/// Parse an XYZ file with a default runtime context
pub fn parse_xyz(data: &str) -> ReaderResult<XyzFile> {
    parse_xyz_with(data, &mut RuntimeContext::new())
}

/// Parse every molecule of an XYZ file, reporting progress after each one.
///
/// Reading stops at the end of input or at a count line that is empty, not
/// a number, or zero.
pub fn parse_xyz_with(data: &str, ctx: &mut RuntimeContext) -> ReaderResult<XyzFile> {
    let mut t = Tokenizer::new(data);
    let mut file = XyzFile::default();
    ctx.update(Progress::parsing(0, data.len()))?;

    while !t.at_end() {
        let count = match t.read_line().trim().parse::<usize>() {
            Ok(count) if count > 0 => count,
            _ => break,
        };
        file.molecules.push(read_molecule(&mut t, count)?);
        ctx.update(Progress::parsing(t.position, data.len()))?;
    }

    debug!("Parsed {} XYZ molecule(s)", file.molecules.len());
    Ok(Parsed::new(file))
}
