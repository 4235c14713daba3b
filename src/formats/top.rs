//! GROMACS topology (TOP) reader.
//!
//! A topology is a sequence of `[ section ]` blocks. `moleculetype`, `atoms`
//! and `bonds` describe one compound at a time, while `system` and
//! `molecules` describe the whole file. Text after `;` is a comment, lines
//! starting with `*` are ignored, and preprocessor lines other than
//! `#include` are skipped. Sections not listed here are skipped as well.

use log::debug;

use crate::data::TokenColumn;
use crate::result::{Parsed, ReaderError, ReaderResult};
use crate::task::{chunked_subtask, ParseOptions, Progress, RuntimeContext};
use crate::text::{slice, split_line, trim_range, Tokenizer, Tokens, DEFAULT_LINE_CHUNK_SIZE};

/// `[ atoms ]` section of a compound
#[derive(Debug, Clone)]
pub struct TopAtoms<'a> {
    /// Number of atom rows
    pub count: usize,
    /// Atom number
    pub nr: TokenColumn<'a, i32>,
    /// Atom type
    pub atom_type: TokenColumn<'a, &'a str>,
    /// Residue number
    pub resnr: TokenColumn<'a, i32>,
    /// Residue name
    pub residue: TokenColumn<'a, &'a str>,
    /// Atom name
    pub atom: TokenColumn<'a, &'a str>,
    /// Charge group number
    pub cgnr: TokenColumn<'a, i32>,
    /// Partial charge; empty when the row omits it
    pub charge: TokenColumn<'a, f64>,
    /// Mass; empty when the row omits it
    pub mass: TokenColumn<'a, f64>,
}

/// `[ bonds ]` section of a compound
#[derive(Debug, Clone)]
pub struct TopBonds<'a> {
    /// Number of bond rows
    pub count: usize,
    /// First atom number
    pub ai: TokenColumn<'a, i32>,
    /// Second atom number
    pub aj: TokenColumn<'a, i32>,
}

/// A `[ moleculetype ]` with its atoms and bonds
#[derive(Debug, Clone)]
pub struct TopCompound<'a> {
    /// Molecule name
    pub name: String,
    /// Atoms
    pub atoms: TopAtoms<'a>,
    /// Bonds, if the compound lists any
    pub bonds: Option<TopBonds<'a>>,
}

/// `[ molecules ]` section
#[derive(Debug, Clone)]
pub struct TopMolecules<'a> {
    /// Number of rows
    pub count: usize,
    /// Compound name
    pub compound: TokenColumn<'a, &'a str>,
    /// Number of consecutive copies of the compound
    pub mol_count: TokenColumn<'a, i32>,
}

/// A parsed topology
#[derive(Debug, Clone, Default)]
pub struct TopFile<'a> {
    /// `[ system ]` title
    pub system: Option<String>,
    /// Compounds that have atoms, in file order
    pub compounds: Vec<TopCompound<'a>>,
    /// Composition of the system
    pub molecules: Option<TopMolecules<'a>>,
}

impl<'a> TopFile<'a> {
    /// Compound named `name`
    pub fn get_compound(&self, name: &str) -> Option<&TopCompound<'a>> {
        self.compounds.iter().find(|c| c.name == name)
    }
}

/// `[ name ]` of a section header line
fn section_name(line: &str, line_number: usize) -> Result<&str, ReaderError> {
    line.strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ReaderError::syntax("Expected section name.", line_number))
}

fn include_error(line_number: usize) -> ReaderError {
    ReaderError::syntax("#include statements are not supported.", line_number)
}

/// `start..end` without its `;` comment and surrounding blanks
fn content_range(data: &str, start: usize, end: usize) -> (usize, usize) {
    let end = slice(data, start, end)
        .find(';')
        .map_or(end, |i| start + i);
    trim_range(data, start, end)
}

/// Range and line number of the next data line of the current section.
///
/// Stops in front of the next section header.
fn next_row(t: &mut Tokenizer<'_>) -> Result<Option<(usize, usize, usize)>, ReaderError> {
    let data = t.data();
    while !t.at_end() {
        let (position, line_number) = (t.position, t.line_number);
        t.mark_line();
        let (start, end) = content_range(data, t.token_start, t.token_end);
        let text = slice(data, start, end);
        if text.is_empty() || text.starts_with('*') {
            continue;
        }
        if text.starts_with('[') {
            t.position = position;
            t.line_number = line_number;
            return Ok(None);
        }
        if text.starts_with("#include") {
            return Err(include_error(line_number));
        }
        if text.starts_with('#') {
            continue;
        }
        return Ok(Some((start, end, line_number)));
    }
    Ok(None)
}

/// Data lines of a section holding a single value (`moleculetype`, `system`)
fn read_single<'a>(t: &mut Tokenizer<'a>, section: &str) -> Result<&'a str, ReaderError> {
    let data = t.data();
    let first_line = t.line_number;
    let mut value = None;
    while let Some((start, end, line_number)) = next_row(t)? {
        if value.is_some() {
            return Err(ReaderError::syntax(
                format!("More than one entry in [ {section} ]."),
                line_number,
            ));
        }
        value = Some(slice(data, start, end));
    }
    value.ok_or_else(|| ReaderError::syntax(format!("Missing entry in [ {section} ]."), first_line))
}

struct TableState<'t, 'a> {
    tokenizer: &'t mut Tokenizer<'a>,
    columns: Vec<Tokens<'a>>,
    fields: Vec<(usize, usize)>,
    error: Option<ReaderError>,
    done: bool,
}

/// Rows of a section, the first `column_count` values of each; extra values are ignored
fn read_table<'a>(
    t: &mut Tokenizer<'a>,
    column_count: usize,
    ctx: &mut RuntimeContext,
    chunk_size: usize,
) -> Result<Vec<Tokens<'a>>, ReaderError> {
    let data = t.data();
    let length = t.length;
    let mut state = TableState {
        tokenizer: t,
        columns: (0..column_count).map(|_| Tokens::new(data, 64)).collect(),
        fields: Vec::with_capacity(column_count),
        error: None,
        done: false,
    };
    chunked_subtask(
        ctx,
        chunk_size,
        &mut state,
        |size, state| {
            let mut read = 0;
            while read < size && !state.done {
                match next_row(state.tokenizer) {
                    Ok(Some((start, end, _))) => {
                        split_line(data, start, end, state.columns.len(), &mut state.fields);
                        for (i, column) in state.columns.iter_mut().enumerate() {
                            let (s, e) = state.fields.get(i).copied().unwrap_or((end, end));
                            column.add(s, e);
                        }
                        read += 1;
                    }
                    Ok(None) => state.done = true,
                    Err(err) => {
                        state.error = Some(err);
                        state.done = true;
                    }
                }
            }
            read
        },
        |ctx, state| ctx.update(Progress::parsing(state.tokenizer.position, length)),
    )?;
    match state.error {
        Some(err) => Err(err),
        None => Ok(state.columns),
    }
}

fn take<'a>(columns: &mut std::vec::IntoIter<Tokens<'a>>, data: &'a str) -> Tokens<'a> {
    columns.next().unwrap_or_else(|| Tokens::new(data, 0))
}

fn read_atoms<'a>(
    t: &mut Tokenizer<'a>,
    ctx: &mut RuntimeContext,
    chunk_size: usize,
) -> Result<TopAtoms<'a>, ReaderError> {
    let data = t.data();
    let mut columns = read_table(t, 8, ctx, chunk_size)?.into_iter();
    let nr = take(&mut columns, data);
    Ok(TopAtoms {
        count: nr.count(),
        nr: TokenColumn::new(nr),
        atom_type: TokenColumn::new(take(&mut columns, data)),
        resnr: TokenColumn::new(take(&mut columns, data)),
        residue: TokenColumn::new(take(&mut columns, data)),
        atom: TokenColumn::new(take(&mut columns, data)),
        cgnr: TokenColumn::new(take(&mut columns, data)),
        charge: TokenColumn::new(take(&mut columns, data)),
        mass: TokenColumn::new(take(&mut columns, data)),
    })
}

fn read_bonds<'a>(
    t: &mut Tokenizer<'a>,
    ctx: &mut RuntimeContext,
    chunk_size: usize,
) -> Result<TopBonds<'a>, ReaderError> {
    let data = t.data();
    let mut columns = read_table(t, 2, ctx, chunk_size)?.into_iter();
    let ai = take(&mut columns, data);
    Ok(TopBonds {
        count: ai.count(),
        ai: TokenColumn::new(ai),
        aj: TokenColumn::new(take(&mut columns, data)),
    })
}

fn read_molecules<'a>(
    t: &mut Tokenizer<'a>,
    ctx: &mut RuntimeContext,
    chunk_size: usize,
) -> Result<TopMolecules<'a>, ReaderError> {
    let data = t.data();
    let mut columns = read_table(t, 2, ctx, chunk_size)?.into_iter();
    let compound = take(&mut columns, data);
    Ok(TopMolecules {
        count: compound.count(),
        compound: TokenColumn::new(compound),
        mol_count: TokenColumn::new(take(&mut columns, data)),
    })
}

fn skip_section(t: &mut Tokenizer<'_>) -> Result<(), ReaderError> {
    while next_row(t)?.is_some() {}
    Ok(())
}

/// Compound being assembled from `moleculetype`, `atoms` and `bonds`
#[derive(Default)]
struct Pending<'a> {
    name: Option<String>,
    atoms: Option<TopAtoms<'a>>,
    bonds: Option<TopBonds<'a>>,
}

impl<'a> Pending<'a> {
    /// Move a named compound with atoms into `out`; anything else is dropped
    fn finish(&mut self, out: &mut Vec<TopCompound<'a>>) {
        let pending = std::mem::take(self);
        if let (Some(name), Some(atoms)) = (pending.name, pending.atoms) {
            out.push(TopCompound {
                name,
                atoms,
                bonds: pending.bonds,
            });
        }
    }
}

/// Parse a GROMACS topology with a default runtime context
pub fn parse_top(data: &str) -> ReaderResult<TopFile<'_>> {
    parse_top_with(data, &mut RuntimeContext::new(), &ParseOptions::default())
}

/// Parse a GROMACS topology, reporting progress every chunk of section rows
pub fn parse_top_with<'a>(
    data: &'a str,
    ctx: &mut RuntimeContext,
    options: &ParseOptions,
) -> ReaderResult<TopFile<'a>> {
    let chunk_size = options.chunk_size_or(DEFAULT_LINE_CHUNK_SIZE);
    let mut t = Tokenizer::new(data);
    let mut file = TopFile::default();
    let mut pending = Pending::default();
    ctx.update(Progress::parsing(0, data.len()))?;

    while !t.at_end() {
        let line_number = t.line_number;
        t.mark_line();
        let (start, end) = content_range(data, t.token_start, t.token_end);
        let line = slice(data, start, end);
        if line.starts_with("#include") {
            return Err(include_error(line_number));
        }
        if !line.starts_with('[') {
            continue;
        }
        match section_name(line, line_number)? {
            "moleculetype" => {
                pending.finish(&mut file.compounds);
                let entry = read_single(&mut t, "moleculetype")?;
                let name = entry.split_whitespace().next().unwrap_or(entry);
                pending.name = Some(name.to_string());
            }
            "atoms" => pending.atoms = Some(read_atoms(&mut t, ctx, chunk_size)?),
            "bonds" => pending.bonds = Some(read_bonds(&mut t, ctx, chunk_size)?),
            "system" => file.system = Some(read_single(&mut t, "system")?.to_string()),
            "molecules" => {
                pending.finish(&mut file.compounds);
                file.molecules = Some(read_molecules(&mut t, ctx, chunk_size)?);
            }
            _ => skip_section(&mut t)?,
        }
        ctx.update(Progress::parsing(t.position, data.len()))?;
    }
    pending.finish(&mut file.compounds);

    debug!(
        "Parsed TOP with {} compound(s), system {:?}",
        file.compounds.len(),
        file.system
    );
    Ok(Parsed::new(file))
}
