//! CHARMM/NAMD/LAMMPS protein structure file (PSF) reader.
//!
//! Sections are introduced by a count followed by a `!NAME` marker. Atoms are
//! read either in the standard 8 column layout or, when the first atom line
//! has 7 values, the LAMMPS "full" layout without segment and residue names.
//! Bond pairs are read as free-format integers across line breaks.

use std::sync::Arc;

use log::debug;

use crate::data::TokenColumn;
use crate::result::{Parsed, ReaderError, ReaderResult};
use crate::task::{chunked_subtask, ParseOptions, Progress, RuntimeContext};
use crate::text::{Tokenizer, Tokens, DEFAULT_LINE_CHUNK_SIZE};

/// `!NATOM` section
#[derive(Debug, Clone)]
pub struct PsfAtoms<'a> {
    /// Number of atoms declared
    pub count: usize,
    /// Atom id
    pub atom_id: TokenColumn<'a, i32>,
    /// Segment name (the residue id for LAMMPS full files)
    pub segment_name: TokenColumn<'a, &'a str>,
    /// Residue id
    pub residue_id: TokenColumn<'a, i32>,
    /// Residue name (the residue id for LAMMPS full files)
    pub residue_name: TokenColumn<'a, &'a str>,
    /// Atom name
    pub atom_name: TokenColumn<'a, &'a str>,
    /// Atom type
    pub atom_type: TokenColumn<'a, &'a str>,
    /// Partial charge
    pub charge: TokenColumn<'a, f64>,
    /// Mass
    pub mass: TokenColumn<'a, f64>,
}

/// `!NBOND` section
#[derive(Debug, Clone)]
pub struct PsfBonds<'a> {
    /// Number of bonds declared
    pub count: usize,
    /// First atom id
    pub atom_id_a: TokenColumn<'a, i32>,
    /// Second atom id
    pub atom_id_b: TokenColumn<'a, i32>,
}

/// A parsed PSF file
#[derive(Debug, Clone)]
pub struct PsfFile<'a> {
    /// First line, usually `PSF` plus flags such as `EXT CMAP`
    pub id: String,
    /// `!NTITLE` lines with leading `*` and `REMARK` removed
    pub title: Vec<String>,
    /// Atoms
    pub atoms: PsfAtoms<'a>,
    /// Bonds
    pub bonds: PsfBonds<'a>,
}

/// Leading count of a section marker line such as `   12 !NATOM`
fn section_count(line: &str) -> usize {
    line.split_whitespace()
        .next()
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

fn clean_title(line: &str) -> String {
    let mut text = line.strip_prefix('*').unwrap_or(line);
    while let Some(rest) = text.strip_prefix("REMARK") {
        text = rest;
    }
    text.trim().to_string()
}

fn read_title(t: &mut Tokenizer<'_>, count: usize) -> Vec<String> {
    let mut title = Vec::new();
    for _ in 0..count {
        if t.at_end() {
            break;
        }
        title.push(clean_title(t.read_line()));
    }
    title
}

/// Whether only whitespace is left
fn is_exhausted(t: &mut Tokenizer<'_>) -> bool {
    t.skip_whitespace();
    t.at_end()
}

fn truncated(what: &str, expected: usize, found: usize, line: usize) -> ReaderError {
    ReaderError::syntax(format!("Expected {expected} {what}, found {found}."), line)
}

/// Whitespace separated value at the cursor; may cross line breaks
fn next_value(t: &mut Tokenizer<'_>) -> (usize, usize) {
    t.skip_whitespace();
    t.mark_start();
    t.eat_value();
    (t.token_start, t.token_end)
}

struct AtomState<'t, 'a> {
    tokenizer: &'t mut Tokenizer<'a>,
    columns: Vec<Tokens<'a>>,
    remaining: usize,
}

fn read_atoms<'a>(
    t: &mut Tokenizer<'a>,
    count: usize,
    ctx: &mut RuntimeContext,
    chunk_size: usize,
) -> Result<PsfAtoms<'a>, ReaderError> {
    let data = t.data();
    let length = t.length;

    let (position, line_number) = (t.position, t.line_number);
    let is_lammps_full = t.read_line().split_whitespace().count() == 7;
    t.position = position;
    t.line_number = line_number;
    let value_count = if is_lammps_full { 6 } else { 8 };

    let mut state = AtomState {
        tokenizer: t,
        columns: (0..value_count)
            .map(|_| Tokens::new(data, count.saturating_mul(2)))
            .collect(),
        remaining: count,
    };
    chunked_subtask(
        ctx,
        chunk_size,
        &mut state,
        |size, state| {
            let to_read = state.remaining.min(size);
            let mut read = 0;
            while read < to_read && !is_exhausted(state.tokenizer) {
                for column in state.columns.iter_mut() {
                    let (start, end) = next_value(state.tokenizer);
                    column.add(start, end);
                }
                // extra columns (e.g. the CHARMM IMOVE flag) are ignored
                state.tokenizer.eat_line();
                read += 1;
            }
            state.remaining -= read;
            read
        },
        |ctx, state| ctx.update(Progress::parsing(state.tokenizer.position, length)),
    )?;
    if state.remaining > 0 {
        let line = state.tokenizer.line_number;
        return Err(truncated("atoms", count, count - state.remaining, line));
    }

    let mut columns = state.columns.into_iter().map(Arc::new);
    let mut next = || {
        columns
            .next()
            .unwrap_or_else(|| Arc::new(Tokens::new(data, 0)))
    };
    let atoms = if is_lammps_full {
        let atom_id = next();
        let residue_id = next();
        PsfAtoms {
            count,
            atom_id: TokenColumn::shared(atom_id),
            segment_name: TokenColumn::shared(Arc::clone(&residue_id)),
            residue_name: TokenColumn::shared(Arc::clone(&residue_id)),
            residue_id: TokenColumn::shared(residue_id),
            atom_name: TokenColumn::shared(next()),
            atom_type: TokenColumn::shared(next()),
            charge: TokenColumn::shared(next()),
            mass: TokenColumn::shared(next()),
        }
    } else {
        PsfAtoms {
            count,
            atom_id: TokenColumn::shared(next()),
            segment_name: TokenColumn::shared(next()),
            residue_id: TokenColumn::shared(next()),
            residue_name: TokenColumn::shared(next()),
            atom_name: TokenColumn::shared(next()),
            atom_type: TokenColumn::shared(next()),
            charge: TokenColumn::shared(next()),
            mass: TokenColumn::shared(next()),
        }
    };
    Ok(atoms)
}

fn read_bonds<'a>(
    t: &mut Tokenizer<'a>,
    count: usize,
    ctx: &mut RuntimeContext,
    chunk_size: usize,
) -> Result<PsfBonds<'a>, ReaderError> {
    let data = t.data();
    let length = t.length;
    let mut state = (
        t,
        Tokens::new(data, count.saturating_mul(2)),
        Tokens::new(data, count.saturating_mul(2)),
        count,
    );
    chunked_subtask(
        ctx,
        chunk_size,
        &mut state,
        |size, (tokenizer, a, b, remaining)| {
            let to_read = (*remaining).min(size);
            let mut read = 0;
            while read < to_read && !is_exhausted(tokenizer) {
                let (start, end) = next_value(tokenizer);
                a.add(start, end);
                let (start, end) = next_value(tokenizer);
                b.add(start, end);
                read += 1;
            }
            *remaining -= read;
            read
        },
        |ctx, (tokenizer, ..)| ctx.update(Progress::parsing(tokenizer.position, length)),
    )?;
    let (t, a, b, remaining) = state;
    if remaining > 0 {
        return Err(truncated("bonds", count, count - remaining, t.line_number));
    }
    Ok(PsfBonds {
        count,
        atom_id_a: TokenColumn::new(a),
        atom_id_b: TokenColumn::new(b),
    })
}

/// Parse a PSF file with a default runtime context
pub fn parse_psf(data: &str) -> ReaderResult<PsfFile<'_>> {
    parse_psf_with(data, &mut RuntimeContext::new(), &ParseOptions::default())
}

/// Parse a PSF file, reporting progress every chunk of atoms or bonds.
///
/// Reading stops after the bond section; later sections (angles,
/// dihedrals, ...) are not interpreted.
pub fn parse_psf_with<'a>(
    data: &'a str,
    ctx: &mut RuntimeContext,
    options: &ParseOptions,
) -> ReaderResult<PsfFile<'a>> {
    let chunk_size = options.chunk_size_or(DEFAULT_LINE_CHUNK_SIZE);
    let mut t = Tokenizer::new(data);
    ctx.update(Progress::parsing(0, data.len()))?;

    let id = t.read_line().trim().to_string();
    let mut title = Vec::new();
    let mut atoms = None;
    let mut bonds = None;

    while !t.at_end() {
        let line = t.read_line().trim();
        if line.contains("!NTITLE") {
            title = read_title(&mut t, section_count(line));
        } else if line.contains("!NATOM") {
            atoms = Some(read_atoms(&mut t, section_count(line), ctx, chunk_size)?);
        } else if line.contains("!NBOND") {
            bonds = Some(read_bonds(&mut t, section_count(line), ctx, chunk_size)?);
            break;
        }
    }

    let atoms = atoms.ok_or_else(|| ReaderError::format("no atoms data"))?;
    let bonds = bonds.ok_or_else(|| ReaderError::format("no bonds data"))?;
    debug!(
        "Parsed PSF '{id}' with {} atoms and {} bonds",
        atoms.count, bonds.count
    );
    Ok(Parsed::new(PsfFile {
        id,
        title,
        atoms,
        bonds,
    }))
}
