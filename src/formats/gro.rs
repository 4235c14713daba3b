//! GROMACS GRO reader.
//!
//! Each frame is a title line (optionally carrying `t= <time>`), an atom
//! count, fixed-column atom lines and a box line. Coordinate precision is
//! inferred from the first atom line: with `n` decimals a coordinate is
//! `n + 5` wide and a velocity `n + 5` wide with one more decimal.

use std::sync::Arc;

use log::debug;

use crate::data::FixedColumn;
use crate::result::{Parsed, ReaderError, ReaderResult};
use crate::task::{ParseOptions, Progress, RuntimeContext};
use crate::text::{slice, Tokenizer, DEFAULT_LINE_CHUNK_SIZE};

const POSITION_OFFSET: usize = 20;

/// Number of decimals of the coordinate columns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroPrecision {
    /// Decimals of x, y and z
    pub position: usize,
    /// Decimals of vx, vy and vz (0 without velocities)
    pub velocity: usize,
}

/// Frame header
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroHeader {
    /// Title without the time annotation
    pub title: String,
    /// Time from `t=`, 0 when absent
    pub time_in_ps: f64,
    /// Whether atom lines carry velocities
    pub has_velocities: bool,
    /// Inferred column precision
    pub precision: GroPrecision,
    /// Box lengths (the diagonal of the box matrix) in nm
    pub box_size: [f64; 3],
}

/// Atom lines of one frame
#[derive(Debug, Clone)]
pub struct GroAtoms<'a> {
    /// Number of atoms declared in the header
    pub count: usize,
    /// Residue number
    pub residue_number: FixedColumn<'a, i32>,
    /// Residue name
    pub residue_name: FixedColumn<'a, &'a str>,
    /// Atom name
    pub atom_name: FixedColumn<'a, &'a str>,
    /// Atom number
    pub atom_number: FixedColumn<'a, i32>,
    /// X in nm
    pub x: FixedColumn<'a, f64>,
    /// Y in nm
    pub y: FixedColumn<'a, f64>,
    /// Z in nm
    pub z: FixedColumn<'a, f64>,
    /// X velocity in nm/ps
    pub vx: Option<FixedColumn<'a, f64>>,
    /// Y velocity in nm/ps
    pub vy: Option<FixedColumn<'a, f64>>,
    /// Z velocity in nm/ps
    pub vz: Option<FixedColumn<'a, f64>>,
}

/// One frame of a GRO file
#[derive(Debug, Clone)]
pub struct GroStructure<'a> {
    /// Header
    pub header: GroHeader,
    /// Atoms
    pub atoms: GroAtoms<'a>,
}

/// A parsed GRO file
#[derive(Debug, Clone)]
pub struct GroFile<'a> {
    /// Frames in file order
    pub structures: Vec<GroStructure<'a>>,
}

/// Title line; a single blank line before it is skipped
fn read_title(t: &mut Tokenizer<'_>, header: &mut GroHeader) {
    let mut line = t.read_line();
    if line.trim().is_empty() {
        line = t.read_line();
    }
    match line.rfind("t=") {
        Some(offset) => {
            header.time_in_ps = line[offset + 2..]
                .split_whitespace()
                .next()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.0);
            let title = line[..offset].trim();
            header.title = title.strip_suffix(',').unwrap_or(title).to_string();
        }
        None => header.title = line.to_string(),
    }
}

/// Lengths of the `.ddd` groups of a line, excluding the dot
fn decimal_groups(text: &str) -> Vec<usize> {
    let bytes = text.as_bytes();
    let mut groups = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'.' {
            let start = i + 1;
            let mut end = start;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
            if end > start {
                groups.push(end - start);
                i = end;
                continue;
            }
        }
        i += 1;
    }
    groups
}

fn infer_precision(sample: &str, line: usize) -> Result<(GroPrecision, bool), ReaderError> {
    let groups = decimal_groups(slice(sample, POSITION_OFFSET, sample.len()));
    let Some(&position) = groups.first() else {
        return Err(ReaderError::syntax(
            "Could not infer coordinate precision from atom line.",
            line,
        ));
    };
    let has_velocities = groups.len() == 6;
    let velocity = if has_velocities { groups[3] } else { 0 };
    Ok((GroPrecision { position, velocity }, has_velocities))
}

fn read_box(t: &mut Tokenizer<'_>) -> [f64; 3] {
    let line = t.read_line();
    let mut values = line
        .split_whitespace()
        .map(|v| v.parse::<f64>().unwrap_or(0.0));
    let mut next = || values.next().unwrap_or(0.0);
    [next(), next(), next()]
}

fn read_frame<'a>(
    t: &mut Tokenizer<'a>,
    ctx: &mut RuntimeContext,
    chunk_size: usize,
) -> Result<GroStructure<'a>, ReaderError> {
    let mut header = GroHeader::default();
    read_title(t, &mut header);

    let count_line = t.line_number;
    let count_text = t.read_line().trim();
    let count: usize = count_text.parse().map_err(|_| {
        ReaderError::syntax(format!("Invalid atom count '{count_text}'."), count_line)
    })?;

    let first_atom_line = t.line_number;
    let lines = t.read_lines_chunked(count, ctx, chunk_size)?;
    if count > 0 {
        if lines.count() < count {
            return Err(ReaderError::syntax(
                format!("Expected {count} atom lines, found {}.", lines.count()),
                t.line_number,
            ));
        }
        let (precision, has_velocities) = infer_precision(lines.text(0), first_atom_line)?;
        header.precision = precision;
        header.has_velocities = has_velocities;
    }

    let p_width = header.precision.position + 5;
    let v_offset = POSITION_OFFSET + 3 * p_width;
    let v_width = header.precision.velocity + 4;

    let lines = Arc::new(lines);
    let velocity = |i: usize| {
        header
            .has_velocities
            .then(|| FixedColumn::view(&lines, v_offset + i * v_width, v_width))
    };
    let atoms = GroAtoms {
        count,
        residue_number: FixedColumn::view(&lines, 0, 5),
        residue_name: FixedColumn::view(&lines, 5, 5),
        atom_name: FixedColumn::view(&lines, 10, 5),
        atom_number: FixedColumn::view(&lines, 15, 5),
        x: FixedColumn::view(&lines, POSITION_OFFSET, p_width),
        y: FixedColumn::view(&lines, POSITION_OFFSET + p_width, p_width),
        z: FixedColumn::view(&lines, POSITION_OFFSET + 2 * p_width, p_width),
        vx: velocity(0),
        vy: velocity(1),
        vz: velocity(2),
    };

    header.box_size = read_box(t);
    Ok(GroStructure { header, atoms })
}

/// Parse a GRO file with a default runtime context
pub fn parse_gro(data: &str) -> ReaderResult<GroFile<'_>> {
    parse_gro_with(data, &mut RuntimeContext::new(), &ParseOptions::default())
}

/// Parse every frame of a GRO file, reporting progress every chunk of atom lines
pub fn parse_gro_with<'a>(
    data: &'a str,
    ctx: &mut RuntimeContext,
    options: &ParseOptions,
) -> ReaderResult<GroFile<'a>> {
    let chunk_size = options.chunk_size_or(DEFAULT_LINE_CHUNK_SIZE);
    let mut t = Tokenizer::new(data);
    let mut structures = Vec::new();
    ctx.update(Progress::parsing(0, data.len()))?;

    while !t.at_end() && !data[t.position..].trim().is_empty() {
        structures.push(read_frame(&mut t, ctx, chunk_size)?);
    }

    debug!("Parsed {} GRO frame(s)", structures.len());
    Ok(Parsed::new(GroFile { structures }))
}
