//! CHARMM/NAMD/X-PLOR DCD trajectory reader.
//!
//! DCD is a sequence of Fortran unformatted records, each framed by its byte
//! length before and after. The byte order is detected from the first record
//! marker, which is always 84.
//!
//! ```text
//! header   84 | "CORD" NSET ISTART NSAVC ... NAMNF DELTA ... VERSION | 84
//! title    n  | NTITLE (n - 4) / 80 lines of 80 characters          | n
//! natom    4  | NATOM                                               | 4
//! frame    [48 | unit cell, 6 f64 | 48]  4N | x | 4N  4N | y | 4N  4N | z | 4N  [4th dim]
//! ```

use std::io::{Cursor, Seek, SeekFrom};
use std::marker::PhantomData;

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt};
use log::debug;

use crate::result::{Parsed, ReaderError, ReaderResult};
use crate::task::{Progress, RuntimeContext};

const HEADER_MARKER: i32 = 84;
const HEADER_SIZE: usize = 92;
const TITLE_LINE: usize = 80;

/// DCD header values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DcdHeader {
    /// Number of frames declared
    pub nset: i32,
    /// First time step
    pub istart: i32,
    /// Time steps between frames
    pub nsavc: i32,
    /// Number of fixed atoms
    pub namnf: i32,
    /// Time step in AKMA units
    pub delta: f64,
    /// Title lines joined by `\n`
    pub title: String,
    /// Number of atoms per frame
    pub natom: usize,
    /// Written by CHARMM (non-zero version field)
    pub is_charmm: bool,
    /// Frames carry a unit cell record
    pub has_unit_cell: bool,
    /// Frames carry a fourth coordinate record
    pub has_four_dims: bool,
}

/// One trajectory frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DcdFrame {
    /// Number of atoms
    pub element_count: usize,
    /// `A, gamma, B, beta, alpha, C` as written by CHARMM
    pub cell: Option<[f64; 6]>,
    /// X coordinates in Angstrom
    pub x: Vec<f32>,
    /// Y coordinates in Angstrom
    pub y: Vec<f32>,
    /// Z coordinates in Angstrom
    pub z: Vec<f32>,
}

/// A parsed DCD file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DcdFile {
    /// Header
    pub header: DcdHeader,
    /// Frames in file order
    pub frames: Vec<DcdFrame>,
}

fn bad_format(what: impl std::fmt::Display) -> ReaderError {
    ReaderError::format(format!("dcd bad format, {what}"))
}

struct RecordReader<'a, B> {
    cursor: Cursor<&'a [u8]>,
    _order: PhantomData<B>,
}

impl<'a, B: ByteOrder> RecordReader<'a, B> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(data),
            _order: PhantomData,
        }
    }

    fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    fn remaining(&self) -> usize {
        self.cursor.get_ref().len().saturating_sub(self.position())
    }

    fn seek(&mut self, position: usize) {
        self.cursor.set_position(position as u64);
    }

    fn skip(&mut self, bytes: usize, what: &str) -> Result<(), ReaderError> {
        if bytes > self.remaining() {
            return Err(bad_format(format!("unexpected end of data in {what}")));
        }
        self.cursor
            .seek(SeekFrom::Current(bytes as i64))
            .map_err(|_| bad_format(what))?;
        Ok(())
    }

    fn i32(&mut self, what: &str) -> Result<i32, ReaderError> {
        self.cursor
            .read_i32::<B>()
            .map_err(|_| bad_format(format!("unexpected end of data in {what}")))
    }

    fn f64(&mut self, what: &str) -> Result<f64, ReaderError> {
        self.cursor
            .read_f64::<B>()
            .map_err(|_| bad_format(format!("unexpected end of data in {what}")))
    }

    /// Read a record marker and require it to equal `expected`
    fn marker(&mut self, expected: i32, what: &str) -> Result<(), ReaderError> {
        if self.i32(what)? != expected {
            return Err(bad_format(what));
        }
        Ok(())
    }

    fn f32_array(&mut self, count: usize, what: &str) -> Result<Vec<f32>, ReaderError> {
        if count * 4 > self.remaining() {
            return Err(bad_format(format!("unexpected end of data in {what}")));
        }
        let mut values = vec![0f32; count];
        self.cursor
            .read_f32_into::<B>(&mut values)
            .map_err(|_| bad_format(what))?;
        Ok(values)
    }
}

fn read_header<B: ByteOrder>(r: &mut RecordReader<'_, B>, data: &[u8]) -> Result<DcdHeader, ReaderError> {
    if data.len() < HEADER_SIZE {
        return Err(bad_format("header block start"));
    }
    if &data[4..8] != b"CORD" {
        return Err(bad_format("format string"));
    }
    let int = |index: usize| B::read_i32(&data[index * 4..index * 4 + 4]);
    if int(22) != HEADER_MARKER {
        return Err(bad_format("header block end"));
    }

    let is_charmm = int(21) != 0;
    let mut header = DcdHeader {
        nset: int(2),
        istart: int(3),
        nsavc: int(4),
        namnf: int(10),
        delta: if is_charmm {
            f64::from(B::read_f32(&data[44..48]))
        } else {
            B::read_f64(&data[44..52])
        },
        is_charmm,
        has_unit_cell: is_charmm && int(12) != 0,
        has_four_dims: is_charmm && int(13) == 1,
        ..Default::default()
    };
    r.seek(HEADER_SIZE);

    // title block
    let title_size = r.i32("title block start")?;
    let title_bytes = usize::try_from(title_size)
        .ok()
        .filter(|size| *size >= 4 && (size - 4) % TITLE_LINE == 0)
        .ok_or_else(|| bad_format("title block start"))?;
    let start = r.position();
    if title_bytes > r.remaining() {
        return Err(bad_format("title block start"));
    }
    let text = &data[start + 4..start + title_bytes];
    header.title = text
        .chunks(TITLE_LINE)
        .map(|line| String::from_utf8_lossy(line).trim_end_matches(['\0', ' ']).to_string())
        .collect::<Vec<_>>()
        .join("\n");
    r.skip(title_bytes, "title block")?;
    r.marker(title_size, "title block end")?;

    // natom block
    r.marker(4, "natom block start")?;
    let natom = r.i32("natom block")?;
    header.natom = usize::try_from(natom).map_err(|_| bad_format("natom block"))?;
    r.marker(4, "natom block end")?;

    if header.namnf > 0 {
        return Err(ReaderError::Unsupported(
            "dcd format with fixed atoms".to_string(),
        ));
    }
    Ok(header)
}

fn read_frame<B: ByteOrder>(
    r: &mut RecordReader<'_, B>,
    header: &DcdHeader,
    index: usize,
) -> Result<DcdFrame, ReaderError> {
    let natom = header.natom;
    let block = i32::try_from(natom * 4).map_err(|_| bad_format("natom block"))?;
    let mut frame = DcdFrame {
        element_count: natom,
        ..Default::default()
    };

    if header.has_unit_cell {
        let size = r.i32("unit cell block start")?;
        let mut cell = [0.0; 6];
        for value in cell.iter_mut() {
            *value = r.f64("unit cell block")?;
        }
        r.marker(size, "unit cell block end")?;
        frame.cell = Some(cell);
    }

    for axis in 0..3 {
        r.marker(block, &format!("coord block start: {index}, {axis}"))?;
        let values = r.f32_array(natom, "coord block")?;
        r.marker(block, &format!("coord block end: {index}, {axis}"))?;
        match axis {
            0 => frame.x = values,
            1 => frame.y = values,
            _ => frame.z = values,
        }
    }

    if header.has_four_dims {
        let size = r.i32("4th dimension block start")?;
        let bytes = usize::try_from(size).map_err(|_| bad_format("4th dimension block"))?;
        r.skip(bytes, "4th dimension block")?;
        r.marker(size, "4th dimension block end")?;
    }
    Ok(frame)
}

fn parse_ordered<B: ByteOrder>(data: &[u8], ctx: &mut RuntimeContext) -> ReaderResult<DcdFile> {
    let mut r = RecordReader::<B>::new(data);
    let header = read_header(&mut r, data)?;
    let frame_count = usize::try_from(header.nset).unwrap_or(0);
    let mut frames = Vec::with_capacity(frame_count.min(data.len()));
    for i in 0..frame_count {
        frames.push(read_frame(&mut r, &header, i)?);
        ctx.update(Progress::parsing(r.position(), data.len()))?;
    }
    debug!(
        "Parsed DCD with {} atoms and {} frame(s)",
        header.natom,
        frames.len()
    );
    Ok(Parsed::new(DcdFile { header, frames }))
}

/// Parse a DCD file with a default runtime context
pub fn parse_dcd(data: &[u8]) -> ReaderResult<DcdFile> {
    parse_dcd_with(data, &mut RuntimeContext::new())
}

/// Parse a DCD file of either byte order, reporting progress after every frame
pub fn parse_dcd_with(data: &[u8], ctx: &mut RuntimeContext) -> ReaderResult<DcdFile> {
    ctx.update(Progress::parsing(0, data.len()))?;
    let first = data
        .get(..4)
        .ok_or_else(|| bad_format("header block start"))?;
    if LittleEndian::read_i32(first) == HEADER_MARKER {
        parse_ordered::<LittleEndian>(data, ctx)
    } else if BigEndian::read_i32(first) == HEADER_MARKER {
        parse_ordered::<BigEndian>(data, ctx)
    } else {
        Err(bad_format("header block start"))
    }
}
