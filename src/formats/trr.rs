//! GROMACS TRR trajectory reader.
//!
//! TRR frames are XDR encoded (big-endian, 4-byte aligned). Each frame header
//! lists the byte size of every optional block, which also tells whether the
//! file was written in single or double precision. Lengths are converted
//! from nm to Angstrom.

use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt};
use log::debug;

use crate::result::{Parsed, ReaderError, ReaderResult};
use crate::task::{Progress, RuntimeContext};

/// nm to Angstrom
const LENGTH_SCALE: f64 = 10.0;

/// Block sizes of a frame header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct FrameSizes {
    ir: usize,
    e: usize,
    box_: usize,
    vir: usize,
    pres: usize,
    top: usize,
    sym: usize,
    x: usize,
    v: usize,
    f: usize,
}

/// One TRR frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrrFrame {
    /// Simulation step
    pub step: i32,
    /// Number of atoms
    pub natoms: usize,
    /// Time in ps
    pub time: f64,
    /// Free energy lambda
    pub lambda: f64,
    /// Whether reals were written in double precision
    pub double_precision: bool,
    /// Box vectors (row major) in Angstrom
    pub box_vectors: Option<[f64; 9]>,
    /// X coordinates in Angstrom; empty when the frame has no coordinates
    pub x: Vec<f32>,
    /// Y coordinates in Angstrom
    pub y: Vec<f32>,
    /// Z coordinates in Angstrom
    pub z: Vec<f32>,
}

/// A parsed TRR file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrrFile {
    /// Frames in file order
    pub frames: Vec<TrrFrame>,
    /// Time of the first frame
    pub time_offset: f64,
    /// Time between the first two frames, 0 with fewer than two frames
    pub delta_time: f64,
}

impl TrrFile {
    /// Frame times in ps
    pub fn times(&self) -> Vec<f64> {
        self.frames.iter().map(|f| f.time).collect()
    }
}

fn truncated(what: &str) -> ReaderError {
    ReaderError::format(format!("trr bad format, unexpected end of data in {what}"))
}

struct XdrReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> XdrReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(data),
        }
    }

    fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    fn remaining(&self) -> usize {
        self.cursor.get_ref().len().saturating_sub(self.position())
    }

    fn at_end(&self) -> bool {
        self.remaining() == 0
    }

    fn i32(&mut self, what: &str) -> Result<i32, ReaderError> {
        self.cursor.read_i32::<BigEndian>().map_err(|_| truncated(what))
    }

    fn size(&mut self, what: &str) -> Result<usize, ReaderError> {
        usize::try_from(self.i32(what)?)
            .map_err(|_| ReaderError::format(format!("trr bad format, negative size in {what}")))
    }

    fn real(&mut self, double: bool, what: &str) -> Result<f64, ReaderError> {
        if double {
            self.cursor.read_f64::<BigEndian>().map_err(|_| truncated(what))
        } else {
            self.cursor
                .read_f32::<BigEndian>()
                .map(f64::from)
                .map_err(|_| truncated(what))
        }
    }

    fn skip(&mut self, bytes: usize, what: &str) -> Result<(), ReaderError> {
        if bytes > self.remaining() {
            return Err(truncated(what));
        }
        self.cursor.set_position((self.position() + bytes) as u64);
        Ok(())
    }
}

fn read_frame(r: &mut XdrReader<'_>) -> Result<TrrFrame, ReaderError> {
    // magic number and version string length
    r.skip(8, "frame header")?;
    let version_size = r.size("version string")?;
    r.skip(version_size.div_ceil(4) * 4, "version string")?;

    let mut sizes = FrameSizes::default();
    for size in [
        &mut sizes.ir,
        &mut sizes.e,
        &mut sizes.box_,
        &mut sizes.vir,
        &mut sizes.pres,
        &mut sizes.top,
        &mut sizes.sym,
        &mut sizes.x,
        &mut sizes.v,
        &mut sizes.f,
    ] {
        *size = r.size("frame header")?;
    }
    let natoms = r.size("frame header")?;
    let step = r.i32("frame header")?;
    let _nre = r.i32("frame header")?;

    let real_size = if sizes.box_ > 0 {
        sizes.box_ / 9
    } else if sizes.x > 0 && natoms > 0 {
        sizes.x / (natoms * 3)
    } else {
        4
    };
    let double = real_size == 8;

    let mut frame = TrrFrame {
        step,
        natoms,
        double_precision: double,
        ..Default::default()
    };
    frame.time = r.real(double, "time")?;
    frame.lambda = r.real(double, "lambda")?;

    if sizes.box_ > 0 {
        let mut box_vectors = [0.0; 9];
        for value in box_vectors.iter_mut() {
            *value = r.real(double, "box")? * LENGTH_SCALE;
        }
        frame.box_vectors = Some(box_vectors);
    }
    r.skip(sizes.vir, "virial")?;
    r.skip(sizes.pres, "pressure")?;

    if sizes.x > 0 {
        if sizes.x > r.remaining() {
            return Err(truncated("coordinates"));
        }
        frame.x.reserve(natoms);
        frame.y.reserve(natoms);
        frame.z.reserve(natoms);
        for _ in 0..natoms {
            frame.x.push((r.real(double, "coordinates")? * LENGTH_SCALE) as f32);
            frame.y.push((r.real(double, "coordinates")? * LENGTH_SCALE) as f32);
            frame.z.push((r.real(double, "coordinates")? * LENGTH_SCALE) as f32);
        }
    }
    r.skip(sizes.v, "velocities")?;
    r.skip(sizes.f, "forces")?;
    Ok(frame)
}

/// Parse a TRR file with a default runtime context
pub fn parse_trr(data: &[u8]) -> ReaderResult<TrrFile> {
    parse_trr_with(data, &mut RuntimeContext::new())
}

/// Parse every frame of a TRR file, reporting progress after each one
pub fn parse_trr_with(data: &[u8], ctx: &mut RuntimeContext) -> ReaderResult<TrrFile> {
    ctx.update(Progress::parsing(0, data.len()))?;
    let mut r = XdrReader::new(data);
    let mut frames = Vec::new();
    while !r.at_end() {
        frames.push(read_frame(&mut r)?);
        ctx.update(Progress::parsing(r.position(), data.len()))?;
    }

    let time_offset = frames.first().map(|f| f.time).unwrap_or(0.0);
    let delta_time = match frames.as_slice() {
        [first, second, ..] => second.time - first.time,
        _ => 0.0,
    };
    debug!("Parsed TRR with {} frame(s)", frames.len());
    Ok(Parsed::new(TrrFile {
        frames,
        time_offset,
        delta_time,
    }))
}
