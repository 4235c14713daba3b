//! Input loading and per-format summaries shared by the commands.

use anyhow::{bail, Context, Result};
use log::{debug, info};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use molio::cif::{self, CifFile};
use molio::formats::{self, CsvOptions, Format};
use molio::result::Parsed;
use molio::task::{ParseOptions, Progress, RuntimeContext};

/// A file read into memory
pub struct Input {
    pub path: PathBuf,
    pub format: Format,
    pub bytes: Vec<u8>,
}

impl Input {
    /// Read and, when gzip compressed, inflate `path`
    pub fn read(path: &Path, format: Option<Format>) -> Result<Self> {
        if !path.exists() {
            bail!("File does not exist: {}", path.display());
        }
        let format = match format.or_else(|| Format::from_path(path)) {
            Some(format) => format,
            None => bail!(
                "Cannot detect the format of {}, pass --format",
                path.display()
            ),
        };
        let raw = std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let compressed = raw.len();
        let bytes = formats::decompress(raw)
            .with_context(|| format!("Failed to decompress {}", path.display()))?;
        if bytes.len() != compressed {
            debug!("Inflated {} bytes to {}", compressed, bytes.len());
        }
        info!("Reading {} as {}", path.display(), format);
        Ok(Self {
            path: path.to_path_buf(),
            format,
            bytes,
        })
    }

    /// Input as text
    pub fn text(&self) -> Result<&str> {
        std::str::from_utf8(&self.bytes)
            .with_context(|| format!("{} is not valid UTF-8", self.path.display()))
    }
}

/// A named count in a summary
#[derive(Debug, Serialize)]
pub struct Count {
    pub name: String,
    pub value: usize,
}

/// What a file contains
#[derive(Debug, Serialize)]
pub struct Summary {
    pub file: String,
    pub format: String,
    pub counts: Vec<Count>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl Summary {
    fn new(input: &Input) -> Self {
        Self {
            file: input.path.display().to_string(),
            format: input.format.to_string(),
            counts: Vec::new(),
            details: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn count(&mut self, name: &str, value: usize) -> &mut Self {
        self.counts.push(Count {
            name: name.to_string(),
            value,
        });
        self
    }

    fn warnings<T>(&mut self, parsed: Parsed<T>) -> T {
        self.warnings = parsed.warnings;
        parsed.result
    }
}

/// Runtime context that logs progress at debug level
pub fn logging_context() -> RuntimeContext {
    RuntimeContext::new().with_observer(|p: &Progress| {
        debug!("{}: {}/{}", p.message, p.current, p.max);
    })
}

fn summarize_cif(summary: &mut Summary, file: &CifFile<'_>) {
    let categories: usize = file.blocks.iter().map(|b| b.categories.len()).sum();
    summary
        .count("blocks", file.blocks.len())
        .count("categories", categories);
    for block in &file.blocks {
        let rows: usize = block.categories.iter().map(|c| c.row_count).sum();
        summary.details.push(format!(
            "data_{}: {} categories, {} rows, {} save frames",
            block.header,
            block.categories.len(),
            rows,
            block.save_frames.len()
        ));
    }
}

/// Parse `input` and describe its contents
pub fn summarize(input: &Input, options: &ParseOptions) -> Result<Summary> {
    let mut summary = Summary::new(input);
    let mut ctx = logging_context();
    let context = || format!("Failed to parse {} as {}", input.path.display(), input.format);

    match input.format {
        Format::CifText => {
            let parsed = cif::parse_cif_text_with(input.text()?, &mut ctx, options)
                .with_context(context)?;
            let file = summary.warnings(parsed);
            summarize_cif(&mut summary, &file);
        }
        Format::CifBinary => {
            let parsed = cif::parse_cif_binary(&input.bytes).with_context(context)?;
            let file = summary.warnings(parsed);
            summarize_cif(&mut summary, &file);
        }
        Format::Pdb | Format::Pdbqt => {
            let is_pdbqt = input.format == Format::Pdbqt;
            let parsed = formats::parse_pdb_with(input.text()?, None, is_pdbqt, &mut ctx, options)
                .with_context(context)?;
            let file = summary.warnings(parsed);
            let atoms = file.atom_site();
            let models: BTreeSet<i32> = atoms.model_num.iter().copied().collect();
            summary
                .count("lines", file.line_count())
                .count("atoms", atoms.row_count())
                .count("models", models.len());
        }
        Format::Mol => {
            let parsed = formats::parse_mol(input.text()?).with_context(context)?;
            let file = summary.warnings(parsed);
            summary
                .count("atoms", file.atoms.count)
                .count("bonds", file.bonds.count);
            summary.details.push(format!("title: {}", file.title.trim()));
        }
        Format::Sdf => {
            let parsed = formats::parse_sdf_with(input.text()?, &mut ctx).with_context(context)?;
            let file = summary.warnings(parsed);
            let atoms: usize = file.compounds.iter().map(|c| c.mol.atoms.count).sum();
            summary
                .count("compounds", file.compounds.len())
                .count("atoms", atoms);
        }
        Format::Mol2 => {
            let parsed = formats::parse_mol2_with(input.text()?, None, &mut ctx, options)
                .with_context(context)?;
            let file = summary.warnings(parsed);
            let atoms: usize = file.structures.iter().map(|s| s.atoms.count).sum();
            let bonds: usize = file.structures.iter().map(|s| s.bonds.count).sum();
            summary
                .count("molecules", file.structures.len())
                .count("atoms", atoms)
                .count("bonds", bonds);
            for structure in &file.structures {
                summary.details.push(format!(
                    "{}: {} atoms",
                    structure.molecule.mol_name, structure.atoms.count
                ));
            }
        }
        Format::Psf => {
            let parsed = formats::parse_psf_with(input.text()?, &mut ctx, options)
                .with_context(context)?;
            let file = summary.warnings(parsed);
            summary
                .count("atoms", file.atoms.count)
                .count("bonds", file.bonds.count);
            summary.details.extend(file.title.iter().cloned());
        }
        Format::Prmtop => {
            let parsed = formats::parse_prmtop_with(input.text()?, &mut ctx).with_context(context)?;
            let file = summary.warnings(parsed);
            let bonds = file.pointers.nbonh() + file.pointers.nbona();
            summary
                .count("atoms", file.pointers.natom())
                .count("residues", file.pointers.nres())
                .count("bonds", bonds);
        }
        Format::Top => {
            let parsed = formats::parse_top_with(input.text()?, &mut ctx, options)
                .with_context(context)?;
            let file = summary.warnings(parsed);
            let atoms: usize = file.compounds.iter().map(|c| c.atoms.count).sum();
            summary
                .count("compounds", file.compounds.len())
                .count("atoms", atoms)
                .count("molecules", file.molecules.as_ref().map_or(0, |m| m.count));
            if let Some(system) = &file.system {
                summary.details.push(format!("system: {system}"));
            }
        }
        Format::Gro => {
            let parsed = formats::parse_gro_with(input.text()?, &mut ctx, options)
                .with_context(context)?;
            let file = summary.warnings(parsed);
            summary
                .count("frames", file.structures.len())
                .count(
                    "atoms",
                    file.structures.first().map(|s| s.atoms.count).unwrap_or(0),
                );
            if let Some(first) = file.structures.first() {
                summary.details.push(format!("title: {}", first.header.title));
            }
        }
        Format::Xyz => {
            let parsed = formats::parse_xyz_with(input.text()?, &mut ctx).with_context(context)?;
            let file = summary.warnings(parsed);
            let atoms: usize = file.molecules.iter().map(|m| m.atoms.count).sum();
            summary
                .count("molecules", file.molecules.len())
                .count("atoms", atoms);
        }
        Format::Csv => {
            let parsed =
                formats::parse_csv_with(input.text()?, CsvOptions::default(), &mut ctx, options)
                    .with_context(context)?;
            let file = summary.warnings(parsed);
            summary
                .count("rows", file.table.row_count)
                .count("columns", file.table.column_names.len());
            summary
                .details
                .push(format!("columns: {}", file.table.column_names.join(", ")));
        }
        Format::Ply => {
            let parsed = formats::parse_ply_with(input.text()?, &mut ctx, options)
                .with_context(context)?;
            let file = summary.warnings(parsed);
            for element in &file.elements {
                summary.count(element.name(), element.row_count());
            }
        }
        Format::Dcd => {
            let parsed = formats::parse_dcd_with(&input.bytes, &mut ctx).with_context(context)?;
            let file = summary.warnings(parsed);
            summary
                .count("frames", file.frames.len())
                .count("atoms", file.header.natom);
            if !file.header.title.is_empty() {
                summary.details.push(file.header.title.clone());
            }
        }
        Format::Trr => {
            let parsed = formats::parse_trr_with(&input.bytes, &mut ctx).with_context(context)?;
            let file = summary.warnings(parsed);
            summary
                .count("frames", file.frames.len())
                .count("atoms", file.frames.first().map(|f| f.natoms).unwrap_or(0));
            summary.details.push(format!(
                "time offset {} ps, delta {} ps",
                file.time_offset, file.delta_time
            ));
        }
    }
    Ok(summary)
}
