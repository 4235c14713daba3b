use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use molio::formats::Format;

mod config;
#[cfg(feature = "export")]
mod export;
mod inspect;
mod load;
#[cfg(feature = "export")]
mod profile;
mod validate;

#[cfg(feature = "export")]
pub use profile::Profile;

/// molio - reader toolkit for molecular structure, topology and trajectory files
#[derive(Parser)]
#[command(name = "molio")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Export profile trading write speed against file size.
#[cfg(feature = "export")]
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum ProfileArg {
    /// Snappy, small row groups
    Fast,
    /// ZSTD level 3
    #[default]
    Balanced,
    /// High ZSTD level, large row groups
    MaxCompression,
}

#[cfg(feature = "export")]
impl From<ProfileArg> for Profile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::Fast => Profile::Fast,
            ProfileArg::Balanced => Profile::Balanced,
            ProfileArg::MaxCompression => Profile::MaxCompression,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a file and print a summary of its contents
    Inspect {
        /// Input file (may be gzip compressed)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Input format (detected from the file name when omitted)
        #[arg(short, long)]
        format: Option<Format>,

        /// Load settings from a TOML config file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,

        /// Items per progress chunk
        #[arg(long, hide = true)]
        chunk_size: Option<usize>,
    },

    /// Check that a file parses, reporting the first error with its line
    Validate {
        /// Input file (may be gzip compressed)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Input format (detected from the file name when omitted)
        #[arg(short, long)]
        format: Option<Format>,

        /// Treat parser warnings as failures
        #[arg(long)]
        strict: bool,
    },

    /// Export the categories of a CIF or BinaryCIF file to Parquet
    #[cfg(feature = "export")]
    Export {
        /// Input CIF or BinaryCIF file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output directory (defaults to <input stem>.molio next to the input)
        #[arg(value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Export profile (fast, balanced, max-compression)
        #[arg(short = 'p', long, default_value = "balanced", value_enum)]
        profile: ProfileArg,

        /// Load settings from a TOML config file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        // === Advanced tuning flags (hidden from --help) ===
        /// Compression level for ZSTD (1-22, default: profile-dependent)
        #[arg(short = 'c', long, hide = true)]
        compression_level: Option<i32>,

        /// Rows per Parquet row group
        #[arg(short = 'r', long, hide = true)]
        row_group_size: Option<usize>,
    },
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Inspect {
            file,
            format,
            config,
            json,
            chunk_size,
        } => inspect::run(file, format, config, json, chunk_size),
        Commands::Validate {
            file,
            format,
            strict,
        } => validate::run(file, format, strict),
        #[cfg(feature = "export")]
        Commands::Export {
            input,
            output,
            profile,
            config,
            compression_level,
            row_group_size,
        } => export::run(
            input,
            output,
            Profile::from(profile),
            config,
            compression_level,
            row_group_size,
        ),
    }
}
