//! # molio
//!
//! Command-line front end for the molio readers.
//!
//! ## Usage
//!
//! ```bash
//! # Summarize any supported file (gzip is detected automatically)
//! molio inspect 1abc.cif.gz
//!
//! # Check that a file parses; syntax errors are reported with their line
//! molio validate ligands.sdf
//!
//! # Export every CIF category to Parquet
//! molio export 1abc.bcif out/
//! ```

mod cli;

use anyhow::Result;
use clap::Parser;

use cli::{dispatch, init_logging, Cli};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbosity());
    dispatch(cli)
}
