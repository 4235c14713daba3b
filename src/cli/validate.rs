use anyhow::Result;
use log::info;
use std::path::PathBuf;

use molio::formats::Format;
use molio::result::ReaderError;
use molio::task::ParseOptions;

use super::load::{summarize, Input};

/// Check that a file parses
pub fn run(file: PathBuf, format: Option<Format>, strict: bool) -> Result<()> {
    info!("Validating {}", file.display());

    let input = Input::read(&file, format)?;
    match summarize(&input, &ParseOptions::default()) {
        Ok(summary) => {
            for warning in &summary.warnings {
                println!("warning: {}", warning);
            }
            if strict && !summary.warnings.is_empty() {
                println!(
                    "{}: {} warning(s) in strict mode",
                    file.display(),
                    summary.warnings.len()
                );
                std::process::exit(1);
            }
            println!("{}: valid {}", file.display(), input.format);
            Ok(())
        }
        Err(e) => {
            match e.downcast_ref::<ReaderError>() {
                Some(err @ ReaderError::Syntax { line, .. }) => {
                    eprintln!("{}:{}: {}", file.display(), line, err.message())
                }
                _ => eprintln!("{}: {:#}", file.display(), e),
            }
            std::process::exit(1);
        }
    }
}
