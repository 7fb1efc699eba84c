//! Core module for consolidated report assembly
//!
//! Renders the five-section run summary from whichever artifacts the
//! prior stages managed to produce, stating every absence explicitly,
//! then makes a best-effort attempt to render the text into a document.

use anyhow::Result;
use std::path::PathBuf;

pub mod cli;
pub mod core;
pub mod utils;

pub fn lib_patho_report(args: Vec<String>) -> Result<PathBuf> {
    let args = cli::Args::from(args);
    let report = core::assemble_report(args)?;

    Ok(report)
}
