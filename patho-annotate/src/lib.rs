//! Core module for per-unit annotation and similarity search
//!
//! For every sequence unit produced by the splitter, this crate runs the
//! external annotation tool and the external similarity search as two
//! independently tolerated sub-steps, then distills the search output
//! into a per-unit top-hits table. Units are processed in parallel; a
//! unit whose tools fail simply contributes an empty top-hits file.

use anyhow::Result;
use config::RunDescriptor;

pub mod cli;
pub mod core;
pub mod utils;

pub fn lib_patho_annotate(args: Vec<String>) -> Result<RunDescriptor> {
    let args = cli::Args::from(args);
    let descriptor = core::annotate_units(args)?;

    Ok(descriptor)
}
