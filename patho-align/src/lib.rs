//! Core module for multiple alignment and tree building
//!
//! Concatenates the split units in order, aligns them with the external
//! aligner and, when an alignment artifact exists, infers a phylogenetic
//! tree. Tool failures downgrade to missing artifacts; only an empty
//! concatenated sequence set aborts the run.

use anyhow::Result;
use config::RunDescriptor;

pub mod cli;
pub mod core;

pub fn lib_patho_align(args: Vec<String>) -> Result<RunDescriptor> {
    let args = cli::Args::from(args);
    let descriptor = core::build_alignment(args)?;

    Ok(descriptor)
}
