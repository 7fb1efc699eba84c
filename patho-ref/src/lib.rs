//! Core module for reference genome resolution
//!
//! Selects the run-wide best hit from the per-unit top-hits tables and
//! retrieves the corresponding reference genome through a two-tier
//! retrieval chain, falling back to a fixed representative pathogen
//! genome when the run produced no hits at all.

use anyhow::Result;
use config::RunDescriptor;

pub mod cli;
pub mod core;
pub mod utils;

pub fn lib_patho_ref(args: Vec<String>) -> Result<RunDescriptor> {
    let args = cli::Args::from(args);
    let descriptor = core::resolve_reference(args)?;

    Ok(descriptor)
}
