//! Core module for multiple alignment and tree building
//!
//! Standalone entry point for the alignment stage. Exits non-zero only
//! when the concatenated sequence set is empty; a failing aligner or
//! tree tool is logged and leaves the corresponding artifact absent.

use clap::Parser;
use log::{error, info, Level};
use simple_logger::init_with_level;

use patho_align::cli::Args;
use patho_align::core::build_alignment;

fn main() {
    let start = std::time::Instant::now();
    init_with_level(Level::Info).unwrap();

    let args: Args = Args::parse();

    build_alignment(args).unwrap_or_else(|e| {
        error!("{}", e);
        std::process::exit(1);
    });

    let elapsed = start.elapsed();
    info!("Elapsed time: {:.3?}", elapsed);
}
