//! Core module for reference genome resolution
//!
//! Standalone entry point for the reference stage. Both retrieval tiers
//! failing is tolerated: the absence is recorded and the consolidated
//! report states that no reference genome was obtained.

use clap::Parser;
use log::{error, info, Level};
use simple_logger::init_with_level;

use patho_ref::cli::Args;
use patho_ref::core::resolve_reference;

fn main() {
    let start = std::time::Instant::now();
    init_with_level(Level::Info).unwrap();

    let args: Args = Args::parse();

    resolve_reference(args).unwrap_or_else(|e| {
        error!("{}", e);
        std::process::exit(1);
    });

    let elapsed = start.elapsed();
    info!("Elapsed time: {:.3?}", elapsed);
}
