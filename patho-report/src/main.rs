//! Core module for consolidated report assembly
//!
//! Standalone entry point for the report stage. The assembler tolerates
//! an artifact tree in any state of completeness, so it can also be
//! re-run on its own to re-collect a partially finished or interrupted
//! run.

use clap::Parser;
use log::{error, info, Level};
use simple_logger::init_with_level;

use patho_report::cli::Args;
use patho_report::core::assemble_report;

fn main() {
    let start = std::time::Instant::now();
    init_with_level(Level::Info).unwrap();

    let args: Args = Args::parse();

    assemble_report(args).unwrap_or_else(|e| {
        error!("{}", e);
        std::process::exit(1);
    });

    let elapsed = start.elapsed();
    info!("Elapsed time: {:.3?}", elapsed);
}
