//! Core module for per-unit annotation and similarity search
//!
//! Standalone entry point for the annotation stage: builds the thread
//! pool, fans out over every split unit and runs the two tolerated
//! sub-steps per unit. This stage never aborts the run; tool failures
//! are logged and surface later in the consolidated report.

use clap::Parser;
use log::{error, info, Level};
use simple_logger::init_with_level;

use patho_annotate::cli::Args;
use patho_annotate::core::annotate_units;

fn main() {
    let start = std::time::Instant::now();
    init_with_level(Level::Info).unwrap();

    let args: Args = Args::parse();

    rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build_global()
        .unwrap();

    annotate_units(args).unwrap_or_else(|e| {
        error!("{}", e);
        std::process::exit(1);
    });

    let elapsed = start.elapsed();
    info!("Elapsed time: {:.3?}", elapsed);
}
