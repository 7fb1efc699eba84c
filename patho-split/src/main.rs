//! Core module for splitting a multi-record FASTA file into sequence units
//!
//! This binary is the standalone entry point for the split stage. It
//! validates the input path, partitions the sample into per-record unit
//! files under the run directory and reports how many units were
//! produced. A missing or empty input file is the one fatal condition.

use anyhow::Result;
use clap::Parser;
use log::{error, info, Level};
use simple_logger::init_with_level;

use config::ArgCheck;
use patho_split::cli::Args;
use patho_split::{dispatch, split_fa, split_fa_gz};

fn main() -> Result<()> {
    let start = std::time::Instant::now();
    init_with_level(Level::Info).unwrap();

    let args: Args = Args::parse();

    args.check().unwrap_or_else(|e| {
        error!("{}", e);
        std::process::exit(1);
    });

    let units = dispatch!(&args.fasta, {
        "fa.gz" => split_fa_gz(&args)?,
        "fasta.gz" => split_fa_gz(&args)?,
        "fna.gz" => split_fa_gz(&args)?,
        "fa" => split_fa(&args)?,
        "fasta" => split_fa(&args)?,
        "fna" => split_fa(&args)?,
    });

    info!(
        "split {} record(s) under {:?}",
        units.len(),
        args.outdir.join(config::SPLIT_DIR)
    );

    let elapsed = start.elapsed();
    info!("Elapsed time: {:.3?}", elapsed);

    Ok(())
}
