//! Shared configuration for the pathotools pipeline
//!
//! This crate holds everything more than one pipeline stage needs:
//! universal constants (artifact names, tool names, cutoff defaults),
//! the run-wide `PipelineConfig` structure, the artifact-tree accessors,
//! the external-tool invocation primitives, the search-hit model with
//! the best-hit selection routine, and the CLI validation helpers used
//! by every subcommand.

use indicatif::{ProgressBar, ProgressStyle};
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub mod fns;
pub mod mods;

pub use fns::*;
pub use mods::*;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// numeric defaults
pub const MIN_THREADS: usize = 1;
pub const TOP_K: usize = 5;
pub const MAX_SUMMARY_HITS: usize = 10;
pub const SEARCH_EVALUE: f64 = 1e-5;
pub const ANNOTATION_EVALUE: f64 = 0.1;
pub const MAX_TARGET_SEQS: usize = 20;
pub const ALIGNER_MAX_ITERATE: usize = 1000;
pub const SEARCH_FIELDS: usize = 13;

// fallback reference; used whenever no unit produced a single hit
pub const DEFAULT_REFERENCE_ACCESSION: &str = "NC_045512.2";
pub const DEFAULT_REFERENCE_TITLE: &str =
    "Severe acute respiratory syndrome coronavirus 2 isolate Wuhan-Hu-1, complete genome";
pub const EUTILS_FETCH_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/efetch.fcgi";

// artifact tree
pub const SPLIT_DIR: &str = "split";
pub const UNITS_DIR: &str = "units";
pub const ANNOTATION_DIR: &str = "annotation";
pub const SEARCH_DIR: &str = "search";
pub const ALIGNMENT_DIR: &str = "alignment";
pub const REFERENCE_DIR: &str = "reference";
pub const REPORT_DIR: &str = "report";
pub const UNIT_PREFIX: &str = "unknown_";
pub const COMBINED_FASTA: &str = "combined.fasta";
pub const ALIGNMENT_FASTA: &str = "combined.aln.fasta";
pub const TREE_FILE: &str = "combined.nwk";
pub const REFERENCE_FASTA: &str = "reference.fasta";
pub const REFERENCE_PREFIX: &str = "reference";
pub const REPORT_TXT: &str = "report.txt";
pub const RUN_DESCRIPTOR: &str = "run_descriptor.json";

// external tools
pub const ANNOTATION_TOOL: &str = "prokka";
pub const SEARCH_TOOL: &str = "blastn";
pub const SEARCH_FORMATTER: &str = "blast_formatter";
pub const ALIGNMENT_TOOL: &str = "mafft";
pub const TREE_TOOL: &str = "fasttree";
pub const RETRIEVAL_TOOL: &str = "efetch";
pub const RENDER_TOOL: &str = "pandoc";
pub const RENDER_FALLBACK_TOOL: &str = "libreoffice";
pub const ANNOTATION_KINGDOM: &str = "Viruses";
pub const SEARCH_DB: &str = "nt";
pub const SEARCH_OUTFMT: &str = "6 std stitle";
pub const CDS_FEATURE: &str = "CDS";

// os
#[cfg(not(windows))]
const TICK_SETTINGS: (&str, u64) = ("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ", 80);
#[cfg(windows)]
const TICK_SETTINGS: (&str, u64) = (r"+-x| ", 200);

/// Run-wide knobs, built once from CLI arguments and handed to every
/// component. Defaults mirror the constants above.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub threads: usize,
    pub search_evalue: f64,
    pub annotation_evalue: f64,
    pub top_k: usize,
    pub default_reference_accession: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            threads: MIN_THREADS,
            search_evalue: SEARCH_EVALUE,
            annotation_evalue: ANNOTATION_EVALUE,
            top_k: TOP_K,
            default_reference_accession: DEFAULT_REFERENCE_ACCESSION.to_string(),
        }
    }
}

/// return a pre-configured progress bar
pub fn get_progress_bar(length: u64, msg: &str) -> ProgressBar {
    let progressbar_style = ProgressStyle::default_spinner()
        .tick_chars(TICK_SETTINGS.0)
        .template(" {spinner} {msg:<30} {wide_bar} ETA {eta_precise} ")
        .expect("no template error");

    let progress_bar = ProgressBar::new(length);

    progress_bar.set_style(progressbar_style);
    progress_bar.enable_steady_tick(Duration::from_millis(TICK_SETTINGS.1));
    progress_bar.set_message(msg.to_owned());

    progress_bar
}

/// write any collection of lines to a file, creating parent directories
pub fn write_collection(data: &[String], path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    for line in data {
        writeln!(writer, "{}", line)?;
    }

    Ok(())
}

/// argument checker for all subcommands
pub trait ArgCheck {
    fn check(&self) -> Result<(), CliError> {
        self.validate_args()
    }

    fn validate_args(&self) -> Result<(), CliError> {
        validate(self.get_input())
    }

    fn get_input(&self) -> &PathBuf;
}

/// error handling for CLI
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// argument validation
pub fn validate(arg: &PathBuf) -> Result<(), CliError> {
    if !arg.exists() {
        return Err(CliError::InvalidInput(format!("{:?} does not exist", arg)));
    }

    if !arg.is_file() {
        return Err(CliError::InvalidInput(format!("{:?} is not a file", arg)));
    }

    match arg.extension() {
        Some(ext) if ext == "fa" || ext == "fasta" || ext == "fna" || ext == "gz" => (),
        _ => {
            return Err(CliError::InvalidInput(format!(
                "file {:?} is not a FASTA file",
                arg
            )))
        }
    }

    match std::fs::metadata(arg) {
        Ok(metadata) if metadata.len() == 0 => {
            Err(CliError::InvalidInput(format!("file {:?} is empty", arg)))
        }
        Ok(_) => Ok(()),
        Err(e) => Err(CliError::IoError(e)),
    }
}
