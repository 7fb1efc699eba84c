//! Full-pipeline orchestration for the pathotools CLI
//!
//! `pathotools run` drives all five stages in-process and in order:
//! split, per-unit annotation, alignment and tree building, reference
//! resolution, report assembly. Stages communicate only through the
//! artifact tree, so each `lib_patho_*` call receives the run directory
//! and reads whatever its predecessors left there. Only two conditions
//! abort the run: a missing input file before anything starts, and an
//! empty concatenated sequence set at the alignment stage.

use anyhow::Result;
use clap::{ArgAction, Parser};
use log::info;
use std::path::PathBuf;

use config::ArgCheck;
use patho_align::lib_patho_align;
use patho_annotate::lib_patho_annotate;
use patho_ref::lib_patho_ref;
use patho_report::lib_patho_report;
use patho_split::lib_patho_split;

#[derive(Debug, Parser)]
pub struct RunArgs {
    #[arg(
        short = 'f',
        long = "fasta",
        required = true,
        value_name = "PATH",
        help = "Multi-record FASTA file with the unknown sample"
    )]
    pub fasta: PathBuf,

    #[arg(
        short = 'o',
        long = "outdir",
        required = false,
        value_name = "PATH",
        help = "Run directory for the artifact tree",
        default_value("pathotools_run")
    )]
    pub outdir: PathBuf,

    #[arg(
        short = 'd',
        long = "db",
        value_name = "NAME",
        help = "Reference database for the similarity search",
        default_value(config::SEARCH_DB)
    )]
    pub db: String,

    #[arg(
        long = "remote",
        help = "Flag to run the similarity search against the remote database service",
        value_name = "FLAG",
        default_missing_value("true"),
        default_value("true"),
        num_args(0..=1),
        require_equals(true),
        action = ArgAction::Set,
    )]
    pub remote: bool,

    #[arg(
        short = 'e',
        long = "evalue",
        value_name = "VALUE",
        help = "E-value cutoff for the similarity search",
        default_value_t = config::SEARCH_EVALUE
    )]
    pub evalue: f64,

    #[arg(
        long = "annotation-evalue",
        value_name = "VALUE",
        help = "Similarity threshold for feature calling",
        default_value_t = config::ANNOTATION_EVALUE
    )]
    pub annotation_evalue: f64,

    #[arg(
        short = 'k',
        long = "top-k",
        value_name = "K",
        help = "Number of top-scoring hits retained per sequence unit",
        default_value_t = config::TOP_K
    )]
    pub top_k: usize,

    #[arg(
        long = "skip-render",
        help = "Flag to skip rendering the report document",
        value_name = "FLAG",
        default_missing_value("true"),
        default_value("false"),
        num_args(0..=1),
        require_equals(true),
        action = ArgAction::Set,
    )]
    pub skip_render: bool,

    #[arg(
        short = 't',
        long = "threads",
        help = "Number of threads",
        value_name = "THREADS",
        default_value_t = num_cpus::get()
    )]
    pub threads: usize,
}

impl RunArgs {
    pub fn from(args: Vec<String>) -> Self {
        let mut full_args = vec![env!("CARGO_PKG_NAME").to_string()];
        full_args.extend(args);

        RunArgs::parse_from(full_args)
    }
}

impl ArgCheck for RunArgs {
    fn get_input(&self) -> &PathBuf {
        &self.fasta
    }
}

pub fn lib(args: Vec<String>) -> Result<()> {
    let args = RunArgs::from(args);

    // a missing input file aborts before any stage runs
    args.check()?;

    rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build_global()
        .ok();

    let fasta = args.fasta.display().to_string();
    let outdir = args.outdir.display().to_string();

    info!("starting run on {:?} [{} threads]", args.fasta, args.threads);

    let units = lib_patho_split(vec![
        "--fasta".to_string(),
        fasta.clone(),
        "--outdir".to_string(),
        outdir.clone(),
    ])?;
    info!("split stage complete: {} unit(s)", units.len());

    lib_patho_annotate(vec![
        "--outdir".to_string(),
        outdir.clone(),
        "--db".to_string(),
        args.db.clone(),
        format!("--remote={}", args.remote),
        "--evalue".to_string(),
        args.evalue.to_string(),
        "--annotation-evalue".to_string(),
        args.annotation_evalue.to_string(),
        "--top-k".to_string(),
        args.top_k.to_string(),
        "--threads".to_string(),
        args.threads.to_string(),
    ])?;
    info!("annotation stage complete");

    lib_patho_align(vec![
        "--outdir".to_string(),
        outdir.clone(),
        "--threads".to_string(),
        args.threads.to_string(),
    ])?;
    info!("alignment stage complete");

    lib_patho_ref(vec![
        "--outdir".to_string(),
        outdir.clone(),
        "--annotation-evalue".to_string(),
        args.annotation_evalue.to_string(),
    ])?;
    info!("reference stage complete");

    let report = lib_patho_report(vec![
        "--fasta".to_string(),
        fasta,
        "--outdir".to_string(),
        outdir,
        format!("--skip-render={}", args.skip_render),
    ])?;
    info!("run complete: {}", report.display());

    Ok(())
}
