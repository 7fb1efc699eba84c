use clap::{ArgAction, Parser};
use config::PipelineConfig;
use std::path::PathBuf;

#[derive(Debug, Parser)]
pub struct Args {
    #[arg(
        short = 'o',
        long = "outdir",
        required = true,
        value_name = "PATH",
        help = "Run directory holding the artifact tree [split units are read from here]"
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
        help = "Similarity threshold for feature calling in the annotation sub-step",
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
        short = 't',
        long = "threads",
        help = "Number of threads",
        value_name = "THREADS",
        default_value_t = num_cpus::get()
    )]
    pub threads: usize,
}

impl Args {
    pub fn from(args: Vec<String>) -> Self {
        let mut full_args = vec![env!("CARGO_PKG_NAME").to_string()];
        full_args.extend(args);

        Args::parse_from(full_args)
    }

    pub fn config(&self) -> PipelineConfig {
        PipelineConfig {
            threads: self.threads,
            search_evalue: self.evalue,
            annotation_evalue: self.annotation_evalue,
            top_k: self.top_k,
            ..PipelineConfig::default()
        }
    }
}
