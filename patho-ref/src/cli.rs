use clap::Parser;
use config::PipelineConfig;
use std::path::PathBuf;

#[derive(Debug, Parser)]
pub struct Args {
    #[arg(
        short = 'o',
        long = "outdir",
        required = true,
        value_name = "PATH",
        help = "Run directory holding the artifact tree [per-unit top hits are read from here]"
    )]
    pub outdir: PathBuf,

    #[arg(
        long = "annotation-evalue",
        value_name = "VALUE",
        help = "Similarity threshold for feature calling on the retrieved reference",
        default_value_t = config::ANNOTATION_EVALUE
    )]
    pub annotation_evalue: f64,

    #[arg(
        long = "fallback-accession",
        value_name = "ACCESSION",
        help = "Reference accession used when no unit produced a single hit",
        default_value(config::DEFAULT_REFERENCE_ACCESSION)
    )]
    pub fallback_accession: String,
}

impl Args {
    pub fn from(args: Vec<String>) -> Self {
        let mut full_args = vec![env!("CARGO_PKG_NAME").to_string()];
        full_args.extend(args);

        Args::parse_from(full_args)
    }

    pub fn config(&self) -> PipelineConfig {
        PipelineConfig {
            annotation_evalue: self.annotation_evalue,
            default_reference_accession: self.fallback_accession.clone(),
            ..PipelineConfig::default()
        }
    }
}
