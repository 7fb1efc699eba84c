/// pathotools: pathogen identification from an unknown sequence sample
///
/// This is the entry point for the pathotools CLI.
/// It is responsible for parsing the CLI arguments
/// and executing the appropriate subcommand [patho-tool].
///
/// This wrapper offers 6 different subcommands:
/// - patho-split
/// - patho-annotate
/// - patho-align
/// - patho-ref
/// - patho-report
/// - run
///
/// The first five delegate to the corresponding stage binary and relay
/// its captured output; `run` drives the whole pipeline in-process, one
/// stage after another over a shared artifact tree. Apart from a missing
/// input file and an empty sequence set at the alignment stage, stage
/// failures are tolerated and documented in the final report instead of
/// aborting the run.
///
/// To get help on the subcommands, you can run:
///
/// ```shell
/// pathotools patho-annotate -- --help
/// ```
///
use clap::{Args, Parser, Subcommand};
use log::{error, info, Level};
use simple_logger::init_with_level;

use std::process::Command;

const ENTRY: &str = env!("CARGO_MANIFEST_DIR");
const RELEASES: &str = "target/release";

const HELP: &str = r#"
Usage: pathotools run --fasta <PATH> --outdir <DIR>

 Options:
  --fasta <PATH>               Multi-record FASTA file with the unknown sample
  --outdir <DIR>               Run directory for the artifact tree
  --db <NAME>                  Reference database for the similarity search
  --remote[=<FLAG>]            Query the remote database service
  --evalue <VALUE>             E-value cutoff for the similarity search
  --annotation-evalue <VALUE>  Similarity threshold for feature calling
  --top-k <K>                  Top-scoring hits retained per sequence unit
  --skip-render[=<FLAG>]       Skip rendering the report document
  --threads <N>                Number of worker threads
  -h, --help                   Print help
"#;

#[derive(Parser)]
#[command(name = "pathotools")]
#[command(about = "pathotools: pathogen identification from an unknown sequence sample")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(name = "patho-split")]
    Split(StageArgs),
    #[command(name = "patho-annotate")]
    Annotate(StageArgs),
    #[command(name = "patho-align")]
    Align(StageArgs),
    #[command(name = "patho-ref")]
    Reference(StageArgs),
    #[command(name = "patho-report")]
    Report(StageArgs),
    #[command(name = "run")]
    Run(StageArgs),
}

#[derive(Args)]
struct StageArgs {
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, help = HELP)]
    args: Vec<String>,
}

fn main() {
    init_with_level(Level::Info).unwrap();
    let cli = Cli::parse();

    init();

    let (cmd, args) = match cli.command {
        Commands::Split(args) => ("patho-split", args.args),
        Commands::Annotate(args) => ("patho-annotate", args.args),
        Commands::Align(args) => ("patho-align", args.args),
        Commands::Reference(args) => ("patho-ref", args.args),
        Commands::Report(args) => ("patho-report", args.args),
        Commands::Run(args) => ("run", args.args),
    };

    match cmd {
        "run" => pathotools::lib(args).unwrap_or_else(|e| {
            error!("{}", e);
            std::process::exit(1);
        }),
        _ => {
            let package = std::path::Path::new(ENTRY)
                .parent()
                .expect("ERROR: Could not get parent dir")
                .join(RELEASES)
                .join(cmd);

            if args.contains(&"--help".to_string()) || args.contains(&"-h".to_string()) {
                let output = Command::new(package)
                    .arg("--help")
                    .output()
                    .expect("ERROR: Failed to execute process");

                check_output(output);
            } else {
                let output = Command::new(package)
                    .args(args)
                    .output()
                    .expect("ERROR: Failed to execute process");

                check_output(output);
            }
        }
    }
}

fn check_output(output: std::process::Output) {
    if output.status.success() {
        info!("{}", String::from_utf8_lossy(&output.stdout));
    } else {
        error!("{}", String::from_utf8_lossy(&output.stderr));
        std::process::exit(1);
    }
}

fn init() {
    let message = format!(
        r#"

        pathotools: pathogen identification from an unknown sequence sample

        this is the entry point for the pathotools CLI
        and it is responsible for parsing the CLI arguments
        for each patho-tool:

        - patho-split
        - patho-annotate
        - patho-align
        - patho-ref
        - patho-report

        > version: {}

        the `run` subcommand executes the full pipeline over one
        FASTA sample and writes a consolidated report documenting
        every stage, including the ones that produced nothing.

        * to get help on the subcommands, run:
            pathotools <SUBCOMMAND> -- --help

        "#,
        env!("CARGO_PKG_VERSION")
    );

    println!("{}", message);
}
