//! Core module for per-unit annotation and similarity search
//!
//! Each sequence unit goes through two independent sub-steps: the gene
//! annotation tool and the similarity search against a reference
//! database. The sub-steps share no state and tolerate each other's
//! failures, so one broken tool never blocks the other and one broken
//! unit never blocks the fan-out. Whatever happens, every unit ends with
//! a persisted top-hits file, possibly empty, which is the only artifact
//! later stages depend on.

use std::fs::create_dir_all;

use anyhow::Result;
use log::{info, warn};
use rayon::prelude::*;
use serde_json::Value;

use crate::cli::Args;
use crate::utils::extract_top_hits;

use config::{
    annotation_call, get_progress_bar, write_descriptor, ArtifactTree, PipelineConfig,
    RunDescriptor, ToolCall, ToolOutcome, MAX_TARGET_SEQS, SEARCH_FORMATTER, SEARCH_OUTFMT,
    SEARCH_TOOL,
};

/// Fan out over every sequence unit and run both sub-steps, accumulating
/// per-unit outcomes into the run descriptor.
pub fn annotate_units(args: Args) -> Result<RunDescriptor> {
    let tree = ArtifactTree::new(&args.outdir);
    let cfg = args.config();

    let ids = tree.unit_ids();
    if ids.is_empty() {
        warn!("no sequence units found under {:?}", tree.split_dir());
    }

    info!("annotating {} sequence unit(s)", ids.len());
    let pb = get_progress_bar(ids.len() as u64, "Annotating units...");

    let descriptor = RunDescriptor::new();

    ids.par_iter().for_each(|id| {
        let annotation = annotate_unit(&tree, id, &cfg);
        descriptor.insert(format!("{}/annotation", id), annotation.as_value());

        let search = search_unit(&tree, id, &args, &cfg);
        descriptor.insert(format!("{}/search", id), search.as_value());

        match extract_top_hits(&tree, id, cfg.top_k) {
            Ok(hits) => {
                descriptor.insert(format!("{}/top_hits", id), Value::from(hits.len()));
            }
            Err(e) => {
                warn!("{}: could not persist top hits: {}", id, e);
                descriptor.insert(format!("{}/top_hits", id), Value::from(0));
            }
        }

        pb.inc(1);
    });

    pb.finish_and_clear();
    write_descriptor(&descriptor, &tree.descriptor());

    Ok(descriptor)
}

/// Annotation sub-step: feature calling with a viral domain hint and a
/// lenient similarity threshold. Failure is recorded, never propagated.
fn annotate_unit(tree: &ArtifactTree, id: &str, cfg: &PipelineConfig) -> ToolOutcome {
    let outcome = annotation_call(
        &tree.unit_fasta(id),
        &tree.annotation_dir(id),
        id,
        cfg.annotation_evalue,
    )
    .run();

    if !outcome.succeeded {
        warn!("{}: annotation failed: {}", id, outcome.diagnostic);
    }

    outcome
}

/// Search sub-step: query the reference database capturing the exchange
/// archive, then convert the archive into the flat ranked table. Either
/// step failing means this unit contributes zero hits.
fn search_unit(tree: &ArtifactTree, id: &str, args: &Args, cfg: &PipelineConfig) -> ToolOutcome {
    if let Err(e) = create_dir_all(tree.search_dir(id)) {
        let outcome = ToolOutcome::failure(format!("could not create search directory: {}", e));
        warn!("{}: {}", id, outcome.diagnostic);
        return outcome;
    }

    let archive = tree.search_archive(id);

    let mut search = ToolCall::new(SEARCH_TOOL)
        .arg("-query")
        .arg(tree.unit_fasta(id))
        .arg("-db")
        .arg(&args.db)
        .arg("-evalue")
        .arg(cfg.search_evalue.to_string())
        .arg("-max_target_seqs")
        .arg(MAX_TARGET_SEQS.to_string())
        .arg("-outfmt")
        .arg("11")
        .arg("-out")
        .arg(&archive);
    if args.remote {
        search = search.arg("-remote");
    }

    let outcome = search.expects(&archive).run();
    if !outcome.succeeded {
        warn!("{}: similarity search failed: {}", id, outcome.diagnostic);
        return outcome;
    }

    let table = tree.search_table(id);
    let outcome = ToolCall::new(SEARCH_FORMATTER)
        .arg("-archive")
        .arg(&archive)
        .arg("-outfmt")
        .arg(SEARCH_OUTFMT)
        .arg("-out")
        .arg(&table)
        .expects(&table)
        .run();

    if !outcome.succeeded {
        warn!(
            "{}: search output conversion failed: {}",
            id, outcome.diagnostic
        );
    }

    outcome
}
