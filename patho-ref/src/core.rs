//! Core module for reference genome resolution
//!
//! Aggregates every unit's persisted top hits, picks the single
//! best-scoring subject across the run and retrieves its sequence as the
//! comparison baseline. When no unit produced a hit the stage falls back
//! to a fixed representative pathogen genome instead of failing: the
//! pipeline never finishes without a reference candidate. Retrieval
//! itself goes through a two-tier chain, and the retrieved genome is
//! annotated with the same tolerance as the per-unit annotation.

use std::fs::create_dir_all;

use anyhow::Result;
use log::{info, warn};
use serde_json::Value;

use crate::cli::Args;
use crate::utils::{choose_accession, retrieve};

use config::{
    annotation_call, collect_top_hits, write_descriptor, ArtifactTree, RunDescriptor,
    REFERENCE_PREFIX,
};

pub fn resolve_reference(args: Args) -> Result<RunDescriptor> {
    let tree = ArtifactTree::new(&args.outdir);
    let cfg = args.config();
    let descriptor = RunDescriptor::new();

    let hits = collect_top_hits(&tree)?;
    info!("aggregated {} hit(s) across all units", hits.len());

    let accession = choose_accession(&hits, &cfg.default_reference_accession);
    descriptor.insert(
        "reference/accession".to_string(),
        Value::String(accession.clone()),
    );

    create_dir_all(tree.reference_dir())?;

    let retrieval = retrieve(&accession, &tree.reference_fasta());
    descriptor.insert("reference/retrieval".to_string(), retrieval.as_value());

    if retrieval.succeeded {
        let annotation = annotation_call(
            &tree.reference_fasta(),
            &tree.reference_annotation_dir(),
            REFERENCE_PREFIX,
            cfg.annotation_evalue,
        )
        .run();

        if !annotation.succeeded {
            warn!("reference annotation failed: {}", annotation.diagnostic);
        }
        descriptor.insert("reference/annotation".to_string(), annotation.as_value());
    } else {
        warn!("no reference genome obtained for {}", accession);
    }

    write_descriptor(&descriptor, &tree.descriptor());

    Ok(descriptor)
}
