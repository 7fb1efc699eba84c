//! Core module for consolidated report assembly
//!
//! The report is the single place where every gap accumulated across the
//! run becomes user-visible text. It performs no external calls of its
//! own beyond the optional document rendering: each of its five sections
//! only reads artifacts written by prior stages and renders absence as
//! an explicit notice instead of an error, so the assembler works over
//! any subset of the artifact tree, including one where only the
//! original input file exists.

use std::path::{Path, PathBuf};

use anyhow::Result;
use log::{info, warn};

use crate::cli::Args;
use crate::utils::cds_counts;

use config::{
    collect_top_hits, exists_non_empty, fasta_stats, first_success, rank_hits, select_best_hit,
    write_collection, ArtifactTree, SearchHit, ToolCall, DEFAULT_REFERENCE_ACCESSION,
    DEFAULT_REFERENCE_TITLE, MAX_SUMMARY_HITS, RENDER_FALLBACK_TOOL, RENDER_TOOL,
};

pub fn assemble_report(args: Args) -> Result<PathBuf> {
    let tree = ArtifactTree::new(&args.outdir);

    let hits = collect_top_hits(&tree).unwrap_or_else(|e| {
        warn!("could not aggregate top hits: {}", e);
        Vec::new()
    });

    let mut lines: Vec<String> = Vec::new();
    lines.push("pathotools run report".to_string());
    lines.push("=====================".to_string());
    lines.push(String::new());

    section_input_stats(&args.fasta, &mut lines);
    section_search_summary(&hits, &mut lines);
    section_phylogeny(&tree, &mut lines);
    section_reference_annotation(&tree, &mut lines);
    section_conclusion(&hits, &mut lines);

    let path = tree.report_txt();
    write_collection(&lines, &path)?;
    info!("report written to {:?}", path);

    if !args.skip_render {
        render_report(&tree);
    }

    Ok(path)
}

/// [1] record count and mean record length, straight from the input file
fn section_input_stats(fasta: &Path, lines: &mut Vec<String>) {
    lines.push("[1] Input statistics".to_string());

    match fasta_stats(fasta) {
        Ok((records, mean)) => {
            lines.push(format!("  records:            {}", records));
            lines.push(format!("  mean record length: {:.1} bases", mean));
        }
        Err(e) => {
            warn!("could not read input file {:?}: {}", fasta, e);
            lines.push("  input statistics not available".to_string());
        }
    }

    lines.push(String::new());
}

/// [2] top hits across all units, re-ranked over the whole run
fn section_search_summary(hits: &[SearchHit], lines: &mut Vec<String>) {
    lines.push(format!("[2] Search summary [top {} hits]", MAX_SUMMARY_HITS));

    if hits.is_empty() {
        lines.push("  none".to_string());
    } else {
        let mut ranked = hits.to_vec();
        rank_hits(&mut ranked);
        ranked.truncate(MAX_SUMMARY_HITS);

        for hit in &ranked {
            lines.push(format!(
                "  {}\t{}\t{}%\t{}",
                hit.subject_id, hit.bitscore, hit.percent_identity, hit.subject_title
            ));
        }
    }

    lines.push(String::new());
}

/// [3] where the tree artifact ended up, if anywhere
fn section_phylogeny(tree: &ArtifactTree, lines: &mut Vec<String>) {
    lines.push("[3] Phylogenetic status".to_string());

    if exists_non_empty(&tree.tree_file()) {
        lines.push(format!("  tree: {}", tree.tree_file().display()));
    } else {
        lines.push("  tree not generated".to_string());
    }

    lines.push(String::new());
}

/// [4] coding-sequence features of the reference, grouped by product
fn section_reference_annotation(tree: &ArtifactTree, lines: &mut Vec<String>) {
    lines.push("[4] Reference annotation [CDS features by product]".to_string());

    let table = tree.reference_annotation_table();
    if !exists_non_empty(&table) {
        lines.push("  reference annotation not obtained".to_string());
        lines.push(String::new());
        return;
    }

    match cds_counts(&table) {
        Ok(counts) if counts.is_empty() => {
            lines.push("  no coding-sequence features called".to_string());
        }
        Ok(counts) => {
            for (product, count) in counts {
                lines.push(format!("  {:>4}  {}", count, product));
            }
        }
        Err(e) => {
            warn!("could not parse reference annotation {:?}: {}", table, e);
            lines.push("  reference annotation not obtained".to_string());
        }
    }

    lines.push(String::new());
}

/// [5] the inferred identification, or the fallback identity
fn section_conclusion(hits: &[SearchHit], lines: &mut Vec<String>) {
    lines.push("[5] Conclusion".to_string());

    match select_best_hit(hits) {
        Some(best) => {
            lines.push(format!(
                "  Inferred identification: {} [{}, bitscore {}]",
                best.subject_title, best.subject_id, best.bitscore
            ));
        }
        None => {
            lines.push("  No similarity hits were obtained across the run.".to_string());
            lines.push(format!(
                "  Inferred identification defaults to {}: {}",
                DEFAULT_REFERENCE_ACCESSION, DEFAULT_REFERENCE_TITLE
            ));
        }
    }
}

/// Best-effort rendering of the text report into a document, primary
/// engine first, then the simpler fallback engine.
pub fn render_report(tree: &ArtifactTree) {
    let txt = tree.report_txt();
    let doc = tree.report_doc("pdf");

    let primary = ToolCall::new(RENDER_TOOL)
        .arg(&txt)
        .arg("-o")
        .arg(&doc)
        .expects(&doc);

    let fallback = ToolCall::new(RENDER_FALLBACK_TOOL)
        .arg("--headless")
        .arg("--convert-to")
        .arg("pdf")
        .arg("--outdir")
        .arg(tree.report_dir())
        .arg(&txt)
        .expects(&doc);

    let outcome = first_success(
        "report rendering",
        vec![
            ("primary renderer", Box::new(move || primary.run())),
            ("fallback renderer", Box::new(move || fallback.run())),
        ],
    );

    if outcome.succeeded {
        info!("rendered report document {:?}", outcome.output);
    } else {
        warn!("report rendering failed; the text report remains available");
    }
}
