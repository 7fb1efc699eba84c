//! Core module for multiple alignment and tree building
//!
//! The split units are concatenated in split order into one working file
//! and handed to the external aligner with a bounded iteration count.
//! Tree building only runs when an alignment artifact actually exists,
//! using a nucleotide substitution model. Both tools are tolerated: this
//! stage produces at most two optional artifacts and the only fatal
//! condition is an empty concatenated sequence set, because then there
//! is nothing left for the pipeline to work with.

use std::fs::create_dir_all;
use std::path::PathBuf;

use anyhow::Result;
use log::{info, warn};

use crate::cli::Args;

use config::{
    concat_files, exists_non_empty, write_descriptor, ArtifactTree, RunDescriptor, ToolCall,
    ToolOutcome, ALIGNER_MAX_ITERATE, ALIGNMENT_TOOL, TREE_TOOL,
};

pub fn build_alignment(args: Args) -> Result<RunDescriptor> {
    let tree = ArtifactTree::new(&args.outdir);
    let descriptor = RunDescriptor::new();

    let units: Vec<PathBuf> = tree
        .unit_ids()
        .iter()
        .map(|id| tree.unit_fasta(id))
        .collect();

    let combined = tree.combined_fasta();
    let bytes = concat_files(&units, &combined)?;
    if bytes == 0 {
        anyhow::bail!(
            "ERROR: nothing to align: no sequence content under {:?}",
            tree.split_dir()
        );
    }
    info!(
        "concatenated {} unit(s) [{} bytes] into {:?}",
        units.len(),
        bytes,
        combined
    );

    create_dir_all(tree.alignment_dir())?;

    let alignment = ToolCall::new(ALIGNMENT_TOOL)
        .arg("--maxiterate")
        .arg(ALIGNER_MAX_ITERATE.to_string())
        .arg("--thread")
        .arg(args.threads.to_string())
        .arg(&combined)
        .stdout_to(tree.alignment_fasta())
        .run();

    if !alignment.succeeded {
        warn!("alignment failed: {}", alignment.diagnostic);
    }
    descriptor.insert("alignment".to_string(), alignment.as_value());

    let tree_outcome = build_tree(&tree);
    descriptor.insert("tree".to_string(), tree_outcome.as_value());

    write_descriptor(&descriptor, &tree.descriptor());

    Ok(descriptor)
}

/// Attempt tree building iff the alignment artifact exists and is
/// non-empty; the tree tool's stderr stays captured and is not relayed.
fn build_tree(tree: &ArtifactTree) -> ToolOutcome {
    if !exists_non_empty(&tree.alignment_fasta()) {
        info!("no alignment artifact, skipping tree building");
        return ToolOutcome::failure("skipped: no alignment artifact");
    }

    let outcome = ToolCall::new(TREE_TOOL)
        .arg("-nt")
        .arg("-gtr")
        .arg(tree.alignment_fasta())
        .stdout_to(tree.tree_file())
        .run();

    if !outcome.succeeded {
        warn!("tree building failed, no tree artifact produced");
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::unit_id;
    use std::fs;

    #[test]
    fn test_empty_concatenation_is_fatal() {
        let dir = tempfile::tempdir().unwrap();

        let result = build_alignment(Args {
            outdir: dir.path().to_path_buf(),
            threads: 1,
        });

        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("nothing to align"));
    }

    #[test]
    fn test_failing_aligner_does_not_crash_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let tree = ArtifactTree::new(dir.path());
        fs::create_dir_all(tree.split_dir()).unwrap();
        fs::write(tree.unit_fasta(&unit_id(1)), ">r1\nACGT\n").unwrap();
        fs::write(tree.unit_fasta(&unit_id(2)), ">r2\nTTTT\n").unwrap();

        // whether or not the aligner is installed, the stage must finish
        // and record an outcome for both tools
        let descriptor = build_alignment(Args {
            outdir: dir.path().to_path_buf(),
            threads: 1,
        })
        .unwrap();

        assert_eq!(
            fs::read_to_string(tree.combined_fasta()).unwrap(),
            ">r1\nACGT\n>r2\nTTTT\n"
        );
        assert!(descriptor.contains_key("alignment"));
        assert!(descriptor.contains_key("tree"));
        assert!(tree.descriptor().exists());
    }

    #[test]
    fn test_tree_building_requires_alignment_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let tree = ArtifactTree::new(dir.path());
        fs::create_dir_all(tree.alignment_dir()).unwrap();

        let outcome = build_tree(&tree);
        assert!(!outcome.succeeded);
        assert!(outcome.diagnostic.contains("skipped"));

        // an empty alignment file must not trigger tree building either
        fs::write(tree.alignment_fasta(), "").unwrap();
        let outcome = build_tree(&tree);
        assert!(outcome.diagnostic.contains("skipped"));
    }
}
