use anyhow::Result;
use config::{rank_hits, read_hits, write_hits, ArtifactTree, SearchHit};

/// Rank whatever the converted search table holds and persist the top-K
/// rows for this unit. The top-hits file is written even when there is
/// nothing to rank, so downstream aggregation can rely on its presence.
pub fn extract_top_hits(tree: &ArtifactTree, id: &str, top_k: usize) -> Result<Vec<SearchHit>> {
    let mut hits = read_hits(&tree.search_table(id))?;

    rank_hits(&mut hits);
    hits.truncate(top_k);

    write_hits(&hits, &tree.top_hits(id))?;

    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{unit_id, TOP_K};
    use std::fs;

    fn row(query: &str, subject: &str, bitscore: f64) -> String {
        format!(
            "{}\t{}\t95.0\t100\t2\t0\t1\t100\t1\t100\t1e-40\t{}\t{} description",
            query, subject, bitscore, subject
        )
    }

    fn tree_with_unit(dir: &std::path::Path, idx: usize) -> (ArtifactTree, String) {
        let tree = ArtifactTree::new(dir);
        let id = unit_id(idx);
        fs::create_dir_all(tree.split_dir()).unwrap();
        fs::write(tree.unit_fasta(&id), ">r\nACGT\n").unwrap();
        (tree, id)
    }

    #[test]
    fn test_extract_top_hits_keeps_top_k_by_bitscore() {
        let dir = tempfile::tempdir().unwrap();
        let (tree, id) = tree_with_unit(dir.path(), 1);

        let rows: Vec<String> = (1..=8)
            .map(|i| row(&id, &format!("S{}", i), (i * 10) as f64))
            .collect();
        fs::create_dir_all(tree.search_dir(&id)).unwrap();
        fs::write(tree.search_table(&id), rows.join("\n")).unwrap();

        let hits = extract_top_hits(&tree, &id, TOP_K).unwrap();

        assert_eq!(hits.len(), TOP_K);
        assert_eq!(hits[0].subject_id, "S8");
        assert_eq!(hits[4].subject_id, "S4");

        let persisted = read_hits(&tree.top_hits(&id)).unwrap();
        assert_eq!(persisted.len(), TOP_K);
        assert_eq!(persisted[0].subject_id, "S8");
    }

    #[test]
    fn test_extract_top_hits_without_search_table_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let (tree, id) = tree_with_unit(dir.path(), 1);

        let hits = extract_top_hits(&tree, &id, TOP_K).unwrap();

        assert!(hits.is_empty());
        // the per-unit top-hits file exists even with zero hits
        assert!(tree.top_hits(&id).exists());
    }

    #[test]
    fn test_extract_top_hits_skips_malformed_rows() {
        let dir = tempfile::tempdir().unwrap();
        let (tree, id) = tree_with_unit(dir.path(), 1);

        let content = format!("{}\nnot\ta\tvalid\trow\n{}", row(&id, "A", 50.0), row(&id, "B", 90.0));
        fs::create_dir_all(tree.search_dir(&id)).unwrap();
        fs::write(tree.search_table(&id), content).unwrap();

        let hits = extract_top_hits(&tree, &id, TOP_K).unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].subject_id, "B");
    }
}
