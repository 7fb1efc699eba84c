use std::path::Path;

use anyhow::Result;
use log::{info, warn};

use config::{
    exists_non_empty, first_success, persist_bytes, select_best_hit, SearchHit, ToolCall,
    ToolOutcome, EUTILS_FETCH_URL, RETRIEVAL_TOOL,
};

/// The candidate reference accession: the global best hit's subject,
/// normalized to a bare accession, or the configured fallback when the
/// aggregate hit set is empty.
pub fn choose_accession(hits: &[SearchHit], fallback: &str) -> String {
    match select_best_hit(hits) {
        Some(best) => {
            info!(
                "global best hit: {} [bitscore {}] {}",
                best.subject_id, best.bitscore, best.subject_title
            );
            best.accession().to_string()
        }
        None => {
            warn!(
                "no hits across any unit, falling back to default reference {}",
                fallback
            );
            fallback.to_string()
        }
    }
}

/// Two-tier retrieval: the retrieval service first, then a direct
/// network fetch of the same record. Either tier succeeding counts as
/// success.
pub fn retrieve(accession: &str, dest: &Path) -> ToolOutcome {
    let primary = ToolCall::new(RETRIEVAL_TOOL)
        .arg("-db")
        .arg("nucleotide")
        .arg("-id")
        .arg(accession)
        .arg("-format")
        .arg("fasta")
        .stdout_to(dest);

    first_success(
        "reference retrieval",
        vec![
            ("retrieval service", Box::new(move || primary.run())),
            (
                "network fetch",
                Box::new(move || fetch_over_network(accession, dest)),
            ),
        ],
    )
}

/// Secondary retrieval path: fetch the record body over HTTP and persist
/// it next to where the primary tier would have written it.
pub fn fetch_over_network(accession: &str, dest: &Path) -> ToolOutcome {
    let url = format!(
        "{}?db=nucleotide&id={}&rettype=fasta&retmode=text",
        EUTILS_FETCH_URL, accession
    );

    match try_fetch(&url, dest) {
        Ok(()) if exists_non_empty(dest) => ToolOutcome::success(Some(dest.to_path_buf())),
        Ok(()) => ToolOutcome::failure("network fetch returned an empty record"),
        Err(e) => ToolOutcome::failure(format!("network fetch failed: {}", e)),
    }
}

fn try_fetch(url: &str, dest: &Path) -> Result<()> {
    let response = reqwest::blocking::get(url)?;

    if !response.status().is_success() {
        anyhow::bail!("HTTP {}", response.status());
    }

    let body = response.text()?;
    persist_bytes(body.as_bytes(), dest)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(subject_id: &str, bitscore: f64) -> SearchHit {
        SearchHit {
            query_id: "q".to_string(),
            subject_id: subject_id.to_string(),
            percent_identity: 90.0,
            length: 100,
            mismatches: 1,
            gap_opens: 0,
            query_start: 1,
            query_end: 100,
            subject_start: 1,
            subject_end: 100,
            evalue: 1e-30,
            bitscore,
            subject_title: format!("{} title", subject_id),
        }
    }

    #[test]
    fn test_choose_accession_takes_global_best() {
        let hits = vec![
            hit("gi|1|ref|NC_001477.1|", 50.0),
            hit("gi|2|ref|NC_045512.2|", 90.0),
        ];

        assert_eq!(
            choose_accession(&hits, config::DEFAULT_REFERENCE_ACCESSION),
            "NC_045512.2"
        );
    }

    #[test]
    fn test_choose_accession_falls_back_when_empty() {
        assert_eq!(
            choose_accession(&[], config::DEFAULT_REFERENCE_ACCESSION),
            config::DEFAULT_REFERENCE_ACCESSION
        );
        assert_eq!(choose_accession(&[], "NC_001477.1"), "NC_001477.1");
    }

    #[test]
    fn test_choose_accession_is_deterministic_on_ties() {
        let hits = vec![hit("B_tied", 90.0), hit("A_tied", 90.0)];

        for _ in 0..10 {
            assert_eq!(choose_accession(&hits, "unused"), "A_tied");
        }
    }
}
