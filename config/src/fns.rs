//! Search-hit model and FASTA helpers shared across pipeline stages
//!
//! One [`SearchHit`] is a row of the 13-column tabular report the search
//! tool's exchange output converts into. Hits are ranked by descending
//! bitscore with ties broken by ascending subject id, then first-seen in
//! ascending unit order, so best-hit selection is deterministic for a
//! fixed aggregate set.

use anyhow::Result;
use flate2::read::MultiGzDecoder;
use std::fs::{create_dir_all, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::{exists_non_empty, ArtifactTree, SEARCH_FIELDS};

/// One row of ranked search output: query id, subject id, percent
/// identity, alignment length, mismatches, gap opens, query start/end,
/// subject start/end, e-value, bitscore, subject title.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub query_id: String,
    pub subject_id: String,
    pub percent_identity: f64,
    pub length: u64,
    pub mismatches: u64,
    pub gap_opens: u64,
    pub query_start: u64,
    pub query_end: u64,
    pub subject_start: u64,
    pub subject_end: u64,
    pub evalue: f64,
    pub bitscore: f64,
    pub subject_title: String,
}

impl SearchHit {
    pub fn new(line: &str) -> Result<SearchHit, &'static str> {
        if line.is_empty() {
            return Err("empty line");
        }

        let mut fields = line.splitn(SEARCH_FIELDS, '\t');
        let float = |field: &str| field.parse::<f64>().map_err(|_| "cannot parse float field");
        let int = |field: &str| field.parse::<u64>().map_err(|_| "cannot parse integer field");

        Ok(SearchHit {
            query_id: fields.next().ok_or("missing query id")?.to_string(),
            subject_id: fields.next().ok_or("missing subject id")?.to_string(),
            percent_identity: float(fields.next().ok_or("missing percent identity")?)?,
            length: int(fields.next().ok_or("missing alignment length")?)?,
            mismatches: int(fields.next().ok_or("missing mismatches")?)?,
            gap_opens: int(fields.next().ok_or("missing gap opens")?)?,
            query_start: int(fields.next().ok_or("missing query start")?)?,
            query_end: int(fields.next().ok_or("missing query end")?)?,
            subject_start: int(fields.next().ok_or("missing subject start")?)?,
            subject_end: int(fields.next().ok_or("missing subject end")?)?,
            evalue: float(fields.next().ok_or("missing evalue")?)?,
            bitscore: float(fields.next().ok_or("missing bitscore")?)?,
            subject_title: fields.next().unwrap_or("").trim().to_string(),
        })
    }

    /// bare accession out of a pipe-delimited NCBI subject id
    /// [`gi|…|ref|NC_045512.2|` -> `NC_045512.2`]; plain ids pass through
    pub fn accession(&self) -> &str {
        self.subject_id
            .trim_end_matches('|')
            .rsplit('|')
            .next()
            .unwrap_or(&self.subject_id)
    }

    pub fn to_row(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.query_id,
            self.subject_id,
            self.percent_identity,
            self.length,
            self.mismatches,
            self.gap_opens,
            self.query_start,
            self.query_end,
            self.subject_start,
            self.subject_end,
            self.evalue,
            self.bitscore,
            self.subject_title
        )
    }
}

/// Sort hits by descending bitscore; equal scores break by ascending
/// subject id. The sort is stable, so fully tied rows keep their
/// aggregation order.
pub fn rank_hits(hits: &mut [SearchHit]) {
    hits.sort_by(|a, b| {
        b.bitscore
            .partial_cmp(&a.bitscore)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.subject_id.cmp(&b.subject_id))
    });
}

/// The single best hit under the same ordering as [`rank_hits`];
/// `None` for an empty aggregate.
pub fn select_best_hit(hits: &[SearchHit]) -> Option<&SearchHit> {
    let mut best: Option<&SearchHit> = None;

    for hit in hits {
        match best {
            None => best = Some(hit),
            Some(current) => {
                if hit.bitscore > current.bitscore
                    || (hit.bitscore == current.bitscore && hit.subject_id < current.subject_id)
                {
                    best = Some(hit);
                }
            }
        }
    }

    best
}

/// Parse a tabular hit file; an absent or empty file yields zero hits.
pub fn read_hits(path: &Path) -> Result<Vec<SearchHit>> {
    let mut hits = Vec::new();

    if !exists_non_empty(path) {
        return Ok(hits);
    }

    for line in BufReader::new(File::open(path)?).lines() {
        let line = line?;
        match SearchHit::new(&line) {
            Ok(hit) => hits.push(hit),
            Err(e) => log::warn!("skipping malformed hit row in {:?}: {}", path, e),
        }
    }

    Ok(hits)
}

pub fn write_hits(hits: &[SearchHit], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    for hit in hits {
        writeln!(writer, "{}", hit.to_row())?;
    }

    Ok(())
}

/// Union of every unit's persisted top hits, ascending unit order.
pub fn collect_top_hits(tree: &ArtifactTree) -> Result<Vec<SearchHit>> {
    let mut all = Vec::new();

    for id in tree.unit_ids() {
        all.extend(read_hits(&tree.top_hits(&id))?);
    }

    Ok(all)
}

pub fn open_maybe_gz(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path)?;

    if path.extension().map_or(false, |e| e == "gz") {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// record count and mean record length of a FASTA file
pub fn fasta_stats(path: &Path) -> Result<(usize, f64)> {
    let reader = open_maybe_gz(path)?;
    let mut records = 0usize;
    let mut bases = 0u64;

    for line in reader.lines() {
        let line = line?;
        if line.starts_with('>') {
            records += 1;
        } else {
            bases += line.trim().len() as u64;
        }
    }

    let mean = if records == 0 {
        0.0
    } else {
        bases as f64 / records as f64
    };

    Ok((records, mean))
}

/// Concatenate `paths` in order into `dest`, returning the bytes written.
/// Inputs without a trailing newline get one so records never fuse.
pub fn concat_files(paths: &[PathBuf], dest: &Path) -> Result<u64> {
    let mut writer = BufWriter::new(File::create(dest)?);
    let mut total = 0u64;

    for path in paths {
        let data = std::fs::read(path)?;
        writer.write_all(&data)?;
        total += data.len() as u64;

        if !data.is_empty() && !data.ends_with(b"\n") {
            writer.write_all(b"\n")?;
        }
    }

    writer.flush()?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit_id;
    use std::fs;
    use std::io::Write;

    const ROW: &str = "unknown_01\tgi|1798174254|ref|NC_045512.2|\t99.5\t29903\t12\t3\t1\t29903\t1\t29903\t0.0\t54000\tSevere acute respiratory syndrome coronavirus 2, complete genome";

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
    fn test_search_hit_parses_thirteen_columns() {
        let hit = SearchHit::new(ROW).unwrap();

        assert_eq!(hit.query_id, "unknown_01");
        assert_eq!(hit.subject_id, "gi|1798174254|ref|NC_045512.2|");
        assert_eq!(hit.percent_identity, 99.5);
        assert_eq!(hit.length, 29903);
        assert_eq!(hit.bitscore, 54000.0);
        assert!(hit.subject_title.starts_with("Severe acute"));
    }

    #[test]
    fn test_search_hit_round_trips_through_row() {
        let hit = SearchHit::new(ROW).unwrap();
        let reparsed = SearchHit::new(&hit.to_row()).unwrap();

        assert_eq!(hit, reparsed);
    }

    #[test]
    fn test_search_hit_rejects_malformed_rows() {
        assert!(SearchHit::new("").is_err());
        assert!(SearchHit::new("only\ttwo").is_err());
        assert!(SearchHit::new("q\ts\tnot-a-number\t1\t0\t0\t1\t2\t1\t2\t0.0\t50\tt").is_err());
    }

    #[test]
    fn test_accession_normalization() {
        assert_eq!(SearchHit::new(ROW).unwrap().accession(), "NC_045512.2");
        assert_eq!(hit("NC_001477.1", 10.0).accession(), "NC_001477.1");
        assert_eq!(hit("ref|MN908947.3|", 10.0).accession(), "MN908947.3");
    }

    #[test]
    fn test_best_hit_is_deterministic() {
        let hits = vec![hit("B", 50.0), hit("A", 90.0), hit("C", 90.0)];

        for _ in 0..10 {
            let best = select_best_hit(&hits).unwrap();
            assert_eq!(best.subject_id, "A");
        }
    }

    #[test]
    fn test_best_hit_tie_breaks_by_subject_id() {
        let hits = vec![hit("Z", 90.0), hit("A", 90.0)];
        assert_eq!(select_best_hit(&hits).unwrap().subject_id, "A");

        let mut ranked = hits.clone();
        rank_hits(&mut ranked);
        assert_eq!(ranked[0].subject_id, "A");
        assert_eq!(ranked[1].subject_id, "Z");
    }

    #[test]
    fn test_best_hit_of_empty_aggregate_is_none() {
        assert!(select_best_hit(&[]).is_none());
    }

    #[test]
    fn test_read_hits_tolerates_absent_file() {
        let hits = read_hits(Path::new("/nonexistent/units/unknown_99.tsv")).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_collect_top_hits_ascending_unit_order() {
        let dir = tempfile::tempdir().unwrap();
        let tree = ArtifactTree::new(dir.path());
        fs::create_dir_all(tree.split_dir()).unwrap();

        for idx in [1usize, 2, 3] {
            fs::write(tree.unit_fasta(&unit_id(idx)), ">r\nACGT\n").unwrap();
        }

        write_hits(&[hit("Virus A", 50.0)], &tree.top_hits("unknown_01")).unwrap();
        write_hits(&[], &tree.top_hits("unknown_02")).unwrap();
        write_hits(&[hit("Virus B", 90.0)], &tree.top_hits("unknown_03")).unwrap();

        let all = collect_top_hits(&tree).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].subject_id, "Virus A");
        assert_eq!(all[1].subject_id, "Virus B");

        assert_eq!(select_best_hit(&all).unwrap().subject_id, "Virus B");
    }

    #[test]
    fn test_fasta_stats() {
        let mut file = tempfile::Builder::new()
            .suffix(".fasta")
            .tempfile()
            .unwrap();
        write!(file, ">r1\nACGT\nACGT\n>r2\nAC\n").unwrap();

        let (records, mean) = fasta_stats(file.path()).unwrap();
        assert_eq!(records, 2);
        assert_eq!(mean, 5.0);
    }

    #[test]
    fn test_concat_files_keeps_order_and_separates_records() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.fasta");
        let b = dir.path().join("b.fasta");
        let dest = dir.path().join("combined.fasta");

        fs::write(&a, ">r1\nAAAA").unwrap();
        fs::write(&b, ">r2\nCCCC\n").unwrap();

        let bytes = concat_files(&[a, b], &dest).unwrap();
        assert!(bytes > 0);
        assert_eq!(fs::read_to_string(&dest).unwrap(), ">r1\nAAAA\n>r2\nCCCC\n");
    }

    #[test]
    fn test_concat_files_of_nothing_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("combined.fasta");

        let bytes = concat_files(&[], &dest).unwrap();
        assert_eq!(bytes, 0);
    }
}
