use anyhow::Result;
use hashbrown::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use config::CDS_FEATURE;

/// Count coding-sequence features grouped by product name from the
/// annotation tool's tabular output [locus_tag, ftype, length_bp, gene,
/// EC_number, product]. Sorted by count descending, then product name.
pub fn cds_counts(path: &Path) -> Result<Vec<(String, usize)>> {
    let reader = BufReader::new(File::open(path)?);
    let mut counts: HashMap<String, usize> = HashMap::new();

    for line in reader.lines().skip(1) {
        let line = line?;
        let mut fields = line.split('\t');

        let _locus = fields.next();
        let ftype = fields.next().unwrap_or("");
        if ftype != CDS_FEATURE {
            continue;
        }

        // remaining fields: length_bp, gene, EC_number, product
        let product = match fields.nth(3) {
            Some(product) if !product.is_empty() => product,
            _ => "hypothetical protein",
        };
        *counts.entry(product.to_string()).or_insert(0) += 1;
    }

    let mut counts: Vec<(String, usize)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    Ok(counts)
}
