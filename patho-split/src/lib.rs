//! Core module for splitting a multi-record FASTA file into sequence units
//!
//! This module partitions the unknown sample into individually named
//! single-record files, one per sequence unit, numbered sequentially from
//! 1 and zero-padded. Every downstream stage fans out over these unit
//! files, so the split order fixes the unit identifiers for the whole
//! run. Plain files are scanned through a memory map for record-start
//! markers; compressed files go through a buffered line path. Re-running
//! the split rebuilds the split directory from scratch.

use std::fs::{create_dir_all, remove_dir_all, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::Result;
use config::{unit_id, ArgCheck, ArtifactTree};
use flate2::read::MultiGzDecoder;
use memchr::memchr_iter;
use memmap2::Mmap;

pub mod cli;
use cli::Args;

const FA_NEEDLE: u8 = b'>';

#[macro_export]
macro_rules! dispatch {
    ($file:expr, { $($suffix:literal => $action:expr),* $(,)? }) => {{
        let f = $file.file_name().and_then(|f| f.to_str()).unwrap_or_default();
        $(
            if f.ends_with($suffix) {
                $action
            } else
        )* {
            anyhow::bail!("ERROR: unrecognized file format: {}", $file.display());
        }
    }};
}

pub fn lib_patho_split(args: Vec<String>) -> Result<Vec<PathBuf>> {
    let args = cli::Args::from(args);
    args.check()?;

    let units = dispatch!(&args.fasta, {
        "fa.gz" => split_fa_gz(&args)?,
        "fasta.gz" => split_fa_gz(&args)?,
        "fna.gz" => split_fa_gz(&args)?,
        "fa" => split_fa(&args)?,
        "fasta" => split_fa(&args)?,
        "fna" => split_fa(&args)?,
    });

    Ok(units)
}

/// Split a plain FASTA file through a memory map. Record starts are the
/// `>` markers at line starts; each region between consecutive markers
/// becomes one unit file.
pub fn split_fa(args: &Args) -> Result<Vec<PathBuf>> {
    log::info!("INFO: splitting {:?} into sequence units", args.fasta);

    let file = File::open(&args.fasta)?;
    let mmap = unsafe { Mmap::map(&file)? };
    let data = mmap.as_ref();

    let headers: Vec<usize> = memchr_iter(FA_NEEDLE, data)
        .filter(|&pos| pos == 0 || data[pos - 1] == b'\n')
        .collect();

    if headers.is_empty() {
        log::warn!("no records found in {:?}", args.fasta);
    }

    let outdir = fresh_split_dir(args)?;

    let mut units = Vec::with_capacity(headers.len());
    for (i, start) in headers.iter().enumerate() {
        let end = headers.get(i + 1).copied().unwrap_or(data.len());
        let record = &data[*start..end];

        let path = outdir.join(format!("{}.fasta", unit_id(i + 1)));
        let mut writer = BufWriter::new(File::create(&path)?);
        writer.write_all(record)?;
        if !record.ends_with(b"\n") {
            writer.write_all(b"\n")?;
        }

        units.push(path);
    }

    Ok(units)
}

/// Split a gzip-compressed FASTA file through a buffered line path.
pub fn split_fa_gz(args: &Args) -> Result<Vec<PathBuf>> {
    log::info!("INFO: splitting {:?} into sequence units", args.fasta);

    let reader = BufReader::new(MultiGzDecoder::new(File::open(&args.fasta)?));
    let outdir = fresh_split_dir(args)?;

    let mut units: Vec<PathBuf> = Vec::new();
    let mut writer: Option<BufWriter<File>> = None;

    for line in reader.lines() {
        let line = line?;

        if line.starts_with('>') {
            let path = outdir.join(format!("{}.fasta", unit_id(units.len() + 1)));
            writer = Some(BufWriter::new(File::create(&path)?));
            units.push(path);
        }

        if let Some(w) = writer.as_mut() {
            writeln!(w, "{}", line)?;
        }
    }

    if units.is_empty() {
        log::warn!("no records found in {:?}", args.fasta);
    }

    Ok(units)
}

/// Rebuild the split directory so a re-split never leaves stale units.
fn fresh_split_dir(args: &Args) -> Result<PathBuf> {
    let outdir = ArtifactTree::new(&args.outdir).split_dir();

    if outdir.exists() {
        remove_dir_all(&outdir)?;
    }
    create_dir_all(&outdir)?;

    Ok(outdir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::fs;
    use std::io::Write;

    const SAMPLE: &str = ">seq1 sample\nACGTACGT\nACGT\n>seq2\nTTTT\n>seq3\nGGGG";

    fn args(fasta: PathBuf, outdir: PathBuf) -> Args {
        Args { fasta, outdir }
    }

    #[test]
    fn test_split_fa_one_file_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("sample.fasta");
        fs::write(&input, SAMPLE).unwrap();

        let units = split_fa(&args(input, dir.path().join("run"))).unwrap();

        assert_eq!(units.len(), 3);
        assert_eq!(
            units[0].file_name().unwrap().to_str().unwrap(),
            "unknown_01.fasta"
        );
        assert_eq!(
            units[2].file_name().unwrap().to_str().unwrap(),
            "unknown_03.fasta"
        );

        let first = fs::read_to_string(&units[0]).unwrap();
        assert_eq!(first, ">seq1 sample\nACGTACGT\nACGT\n");
        assert_eq!(first.matches('>').count(), 1);

        // last record had no trailing newline in the input
        assert_eq!(fs::read_to_string(&units[2]).unwrap(), ">seq3\nGGGG\n");
    }

    #[test]
    fn test_split_fa_gz_matches_plain_split() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("sample.fasta.gz");

        let mut encoder = GzEncoder::new(File::create(&input).unwrap(), Compression::default());
        encoder.write_all(SAMPLE.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let units = split_fa_gz(&args(input, dir.path().join("run"))).unwrap();

        assert_eq!(units.len(), 3);
        assert_eq!(fs::read_to_string(&units[1]).unwrap(), ">seq2\nTTTT\n");
    }

    #[test]
    fn test_split_fa_zero_records_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("empty.fasta");
        fs::write(&input, "no records here\n").unwrap();

        let units = split_fa(&args(input, dir.path().join("run"))).unwrap();
        assert!(units.is_empty());
    }

    #[test]
    fn test_resplit_drops_stale_units() {
        let dir = tempfile::tempdir().unwrap();
        let run = dir.path().join("run");

        let big = dir.path().join("big.fasta");
        fs::write(&big, SAMPLE).unwrap();
        let units = split_fa(&args(big, run.clone())).unwrap();
        assert_eq!(units.len(), 3);

        let small = dir.path().join("small.fasta");
        fs::write(&small, ">only\nACGT\n").unwrap();
        let units = split_fa(&args(small, run.clone())).unwrap();
        assert_eq!(units.len(), 1);

        let tree = ArtifactTree::new(&run);
        assert_eq!(tree.unit_ids(), vec!["unknown_01"]);
    }
}
