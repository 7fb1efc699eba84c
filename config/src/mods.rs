//! Tool-invocation and artifact-tree primitives
//!
//! External tools only ever signal failure through their exit status and
//! the files they leave behind, so every invocation is wrapped into a
//! [`ToolCall`] that captures stdout/stderr, checks the expected artifact
//! and reports back an explicit [`ToolOutcome`]. The artifact tree is the
//! pipeline's only shared state: [`ArtifactTree`] replaces ad hoc path
//! construction with one typed accessor per artifact kind.

use dashmap::DashMap;
use serde_json::{json, Value};
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::NamedTempFile;

use crate::{
    ALIGNMENT_DIR, ALIGNMENT_FASTA, ANNOTATION_DIR, ANNOTATION_KINGDOM, ANNOTATION_TOOL,
    COMBINED_FASTA, REFERENCE_DIR, REFERENCE_FASTA, REPORT_DIR, REPORT_TXT, RUN_DESCRIPTOR,
    SEARCH_DIR, SPLIT_DIR, TREE_FILE, UNITS_DIR, UNIT_PREFIX,
};

/// Outcome of one external tool invocation: {succeeded, output, diagnostic}.
/// Callers check this explicitly instead of relying on unchecked process
/// status.
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub succeeded: bool,
    pub output: Option<PathBuf>,
    pub diagnostic: String,
}

impl ToolOutcome {
    pub fn success(output: Option<PathBuf>) -> Self {
        Self {
            succeeded: true,
            output,
            diagnostic: String::new(),
        }
    }

    pub fn failure(diagnostic: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            output: None,
            diagnostic: diagnostic.into(),
        }
    }

    pub fn as_value(&self) -> Value {
        json!({
            "succeeded": self.succeeded,
            "output": self.output.as_ref().map(|p| p.display().to_string()),
            "diagnostic": self.diagnostic,
        })
    }
}

/// One external tool invocation with captured stdio.
///
/// Success requires a zero exit status and, when an artifact is expected,
/// a non-empty file at that path; a tool that exits zero but leaves no
/// usable output is still a failed invocation. Tools that write to stdout
/// are captured through a temporary file persisted only on success, so a
/// failed or interrupted call never leaves a stray partial artifact.
#[derive(Debug, Clone)]
pub struct ToolCall {
    program: String,
    args: Vec<OsString>,
    stdout_to: Option<PathBuf>,
    expects: Option<PathBuf>,
}

impl ToolCall {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            stdout_to: None,
            expects: None,
        }
    }

    pub fn arg<S: AsRef<std::ffi::OsStr>>(mut self, arg: S) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// capture stdout into `path`; also the expected artifact unless
    /// `expects` names another one
    pub fn stdout_to<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.stdout_to = Some(path.into());
        self
    }

    pub fn expects<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.expects = Some(path.into());
        self
    }

    pub fn run(&self) -> ToolOutcome {
        let out = match Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .output()
        {
            Ok(out) => out,
            Err(e) => {
                return ToolOutcome::failure(format!("{}: failed to launch: {}", self.program, e))
            }
        };

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return ToolOutcome::failure(format!(
                "{} exited with {}: {}",
                self.program,
                out.status,
                stderr.trim()
            ));
        }

        if let Some(path) = &self.stdout_to {
            if let Err(e) = persist_bytes(&out.stdout, path) {
                return ToolOutcome::failure(format!(
                    "{}: could not persist stdout to {:?}: {}",
                    self.program, path, e
                ));
            }
        }

        let artifact = self.expects.clone().or_else(|| self.stdout_to.clone());
        match artifact {
            Some(path) if !exists_non_empty(&path) => ToolOutcome::failure(format!(
                "{}: expected output {:?} is missing or empty",
                self.program, path
            )),
            other => ToolOutcome::success(other),
        }
    }
}

/// Write `bytes` to `dest` through a sibling temp file, renamed into place
/// only once the write is complete.
pub fn persist_bytes(bytes: &[u8], dest: &Path) -> anyhow::Result<()> {
    let dir = dest.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.persist(dest)?;

    Ok(())
}

/// Ordered fallback chain: candidates are tried in order and the first
/// success short-circuits the rest. The uniform shape for the retrieval
/// and rendering fallbacks.
pub fn first_success<'a>(
    label: &str,
    candidates: Vec<(&'a str, Box<dyn Fn() -> ToolOutcome + 'a>)>,
) -> ToolOutcome {
    let mut last = ToolOutcome::failure(format!("{}: no candidates", label));

    for (name, candidate) in candidates {
        let outcome = candidate();
        if outcome.succeeded {
            return outcome;
        }
        log::warn!("{} [{}]: {}", label, name, outcome.diagnostic);
        last = outcome;
    }

    last
}

/// Canonical argv for the external annotation tool; shared between the
/// per-unit annotation sub-step and the reference-genome annotation.
pub fn annotation_call(fasta: &Path, outdir: &Path, prefix: &str, evalue: f64) -> ToolCall {
    ToolCall::new(ANNOTATION_TOOL)
        .arg("--kingdom")
        .arg(ANNOTATION_KINGDOM)
        .arg("--evalue")
        .arg(evalue.to_string())
        .arg("--outdir")
        .arg(outdir)
        .arg("--prefix")
        .arg(prefix)
        .arg("--cpus")
        .arg("1")
        .arg("--force")
        .arg(fasta)
        .expects(outdir.join(format!("{}.tsv", prefix)))
}

/// stage/unit outcome journal, written into the artifact tree for operator
/// inspection; never read back for control flow
pub type RunDescriptor = DashMap<String, Value>;

/// Merge `descriptor` over the journal already on disk and rewrite it.
pub fn write_descriptor(descriptor: &RunDescriptor, path: &Path) {
    let mut journal = std::fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str::<serde_json::Map<String, Value>>(&raw).ok())
        .unwrap_or_default();

    for entry in descriptor.iter() {
        journal.insert(entry.key().clone(), entry.value().clone());
    }

    match serde_json::to_string_pretty(&Value::Object(journal)) {
        Ok(body) => {
            if let Err(e) = std::fs::write(path, body) {
                log::warn!("could not write run descriptor {:?}: {}", path, e);
            }
        }
        Err(e) => log::warn!("could not serialize run descriptor: {}", e),
    }
}

/// stable unit identifier: 1-based index, zero-padded to two digits
pub fn unit_id(index: usize) -> String {
    format!("{}{:02}", UNIT_PREFIX, index)
}

/// numeric index back out of a unit identifier
pub fn unit_index(id: &str) -> Option<usize> {
    id.strip_prefix(UNIT_PREFIX)?.parse().ok()
}

pub fn exists_non_empty(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

/// Typed accessors over the per-run artifact tree. Artifact existence is
/// the only contract between stages: every reader checks before use.
#[derive(Debug, Clone)]
pub struct ArtifactTree {
    root: PathBuf,
}

impl ArtifactTree {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn split_dir(&self) -> PathBuf {
        self.root.join(SPLIT_DIR)
    }

    pub fn unit_fasta(&self, id: &str) -> PathBuf {
        self.split_dir().join(format!("{}.fasta", id))
    }

    /// unit identifiers present in the split directory, ascending by index
    pub fn unit_ids(&self) -> Vec<String> {
        let mut ids = Vec::new();

        let entries = match std::fs::read_dir(self.split_dir()) {
            Ok(entries) => entries,
            Err(_) => return ids,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().map_or(false, |e| e == "fasta") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    if stem.starts_with(UNIT_PREFIX) {
                        ids.push(stem.to_string());
                    }
                }
            }
        }

        ids.sort_by_key(|id| unit_index(id).unwrap_or(usize::MAX));
        ids
    }

    pub fn unit_dir(&self, id: &str) -> PathBuf {
        self.root.join(UNITS_DIR).join(id)
    }

    pub fn annotation_dir(&self, id: &str) -> PathBuf {
        self.unit_dir(id).join(ANNOTATION_DIR)
    }

    pub fn annotation_table(&self, id: &str) -> PathBuf {
        self.annotation_dir(id).join(format!("{}.tsv", id))
    }

    pub fn search_dir(&self, id: &str) -> PathBuf {
        self.unit_dir(id).join(SEARCH_DIR)
    }

    pub fn search_archive(&self, id: &str) -> PathBuf {
        self.search_dir(id).join(format!("{}.asn", id))
    }

    pub fn search_table(&self, id: &str) -> PathBuf {
        self.search_dir(id).join(format!("{}.tsv", id))
    }

    pub fn top_hits(&self, id: &str) -> PathBuf {
        self.search_dir(id).join(format!("{}.tophits.tsv", id))
    }

    pub fn combined_fasta(&self) -> PathBuf {
        self.root.join(COMBINED_FASTA)
    }

    pub fn alignment_dir(&self) -> PathBuf {
        self.root.join(ALIGNMENT_DIR)
    }

    pub fn alignment_fasta(&self) -> PathBuf {
        self.alignment_dir().join(ALIGNMENT_FASTA)
    }

    pub fn tree_file(&self) -> PathBuf {
        self.alignment_dir().join(TREE_FILE)
    }

    pub fn reference_dir(&self) -> PathBuf {
        self.root.join(REFERENCE_DIR)
    }

    pub fn reference_fasta(&self) -> PathBuf {
        self.reference_dir().join(REFERENCE_FASTA)
    }

    pub fn reference_annotation_dir(&self) -> PathBuf {
        self.reference_dir().join(ANNOTATION_DIR)
    }

    pub fn reference_annotation_table(&self) -> PathBuf {
        self.reference_annotation_dir()
            .join(format!("{}.tsv", crate::REFERENCE_PREFIX))
    }

    pub fn report_dir(&self) -> PathBuf {
        self.root.join(REPORT_DIR)
    }

    pub fn report_txt(&self) -> PathBuf {
        self.report_dir().join(REPORT_TXT)
    }

    pub fn report_doc(&self, ext: &str) -> PathBuf {
        self.report_dir().join(format!("report.{}", ext))
    }

    pub fn descriptor(&self) -> PathBuf {
        self.root.join(RUN_DESCRIPTOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_unit_id_padding() {
        assert_eq!(unit_id(1), "unknown_01");
        assert_eq!(unit_id(42), "unknown_42");
        assert_eq!(unit_id(100), "unknown_100");

        assert_eq!(unit_index("unknown_07"), Some(7));
        assert_eq!(unit_index("unknown_100"), Some(100));
        assert_eq!(unit_index("reference"), None);
    }

    #[test]
    fn test_unit_ids_ascending_order() {
        let dir = tempfile::tempdir().unwrap();
        let tree = ArtifactTree::new(dir.path());
        fs::create_dir_all(tree.split_dir()).unwrap();

        for idx in [3usize, 1, 10, 2] {
            fs::write(tree.unit_fasta(&unit_id(idx)), ">r\nACGT\n").unwrap();
        }
        fs::write(tree.split_dir().join("notes.txt"), "ignored").unwrap();

        assert_eq!(
            tree.unit_ids(),
            vec!["unknown_01", "unknown_02", "unknown_03", "unknown_10"]
        );
    }

    #[test]
    fn test_tool_call_captures_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("captured.txt");

        let outcome = ToolCall::new("sh")
            .arg("-c")
            .arg("printf 'hello'")
            .stdout_to(&dest)
            .run();

        assert!(outcome.succeeded);
        assert_eq!(outcome.output, Some(dest.clone()));
        assert_eq!(fs::read_to_string(&dest).unwrap(), "hello");
    }

    #[test]
    fn test_tool_call_nonzero_exit_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("never.txt");

        let outcome = ToolCall::new("sh")
            .arg("-c")
            .arg("echo doomed >&2; exit 3")
            .stdout_to(&dest)
            .run();

        assert!(!outcome.succeeded);
        assert!(outcome.diagnostic.contains("doomed"));
        assert!(!dest.exists());
    }

    #[test]
    fn test_tool_call_missing_program_is_failure() {
        let outcome = ToolCall::new("definitely-not-a-real-tool").run();

        assert!(!outcome.succeeded);
        assert!(outcome.diagnostic.contains("failed to launch"));
    }

    #[test]
    fn test_tool_call_empty_expected_output_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("empty.txt");

        let outcome = ToolCall::new("sh")
            .arg("-c")
            .arg("true")
            .stdout_to(&dest)
            .run();

        assert!(!outcome.succeeded);
        assert!(outcome.diagnostic.contains("missing or empty"));
    }

    #[test]
    fn test_first_success_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.txt");

        let primary = ToolCall::new("sh").arg("-c").arg("exit 1");
        let secondary = ToolCall::new("sh")
            .arg("-c")
            .arg("printf 'fallback'")
            .stdout_to(&dest);
        let tertiary = ToolCall::new("sh").arg("-c").arg("exit 1");

        let outcome = first_success(
            "test chain",
            vec![
                ("primary", Box::new(move || primary.run())),
                ("secondary", Box::new(move || secondary.run())),
                ("tertiary", Box::new(move || tertiary.run())),
            ],
        );

        assert!(outcome.succeeded);
        assert_eq!(fs::read_to_string(&dest).unwrap(), "fallback");
    }

    #[test]
    fn test_write_descriptor_merges_existing_journal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(RUN_DESCRIPTOR);

        let first = RunDescriptor::new();
        first.insert("alignment".to_string(), json!({"succeeded": false}));
        write_descriptor(&first, &path);

        let second = RunDescriptor::new();
        second.insert("tree".to_string(), json!({"succeeded": true}));
        write_descriptor(&second, &path);

        let journal: serde_json::Map<String, Value> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(journal.contains_key("alignment"));
        assert!(journal.contains_key("tree"));
    }
}
