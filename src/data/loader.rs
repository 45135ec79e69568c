// ============================================================
// Layer 4 — Dataset Loader
// ============================================================
// Reads MultiNLI splits stored as JSON Lines, one example per
// line. Two field layouts are accepted:
//
//   MultiNLI 1.0 distribution:
//     {"gold_label": "neutral", "sentence1": "...", "sentence2": "..."}
//
//   GLUE export:
//     {"premise": "...", "hypothesis": "...", "label": 1, "idx": 0}
//
// Rows without a gold label ("-" in MultiNLI, -1 in GLUE test
// splits) are skipped and counted.
//
// Reference: serde_json documentation
//            Rust Book §9 (Error Handling)

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use crate::domain::example::{NliExample, NliLabel};
use crate::domain::split::SplitName;
use crate::domain::traits::ExampleSource;

/// The shape of one JSONL row before validation.
/// Extra fields (pairID, genre, annotator_labels, idx ...) are ignored.
#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(alias = "sentence1")]
    premise:    String,
    #[serde(alias = "sentence2")]
    hypothesis: String,
    #[serde(default, alias = "gold_label")]
    label:      Option<RawLabel>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawLabel {
    Index(i64),
    Name(String),
}

impl RawLabel {
    fn resolve(&self) -> Option<NliLabel> {
        match self {
            RawLabel::Index(i) => NliLabel::from_index(*i),
            RawLabel::Name(n)  => NliLabel::from_name(n),
        }
    }
}

/// Loads split files from a single data directory.
pub struct JsonlLoader {
    dir: PathBuf,
}

impl JsonlLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// First existing file among the split's candidate names.
    pub fn split_path(&self, split: SplitName) -> Result<PathBuf> {
        let candidates = split.file_candidates();
        for name in &candidates {
            let path = self.dir.join(name);
            if path.is_file() {
                return Ok(path);
            }
        }
        bail!(
            "No file for split '{}' in '{}' (looked for: {})",
            split,
            self.dir.display(),
            candidates.join(", ")
        )
    }
}

impl ExampleSource for JsonlLoader {
    fn load_split(&self, split: SplitName) -> Result<Vec<NliExample>> {
        let path = self.split_path(split)?;
        let (examples, skipped) = read_jsonl(&path)?;

        if skipped > 0 {
            tracing::info!(
                "Skipped {} rows without a gold label in '{}'",
                skipped,
                path.display()
            );
        }
        tracing::info!("Loaded {} examples for split '{}'", examples.len(), split);
        Ok(examples)
    }
}

/// Parse a JSONL file into examples.
/// Returns the examples and the number of unlabeled rows skipped.
pub fn read_jsonl(path: &Path) -> Result<(Vec<NliExample>, usize)> {
    let file = File::open(path)
        .with_context(|| format!("Cannot open '{}'", path.display()))?;

    let mut examples = Vec::new();
    let mut skipped  = 0usize;

    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }

        let row: RawRow = serde_json::from_str(&line).with_context(|| {
            format!("Malformed example at {}:{}", path.display(), line_no + 1)
        })?;

        match row.label.as_ref().and_then(RawLabel::resolve) {
            Some(label) => examples.push(NliExample::new(row.premise, row.hypothesis, label)),
            None        => skipped += 1,
        }
    }

    Ok((examples, skipped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn test_reads_multinli_layout_and_skips_no_consensus() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "multinli_1.0_train.jsonl", concat!(
            r#"{"gold_label": "neutral", "sentence1": "A dog runs.", "sentence2": "A dog is fast.", "genre": "fiction"}"#, "\n",
            r#"{"gold_label": "-", "sentence1": "It rains.", "sentence2": "It is wet."}"#, "\n",
            "\n",
            r#"{"gold_label": "contradiction", "sentence1": "A cat sleeps.", "sentence2": "A cat runs."}"#, "\n",
        ));

        let examples = JsonlLoader::new(dir.path()).load_split(SplitName::Train).unwrap();
        assert_eq!(examples.len(), 2);
        assert_eq!(examples[0].label, NliLabel::Neutral);
        assert_eq!(examples[1].premise, "A cat sleeps.");
    }

    #[test]
    fn test_reads_glue_layout_with_integer_labels() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "validation_matched.jsonl", concat!(
            r#"{"premise": "P1", "hypothesis": "H1", "label": 0, "idx": 0}"#, "\n",
            r#"{"premise": "P2", "hypothesis": "H2", "label": -1, "idx": 1}"#, "\n",
        ));

        let (examples, skipped) = read_jsonl(&dir.path().join("validation_matched.jsonl")).unwrap();
        assert_eq!(examples, vec![NliExample::new("P1", "H1", NliLabel::Entailment)]);
        assert_eq!(skipped, 1);
    }

    #[test]
    fn test_canonical_file_wins_over_distribution_name() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "train.jsonl", "");
        write(dir.path(), "multinli_1.0_train.jsonl", "");

        let path = JsonlLoader::new(dir.path()).split_path(SplitName::Train).unwrap();
        assert!(path.ends_with("train.jsonl"));
        assert!(!path.ends_with("multinli_1.0_train.jsonl"));
    }

    #[test]
    fn test_non_string_fields_are_rejected_with_location() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "train.jsonl", r#"{"premise": 42, "hypothesis": "H", "label": 1}"#);

        let err = JsonlLoader::new(dir.path()).load_split(SplitName::Train).unwrap_err();
        assert!(format!("{err:#}").contains("train.jsonl:1"));
    }

    #[test]
    fn test_missing_split_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = JsonlLoader::new(dir.path())
            .load_split(SplitName::TestMismatched)
            .unwrap_err();
        assert!(err.to_string().contains("test_mismatched"));
    }
}
