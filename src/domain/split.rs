// ============================================================
// Layer 3 — Dataset Split Names
// ============================================================
// MultiNLI ships five named splits. Training consumes `train`
// and one validation split; the rest are available to `eval`.
//
// Each split can live on disk under a canonical name
// (as exported from GLUE) or under the name used by the
// original MultiNLI 1.0 distribution.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitName {
    Train,
    ValidationMatched,
    ValidationMismatched,
    TestMatched,
    TestMismatched,
}

impl SplitName {
    pub const ALL: [SplitName; 5] = [
        SplitName::Train,
        SplitName::ValidationMatched,
        SplitName::ValidationMismatched,
        SplitName::TestMatched,
        SplitName::TestMismatched,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SplitName::Train                => "train",
            SplitName::ValidationMatched    => "validation_matched",
            SplitName::ValidationMismatched => "validation_mismatched",
            SplitName::TestMatched          => "test_matched",
            SplitName::TestMismatched       => "test_mismatched",
        }
    }

    /// File names searched for this split, in priority order.
    pub fn file_candidates(self) -> Vec<String> {
        let mut names = vec![format!("{}.jsonl", self.as_str())];
        let original = match self {
            SplitName::Train                => Some("multinli_1.0_train.jsonl"),
            SplitName::ValidationMatched    => Some("multinli_1.0_dev_matched.jsonl"),
            SplitName::ValidationMismatched => Some("multinli_1.0_dev_mismatched.jsonl"),
            SplitName::TestMatched          => Some("multinli_0.9_test_matched_unlabeled.jsonl"),
            SplitName::TestMismatched       => Some("multinli_0.9_test_mismatched_unlabeled.jsonl"),
        };
        names.extend(original.map(str::to_string));
        names
    }
}

impl fmt::Display for SplitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SplitName {
    type Err = String;

    /// Accepts both `validation_matched` and `validation-matched`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_");
        SplitName::ALL
            .into_iter()
            .find(|split| split.as_str() == wanted)
            .ok_or_else(|| format!(
                "unknown split '{s}' (expected one of: {})",
                SplitName::ALL.map(|s| s.as_str()).join(", ")
            ))
    }
}
