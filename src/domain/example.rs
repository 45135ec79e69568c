// ============================================================
// Layer 3 — NLI Example Domain Type
// ============================================================
// A natural-language-inference example asks whether a
// hypothesis follows from a premise:
//
//   Premise:    "A man is playing guitar."
//   Hypothesis: "A man is making music."
//   Label:      entailment
//
// The label set is closed to three classes. Indices follow
// the GLUE convention so datasets exported with integer
// labels load without remapping:
//
//   0 → entailment, 1 → neutral, 2 → contradiction
//
// Reference: Williams et al. (2018) MultiNLI
//            Rust Book §6 (Enums and Pattern Matching)

use serde::{Deserialize, Serialize};
use std::fmt;

/// The three NLI classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NliLabel {
    Entailment,
    Neutral,
    Contradiction,
}

impl NliLabel {
    /// Number of output classes of the classification head
    pub const COUNT: usize = 3;

    /// All labels in index order
    pub const ALL: [NliLabel; 3] = [
        NliLabel::Entailment,
        NliLabel::Neutral,
        NliLabel::Contradiction,
    ];

    pub fn index(self) -> usize {
        match self {
            NliLabel::Entailment    => 0,
            NliLabel::Neutral       => 1,
            NliLabel::Contradiction => 2,
        }
    }

    /// Inverse of [`NliLabel::index`]. Negative or unknown indices
    /// (GLUE marks unlabeled test rows with -1) yield `None`.
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(NliLabel::Entailment),
            1 => Some(NliLabel::Neutral),
            2 => Some(NliLabel::Contradiction),
            _ => None,
        }
    }

    /// Parse a label name. MultiNLI writes "-" when annotators
    /// did not reach a consensus, which also yields `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "entailment"    => Some(NliLabel::Entailment),
            "neutral"       => Some(NliLabel::Neutral),
            "contradiction" => Some(NliLabel::Contradiction),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            NliLabel::Entailment    => "entailment",
            NliLabel::Neutral       => "neutral",
            NliLabel::Contradiction => "contradiction",
        }
    }

    /// Label names in index order, as stored in adapter manifests
    pub fn names() -> Vec<String> {
        Self::ALL.iter().map(|l| l.name().to_string()).collect()
    }
}

impl fmt::Display for NliLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One labelled premise/hypothesis pair. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NliExample {
    pub premise:    String,
    pub hypothesis: String,
    pub label:      NliLabel,
}

impl NliExample {
    pub fn new(
        premise:    impl Into<String>,
        hypothesis: impl Into<String>,
        label:      NliLabel,
    ) -> Self {
        Self {
            premise:    premise.into(),
            hypothesis: hypothesis.into(),
            label,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_roundtrip_covers_all_labels() {
        for label in NliLabel::ALL {
            assert_eq!(NliLabel::from_index(label.index() as i64), Some(label));
        }
    }

    #[test]
    fn test_unlabeled_markers_are_rejected() {
        assert_eq!(NliLabel::from_index(-1), None);
        assert_eq!(NliLabel::from_index(3), None);
        assert_eq!(NliLabel::from_name("-"), None);
        assert_eq!(NliLabel::from_name(""), None);
    }

    #[test]
    fn test_name_parsing_ignores_case_and_padding() {
        assert_eq!(NliLabel::from_name(" Entailment "), Some(NliLabel::Entailment));
        assert_eq!(NliLabel::from_name("CONTRADICTION"), Some(NliLabel::Contradiction));
    }

    #[test]
    fn test_names_follow_index_order() {
        assert_eq!(NliLabel::names(), vec!["entailment", "neutral", "contradiction"]);
    }
}
