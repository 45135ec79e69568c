// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer talks to the data, ml and infra
// layers through these traits:
//
//   ExampleSource     → JsonlLoader (data layer)
//   LabelPredictor    → Inferencer (ml layer)
//   AdapterPublisher  → LocalRegistry, HubPublisher (infra layer)
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use std::path::Path;

use crate::domain::example::{NliExample, NliLabel};
use crate::domain::split::SplitName;

// ─── ExampleSource ────────────────────────────────────────────────────────────
/// Anything that can produce the labelled examples of a named split.
pub trait ExampleSource {
    fn load_split(&self, split: SplitName) -> Result<Vec<NliExample>>;
}

// ─── LabelPredictor ───────────────────────────────────────────────────────────
/// Class probabilities for one premise/hypothesis pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label:         NliLabel,
    /// Softmax output in label index order; sums to 1
    pub probabilities: Vec<f32>,
}

impl Prediction {
    /// Probability assigned to the predicted label
    pub fn confidence(&self) -> f32 {
        self.probabilities
            .get(self.label.index())
            .copied()
            .unwrap_or(0.0)
    }
}

pub trait LabelPredictor {
    fn predict(&self, premise: &str, hypothesis: &str) -> Result<Prediction>;
}

// ─── AdapterPublisher ─────────────────────────────────────────────────────────
/// Metadata rendered into the model card of a published adapter.
#[derive(Debug, Clone)]
pub struct PublishRequest {
    /// Repository identifier in `owner/name` form
    pub repo_id:     String,
    /// Dataset the adapter was trained on, e.g. "glue/mnli"
    pub dataset_tag: String,
    pub base_model:  String,
    pub accuracy:    Option<f64>,
}

/// Destination for exported adapter weights.
/// Returns a human-readable location of the published copy.
pub trait AdapterPublisher {
    fn publish(&self, export_dir: &Path, request: &PublishRequest) -> Result<String>;
}
