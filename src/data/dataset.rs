use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

/// One tokenised, fixed-length example.
/// `input_ids` and `attention_mask` always have the same length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NliSample {
    pub input_ids:      Vec<u32>,
    pub attention_mask: Vec<u32>,
    /// Label index (see `NliLabel::index`)
    pub label:          usize,
}

pub struct NliDataset {
    samples: Vec<NliSample>,
}

impl NliDataset {
    pub fn new(samples: Vec<NliSample>) -> Self { Self { samples } }

    pub fn sample_count(&self) -> usize { self.samples.len() }

    /// Per-class sample counts in label index order
    pub fn label_histogram(&self, num_labels: usize) -> Vec<usize> {
        let mut counts = vec![0usize; num_labels];
        for s in &self.samples {
            if let Some(c) = counts.get_mut(s.label) {
                *c += 1;
            }
        }
        counts
    }
}

impl Dataset<NliSample> for NliDataset {
    fn get(&self, index: usize) -> Option<NliSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
