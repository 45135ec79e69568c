// ============================================================
// Layer 2 — Predict and Evaluate Use Cases
// ============================================================
// Both start from an exported adapter directory; the base
// encoder is re-resolved from the adapter manifest.
//
//   PredictUseCase — one (premise, hypothesis) pair → Prediction
//   EvalUseCase    — a labelled split → loss + accuracy

use anyhow::{bail, Result};
use burn::prelude::Backend;
use std::path::PathBuf;

use crate::data::{dataset::NliDataset, loader::JsonlLoader, splitter::take_subset};
use crate::domain::{
    split::SplitName,
    traits::{ExampleSource, LabelPredictor, Prediction},
};
use crate::ml::{
    backend::{CpuBackend, DeviceKind, GpuBackend},
    evaluator::{evaluate_dataset, EvalOutcome},
    inferencer::Inferencer,
};

pub struct PredictUseCase {
    adapter_dir: PathBuf,
    device:      DeviceKind,
}

impl PredictUseCase {
    pub fn new(adapter_dir: impl Into<PathBuf>, device: DeviceKind) -> Self {
        Self { adapter_dir: adapter_dir.into(), device }
    }

    pub fn predict(&self, premise: &str, hypothesis: &str) -> Result<Prediction> {
        match self.device {
            DeviceKind::Cpu  => self.run::<CpuBackend>(Default::default(), premise, hypothesis),
            DeviceKind::Wgpu => self.run::<GpuBackend>(Default::default(), premise, hypothesis),
        }
    }

    fn run<B: Backend>(&self, device: B::Device, premise: &str, hypothesis: &str) -> Result<Prediction> {
        let (inferencer, _) = Inferencer::<B>::from_adapter_dir(&self.adapter_dir, device)?;
        inferencer.predict(premise, hypothesis)
    }
}

pub struct EvalUseCase {
    pub adapter_dir: PathBuf,
    pub data_dir:    PathBuf,
    pub split:       SplitName,
    pub batch_size:  usize,
    pub max_samples: Option<usize>,
    pub seed:        u64,
    pub device:      DeviceKind,
}

impl EvalUseCase {
    pub fn execute(&self) -> Result<EvalOutcome> {
        match self.device {
            DeviceKind::Cpu  => self.run::<CpuBackend>(Default::default()),
            DeviceKind::Wgpu => self.run::<GpuBackend>(Default::default()),
        }
    }

    fn run<B: Backend>(&self, device: B::Device) -> Result<EvalOutcome> {
        let (inferencer, _) = Inferencer::<B>::from_adapter_dir(&self.adapter_dir, device.clone())?;

        let examples = JsonlLoader::new(&self.data_dir).load_split(self.split)?;
        let examples = take_subset(examples, self.max_samples, self.seed);
        if examples.is_empty() {
            bail!("split '{}' has no labelled examples", self.split);
        }

        let dataset = NliDataset::new(inferencer.preprocessor().process_all(&examples)?);
        let outcome = evaluate_dataset(inferencer.model(), dataset, self.batch_size, &device);
        tracing::info!(
            "{}: {} examples, loss={:.4}, accuracy={:.4}",
            self.split, outcome.count, outcome.loss, outcome.accuracy
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::example::NliLabel;
    use crate::test_support;

    #[test]
    fn test_predict_and_evaluate_from_export() {
        let data_dir = tempfile::tempdir().unwrap();
        let export   = test_support::exported_adapter();
        test_support::write_splits(data_dir.path());

        let prediction = PredictUseCase::new(export.adapter_dir(), DeviceKind::Cpu)
            .predict("A man is playing guitar.", "A man is making music.")
            .unwrap();
        assert!(NliLabel::ALL.contains(&prediction.label));

        let outcome = EvalUseCase {
            adapter_dir: export.adapter_dir(),
            data_dir:    data_dir.path().to_path_buf(),
            split:       SplitName::ValidationMatched,
            batch_size:  3,
            max_samples: None,
            seed:        0,
            device:      DeviceKind::Cpu,
        }
        .execute()
        .unwrap();
        assert!(outcome.count > 0);
        assert!((0.0..=1.0).contains(&outcome.accuracy));
    }

    #[test]
    fn test_missing_adapter_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(PredictUseCase::new(dir.path(), DeviceKind::Cpu).predict("a", "b").is_err());
    }
}
