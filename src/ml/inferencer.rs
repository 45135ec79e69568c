// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Single-pair prediction with a trained assembly:
//
//   (premise, hypothesis) → Preprocessor → NliBatcher (batch of 1)
//                         → ReftClassifier → softmax → argmax
//
// Burn's softmax subtracts the row maximum before exponentiating,
// so large logits never overflow.
//
// Runs on a non-autodiff backend, where dropout is the identity,
// so the same input always yields the same probabilities.

use anyhow::{anyhow, Result};
use burn::{data::dataloader::batcher::Batcher, prelude::*, tensor::activation::softmax};
use std::path::Path;

use crate::data::{batcher::NliBatcher, preprocessor::Preprocessor};
use crate::domain::{
    example::NliLabel,
    traits::{LabelPredictor, Prediction},
};
use crate::infra::{
    base_model::BaseModel,
    checkpoint::{AdapterManifest, CheckpointManager},
};
use crate::ml::model::{assemble, ReftClassifier};

pub struct Inferencer<B: Backend> {
    model:        ReftClassifier<B>,
    preprocessor: Preprocessor,
    batcher:      NliBatcher<B>,
}

impl<B: Backend> Inferencer<B> {
    pub fn new(model: ReftClassifier<B>, preprocessor: Preprocessor, device: B::Device) -> Self {
        Self { model, preprocessor, batcher: NliBatcher::new(device) }
    }

    /// Rebuild the assembly from an exported adapter directory: the base
    /// encoder named in the manifest plus the saved adapter weights.
    pub fn from_adapter_dir(dir: &Path, device: B::Device) -> Result<(Self, AdapterManifest)> {
        let ckpt     = CheckpointManager::new(dir);
        let manifest = ckpt.load_manifest()?;

        let base = BaseModel::resolve(&manifest.base_model)?;
        manifest.reft.validate(&base.config)?;

        let encoder = base.load_encoder::<B>(&device)?;
        let adapter = ckpt.load_adapter(manifest.reft.init_adapter(&base.config, &device), &device)?;
        let model   = assemble(encoder, adapter)?;

        let preprocessor = Preprocessor::new(base.tokenizer()?, manifest.max_length)?;
        tracing::info!("Adapter loaded from '{}' on base '{}'", dir.display(), base.id);

        Ok((Self::new(model, preprocessor, device), manifest))
    }

    pub fn model(&self) -> &ReftClassifier<B> {
        &self.model
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    /// Class probabilities in label index order.
    pub fn probabilities(&self, premise: &str, hypothesis: &str) -> Result<Tensor<B, 2>> {
        let sample = self.preprocessor.encode_pair(premise, hypothesis)?;
        let batch  = self.batcher.batch(vec![sample]);
        let logits = self.model.forward(batch.input_ids, batch.attention_mask);
        Ok(softmax(logits, 1))
    }
}

impl<B: Backend> LabelPredictor for Inferencer<B> {
    fn predict(&self, premise: &str, hypothesis: &str) -> Result<Prediction> {
        let probs = self.probabilities(premise, hypothesis)?;

        let index: i64 = probs.clone().argmax(1).into_scalar().elem::<i64>();
        let label = NliLabel::from_index(index)
            .ok_or_else(|| anyhow!("Model produced label index {index} outside the label set"))?;

        let probabilities: Vec<f32> = probs.into_data().iter::<f32>().collect();
        tracing::debug!("Predicted {} ({:?})", label, probabilities);

        Ok(Prediction { label, probabilities })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::checkpoint::AdapterManifest;
    use crate::ml::model::ReftConfig;
    use crate::test_support::{self, TestBackend};

    const PREMISE:    &str = "A man is playing guitar.";
    const HYPOTHESIS: &str = "A man is making music.";

    fn inferencer(base_dir: &Path) -> (Inferencer<TestBackend>, ReftConfig) {
        let device = Default::default();
        let base   = test_support::base_model_dir::<TestBackend>(base_dir);
        let reft   = ReftConfig::default();
        let model  = assemble(
            base.load_encoder::<TestBackend>(&device).unwrap(),
            reft.init_adapter(&base.config, &device),
        )
        .unwrap();
        let pre = Preprocessor::new(base.tokenizer().unwrap(), 32).unwrap();
        (Inferencer::new(model, pre, device), reft)
    }

    #[test]
    fn test_guitar_pair_gets_one_of_three_labels() {
        let dir       = tempfile::tempdir().unwrap();
        let (inf, _)  = inferencer(dir.path());
        let predicted = inf.predict(PREMISE, HYPOTHESIS).unwrap();

        assert!(NliLabel::ALL.contains(&predicted.label));
        assert_eq!(predicted.probabilities.len(), 3);
        let sum: f32 = predicted.probabilities.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        let max = predicted.probabilities.iter().cloned().fold(f32::MIN, f32::max);
        assert_eq!(predicted.confidence(), max);
    }

    #[test]
    fn test_prediction_is_deterministic() {
        let dir      = tempfile::tempdir().unwrap();
        let (inf, _) = inferencer(dir.path());
        let a = inf.predict(PREMISE, HYPOTHESIS).unwrap();
        let b = inf.predict(PREMISE, HYPOTHESIS).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_export_then_reload_reproduces_probabilities() {
        let base_dir   = tempfile::tempdir().unwrap();
        let export_dir = tempfile::tempdir().unwrap();
        let (inf, reft) = inferencer(base_dir.path());

        let manifest = AdapterManifest {
            base_model: base_dir.path().to_string_lossy().to_string(),
            reft,
            max_length: 32,
            labels:     NliLabel::names(),
            epochs:     0,
            accuracy:   None,
        };
        CheckpointManager::new(export_dir.path())
            .save_adapter(&inf.model().adapter, &manifest)
            .unwrap();

        let (reloaded, loaded_manifest) =
            Inferencer::<TestBackend>::from_adapter_dir(export_dir.path(), Default::default()).unwrap();
        assert_eq!(loaded_manifest, manifest);
        assert_eq!(
            inf.predict(PREMISE, HYPOTHESIS).unwrap(),
            reloaded.predict(PREMISE, HYPOTHESIS).unwrap()
        );
    }
}
