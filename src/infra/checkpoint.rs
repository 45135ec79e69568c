// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores the trainable adapter only. The frozen
// encoder is never written here; it is rebuilt from the base
// model named in the manifest.
//
// Layout of an adapter directory:
//
//   <dir>/
//     adapter.mpk.gz        ← ReftAdapter record (full precision)
//     adapter_config.json   ← AdapterManifest
//
// Training writes one such directory per epoch
// (checkpoint-epoch-N) and a final one (adapter).
//
// NamedMpkGzFileRecorder appends ".mpk.gz" itself, so the
// weight path is passed as a stem.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::ml::model::{ReftAdapter, ReftConfig};

pub const ADAPTER_STEM:  &str = "adapter";
pub const MANIFEST_FILE: &str = "adapter_config.json";

/// Everything needed to rebuild an assembly around saved adapter weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterManifest {
    /// Identifier the base encoder was resolved from (local dir or hub id)
    pub base_model: String,
    pub reft:       ReftConfig,
    pub max_length: usize,
    /// Label names in logit order
    pub labels:     Vec<String>,
    /// Epochs trained when this adapter was written
    pub epochs:     usize,
    pub accuracy:   Option<f64>,
}

type AdapterRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Manager for the per-epoch checkpoint under `root`.
    pub fn for_epoch(root: &Path, epoch: usize) -> Self {
        Self::new(root.join(format!("checkpoint-epoch-{epoch}")))
    }

    pub fn weights_path(&self) -> PathBuf {
        self.dir.join(format!("{ADAPTER_STEM}.mpk.gz"))
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    pub fn exists(&self) -> bool {
        self.weights_path().exists() && self.manifest_path().exists()
    }

    pub fn save_adapter<B: Backend>(
        &self,
        adapter:  &ReftAdapter<B>,
        manifest: &AdapterManifest,
    ) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create adapter dir '{}'", self.dir.display()))?;

        let stem = self.dir.join(ADAPTER_STEM);
        AdapterRecorder::new()
            .record(adapter.clone().into_record(), stem.clone())
            .with_context(|| format!("Failed to save adapter to '{}'", stem.display()))?;

        let json = serde_json::to_string_pretty(manifest)?;
        fs::write(self.manifest_path(), json)
            .with_context(|| format!("Cannot write '{}'", self.manifest_path().display()))?;

        tracing::debug!("Saved adapter to '{}'", self.dir.display());
        Ok(())
    }

    pub fn load_manifest(&self) -> Result<AdapterManifest> {
        let path = self.manifest_path();
        let json = fs::read_to_string(&path).with_context(|| {
            format!("Cannot read '{}'. Has this adapter been exported?", path.display())
        })?;
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed adapter manifest '{}'", path.display()))
    }

    /// Load saved weights into a freshly initialised adapter of the same shape.
    pub fn load_adapter<B: Backend>(
        &self,
        adapter: ReftAdapter<B>,
        device:  &B::Device,
    ) -> Result<ReftAdapter<B>> {
        let stem   = self.dir.join(ADAPTER_STEM);
        let record = AdapterRecorder::new()
            .load(stem.clone(), device)
            .with_context(|| format!("Cannot load adapter weights '{}'", stem.display()))?;
        Ok(adapter.load_record(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::example::NliLabel;
    use crate::test_support::{self, TestBackend};

    fn manifest() -> AdapterManifest {
        AdapterManifest {
            base_model: "local/base".to_string(),
            reft:       ReftConfig::default(),
            max_length: 32,
            labels:     NliLabel::names(),
            epochs:     1,
            accuracy:   Some(0.5),
        }
    }

    #[test]
    fn test_round_trip_restores_weights() {
        let dir     = tempfile::tempdir().unwrap();
        let device  = Default::default();
        let enc_cfg = test_support::encoder_config();
        let reft    = ReftConfig::default();

        let saved = reft.init_adapter::<TestBackend>(&enc_cfg, &device);
        let ckpt  = CheckpointManager::new(dir.path().join("adapter"));
        ckpt.save_adapter(&saved, &manifest()).unwrap();
        assert!(ckpt.exists());
        assert_eq!(ckpt.load_manifest().unwrap(), manifest());

        let fresh    = reft.init_adapter::<TestBackend>(&enc_cfg, &device);
        let restored = ckpt.load_adapter(fresh, &device).unwrap();

        let a: Vec<f32> = saved.head.linear.weight.val().into_data().iter::<f32>().collect();
        let b: Vec<f32> = restored.head.linear.weight.val().into_data().iter::<f32>().collect();
        assert_eq!(a, b);
        let a: Vec<f32> = saved.interventions[0].rotate.val().into_data().iter::<f32>().collect();
        let b: Vec<f32> = restored.interventions[0].rotate.val().into_data().iter::<f32>().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_missing_manifest_is_an_error() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path());
        assert!(!ckpt.exists());
        assert!(ckpt.load_manifest().is_err());
    }

    #[test]
    fn test_epoch_dir_name() {
        let ckpt = CheckpointManager::for_epoch(Path::new("out"), 2);
        assert_eq!(ckpt.dir(), Path::new("out/checkpoint-epoch-2"));
    }
}
