// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Resolve the frozen base model    (Layer 6 - infra)
//   Step 2: Load train / validation splits   (Layer 4 - data)
//   Step 3: Cap split sizes                  (Layer 4 - data)
//   Step 4: Tokenise to fixed length         (Layer 4 - data)
//   Step 5: Assemble encoder + adapter       (Layer 5 - ml)
//   Step 6: Save config                      (Layer 6 - infra)
//   Step 7: Run training loop                (Layer 5 - ml)
//   Step 8: Export the adapter               (Layer 6 - infra)
//   Step 9: Publish (optional)               (Layer 6 - infra)
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::{bail, Context, Result};
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::application::publish_use_case::PublishUseCase;
use crate::data::{
    dataset::NliDataset,
    loader::JsonlLoader,
    preprocessor::{Preprocessor, MIN_MAX_LENGTH},
    splitter::{split_train_val, take_subset},
};
use crate::domain::{example::NliLabel, split::SplitName, traits::ExampleSource};
use crate::infra::{
    base_model::BaseModel,
    checkpoint::{AdapterManifest, CheckpointManager},
};
use crate::ml::{
    backend::{CpuTrainBackend, DeviceKind, GpuTrainBackend},
    model::{assemble, ReftConfig},
    schedule::ScheduleKind,
    trainer::{run_training, EvalStrategy, OptimizerKind, TrainReport},
};

pub const CONFIG_FILE: &str = "train_config.json";

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run. Every field has a default,
// so a JSON config file only needs the fields it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Base model: local directory or Hugging Face Hub id
    pub model:                       String,
    pub data_dir:                    String,
    pub output_dir:                  String,
    pub eval_strategy:               EvalStrategy,
    pub learning_rate:               f64,
    pub per_device_train_batch_size: usize,
    pub per_device_eval_batch_size:  usize,
    pub num_train_epochs:            usize,
    pub weight_decay:                f64,
    pub optim:                       OptimizerKind,
    pub lr_scheduler_type:           ScheduleKind,
    pub warmup_ratio:                f64,
    pub max_length:                  usize,
    pub reft:                        ReftConfig,
    pub seed:                        u64,
    pub max_train_samples:           Option<usize>,
    pub max_eval_samples:            Option<usize>,
    /// Log the running training loss every N optimiser steps (0 = never)
    pub logging_steps:               usize,
    pub eval_split:                  SplitName,
    /// Carve validation out of the training split instead of loading `eval_split`
    pub validation_fraction:         Option<f64>,
    pub device:                      DeviceKind,
    /// Publish the final adapter to this `owner/name` repository
    pub push_to:                     Option<String>,
    pub dataset_tag:                 String,
    /// Publish into a local registry directory instead of the Hub
    pub registry_dir:                Option<String>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            model:                       "base-model".to_string(),
            data_dir:                    "data/multinli".to_string(),
            output_dir:                  "outputs/reft-mnli".to_string(),
            eval_strategy:               EvalStrategy::Epoch,
            learning_rate:               4e-3,
            per_device_train_batch_size: 32,
            per_device_eval_batch_size:  32,
            num_train_epochs:            2,
            weight_decay:                0.0,
            optim:                       OptimizerKind::AdamW,
            lr_scheduler_type:           ScheduleKind::Linear,
            warmup_ratio:                0.1,
            max_length:                  128,
            reft:                        ReftConfig::default(),
            seed:                        42,
            max_train_samples:           None,
            max_eval_samples:            None,
            logging_steps:               50,
            eval_split:                  SplitName::ValidationMatched,
            validation_fraction:         None,
            device:                      DeviceKind::Cpu,
            push_to:                     None,
            dataset_tag:                 "glue/mnli".to_string(),
            registry_dir:                None,
        }
    }
}

impl TrainConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read config '{}'", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("Malformed config '{}'", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_train_epochs == 0 {
            bail!("num_train_epochs must be at least 1");
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            bail!("learning_rate must be positive, got {}", self.learning_rate);
        }
        if self.per_device_train_batch_size == 0 || self.per_device_eval_batch_size == 0 {
            bail!("batch sizes must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.warmup_ratio) {
            bail!("warmup_ratio must be in [0, 1], got {}", self.warmup_ratio);
        }
        if self.weight_decay < 0.0 {
            bail!("weight_decay must be non-negative, got {}", self.weight_decay);
        }
        if self.max_length < MIN_MAX_LENGTH {
            bail!("max_length must be at least {MIN_MAX_LENGTH}, got {}", self.max_length);
        }
        if self.reft.positions > self.max_length {
            bail!(
                "reft.positions ({}) cannot exceed max_length ({})",
                self.reft.positions, self.max_length
            );
        }
        if let Some(f) = self.validation_fraction {
            if !(f > 0.0 && f < 1.0) {
                bail!("validation_fraction must be in (0, 1), got {f}");
            }
        }
        Ok(())
    }
}

/// What a finished run produced.
#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub report:     TrainReport,
    pub export_dir: PathBuf,
    /// Location of the published copy, when `push_to` was set
    pub published:  Option<String>,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<TrainOutcome> {
        self.config.validate()?;
        match self.config.device {
            DeviceKind::Cpu  => self.run::<CpuTrainBackend>(Default::default()),
            DeviceKind::Wgpu => self.run::<GpuTrainBackend>(Default::default()),
        }
    }

    fn run<B: AutodiffBackend>(&self, device: B::Device) -> Result<TrainOutcome> {
        let cfg = &self.config;
        B::seed(cfg.seed);
        tracing::info!("Training on {} ({:?})", cfg.device, device);

        // ── Step 1: Resolve the frozen base model ────────────────────────────
        let base = BaseModel::resolve(&cfg.model)?;
        cfg.reft.validate(&base.config)?;
        if cfg.max_length > base.config.max_position_embeddings {
            bail!(
                "max_length {} exceeds the encoder's {} positions",
                cfg.max_length, base.config.max_position_embeddings
            );
        }

        // ── Steps 2-3: Load and cap the splits ───────────────────────────────
        let loader = JsonlLoader::new(&cfg.data_dir);
        let train  = loader.load_split(SplitName::Train)?;
        let (train, valid) = match cfg.validation_fraction {
            Some(fraction) => split_train_val(train, 1.0 - fraction, cfg.seed),
            None => (train, loader.load_split(cfg.eval_split)?),
        };
        let train = take_subset(train, cfg.max_train_samples, cfg.seed);
        let valid = take_subset(valid, cfg.max_eval_samples, cfg.seed);
        tracing::info!("Split: {} train, {} validation", train.len(), valid.len());

        if valid.is_empty() && cfg.eval_strategy != EvalStrategy::No {
            bail!("validation split is empty; set eval_strategy to 'no' to train without it");
        }

        // ── Step 4: Tokenise ─────────────────────────────────────────────────
        let preprocessor  = Preprocessor::new(base.tokenizer()?, cfg.max_length)?;
        let train_dataset = NliDataset::new(preprocessor.process_all(&train)?);
        let valid_dataset = NliDataset::new(preprocessor.process_all(&valid)?);
        tracing::info!(
            "Train label histogram {:?} ({:?})",
            train_dataset.label_histogram(NliLabel::COUNT),
            NliLabel::names()
        );

        // ── Step 5: Assemble ─────────────────────────────────────────────────
        let encoder = base.load_encoder::<B>(&device)?;
        let adapter = cfg.reft.init_adapter::<B>(&base.config, &device);
        let model   = assemble(encoder, adapter)?;

        // ── Step 6: Save config ──────────────────────────────────────────────
        let output_dir = PathBuf::from(&cfg.output_dir);
        fs::create_dir_all(&output_dir)
            .with_context(|| format!("Cannot create '{}'", output_dir.display()))?;
        fs::write(output_dir.join(CONFIG_FILE), serde_json::to_string_pretty(cfg)?)
            .with_context(|| format!("Cannot write {CONFIG_FILE}"))?;

        // ── Step 7: Train ────────────────────────────────────────────────────
        let manifest = AdapterManifest {
            base_model: base.id.clone(),
            reft:       cfg.reft.clone(),
            max_length: cfg.max_length,
            labels:     NliLabel::names(),
            epochs:     0,
            accuracy:   None,
        };
        let (model, report) =
            run_training(cfg, model, train_dataset, valid_dataset, &manifest, &device)?;

        // ── Step 8: Export ───────────────────────────────────────────────────
        let export = CheckpointManager::new(output_dir.join("adapter"));
        let final_manifest = AdapterManifest {
            epochs:   cfg.num_train_epochs,
            accuracy: report.final_accuracy,
            ..manifest
        };
        export.save_adapter(&model.adapter, &final_manifest)?;
        tracing::info!("Adapter exported to '{}'", export.dir().display());

        // ── Step 9: Publish ──────────────────────────────────────────────────
        let published = match &cfg.push_to {
            Some(repo_id) => Some(
                PublishUseCase::new(
                    export.dir(),
                    repo_id.clone(),
                    cfg.dataset_tag.clone(),
                    cfg.registry_dir.as_ref().map(PathBuf::from),
                )
                .execute()?,
            ),
            None => None,
        };

        Ok(TrainOutcome { report, export_dir: export.dir().to_path_buf(), published })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::inferencer::Inferencer;
    use crate::test_support::{self, TestBackend};

    #[test]
    fn test_defaults_match_documented_values() {
        let cfg = TrainConfig::default();
        assert_eq!(cfg.num_train_epochs, 2);
        assert_eq!(cfg.learning_rate, 4e-3);
        assert_eq!(cfg.per_device_train_batch_size, 32);
        assert_eq!(cfg.optim, OptimizerKind::AdamW);
        assert_eq!(cfg.lr_scheduler_type, ScheduleKind::Linear);
        assert_eq!(cfg.eval_strategy, EvalStrategy::Epoch);
        assert_eq!(cfg.max_length, 128);
        assert_eq!(cfg.reft.rank, 1);
        assert!(cfg.reft.layers.is_empty());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_partial_json_config_keeps_defaults() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        fs::write(
            &path,
            r#"{"learning_rate": 0.01, "eval_strategy": "steps:100", "reft": {"rank": 4, "layers": [1]}}"#,
        )
        .unwrap();

        let cfg = TrainConfig::from_json_file(&path).unwrap();
        assert_eq!(cfg.learning_rate, 0.01);
        assert_eq!(cfg.eval_strategy, EvalStrategy::Steps(100));
        assert_eq!(cfg.reft.rank, 4);
        assert_eq!(cfg.reft.positions, 1);
        assert_eq!(cfg.num_train_epochs, 2);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = [
            TrainConfig { num_train_epochs: 0, ..TrainConfig::default() },
            TrainConfig { learning_rate: 0.0, ..TrainConfig::default() },
            TrainConfig { warmup_ratio: 1.5, ..TrainConfig::default() },
            TrainConfig { max_length: 4, ..TrainConfig::default() },
            TrainConfig { validation_fraction: Some(1.0), ..TrainConfig::default() },
        ];
        for cfg in bad {
            assert!(cfg.validate().is_err(), "{cfg:?}");
        }
    }

    #[test]
    fn test_end_to_end_run_exports_and_publishes_locally() {
        let base_dir = tempfile::tempdir().unwrap();
        let data_dir = tempfile::tempdir().unwrap();
        let out_dir  = tempfile::tempdir().unwrap();
        let registry = tempfile::tempdir().unwrap();
        test_support::base_model_dir::<TestBackend>(base_dir.path());
        test_support::write_splits(data_dir.path());

        let cfg = TrainConfig {
            model:                       base_dir.path().to_string_lossy().to_string(),
            data_dir:                    data_dir.path().to_string_lossy().to_string(),
            output_dir:                  out_dir.path().to_string_lossy().to_string(),
            num_train_epochs:            1,
            per_device_train_batch_size: 4,
            per_device_eval_batch_size:  4,
            max_length:                  32,
            logging_steps:               1,
            push_to:                     Some("me/reft-mnli".to_string()),
            registry_dir:                Some(registry.path().to_string_lossy().to_string()),
            ..TrainConfig::default()
        };

        let outcome = TrainUseCase::new(cfg).execute().unwrap();
        let accuracy = outcome.report.final_accuracy.unwrap();
        assert!((0.0..=1.0).contains(&accuracy));
        assert!(out_dir.path().join(CONFIG_FILE).exists());
        assert!(out_dir.path().join("checkpoint-epoch-1").join("adapter.mpk.gz").exists());

        let manifest = CheckpointManager::new(&outcome.export_dir).load_manifest().unwrap();
        assert_eq!(manifest.epochs, 1);
        assert_eq!(manifest.accuracy, Some(accuracy));
        assert!(registry.path().join("me/reft-mnli/README.md").exists());
        assert!(outcome.published.is_some());
    }

    #[test]
    fn test_validation_fraction_needs_no_validation_file() {
        let base_dir = tempfile::tempdir().unwrap();
        let data_dir = tempfile::tempdir().unwrap();
        let out_dir  = tempfile::tempdir().unwrap();
        test_support::base_model_dir::<TestBackend>(base_dir.path());
        test_support::write_splits(data_dir.path());
        fs::remove_file(data_dir.path().join("validation_matched.jsonl")).unwrap();

        let cfg = TrainConfig {
            model:               base_dir.path().to_string_lossy().to_string(),
            data_dir:            data_dir.path().to_string_lossy().to_string(),
            output_dir:          out_dir.path().to_string_lossy().to_string(),
            num_train_epochs:    1,
            max_length:          32,
            validation_fraction: Some(0.25),
            ..TrainConfig::default()
        };
        let outcome = TrainUseCase::new(cfg).execute().unwrap();
        assert_eq!(outcome.report.history.len(), 1);
    }

    #[test]
    fn test_relative_base_dir_is_recorded_absolutely_in_export() {
        let cwd      = std::env::current_dir().unwrap();
        let base_dir = tempfile::tempdir_in(&cwd).unwrap();
        let data_dir = tempfile::tempdir().unwrap();
        let out_dir  = tempfile::tempdir().unwrap();
        test_support::base_model_dir::<TestBackend>(base_dir.path());
        test_support::write_splits(data_dir.path());

        let relative = base_dir.path().strip_prefix(&cwd).unwrap().to_string_lossy().to_string();
        let cfg = TrainConfig {
            model:            relative,
            data_dir:         data_dir.path().to_string_lossy().to_string(),
            output_dir:       out_dir.path().to_string_lossy().to_string(),
            num_train_epochs: 1,
            max_length:       32,
            eval_strategy:    EvalStrategy::No,
            ..TrainConfig::default()
        };
        let outcome = TrainUseCase::new(cfg).execute().unwrap();

        let manifest = CheckpointManager::new(&outcome.export_dir).load_manifest().unwrap();
        assert!(Path::new(&manifest.base_model).is_absolute());
        assert_eq!(PathBuf::from(&manifest.base_model), fs::canonicalize(base_dir.path()).unwrap());

        let (_, reloaded) =
            Inferencer::<TestBackend>::from_adapter_dir(&outcome.export_dir, Default::default()).unwrap();
        assert_eq!(reloaded.base_model, manifest.base_model);
    }

    #[test]
    fn test_unknown_base_model_fails() {
        let out_dir = tempfile::tempdir().unwrap();
        let cfg = TrainConfig {
            model:      out_dir.path().join("missing").to_string_lossy().to_string(),
            output_dir: out_dir.path().to_string_lossy().to_string(),
            ..TrainConfig::default()
        };
        // An absolute path is never a valid hub repository id
        assert!(TrainUseCase::new(cfg).execute().is_err());
    }
}
