// Shared fixtures for unit tests: a tiny encoder, a toy tokenizer,
// base-model / adapter directories and MultiNLI-shaped JSONL files.

use burn::prelude::*;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tokenizers::Tokenizer;

use crate::domain::example::NliLabel;
use crate::infra::{
    base_model::BaseModel,
    checkpoint::{AdapterManifest, CheckpointManager},
    tokenizer_store::build_word_level,
};
use crate::ml::{encoder::EncoderConfig, model::ReftConfig};

pub type TestBackend         = burn::backend::NdArray;
pub type TestAutodiffBackend = burn::backend::Autodiff<TestBackend>;

pub const D_MODEL:    usize = 16;
pub const NUM_LAYERS: usize = 2;
pub const VOCAB_SIZE: usize = 64;

const CORPUS: [&str; 8] = [
    "A man is playing guitar.",
    "A man is making music.",
    "A woman is reading a book on the street.",
    "Nobody is playing an instrument.",
    "A dog runs in the park.",
    "An animal moves.",
    "A cat sleeps on the sofa.",
    "A cat runs.",
];

pub fn encoder_config() -> EncoderConfig {
    EncoderConfig::new(VOCAB_SIZE, 64, D_MODEL, 2, NUM_LAYERS, 32)
}

pub fn tokenizer() -> Tokenizer {
    let corpus: Vec<String> = CORPUS.iter().map(|s| s.to_string()).collect();
    build_word_level(&corpus, VOCAB_SIZE).unwrap()
}

/// Write a random tiny base model into `dir` and open it.
pub fn base_model_dir<B: Backend>(dir: &Path) -> BaseModel {
    let device  = Default::default();
    let config  = encoder_config();
    let encoder = config.init::<B>(&device);
    BaseModel::save(dir, &config, &encoder, &tokenizer()).unwrap();
    BaseModel::open(&dir.to_string_lossy(), dir).unwrap()
}

/// `train.jsonl` (12 labelled rows in MultiNLI layout plus one unlabeled)
/// and `validation_matched.jsonl` (6 rows in GLUE layout).
pub fn write_splits(dir: &Path) {
    let pairs = [
        ("A man is playing guitar.", "A man is making music.", NliLabel::Entailment),
        ("A man is playing guitar.", "Nobody is playing an instrument.", NliLabel::Contradiction),
        ("A woman is reading a book.", "A woman is on the street.", NliLabel::Neutral),
        ("A dog runs in the park.", "An animal moves.", NliLabel::Entailment),
        ("A cat sleeps on the sofa.", "A cat runs.", NliLabel::Contradiction),
        ("A cat sleeps.", "A cat is on the sofa.", NliLabel::Neutral),
    ];

    let mut train = String::new();
    for round in 0..2 {
        for (p, h, label) in &pairs {
            let row = serde_json::json!({
                "gold_label": label.name(), "sentence1": p, "sentence2": h, "pairID": round,
            });
            train.push_str(&format!("{row}\n"));
        }
    }
    train.push_str("{\"gold_label\": \"-\", \"sentence1\": \"A man.\", \"sentence2\": \"A cat.\"}\n");
    fs::write(dir.join("train.jsonl"), train).unwrap();

    let valid: String = pairs
        .iter()
        .enumerate()
        .map(|(idx, (p, h, label))| {
            let row = serde_json::json!({ "premise": p, "hypothesis": h, "label": label.index(), "idx": idx });
            format!("{row}\n")
        })
        .collect();
    fs::write(dir.join("validation_matched.jsonl"), valid).unwrap();
}

/// A base model plus an untrained adapter exported against it.
pub struct ExportedAdapter {
    pub base:   tempfile::TempDir,
    pub export: tempfile::TempDir,
}

impl ExportedAdapter {
    pub fn adapter_dir(&self) -> PathBuf {
        self.export.path().to_path_buf()
    }
}

pub fn exported_adapter() -> ExportedAdapter {
    let base   = tempfile::tempdir().unwrap();
    let export = tempfile::tempdir().unwrap();
    let device = Default::default();

    let model   = base_model_dir::<TestBackend>(base.path());
    let reft    = ReftConfig::default();
    let adapter = reft.init_adapter::<TestBackend>(&model.config, &device);
    let manifest = AdapterManifest {
        base_model: model.id,
        reft,
        max_length: 32,
        labels:     NliLabel::names(),
        epochs:     0,
        accuracy:   None,
    };
    CheckpointManager::new(export.path()).save_adapter(&adapter, &manifest).unwrap();

    ExportedAdapter { base, export }
}
