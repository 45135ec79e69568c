// ============================================================
// Layer 2 — InitBaseUseCase
// ============================================================
// Produces a self-contained base model directory so the whole
// pipeline runs offline:
//
//   Step 1: Load the training split          (Layer 4 - data)
//   Step 2: Build / load tokenizer           (Layer 6 - infra)
//   Step 3: Initialise a random encoder      (Layer 5 - ml)
//   Step 4: Write config + weights           (Layer 6 - infra)
//
// The encoder is random, not pretrained; accuracy after ReFT
// training on it measures the adapter and head alone.

use anyhow::Result;
use burn::prelude::{Backend, Module};
use std::path::PathBuf;

use crate::data::loader::JsonlLoader;
use crate::domain::{split::SplitName, traits::ExampleSource};
use crate::infra::{base_model::BaseModel, tokenizer_store::TokenizerStore};
use crate::ml::{backend::CpuBackend, encoder::EncoderConfig};

#[derive(Debug, Clone)]
pub struct InitBaseConfig {
    pub data_dir:                PathBuf,
    pub output:                  PathBuf,
    pub vocab_size:              usize,
    pub max_position_embeddings: usize,
    pub d_model:                 usize,
    pub num_heads:               usize,
    pub num_layers:              usize,
    pub d_ff:                    usize,
    pub seed:                    u64,
}

pub struct InitBaseUseCase {
    config: InitBaseConfig,
}

impl InitBaseUseCase {
    pub fn new(config: InitBaseConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<BaseModel> {
        let cfg = &self.config;

        // ── Step 1: Corpus ────────────────────────────────────────────────────
        let examples = JsonlLoader::new(&cfg.data_dir).load_split(SplitName::Train)?;
        let texts: Vec<String> = examples
            .iter()
            .flat_map(|e| [e.premise.clone(), e.hypothesis.clone()])
            .collect();

        // ── Step 2: Tokenizer ─────────────────────────────────────────────────
        let tokenizer = TokenizerStore::new(&cfg.output).load_or_build(&texts, cfg.vocab_size)?;

        // ── Step 3: Encoder ───────────────────────────────────────────────────
        let encoder_cfg = EncoderConfig::new(
            tokenizer.get_vocab_size(true),
            cfg.max_position_embeddings,
            cfg.d_model,
            cfg.num_heads,
            cfg.num_layers,
            cfg.d_ff,
        );
        encoder_cfg.validate()?;

        CpuBackend::seed(cfg.seed);
        let device  = Default::default();
        let encoder = encoder_cfg.init::<CpuBackend>(&device);
        tracing::info!(
            "Encoder: {} layers, d_model={}, vocab={}, {} params",
            encoder_cfg.num_layers,
            encoder_cfg.d_model,
            encoder_cfg.vocab_size,
            encoder.num_params()
        );

        // ── Step 4: Save ──────────────────────────────────────────────────────
        BaseModel::save(&cfg.output, &encoder_cfg, &encoder, &tokenizer)?;
        BaseModel::open(&cfg.output.to_string_lossy(), &cfg.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    #[test]
    fn test_init_base_writes_a_loadable_model() {
        let data = tempfile::tempdir().unwrap();
        let out  = tempfile::tempdir().unwrap();
        test_support::write_splits(data.path());

        let base = InitBaseUseCase::new(InitBaseConfig {
            data_dir:                data.path().to_path_buf(),
            output:                  out.path().join("base"),
            vocab_size:              200,
            max_position_embeddings: 64,
            d_model:                 16,
            num_heads:               2,
            num_layers:              2,
            d_ff:                    32,
            seed:                    1,
        })
        .execute()
        .unwrap();

        let tokenizer = base.tokenizer().unwrap();
        assert_eq!(base.config.vocab_size, tokenizer.get_vocab_size(true));
        assert!(base.config.vocab_size <= 200);
        assert!(base.load_encoder::<CpuBackend>(&Default::default()).is_ok());
    }
}
