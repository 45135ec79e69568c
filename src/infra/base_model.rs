// ============================================================
// Layer 6 — Base Model Store
// ============================================================
// Resolves a model identifier to a directory holding a frozen
// base encoder:
//
//   <dir>/
//     encoder_config.json   ← EncoderConfig
//     model.mpk.gz          ← Encoder record (full precision)
//     tokenizer.json        ← HuggingFace tokenizer
//
// An identifier that names an existing local directory resolves
// to its canonical path; anything else is treated as a Hugging Face Hub model
// repository and fetched into the hf-hub cache.
//
// Reference: Burn Book §5 (Records)
//            hf-hub sync API (ApiBuilder, ApiRepo::get)

use anyhow::{bail, Context, Result};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tokenizers::Tokenizer;

use crate::infra::tokenizer_store::{self, TokenizerStore, TOKENIZER_FILE};
use crate::ml::encoder::{Encoder, EncoderConfig};

pub const ENCODER_CONFIG_FILE: &str = "encoder_config.json";
pub const WEIGHTS_STEM:        &str = "model";
pub const WEIGHTS_FILE:        &str = "model.mpk.gz";

type EncoderRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

#[derive(Debug, Clone)]
pub struct BaseModel {
    /// Recorded in adapter manifests: the canonical path of a local
    /// directory, or the Hub repository id verbatim
    pub id:     String,
    pub dir:    PathBuf,
    pub config: EncoderConfig,
}

impl BaseModel {
    pub fn resolve(id: &str) -> Result<Self> {
        let local = Path::new(id);
        if local.is_dir() {
            // manifests must name the base independently of the cwd
            let dir = fs::canonicalize(local)
                .with_context(|| format!("Cannot resolve '{}'", local.display()))?;
            return Self::open(&dir.to_string_lossy(), &dir);
        }
        if local.is_absolute() || id.starts_with('.') || id.matches('/').count() > 1 {
            bail!("Unknown base model '{id}': no such directory");
        }

        tracing::info!("'{}' is not a local directory, fetching from the Hugging Face Hub", id);
        let dir = fetch_from_hub(id).with_context(|| {
            format!("Unknown base model '{id}': no such directory and not fetchable from the hub")
        })?;
        Self::open(id, &dir)
    }

    pub fn open(id: &str, dir: &Path) -> Result<Self> {
        let path = dir.join(ENCODER_CONFIG_FILE);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read encoder config '{}'", path.display()))?;
        let config: EncoderConfig = serde_json::from_str(&json)
            .with_context(|| format!("Malformed encoder config '{}'", path.display()))?;
        config.validate()?;

        Ok(Self { id: id.to_string(), dir: dir.to_path_buf(), config })
    }

    pub fn tokenizer(&self) -> Result<Tokenizer> {
        let tokenizer = TokenizerStore::new(&self.dir).load()?;
        let size = tokenizer.get_vocab_size(true);
        if size > self.config.vocab_size {
            bail!(
                "tokenizer has {} entries but the encoder embeds only {}",
                size,
                self.config.vocab_size
            );
        }
        Ok(tokenizer)
    }

    /// Build the encoder and load its pretrained weights.
    pub fn load_encoder<B: Backend>(&self, device: &B::Device) -> Result<Encoder<B>> {
        let stem   = self.dir.join(WEIGHTS_STEM);
        let record = EncoderRecorder::new()
            .load(stem.clone(), device)
            .with_context(|| format!("Cannot load encoder weights '{}'", stem.display()))?;
        Ok(self.config.init::<B>(device).load_record(record))
    }

    /// Write a base model directory that `open` / `resolve` can read back.
    pub fn save<B: Backend>(
        dir:       &Path,
        config:    &EncoderConfig,
        encoder:   &Encoder<B>,
        tokenizer: &Tokenizer,
    ) -> Result<()> {
        fs::create_dir_all(dir).with_context(|| format!("Cannot create '{}'", dir.display()))?;

        let path = dir.join(ENCODER_CONFIG_FILE);
        fs::write(&path, serde_json::to_string_pretty(config)?)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;

        let stem = dir.join(WEIGHTS_STEM);
        EncoderRecorder::new()
            .record(encoder.clone().into_record(), stem.clone())
            .with_context(|| format!("Failed to save encoder to '{}'", stem.display()))?;

        tokenizer_store::save(tokenizer, &dir.join(TOKENIZER_FILE))?;
        tracing::info!("Base model written to '{}'", dir.display());
        Ok(())
    }
}

/// Hub token from `HF_TOKEN`, falling back to `~/.huggingface/token`.
pub fn resolve_token() -> Option<String> {
    if let Ok(token) = std::env::var("HF_TOKEN") {
        if !token.trim().is_empty() {
            return Some(token.trim().to_string());
        }
    }

    let path  = dirs::home_dir()?.join(".huggingface").join("token");
    let token = fs::read_to_string(path).ok()?;
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn fetch_from_hub(id: &str) -> Result<PathBuf> {
    let api = hf_hub::api::sync::ApiBuilder::new()
        .with_token(resolve_token())
        .build()
        .context("Failed to initialise the Hugging Face Hub client")?;
    let repo = api.model(id.to_string());

    let mut dir = None;
    for file in [ENCODER_CONFIG_FILE, WEIGHTS_FILE, TOKENIZER_FILE] {
        let path = repo
            .get(file)
            .with_context(|| format!("Cannot download '{file}' from '{id}'"))?;
        tracing::debug!("Fetched {} → '{}'", file, path.display());
        dir = path.parent().map(Path::to_path_buf);
    }
    dir.with_context(|| format!("Hub cache path for '{id}' has no parent directory"))
}
