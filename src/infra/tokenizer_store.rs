// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Builds, saves and loads the word-level tokenizer that ships
// with a locally initialised base model.
//
// The tokenizer is assembled as HuggingFace tokenizer JSON and
// parsed back, which keeps the on-disk format identical to the
// one pretrained models use:
//
//   normalizer     BertNormalizer (lowercase, clean text)
//   pre_tokenizer  Whitespace     (\w+ | [^\w\s]+)
//   model          WordLevel      contiguous ids, [UNK] fallback
//   post_processor [CLS] A [SEP] B [SEP]   (type ids 0 / 1)
//
// Special token ids are fixed:
//   [PAD]=0  [UNK]=1  [CLS]=2  [SEP]=3  [MASK]=4
//
// Reference: HuggingFace tokenizers — Tokenizer JSON format

use anyhow::{anyhow, bail, Context, Result};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    str::FromStr,
};
use tokenizers::{
    Normalizer, OffsetReferential, OffsetType, PreTokenizedString, PreTokenizer, Tokenizer,
};

pub const TOKENIZER_FILE: &str = "tokenizer.json";

pub const SPECIAL_TOKENS: [&str; 5] = ["[PAD]", "[UNK]", "[CLS]", "[SEP]", "[MASK]"];

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(TOKENIZER_FILE)
    }

    /// Load existing tokenizer or build a new one from texts
    pub fn load_or_build(&self, texts: &[String], vocab_size: usize) -> Result<Tokenizer> {
        if self.path().exists() {
            tracing::info!("Loading existing tokenizer from '{}'", self.path().display());
            self.load()
        } else {
            tracing::info!("Building new tokenizer (vocab_size={})", vocab_size);
            self.build_and_save(texts, vocab_size)
        }
    }

    pub fn load(&self) -> Result<Tokenizer> {
        let path = self.path();
        Tokenizer::from_file(&path)
            .map_err(|e| anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e))
    }

    pub fn build_and_save(&self, texts: &[String], vocab_size: usize) -> Result<Tokenizer> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        let tokenizer = build_word_level(texts, vocab_size)?;
        save(&tokenizer, &self.path())?;

        tracing::info!(
            "Tokenizer built with {} entries, saved to '{}'",
            tokenizer.get_vocab_size(true),
            self.path().display()
        );
        Ok(tokenizer)
    }
}

pub fn save(tokenizer: &Tokenizer, path: &Path) -> Result<()> {
    tokenizer
        .save(path, true)
        .map_err(|e| anyhow!("Cannot write tokenizer to '{}': {}", path.display(), e))
}

/// Build a word-level tokenizer over the `vocab_size - 5` most frequent
/// pieces of `texts` (ties broken alphabetically).
///
/// Pieces are counted with the tokenizer's own normalizer and
/// pre-tokenizer, so every vocabulary entry is reachable by `encode`.
pub fn build_word_level(texts: &[String], vocab_size: usize) -> Result<Tokenizer> {
    if vocab_size <= SPECIAL_TOKENS.len() {
        bail!(
            "vocab_size must exceed the {} special tokens, got {}",
            SPECIAL_TOKENS.len(),
            vocab_size
        );
    }

    let skeleton = parse(tokenizer_json(special_vocab()))?;
    let freq     = count_pieces(&skeleton, texts)?;

    let mut words: Vec<(String, usize)> = freq
        .into_iter()
        .filter(|(w, _)| !SPECIAL_TOKENS.contains(&w.as_str()))
        .collect();
    words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    words.truncate(vocab_size - SPECIAL_TOKENS.len());

    let mut vocab = special_vocab();
    for (offset, (word, _)) in words.iter().enumerate() {
        vocab.insert(word.clone(), serde_json::json!(SPECIAL_TOKENS.len() + offset));
    }

    parse(tokenizer_json(vocab))
}

/// Frequency of every normalised, pre-tokenised piece in `texts`.
fn count_pieces(tokenizer: &Tokenizer, texts: &[String]) -> Result<HashMap<String, usize>> {
    let normalizer = tokenizer
        .get_normalizer()
        .ok_or_else(|| anyhow!("generated tokenizer has no normalizer"))?;
    let pre_tokenizer = tokenizer
        .get_pre_tokenizer()
        .ok_or_else(|| anyhow!("generated tokenizer has no pre-tokenizer"))?;

    let mut freq: HashMap<String, usize> = HashMap::new();
    for text in texts {
        let mut pieces = PreTokenizedString::from(text.as_str());
        pieces
            .normalize(|n| normalizer.normalize(n))
            .map_err(|e| anyhow!("Cannot normalise '{text}': {e}"))?;
        pre_tokenizer
            .pre_tokenize(&mut pieces)
            .map_err(|e| anyhow!("Cannot pre-tokenise '{text}': {e}"))?;

        for (piece, _, _) in pieces.get_splits(OffsetReferential::Original, OffsetType::Byte) {
            *freq.entry(piece.to_string()).or_insert(0) += 1;
        }
    }
    Ok(freq)
}

fn special_vocab() -> serde_json::Map<String, serde_json::Value> {
    SPECIAL_TOKENS
        .iter()
        .enumerate()
        .map(|(id, token)| (token.to_string(), serde_json::json!(id)))
        .collect()
}

fn parse(json: serde_json::Value) -> Result<Tokenizer> {
    Tokenizer::from_str(&json.to_string())
        .map_err(|e| anyhow!("Cannot parse generated tokenizer: {e}"))
}

fn tokenizer_json(vocab: serde_json::Map<String, serde_json::Value>) -> serde_json::Value {
    let added_tokens: Vec<serde_json::Value> = SPECIAL_TOKENS
        .iter()
        .enumerate()
        .map(|(id, token)| {
            serde_json::json!({
                "id": id, "content": token, "single_word": false, "lstrip": false,
                "rstrip": false, "normalized": false, "special": true
            })
        })
        .collect();

    let special = |token: &str, type_id: u32| serde_json::json!({ "SpecialToken": { "id": token, "type_id": type_id } });
    let sequence = |id: &str, type_id: u32| serde_json::json!({ "Sequence": { "id": id, "type_id": type_id } });

    serde_json::json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": added_tokens,
        "normalizer": {
            "type": "BertNormalizer",
            "clean_text": true,
            "handle_chinese_chars": true,
            "strip_accents": null,
            "lowercase": true
        },
        "pre_tokenizer": { "type": "Whitespace" },
        "post_processor": {
            "type": "TemplateProcessing",
            "single": [special("[CLS]", 0), sequence("A", 0), special("[SEP]", 0)],
            "pair": [
                special("[CLS]", 0), sequence("A", 0), special("[SEP]", 0),
                sequence("B", 1), special("[SEP]", 1)
            ],
            "special_tokens": {
                "[CLS]": { "id": "[CLS]", "ids": [2], "tokens": ["[CLS]"] },
                "[SEP]": { "id": "[SEP]", "ids": [3], "tokens": ["[SEP]"] }
            }
        },
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": vocab,
            "unk_token": "[UNK]"
        }
    })
}
