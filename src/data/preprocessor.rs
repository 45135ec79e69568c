// ============================================================
// Layer 4 — Text-Pair Preprocessor
// ============================================================
// Turns a raw (premise, hypothesis) pair into a fixed-length
// token id sequence plus attention mask.
//
// Steps:
//   1. Normalise each text: control characters and unicode
//      space variants become ' ', whitespace runs collapse,
//      edges are trimmed
//   2. Encode the pair with the tokenizer's own template
//      (e.g. [CLS] A [SEP] B [SEP] or <s> A </s></s> B </s>)
//   3. Truncate longest-first to `max_length`
//   4. Pad to exactly `max_length`
//
// The output length never depends on the input: every sample
// has `max_length` ids and `max_length` mask entries.
//
// Reference: HuggingFace tokenizers — truncation & padding

use anyhow::{anyhow, bail, Result};
use tokenizers::{
    PaddingParams, PaddingStrategy, Tokenizer, TruncationParams, TruncationStrategy,
};

use crate::data::dataset::NliSample;
use crate::domain::example::NliExample;

/// Anything shorter cannot hold the special tokens of a pair template
pub const MIN_MAX_LENGTH: usize = 8;

const PAD_CANDIDATES: [&str; 3] = ["<pad>", "[PAD]", "<|pad|>"];

pub struct Preprocessor {
    tokenizer:  Tokenizer,
    max_length: usize,
    pad_id:     u32,
}

impl Preprocessor {
    /// Configure `tokenizer` for fixed-length pair encoding.
    pub fn new(mut tokenizer: Tokenizer, max_length: usize) -> Result<Self> {
        if max_length < MIN_MAX_LENGTH {
            bail!("max_length must be at least {MIN_MAX_LENGTH}, got {max_length}");
        }

        let (pad_token, pad_id) = PAD_CANDIDATES
            .iter()
            .find_map(|t| tokenizer.token_to_id(t).map(|id| (t.to_string(), id)))
            .unwrap_or_else(|| {
                tracing::warn!("Tokenizer has no pad token; padding with id 0");
                ("[PAD]".to_string(), 0)
            });

        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                strategy: TruncationStrategy::LongestFirst,
                ..Default::default()
            }))
            .map_err(|e| anyhow!("Invalid truncation settings: {e}"))?;

        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::Fixed(max_length),
            pad_id,
            pad_token,
            ..Default::default()
        }));

        Ok(Self { tokenizer, max_length, pad_id })
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn pad_id(&self) -> u32 {
        self.pad_id
    }

    /// Encode a raw text pair. The label is left at 0; use
    /// [`Preprocessor::process`] for labelled examples.
    pub fn encode_pair(&self, premise: &str, hypothesis: &str) -> Result<NliSample> {
        let premise    = normalise(premise);
        let hypothesis = normalise(hypothesis);

        let encoding = self
            .tokenizer
            .encode((premise.as_str(), hypothesis.as_str()), true)
            .map_err(|e| anyhow!("Tokenisation failed: {e}"))?;

        let input_ids      = encoding.get_ids().to_vec();
        let attention_mask = encoding.get_attention_mask().to_vec();

        if input_ids.len() != self.max_length || attention_mask.len() != self.max_length {
            bail!(
                "Tokenizer produced {} ids / {} mask entries, expected {}",
                input_ids.len(),
                attention_mask.len(),
                self.max_length
            );
        }

        Ok(NliSample { input_ids, attention_mask, label: 0 })
    }

    pub fn process(&self, example: &NliExample) -> Result<NliSample> {
        let mut sample = self.encode_pair(&example.premise, &example.hypothesis)?;
        sample.label = example.label.index();
        Ok(sample)
    }

    pub fn process_all(&self, examples: &[NliExample]) -> Result<Vec<NliSample>> {
        let samples = examples
            .iter()
            .map(|e| self.process(e))
            .collect::<Result<Vec<_>>>()?;

        let full = samples
            .iter()
            .filter(|s| s.attention_mask.iter().all(|&m| m == 1))
            .count();
        tracing::debug!(
            "Tokenised {} examples ({} fill max_length={})",
            samples.len(),
            full,
            self.max_length
        );
        Ok(samples)
    }
}

/// Map control/odd whitespace characters to ' ', collapse runs, trim.
pub fn normalise(text: &str) -> String {
    let mut out        = String::with_capacity(text.len());
    let mut last_space = true;

    for c in text.chars() {
        let c = match c {
            '\u{00A0}' | '\u{200B}' | '\u{FEFF}' => ' ',
            c if c.is_control() || c.is_whitespace() => ' ',
            c => c,
        };
        if c == ' ' {
            if !last_space {
                out.push(' ');
            }
            last_space = true;
        } else {
            out.push(c);
            last_space = false;
        }
    }

    out.truncate(out.trim_end().len());
    out
}
