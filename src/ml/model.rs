// ============================================================
// Layer 5 — ReFT Classifier Assembly
// ============================================================
// Frozen base encoder + trainable adapter:
//
//   input_ids ─► Encoder block 0 ─► [LoReFT?] ─► block 1 ─► ... ─► h
//                                                                 │
//                                    first-token representation ◄─┘
//                                                 │
//                                     ClassificationHead ─► logits [batch, 3]
//
// `assemble` marks every encoder parameter as not requiring
// gradients, so the optimiser only ever sees adapter gradients.
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)

use anyhow::{bail, Result};
use burn::{
    nn::{loss::CrossEntropyLossConfig, Dropout, DropoutConfig, Linear, LinearConfig},
    prelude::*,
    train::ClassificationOutput,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::example::NliLabel;
use crate::ml::encoder::{Encoder, EncoderConfig};
use crate::ml::intervention::{LoreftConfig, LoreftIntervention};

// ─── Adapter hyperparameters ─────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReftConfig {
    /// Dimension of the low-rank subspace
    pub rank:       usize,
    /// Encoder layers receiving an intervention; empty = every layer
    pub layers:     Vec<usize>,
    /// Number of leading token positions edited in each layer
    pub positions:  usize,
    pub dropout:    f64,
    pub num_labels: usize,
}

impl Default for ReftConfig {
    fn default() -> Self {
        Self {
            rank:       1,
            layers:     Vec::new(),
            positions:  1,
            dropout:    0.05,
            num_labels: NliLabel::COUNT,
        }
    }
}

impl ReftConfig {
    /// Layer indices the adapter attaches to, resolved against the encoder.
    pub fn target_layers(&self, num_layers: usize) -> Vec<usize> {
        if self.layers.is_empty() {
            (0..num_layers).collect()
        } else {
            let mut layers = self.layers.clone();
            layers.sort_unstable();
            layers.dedup();
            layers
        }
    }

    pub fn validate(&self, encoder: &EncoderConfig) -> Result<()> {
        if self.rank == 0 || self.rank > encoder.d_model {
            bail!("rank must be in 1..={}, got {}", encoder.d_model, self.rank);
        }
        if self.positions == 0 || self.positions > encoder.max_position_embeddings {
            bail!(
                "positions must be in 1..={}, got {}",
                encoder.max_position_embeddings, self.positions
            );
        }
        if !(0.0..1.0).contains(&self.dropout) {
            bail!("dropout must be in [0, 1), got {}", self.dropout);
        }
        if self.num_labels < 2 {
            bail!("num_labels must be at least 2, got {}", self.num_labels);
        }
        if let Some(bad) = self.layers.iter().find(|&&l| l >= encoder.num_layers) {
            bail!(
                "intervention layer {} does not exist (encoder has {} layers)",
                bad, encoder.num_layers
            );
        }
        Ok(())
    }

    /// Build a freshly initialised adapter for an encoder of this shape.
    pub fn init_adapter<B: Backend>(&self, encoder: &EncoderConfig, device: &B::Device) -> ReftAdapter<B> {
        let interventions = self
            .target_layers(encoder.num_layers)
            .into_iter()
            .map(|layer| {
                LoreftConfig::new(encoder.d_model, self.rank, layer, self.positions)
                    .with_dropout(self.dropout)
                    .init(device)
            })
            .collect();

        ReftAdapter {
            interventions,
            head: ClassificationHead {
                dropout: DropoutConfig::new(self.dropout).init(),
                linear:  LinearConfig::new(encoder.d_model, self.num_labels).init(device),
            },
        }
    }
}

// ─── Trainable modules ───────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct ClassificationHead<B: Backend> {
    pub dropout: Dropout,
    pub linear:  Linear<B>,
}

impl<B: Backend> ClassificationHead<B> {
    /// pooled: [batch, d_model] → logits [batch, num_labels]
    pub fn forward(&self, pooled: Tensor<B, 2>) -> Tensor<B, 2> {
        self.linear.forward(self.dropout.forward(pooled))
    }
}

/// Everything that is trained and exported.
#[derive(Module, Debug)]
pub struct ReftAdapter<B: Backend> {
    pub interventions: Vec<LoreftIntervention<B>>,
    pub head:          ClassificationHead<B>,
}

// ─── Assembly ────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct ReftClassifier<B: Backend> {
    pub encoder: Encoder<B>,
    pub adapter: ReftAdapter<B>,
}

/// Trainable vs frozen parameter counts of an assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterReport {
    pub trainable: usize,
    pub frozen:    usize,
}

impl ParameterReport {
    pub fn total(&self) -> usize {
        self.trainable + self.frozen
    }

    pub fn trainable_percent(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            self.trainable as f64 * 100.0 / self.total() as f64
        }
    }
}

impl fmt::Display for ParameterReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "trainable params: {} || all params: {} || trainable%: {:.4}",
            self.trainable,
            self.total(),
            self.trainable_percent()
        )
    }
}

/// Freeze `encoder` and attach `adapter` on top of it.
pub fn assemble<B: Backend>(encoder: Encoder<B>, adapter: ReftAdapter<B>) -> Result<ReftClassifier<B>> {
    if let Some(bad) = adapter
        .interventions
        .iter()
        .find(|iv| iv.layer >= encoder.num_layers())
    {
        bail!(
            "adapter targets layer {} but the encoder has {} layers",
            bad.layer,
            encoder.num_layers()
        );
    }

    Ok(ReftClassifier {
        encoder: encoder.no_grad(),
        adapter,
    })
}

impl<B: Backend> ReftClassifier<B> {
    pub fn parameter_report(&self) -> ParameterReport {
        ParameterReport {
            trainable: self.adapter.num_params(),
            frozen:    self.encoder.num_params(),
        }
    }

    /// input_ids, attention_mask: [batch, seq] → logits [batch, num_labels]
    pub fn forward(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
    ) -> Tensor<B, 2> {
        let interventions = &self.adapter.interventions;
        let hidden = self.encoder.forward_with(input_ids, attention_mask, |layer, mut h| {
            for iv in interventions.iter().filter(|iv| iv.layer == layer) {
                h = iv.forward(h);
            }
            h
        });

        let [batch, _, d_model] = hidden.dims();
        let pooled = hidden.slice([0..batch, 0..1, 0..d_model]).reshape([batch, d_model]);
        self.adapter.head.forward(pooled)
    }

    pub fn forward_classification(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
        labels:         Tensor<B, 1, Int>,
    ) -> ClassificationOutput<B> {
        let logits = self.forward(input_ids, attention_mask);
        let loss = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), labels.clone());
        ClassificationOutput::new(loss, logits, labels)
    }
}
