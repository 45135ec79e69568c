// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Explicit train + evaluation loop over Burn's DataLoader:
//
//   for each batch:
//     logits = model(batch)                 (Autodiff backend)
//     loss   = cross_entropy(logits, labels)
//     grads  = loss.backward()              (adapter params only;
//                                            the encoder is no_grad)
//     model  = optim.step(lr(step), model, grads)
//     every `eval_strategy` → evaluate on model.valid()
//   end of epoch → adapter checkpoint
//
// Key Burn insight:
//   - Training uses B (Autodiff<Inner>) for gradients
//   - model.valid() returns the model on B::InnerBackend
//   - Validation batcher must also use B::InnerBackend
//
// Reference: Burn Book §5, Loshchilov & Hutter (2019) AdamW

use anyhow::{bail, Result};
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    module::AutodiffModule,
    optim::{AdamConfig, AdamWConfig, GradientsParams, Optimizer, SgdConfig},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};
use std::{fmt, path::Path, str::FromStr, sync::Arc};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{NliBatch, NliBatcher},
    dataset::NliDataset,
};
use crate::infra::{
    checkpoint::{AdapterManifest, CheckpointManager},
    metrics::{EvalRecord, MetricsLogger},
};
use crate::ml::{
    evaluator::evaluate,
    model::{ParameterReport, ReftClassifier},
    schedule::LrSchedule,
};

// ─── Optimiser choice ─────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    #[default]
    AdamW,
    Adam,
    Sgd,
}

impl fmt::Display for OptimizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OptimizerKind::AdamW => "adamw",
            OptimizerKind::Adam  => "adam",
            OptimizerKind::Sgd   => "sgd",
        })
    }
}

impl FromStr for OptimizerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "adamw" | "adamw_torch" => Ok(OptimizerKind::AdamW),
            "adam"                  => Ok(OptimizerKind::Adam),
            "sgd"                   => Ok(OptimizerKind::Sgd),
            other => Err(format!("unknown optimizer '{other}' (adamw, adam, sgd)")),
        }
    }
}

// ─── Evaluation cadence ───────────────────────────────────────────────────────
/// `epoch`, `steps:N` or `no`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EvalStrategy {
    #[default]
    Epoch,
    Steps(usize),
    No,
}

impl EvalStrategy {
    fn due_after_step(self, step: usize) -> bool {
        matches!(self, EvalStrategy::Steps(n) if step % n == 0)
    }
}

impl fmt::Display for EvalStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalStrategy::Epoch    => f.write_str("epoch"),
            EvalStrategy::Steps(n) => write!(f, "steps:{n}"),
            EvalStrategy::No       => f.write_str("no"),
        }
    }
}

impl FromStr for EvalStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "epoch"       => return Ok(EvalStrategy::Epoch),
            "no" | "none" => return Ok(EvalStrategy::No),
            _ => {}
        }
        match s.strip_prefix("steps:").map(str::parse::<usize>) {
            Some(Ok(n)) if n > 0 => Ok(EvalStrategy::Steps(n)),
            _ => Err(format!("unknown eval strategy '{s}' (epoch, steps:N with N > 0, no)")),
        }
    }
}

impl TryFrom<String> for EvalStrategy {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<EvalStrategy> for String {
    fn from(s: EvalStrategy) -> Self {
        s.to_string()
    }
}

// ─── Report ───────────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub history:        Vec<EvalRecord>,
    /// Mean training loss of each epoch, in order
    pub epoch_losses:   Vec<f64>,
    /// Accuracy of the last evaluation; None when evaluation is disabled
    pub final_accuracy: Option<f64>,
    pub parameters:     ParameterReport,
    pub steps:          usize,
}

/// Dispatch on the configured optimiser and run the loop.
///
/// `manifest` describes the adapter being trained; per-epoch
/// checkpoints are written with its epoch / accuracy fields updated.
pub fn run_training<B: AutodiffBackend>(
    cfg:      &TrainConfig,
    model:    ReftClassifier<B>,
    train:    NliDataset,
    valid:    NliDataset,
    manifest: &AdapterManifest,
    device:   &B::Device,
) -> Result<(ReftClassifier<B>, TrainReport)> {
    match cfg.optim {
        OptimizerKind::AdamW => {
            let optim = AdamWConfig::new()
                .with_weight_decay(cfg.weight_decay as f32)
                .init::<B, ReftClassifier<B>>();
            fit(cfg, model, optim, train, valid, manifest, device)
        }
        OptimizerKind::Adam => {
            warn_ignored_weight_decay(cfg);
            fit(cfg, model, AdamConfig::new().init::<B, ReftClassifier<B>>(), train, valid, manifest, device)
        }
        OptimizerKind::Sgd => {
            warn_ignored_weight_decay(cfg);
            fit(cfg, model, SgdConfig::new().init::<B, ReftClassifier<B>>(), train, valid, manifest, device)
        }
    }
}

fn warn_ignored_weight_decay(cfg: &TrainConfig) {
    if cfg.weight_decay > 0.0 {
        tracing::warn!("weight_decay={} is only applied by adamw; ignoring", cfg.weight_decay);
    }
}

fn fit<B, O>(
    cfg:       &TrainConfig,
    mut model: ReftClassifier<B>,
    mut optim: O,
    train:     NliDataset,
    valid:     NliDataset,
    manifest:  &AdapterManifest,
    device:    &B::Device,
) -> Result<(ReftClassifier<B>, TrainReport)>
where
    B: AutodiffBackend,
    O: Optimizer<ReftClassifier<B>, B>,
{
    let train_len = train.sample_count();
    if train_len == 0 {
        bail!("training split is empty");
    }

    let batch_size      = cfg.per_device_train_batch_size.max(1);
    let steps_per_epoch = train_len.div_ceil(batch_size);
    let total_steps     = steps_per_epoch * cfg.num_train_epochs;
    let schedule = LrSchedule::new(cfg.lr_scheduler_type, cfg.learning_rate, cfg.warmup_ratio, total_steps);

    let parameters = model.parameter_report();
    tracing::info!("{}", parameters);
    tracing::info!(
        "{} examples, {} epochs, {} steps ({} warmup), optimizer={}, schedule={}",
        train_len, cfg.num_train_epochs, total_steps, schedule.warmup_steps(),
        cfg.optim, cfg.lr_scheduler_type,
    );

    // ── Training data loader (AutodiffBackend) ────────────────────────────────
    let train_loader = DataLoaderBuilder::new(NliBatcher::<B>::new(device.clone()))
        .batch_size(batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(train);

    // ── Validation data loader (InnerBackend — no autodiff overhead) ──────────
    let valid_loader = DataLoaderBuilder::new(NliBatcher::<B::InnerBackend>::new(device.clone()))
        .batch_size(cfg.per_device_eval_batch_size.max(1))
        .num_workers(1)
        .build(valid);

    let output_dir = Path::new(&cfg.output_dir);
    let metrics    = MetricsLogger::create(output_dir)?;

    let mut history: Vec<EvalRecord> = Vec::new();
    let mut epoch_losses = Vec::with_capacity(cfg.num_train_epochs);
    let mut step         = 0usize;
    let mut eval_window  = LossWindow::default();
    let mut log_window   = LossWindow::default();
    let mut epoch_window = LossWindow::default();

    for epoch in 1..=cfg.num_train_epochs {
        let mut lr = schedule.lr_at(step);

        for batch in train_loader.iter() {
            lr = schedule.lr_at(step);

            let output = model.forward_classification(batch.input_ids, batch.attention_mask, batch.labels);
            let loss_val: f64 = output.loss.clone().into_scalar().elem::<f64>();
            if !loss_val.is_finite() {
                bail!("training loss became {loss_val} at step {}", step + 1);
            }

            // Backward pass + optimiser update
            let grads = output.loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(lr, model, grads);
            step += 1;

            eval_window.push(loss_val);
            log_window.push(loss_val);
            epoch_window.push(loss_val);

            if cfg.logging_steps > 0 && step % cfg.logging_steps == 0 {
                tracing::info!(
                    "epoch {} | step {}/{} | loss={:.4} | lr={:.3e}",
                    epoch, step, total_steps, log_window.take_mean(), lr,
                );
            }

            if cfg.eval_strategy.due_after_step(step) {
                let record = evaluation(&model, &valid_loader, epoch, step, lr, &mut eval_window);
                metrics.log(&record)?;
                history.push(record);
            }
        }

        if cfg.eval_strategy == EvalStrategy::Epoch {
            let record = evaluation(&model, &valid_loader, epoch, step, lr, &mut eval_window);
            metrics.log(&record)?;
            history.push(record);
        }

        let epoch_loss = epoch_window.take_mean();
        tracing::info!("epoch {} done | mean train loss={:.4}", epoch, epoch_loss);
        epoch_losses.push(epoch_loss);

        // most recent evaluation so far, whatever the cadence
        let accuracy = history.last().map(|r| r.accuracy);
        let checkpoint = CheckpointManager::for_epoch(output_dir, epoch);
        let snapshot   = AdapterManifest { epochs: epoch, accuracy, ..manifest.clone() };
        checkpoint.save_adapter(&model.adapter, &snapshot)?;
        tracing::info!("Checkpoint saved to '{}'", checkpoint.dir().display());
    }

    // A steps:N cadence may end between evaluations
    if matches!(cfg.eval_strategy, EvalStrategy::Steps(_)) && history.last().map(|r| r.step) != Some(step) {
        let lr     = schedule.lr_at(step.saturating_sub(1));
        let record = evaluation(&model, &valid_loader, cfg.num_train_epochs, step, lr, &mut eval_window);
        metrics.log(&record)?;
        history.push(record);
    }

    let final_accuracy = history.last().map(|r| r.accuracy);
    tracing::info!("Training complete after {} steps", step);

    Ok((model, TrainReport { history, epoch_losses, final_accuracy, parameters, steps: step }))
}

/// Running mean of training losses, reset when read.
#[derive(Debug, Default)]
struct LossWindow {
    sum:   f64,
    steps: usize,
}

impl LossWindow {
    fn push(&mut self, loss: f64) {
        self.sum   += loss;
        self.steps += 1;
    }

    fn take_mean(&mut self) -> f64 {
        let mean = if self.steps > 0 { self.sum / self.steps as f64 } else { f64::NAN };
        *self = Self::default();
        mean
    }
}

/// Evaluate on the inner backend (dropout off) and build the metrics row.
fn evaluation<B: AutodiffBackend>(
    model:  &ReftClassifier<B>,
    loader: &Arc<dyn DataLoader<NliBatch<B::InnerBackend>>>,
    epoch:  usize,
    step:   usize,
    lr:     f64,
    window: &mut LossWindow,
) -> EvalRecord {
    let outcome = evaluate(&model.valid(), loader);
    let record  = EvalRecord {
        epoch,
        step,
        learning_rate: lr,
        train_loss:    window.take_mean(),
        val_loss:      outcome.loss,
        accuracy:      outcome.accuracy,
    };
    tracing::info!(
        "eval | epoch {} | step {} | train_loss={:.4} | val_loss={:.4} | accuracy={:.2}%",
        epoch, step, record.train_loss, record.val_loss, record.accuracy * 100.0,
    );
    record
}
