// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Five subcommands:
//
//   init-base — build a tokenizer + random encoder directory
//   train     — ReFT training, export, optional publish
//   eval      — accuracy of an exported adapter on a split
//   predict   — label one premise/hypothesis pair
//   publish   — push an exported adapter to a registry
//
// `train` flags are all optional: values come from the built-in
// defaults, then `--config FILE.json`, then the flags themselves.
//
// Reference: Rust Book §12 (Building a CLI Program)

use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};

use crate::application::{base_use_case::InitBaseConfig, train_use_case::TrainConfig};
use crate::domain::split::SplitName;
use crate::ml::{
    backend::DeviceKind,
    schedule::ScheduleKind,
    trainer::{EvalStrategy, OptimizerKind},
};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a word-level tokenizer and a randomly initialised encoder
    InitBase(InitBaseArgs),

    /// Train a LoReFT adapter on a frozen encoder
    Train(TrainArgs),

    /// Evaluate an exported adapter on a labelled split
    Eval(EvalArgs),

    /// Predict entailment / neutral / contradiction for one pair
    Predict(PredictArgs),

    /// Publish an exported adapter to a registry
    Publish(PublishArgs),
}

#[derive(Args, Debug)]
pub struct InitBaseArgs {
    /// Directory with the training split (used as tokenizer corpus)
    #[arg(long, default_value = "data/multinli")]
    pub data_dir: PathBuf,

    /// Where to write encoder_config.json, model.mpk.gz, tokenizer.json
    #[arg(long, default_value = "base-model")]
    pub output: PathBuf,

    #[arg(long, default_value_t = 30000)]
    pub vocab_size: usize,

    /// Longest sequence the encoder can embed
    #[arg(long, default_value_t = 512)]
    pub max_position_embeddings: usize,

    /// Hidden size; must be divisible by num_heads
    #[arg(long, default_value_t = 256)]
    pub d_model: usize,

    #[arg(long, default_value_t = 8)]
    pub num_heads: usize,

    #[arg(long, default_value_t = 6)]
    pub num_layers: usize,

    /// Inner dimension of the feed-forward network
    #[arg(long, default_value_t = 1024)]
    pub d_ff: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

impl From<InitBaseArgs> for InitBaseConfig {
    fn from(a: InitBaseArgs) -> Self {
        InitBaseConfig {
            data_dir:                a.data_dir,
            output:                  a.output,
            vocab_size:              a.vocab_size,
            max_position_embeddings: a.max_position_embeddings,
            d_model:                 a.d_model,
            num_heads:               a.num_heads,
            num_layers:              a.num_layers,
            d_ff:                    a.d_ff,
            seed:                    a.seed,
        }
    }
}

/// Every field overrides the config file / defaults when given.
#[derive(Args, Debug, Default)]
pub struct TrainArgs {
    /// JSON file with any subset of the training configuration
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Base model: local directory or Hugging Face Hub id [default: base-model]
    #[arg(long)]
    pub model: Option<String>,

    /// Directory with train / validation JSONL files [default: data/multinli]
    #[arg(long)]
    pub data_dir: Option<String>,

    /// Checkpoints, metrics.csv and the final adapter [default: outputs/reft-mnli]
    #[arg(long)]
    pub output_dir: Option<String>,

    /// epoch, steps:N or no [default: epoch]
    #[arg(long)]
    pub eval_strategy: Option<EvalStrategy>,

    /// [default: 0.004]
    #[arg(long)]
    pub learning_rate: Option<f64>,

    /// [default: 32]
    #[arg(long)]
    pub per_device_train_batch_size: Option<usize>,

    /// [default: 32]
    #[arg(long)]
    pub per_device_eval_batch_size: Option<usize>,

    /// [default: 2]
    #[arg(long)]
    pub num_train_epochs: Option<usize>,

    /// Decoupled weight decay, adamw only [default: 0.0]
    #[arg(long)]
    pub weight_decay: Option<f64>,

    /// adamw, adam or sgd [default: adamw]
    #[arg(long)]
    pub optim: Option<OptimizerKind>,

    /// constant, linear or cosine [default: linear]
    #[arg(long)]
    pub lr_scheduler_type: Option<ScheduleKind>,

    /// Fraction of steps spent warming up [default: 0.1]
    #[arg(long)]
    pub warmup_ratio: Option<f64>,

    /// Tokens per example after truncation / padding [default: 128]
    #[arg(long)]
    pub max_length: Option<usize>,

    /// Low-rank subspace dimension [default: 1]
    #[arg(long)]
    pub rank: Option<usize>,

    /// Comma-separated encoder layers to intervene on [default: all]
    #[arg(long, value_delimiter = ',')]
    pub layers: Option<Vec<usize>>,

    /// Leading token positions edited per layer [default: 1]
    #[arg(long)]
    pub positions: Option<usize>,

    /// Adapter dropout [default: 0.05]
    #[arg(long)]
    pub reft_dropout: Option<f64>,

    /// [default: 42]
    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long)]
    pub max_train_samples: Option<usize>,

    #[arg(long)]
    pub max_eval_samples: Option<usize>,

    /// [default: 50]
    #[arg(long)]
    pub logging_steps: Option<usize>,

    /// [default: validation_matched]
    #[arg(long)]
    pub eval_split: Option<SplitName>,

    /// Hold out this fraction of train instead of loading eval_split
    #[arg(long)]
    pub validation_fraction: Option<f64>,

    /// Publish the final adapter as OWNER/NAME
    #[arg(long)]
    pub push_to: Option<String>,

    /// Dataset tag for the model card [default: glue/mnli]
    #[arg(long)]
    pub dataset_tag: Option<String>,

    /// Publish into this local registry directory instead of the Hub
    #[arg(long)]
    pub registry_dir: Option<String>,
}

macro_rules! override_fields {
    ($cfg:ident, $args:ident, $($field:ident),+ $(,)?) => {
        $( if let Some(v) = $args.$field { $cfg.$field = v; } )+
    };
}

impl TrainArgs {
    /// Defaults ← config file ← flags.
    pub fn into_config(self, device: Option<DeviceKind>) -> Result<TrainConfig> {
        let mut cfg = match &self.config {
            Some(path) => TrainConfig::from_json_file(Path::new(path))?,
            None       => TrainConfig::default(),
        };

        override_fields!(
            cfg, self,
            model, data_dir, output_dir, eval_strategy, learning_rate,
            per_device_train_batch_size, per_device_eval_batch_size, num_train_epochs,
            weight_decay, optim, lr_scheduler_type, warmup_ratio, max_length, seed,
            logging_steps, eval_split, dataset_tag,
        );

        if let Some(v) = self.rank         { cfg.reft.rank = v; }
        if let Some(v) = self.layers       { cfg.reft.layers = v; }
        if let Some(v) = self.positions    { cfg.reft.positions = v; }
        if let Some(v) = self.reft_dropout { cfg.reft.dropout = v; }

        if self.max_train_samples.is_some()   { cfg.max_train_samples = self.max_train_samples; }
        if self.max_eval_samples.is_some()    { cfg.max_eval_samples = self.max_eval_samples; }
        if self.validation_fraction.is_some() { cfg.validation_fraction = self.validation_fraction; }
        if self.push_to.is_some()             { cfg.push_to = self.push_to; }
        if self.registry_dir.is_some()        { cfg.registry_dir = self.registry_dir; }
        if let Some(device) = device          { cfg.device = device; }

        Ok(cfg)
    }
}

#[derive(Args, Debug)]
pub struct EvalArgs {
    /// Exported adapter directory (contains adapter_config.json)
    #[arg(long, default_value = "outputs/reft-mnli/adapter")]
    pub adapter_dir: PathBuf,

    #[arg(long, default_value = "data/multinli")]
    pub data_dir: PathBuf,

    #[arg(long, default_value = "validation_matched")]
    pub split: SplitName,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Evaluate a seeded random subset of this size
    #[arg(long)]
    pub max_samples: Option<usize>,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    #[arg(long, default_value = "outputs/reft-mnli/adapter")]
    pub adapter_dir: PathBuf,

    #[arg(long)]
    pub premise: String,

    #[arg(long)]
    pub hypothesis: String,
}

#[derive(Args, Debug)]
pub struct PublishArgs {
    #[arg(long, default_value = "outputs/reft-mnli/adapter")]
    pub adapter_dir: PathBuf,

    /// Target repository, OWNER/NAME
    #[arg(long)]
    pub repo_id: String,

    #[arg(long, default_value = "glue/mnli")]
    pub dataset_tag: String,

    /// Local registry directory; omit to publish to the Hugging Face Hub
    #[arg(long)]
    pub registry_dir: Option<PathBuf>,
}
