// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application);
// this layer only routes and prints results.
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvalArgs, InitBaseArgs, PredictArgs, PublishArgs, TrainArgs};

use crate::ml::backend::DeviceKind;

#[derive(Parser, Debug)]
#[command(
    name = "reft-nli",
    version,
    about = "Representation fine-tuning (LoReFT) of a frozen encoder for natural language inference."
)]
pub struct Cli {
    /// Compute backend
    #[arg(long, global = true, env = "REFT_DEVICE", value_enum)]
    pub device: Option<DeviceKind>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let device = self.device;
        match self.command {
            Commands::InitBase(args) => run_init_base(args),
            Commands::Train(args)    => run_train(args, device),
            Commands::Eval(args)     => run_eval(args, device.unwrap_or_default()),
            Commands::Predict(args)  => run_predict(args, device.unwrap_or_default()),
            Commands::Publish(args)  => run_publish(args),
        }
    }
}

fn run_init_base(args: InitBaseArgs) -> Result<()> {
    use crate::application::base_use_case::InitBaseUseCase;

    let base = InitBaseUseCase::new(args.into()).execute()?;
    println!(
        "Base model written to {} ({} layers, d_model={}, vocab={})",
        base.dir.display(),
        base.config.num_layers,
        base.config.d_model,
        base.config.vocab_size,
    );
    Ok(())
}

fn run_train(args: TrainArgs, device: Option<DeviceKind>) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    let config = args.into_config(device)?;
    tracing::info!("Training adapter on '{}' with data from '{}'", config.model, config.data_dir);

    let outcome = TrainUseCase::new(config).execute()?;
    println!("{}", outcome.report.parameters);
    for r in &outcome.report.history {
        println!(
            "epoch {:>2} | step {:>6} | train_loss={:.4} | val_loss={:.4} | accuracy={:.2}%",
            r.epoch, r.step, r.train_loss, r.val_loss, r.accuracy * 100.0
        );
    }
    println!("Adapter exported to {}", outcome.export_dir.display());
    if let Some(location) = outcome.published {
        println!("Published to {location}");
    }
    Ok(())
}

fn run_eval(args: EvalArgs, device: DeviceKind) -> Result<()> {
    use crate::application::predict_use_case::EvalUseCase;

    let outcome = EvalUseCase {
        adapter_dir: args.adapter_dir,
        data_dir:    args.data_dir,
        split:       args.split,
        batch_size:  args.batch_size,
        max_samples: args.max_samples,
        seed:        args.seed,
        device,
    }
    .execute()?;

    println!(
        "{} examples | loss={:.4} | accuracy={:.4}",
        outcome.count, outcome.loss, outcome.accuracy
    );
    Ok(())
}

fn run_predict(args: PredictArgs, device: DeviceKind) -> Result<()> {
    use crate::application::predict_use_case::PredictUseCase;
    use crate::domain::example::NliLabel;

    let prediction = PredictUseCase::new(args.adapter_dir, device).predict(&args.premise, &args.hypothesis)?;
    println!("\nLabel: {} ({:.1}%)", prediction.label, prediction.confidence() * 100.0);
    for (label, p) in NliLabel::ALL.iter().zip(&prediction.probabilities) {
        println!("  {:<13} {:.4}", label, p);
    }
    Ok(())
}

fn run_publish(args: PublishArgs) -> Result<()> {
    use crate::application::publish_use_case::PublishUseCase;

    let location = PublishUseCase::new(args.adapter_dir, args.repo_id, args.dataset_tag, args.registry_dir)
        .execute()?;
    println!("Published to {location}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::{schedule::ScheduleKind, trainer::EvalStrategy};

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_train_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "reft-nli", "--device", "cpu", "train",
            "--model", "my-base",
            "--eval-strategy", "steps:200",
            "--lr-scheduler-type", "cosine",
            "--layers", "0,2",
            "--rank", "4",
            "--max-train-samples", "1000",
        ])
        .unwrap();

        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg = args.into_config(cli.device).unwrap();
        assert_eq!(cfg.model, "my-base");
        assert_eq!(cfg.eval_strategy, EvalStrategy::Steps(200));
        assert_eq!(cfg.lr_scheduler_type, ScheduleKind::Cosine);
        assert_eq!(cfg.reft.layers, vec![0, 2]);
        assert_eq!(cfg.reft.rank, 4);
        assert_eq!(cfg.max_train_samples, Some(1000));
        assert_eq!(cfg.num_train_epochs, 2);
        assert_eq!(cfg.device, DeviceKind::Cpu);
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        std::fs::write(&path, r#"{"num_train_epochs": 5, "learning_rate": 0.1}"#).unwrap();

        let cli = Cli::try_parse_from([
            "reft-nli", "train", "--config", path.to_str().unwrap(), "--learning-rate", "0.2",
        ])
        .unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg = args.into_config(None).unwrap();
        assert_eq!(cfg.num_train_epochs, 5);
        assert_eq!(cfg.learning_rate, 0.2);
    }

    #[test]
    fn test_predict_requires_both_texts() {
        assert!(Cli::try_parse_from(["reft-nli", "predict", "--premise", "x"]).is_err());
        let cli = Cli::try_parse_from([
            "reft-nli", "predict", "--premise", "A man is playing guitar.",
            "--hypothesis", "A man is making music.", "--device", "wgpu",
        ])
        .unwrap();
        assert_eq!(cli.device, Some(DeviceKind::Wgpu));
    }

    #[test]
    fn test_bad_split_is_rejected() {
        assert!(Cli::try_parse_from(["reft-nli", "eval", "--split", "dev"]).is_err());
    }
}
