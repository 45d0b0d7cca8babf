// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Three commands are supported:
//   1. `train`         — trains LRCN or C3D on a processed dataset
//   2. `predict`       — classifies a video with a checkpoint
//   3. `build-dataset` — downloads a processed dataset
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{BuildDatasetArgs, Commands, PredictArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "action-recognition",
    version = "0.1.0",
    about = "Train LRCN / C3D action recognition models on HMDB51 and UCF101, then classify videos."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    /// This keeps the CLI layer thin — it only routes, never computes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)        => Self::run_train(args),
            Commands::Predict(args)      => Self::run_predict(args),
            Commands::BuildDataset(args) => Self::run_build_dataset(args),
        }
    }

    fn run_train(args: TrainArgs) -> Result<()> {
        use crate::application::train_use_case::TrainUseCase;

        tracing::info!("Starting training on data in: {}", args.data_dir);
        let report = TrainUseCase::new(args.into()).execute()?;

        match report.best_epoch {
            Some(epoch) => println!(
                "Training complete. Best val_acc {:.2}% at epoch {}.",
                report.best_acc * 100.0, epoch
            ),
            None => println!("Training complete."),
        }
        Ok(())
    }

    fn run_predict(args: PredictArgs) -> Result<()> {
        use crate::application::predict_use_case::PredictUseCase;

        let video = args.video.display().to_string();
        let predictions = PredictUseCase::new(args.into()).execute()?;

        println!("\nTop {} for {}:", predictions.len(), video);
        for (rank, p) in predictions.iter().enumerate() {
            match &p.label {
                Some(name) => println!("{:>3}. {:<28} ({:>3}) {:.4}", rank + 1, name, p.class_index, p.score),
                None       => println!("{:>3}. class {:>3} {:.4}", rank + 1, p.class_index, p.score),
            }
        }
        Ok(())
    }

    fn run_build_dataset(args: BuildDatasetArgs) -> Result<()> {
        use crate::application::build_dataset_use_case::BuildDatasetUseCase;

        let folder = BuildDatasetUseCase::new(args.into()).execute()?;
        println!("--DONE-- dataset in {}", folder.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::TrainConfig;
    use crate::ml::model::ModelSpec;

    #[test]
    fn test_train_parses_model_subcommand() {
        let cli = Cli::try_parse_from([
            "action-recognition", "train",
            "--data-dir", "data/HMDB51/5_frames_uniform",
            "--dataset", "hmdb51",
            "lrcn", "--latent-dim", "128",
        ])
        .unwrap();

        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();
        assert_eq!(cfg.batch_size, 64);
        assert_eq!(cfg.ckp_dir, "./ckp/baseline");
        match cfg.model {
            ModelSpec::Lrcn(a) => {
                assert_eq!(a.latent_dim, 128);
                assert_eq!(a.hidden_size, 256);
            }
            other => panic!("unexpected model {:?}", other),
        }
    }

    #[test]
    fn test_model_flags_are_scoped_to_their_model() {
        let res = Cli::try_parse_from([
            "action-recognition", "train",
            "--data-dir", "d", "--dataset", "ucf101",
            "c3d", "--latent-dim", "128",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn test_unknown_dataset_rejected() {
        let res = Cli::try_parse_from([
            "action-recognition", "build-dataset", "--dataset", "kinetics",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn test_predict_defaults() {
        let cli = Cli::try_parse_from(["action-recognition", "predict", "--video", "clip.gif"]).unwrap();
        let Commands::Predict(args) = cli.command else { panic!("expected predict") };
        assert_eq!(args.restore_file, "best.pth");
        assert_eq!(args.staging_dir, std::path::PathBuf::from("./deployment/staging"));
    }
}
