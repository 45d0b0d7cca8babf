// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands and all their flags:
//
//   train         --data-dir … --dataset … <lrcn|c3d> [model flags]
//   predict       --video … --ckp-dir …
//   build-dataset --dataset … --process-type …
//
// The model is itself a subcommand of `train`, so each
// architecture only accepts its own arguments.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args and bad enum values
//   - type conversion (string → usize, f64, etc.)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::{
    build_dataset_use_case::BuildDatasetConfig,
    predict_use_case::PredictConfig,
    train_use_case::TrainConfig,
};
use crate::domain::dataset_kind::{DataSplit, DatasetKind, ProcessType};
use crate::infra::reproducibility::DEFAULT_SEED;
use crate::ml::model::{C3dArgs, LrcnArgs, ModelSpec};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train an action recognition model on a processed dataset
    Train(TrainArgs),

    /// Classify a video with a trained checkpoint
    Predict(PredictArgs),

    /// Download and unpack a processed dataset
    BuildDataset(BuildDatasetArgs),
}

// ─── train ────────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Processed dataset root (splits/ and frames/)
    #[arg(long)]
    pub data_dir: String,

    /// Directory for checkpoints, metric records and train_config.json
    #[arg(long, default_value = "./ckp/baseline")]
    pub ckp_dir: String,

    #[arg(long, value_enum)]
    pub dataset: DatasetKind,

    #[arg(long, value_enum, default_value_t = DataSplit::Split1)]
    pub data_split: DataSplit,

    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    /// Data loader worker threads (0 = load on the training thread).
    /// Batch order only repeats across runs with the same seed at 0.
    #[arg(long, default_value_t = 2)]
    pub num_workers: usize,

    #[arg(long, default_value_t = 5)]
    pub max_epochs: usize,

    /// Initial Adam learning rate
    #[arg(long, default_value_t = 1e-4)]
    pub lr: f64,

    /// Per-epoch exponential decay factor of the learning rate
    #[arg(long, default_value_t = 0.999)]
    pub sl_gamma: f64,

    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Append scalar metrics to this CSV file (tracking is off without it)
    #[arg(long)]
    pub metrics_csv: Option<String>,

    /// Log the running training loss every N steps
    #[arg(long, default_value_t = 10)]
    pub save_loss_steps: usize,

    #[command(subcommand)]
    pub model: ModelCommand,
}

/// Architecture to train, with its own arguments
#[derive(Subcommand, Debug)]
pub enum ModelCommand {
    /// CNN frame encoder + LSTM, 5 frames per clip
    Lrcn(LrcnCliArgs),

    /// 3D convolutional network, 16 frames per clip
    C3d(C3dCliArgs),
}

#[derive(Args, Debug)]
pub struct LrcnCliArgs {
    #[arg(long, default_value_t = 512)]
    pub latent_dim: usize,

    #[arg(long, default_value_t = 256)]
    pub hidden_size: usize,

    #[arg(long, default_value_t = 2)]
    pub lstm_layers: usize,

    #[arg(long, default_value_t = 0.5)]
    pub dropout: f64,

    #[arg(long, default_value_t = 256)]
    pub resize_to: u32,
}

#[derive(Args, Debug)]
pub struct C3dCliArgs {
    #[arg(long, default_value_t = 0.5)]
    pub dropout: f64,

    #[arg(long, default_value_t = 112)]
    pub resize_to: u32,
}

impl From<ModelCommand> for ModelSpec {
    fn from(m: ModelCommand) -> Self {
        match m {
            ModelCommand::Lrcn(a) => ModelSpec::Lrcn(LrcnArgs {
                latent_dim:  a.latent_dim,
                hidden_size: a.hidden_size,
                lstm_layers: a.lstm_layers,
                dropout:     a.dropout,
                resize_to:   a.resize_to,
            }),
            ModelCommand::C3d(a) => ModelSpec::C3d(C3dArgs {
                dropout:   a.dropout,
                resize_to: a.resize_to,
            }),
        }
    }
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_dir:        a.data_dir,
            ckp_dir:         a.ckp_dir,
            dataset:         a.dataset,
            data_split:      a.data_split,
            batch_size:      a.batch_size,
            num_workers:     a.num_workers,
            max_epochs:      a.max_epochs,
            lr:              a.lr,
            sl_gamma:        a.sl_gamma,
            seed:            a.seed,
            metrics_csv:     a.metrics_csv,
            save_loss_steps: a.save_loss_steps,
            model:           a.model.into(),
        }
    }
}

// ─── predict ──────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Video to classify: a directory of frame images or a .gif
    #[arg(long)]
    pub video: PathBuf,

    /// Directory the model was trained into
    #[arg(long, default_value = "./ckp/baseline")]
    pub ckp_dir: PathBuf,

    /// Checkpoint file inside --ckp-dir
    #[arg(long, default_value = "best.pth")]
    pub restore_file: String,

    /// Where extracted frames are written
    #[arg(long, default_value = "./deployment/staging")]
    pub staging_dir: PathBuf,

    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Class list to print names instead of indices
    #[arg(long)]
    pub classes: Option<PathBuf>,
}

impl From<PredictArgs> for PredictConfig {
    fn from(a: PredictArgs) -> Self {
        PredictConfig {
            video:        a.video,
            ckp_dir:      a.ckp_dir,
            restore_file: a.restore_file,
            staging_dir:  a.staging_dir,
            seed:         a.seed,
            classes:      a.classes,
        }
    }
}

// ─── build-dataset ────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct BuildDatasetArgs {
    #[arg(long, default_value = "./data/")]
    pub data_folder: PathBuf,

    /// Shell script that sets up download credentials
    #[arg(long, default_value = "./script/kaggle_config.sh")]
    pub setup_script: PathBuf,

    #[arg(long, value_enum)]
    pub dataset: DatasetKind,

    #[arg(long, value_enum, default_value_t = ProcessType::FiveFramesUniform)]
    pub process_type: ProcessType,
}

impl From<BuildDatasetArgs> for BuildDatasetConfig {
    fn from(a: BuildDatasetArgs) -> Self {
        BuildDatasetConfig {
            data_folder:  a.data_folder,
            setup_script: a.setup_script,
            dataset:      a.dataset,
            process_type: a.process_type,
        }
    }
}
