// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Validate the configuration      (Layer 5 - ml)
//   Step 2: Seed backend + host RNG         (Layer 6 - infra)
//   Step 3: Save config next to checkpoints (Layer 6 - infra)
//   Step 4: Open train/val datasets         (Layer 4 - data)
//   Step 5: Pick the metrics sink           (Layer 6 - infra)
//   Step 6: Build the model and train       (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use anyhow::{ensure, Context, Result};
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::data::{
    dataset::{ClipDataset, SplitPhase},
    transform::FrameTransform,
};
use crate::domain::{
    dataset_kind::{DataSplit, DatasetKind},
    traits::MetricsSink,
};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{CsvMetricsSink, NoopSink},
    reproducibility::{seed_everything, DEFAULT_SEED},
};
use crate::ml::{
    model::{LrcnArgs, ModelSpec},
    trainer::{fit, FitReport, TrainSettings},
};

type TrainBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

// ─── Training Configuration ──────────────────────────────────────────────────
// Everything a training run needs. Saved as train_config.json so
// inference can rebuild the same architecture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data_dir:        String,
    pub ckp_dir:         String,
    pub dataset:         DatasetKind,
    pub data_split:      DataSplit,
    pub batch_size:      usize,
    pub num_workers:     usize,
    pub max_epochs:      usize,
    pub lr:              f64,
    pub sl_gamma:        f64,
    pub seed:            u64,
    pub metrics_csv:     Option<String>,
    pub save_loss_steps: usize,
    pub model:           ModelSpec,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_dir:        "data".to_string(),
            ckp_dir:         "./ckp/baseline".to_string(),
            dataset:         DatasetKind::Hmdb51,
            data_split:      DataSplit::Split1,
            batch_size:      64,
            num_workers:     2,
            max_epochs:      5,
            lr:              1e-4,
            sl_gamma:        0.999,
            seed:            DEFAULT_SEED,
            metrics_csv:     None,
            save_loss_steps: 10,
            model:           ModelSpec::Lrcn(LrcnArgs::default()),
        }
    }
}

impl TrainConfig {
    pub fn num_classes(&self) -> usize {
        self.dataset.num_classes()
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.batch_size > 0, "batch_size must be positive");
        ensure!(self.max_epochs > 0, "max_epochs must be positive");
        ensure!(self.lr > 0.0, "lr must be positive, got {}", self.lr);
        ensure!(
            self.sl_gamma > 0.0 && self.sl_gamma <= 1.0,
            "sl_gamma must be in (0, 1], got {}",
            self.sl_gamma
        );
        self.model.validate()
    }

    pub fn settings(&self) -> TrainSettings {
        TrainSettings {
            max_epochs:      self.max_epochs,
            batch_size:      self.batch_size,
            num_workers:     self.num_workers,
            lr:              self.lr,
            sl_gamma:        self.sl_gamma,
            seed:            self.seed,
            save_loss_steps: self.save_loss_steps,
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline on the GPU backend.
    pub fn execute(&self) -> Result<FitReport> {
        // ── Step 1: Reject bad arguments before any work ──────────────────────
        self.config.validate()?;

        let device = burn::backend::wgpu::WgpuDevice::default();
        tracing::info!("Using WGPU device: {:?}", device);

        // ── Step 2: Seed ──────────────────────────────────────────────────────
        seed_everything::<TrainBackend>(self.config.seed);

        self.run::<TrainBackend>(&device)
    }

    /// Steps 3–6 on any autodiff backend.
    pub fn run<B: AutodiffBackend>(&self, device: &B::Device) -> Result<FitReport> {
        let cfg = &self.config;
        cfg.validate()?;

        // ── Step 3: Save config for inference ─────────────────────────────────
        let ckpt = CheckpointManager::new(&cfg.ckp_dir)
            .with_context(|| format!("Cannot create checkpoint dir '{}'", cfg.ckp_dir))?;
        ckpt.save_config(cfg)?;

        // ── Step 4: Datasets ──────────────────────────────────────────────────
        let data_dir  = Path::new(&cfg.data_dir);
        let transform = FrameTransform::new(cfg.model.resize_to());
        let frames    = cfg.model.frames_per_clip();
        let classes   = cfg.num_classes();

        tracing::info!(
            "Loading {} {} ({} frames per clip) from '{}'",
            cfg.dataset, cfg.data_split, frames, data_dir.display()
        );
        let train = ClipDataset::from_split(data_dir, cfg.data_split, SplitPhase::Train, classes, frames, transform)?;
        let val   = ClipDataset::from_split(data_dir, cfg.data_split, SplitPhase::Val, classes, frames, transform)?;

        // ── Step 5: Metrics sink ──────────────────────────────────────────────
        let mut sink: Box<dyn MetricsSink> = match &cfg.metrics_csv {
            Some(path) => Box::new(CsvMetricsSink::new(path)?),
            None       => Box::new(NoopSink),
        };

        // ── Step 6: Build the chosen model and train it ───────────────────────
        let settings = cfg.settings();
        tracing::info!("Model: {} ({} classes)", cfg.model.name(), classes);
        let report = match &cfg.model {
            ModelSpec::Lrcn(args) => {
                let model = args.config(classes).init::<B>(device);
                fit(model, &settings, train, val, &ckpt, sink.as_mut(), device)?.1
            }
            ModelSpec::C3d(args) => {
                let model = args.config(classes).init::<B>(device);
                fit(model, &settings, train, val, &ckpt, sink.as_mut(), device)?.1
            }
        };

        tracing::info!(
            "Best val_acc {:.4} at epoch {:?}; checkpoints in '{}'",
            report.best_acc, report.best_epoch, ckpt.dir().display()
        );
        Ok(report)
    }
}
