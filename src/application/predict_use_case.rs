// ============================================================
// Layer 2 — Predict Use Case
// ============================================================
// Classify one video with a trained checkpoint:
//
//   1. Read train_config.json to learn which model was trained
//   2. Sample frames from the video with that model's policy
//      and stage them as PNGs under <staging>/<model>/
//   3. Rebuild the model and load <ckp_dir>/<restore_file>
//   4. Transform the staged frames and return the top-10 classes
//
// Frames are staged before the checkpoint is read, so a video
// that is too short fails without loading any weights.

use anyhow::{ensure, Context, Result};
use burn::prelude::*;
use rand::Rng;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::data::transform::FrameTransform;
use crate::domain::clip::Prediction;
use crate::infra::{
    checkpoint::{load_checkpoint, CheckpointManager},
    reproducibility::seed_everything,
    video::{open_video, staging_name, FrameStager},
};
use crate::ml::{
    inferencer::{Inferencer, TOP_K},
    model::ModelSpec,
};

type InferBackend = burn::backend::Wgpu;

#[derive(Debug, Clone)]
pub struct PredictConfig {
    pub video:        PathBuf,
    pub ckp_dir:      PathBuf,
    pub restore_file: String,
    pub staging_dir:  PathBuf,
    pub seed:         u64,
    /// Optional class list, one name per line in class-index order
    pub classes:      Option<PathBuf>,
}

pub struct PredictUseCase {
    config: PredictConfig,
}

impl PredictUseCase {
    pub fn new(config: PredictConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<Vec<Prediction>> {
        let device  = burn::backend::wgpu::WgpuDevice::default();
        let mut rng = seed_everything::<InferBackend>(self.config.seed);
        self.run::<InferBackend, _>(&device, &mut rng)
    }

    pub fn run<B: Backend, R: Rng>(&self, device: &B::Device, rng: &mut R) -> Result<Vec<Prediction>> {
        let cfg  = &self.config;
        let ckpt = CheckpointManager::open(&cfg.ckp_dir);

        // ── Step 1: Which model? ──────────────────────────────────────────────
        let train_cfg   = ckpt.load_config()?;
        let num_classes = train_cfg.num_classes();
        let spec        = &train_cfg.model;
        tracing::info!("Checkpoint holds a {} model for {}", spec.name(), train_cfg.dataset);

        let class_names = match &cfg.classes {
            Some(path) => Some(read_class_names(path)?),
            None       => None,
        };

        // ── Step 2: Stage frames ──────────────────────────────────────────────
        let mut video = open_video(&cfg.video)?;
        let stager    = FrameStager::new(&cfg.staging_dir, spec.name())?;
        let name      = staging_name(rng);
        let policy    = spec.sampling_policy();
        stager.extract(video.as_mut(), policy, &name, rng)?;

        let frames = stager.staged_frames(&name)?;
        ensure!(!frames.is_empty(), "no frames could be extracted from '{}'", cfg.video.display());
        if frames.len() < policy.frames() {
            tracing::warn!(
                "Only {} of {} frames could be extracted; predicting on a shorter clip",
                frames.len(), policy.frames()
            );
        }
        tracing::info!("Staged {} frames as '{}'", frames.len(), stager.frame_path(&name, 1).display());

        // ── Steps 3–4: Load weights and classify ──────────────────────────────
        let weights   = ckpt.path(&cfg.restore_file);
        let transform = FrameTransform::new(spec.resize_to());
        let names     = class_names.as_deref();

        match spec {
            ModelSpec::Lrcn(args) => {
                let model = args.config(num_classes).init::<B>(device);
                let (model, _) = load_checkpoint(&weights, model, device)?;
                Inferencer::new(model, transform, device.clone()).predict(&frames, TOP_K, names)
            }
            ModelSpec::C3d(args) => {
                let model = args.config(num_classes).init::<B>(device);
                let (model, _) = load_checkpoint(&weights, model, device)?;
                Inferencer::new(model, transform, device.clone()).predict(&frames, TOP_K, names)
            }
        }
    }
}

/// Read a class list. Accepts plain names or `<index> <name>`
/// lines (as in UCF101's classInd.txt); blank lines are skipped.
pub fn read_class_names(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read class list '{}'", path.display()))?;

    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| match line.split_once(char::is_whitespace) {
            Some((index, name)) if index.parse::<usize>().is_ok() => name.trim().to_string(),
            _ => line.to_string(),
        })
        .collect())
}
