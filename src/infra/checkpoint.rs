// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores trainable state.
//
// What gets saved per epoch:
//   1. last.pth  — {epoch, model record, optimizer record},
//                  overwritten after every epoch
//   2. best.pth  — same contents, written only when the epoch's
//                  validation accuracy is the best seen so far
//   3. metrics_val_last_weights.json / metrics_val_best_weights.json
//                — {"val_acc": ...} for the matching checkpoint
//   4. train_config.json
//                — the run configuration, so inference can rebuild
//                  the exact architecture before loading weights
//
// Burn records are serialised to bytes with BinBytesRecorder
// (full precision), then wrapped together with the epoch number
// into a single bincode file. Writes are plain fs::write calls:
// a crash mid-write can leave a truncated last.pth.
//
// File layout:
//   ckp/baseline/
//     last.pth
//     best.pth
//     metrics_val_last_weights.json
//     metrics_val_best_weights.json
//     train_config.json
//
// Reference: Burn Book §5 (Records and Checkpointing)
//            Rust Book §9 (Error Handling)

use anyhow::Context;
use burn::{
    module::AutodiffModule,
    optim::Optimizer,
    prelude::*,
    record::{BinBytesRecorder, FullPrecisionSettings, Recorder},
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::application::train_use_case::TrainConfig;
use crate::error::CheckpointError;
use crate::infra::metrics::ValMetrics;

pub const LAST_CHECKPOINT: &str = "last.pth";
pub const BEST_CHECKPOINT: &str = "best.pth";
pub const LAST_METRICS:    &str = "metrics_val_last_weights.json";
pub const BEST_METRICS:    &str = "metrics_val_best_weights.json";
pub const TRAIN_CONFIG:    &str = "train_config.json";

type SnapshotRecorder = BinBytesRecorder<FullPrecisionSettings>;

// ─── TrainingSnapshot ─────────────────────────────────────────────────────────
/// Serialised trainable state at the end of an epoch.
///
/// The model and optimizer records are kept as opaque byte
/// blobs so the snapshot itself carries no backend type and can
/// be written, read and compared without a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSnapshot {
    /// Number of completed epochs (1-based)
    pub epoch: usize,

    /// Model parameters
    pub state_dict: Vec<u8>,

    /// Optimizer state (Adam moments); absent for inference-only snapshots
    pub optim_dict: Option<Vec<u8>>,
}

impl TrainingSnapshot {
    /// Capture model and optimizer state after `epoch` epochs.
    pub fn capture<B, M, O>(epoch: usize, model: &M, optim: &O) -> Result<Self, CheckpointError>
    where
        B: AutodiffBackend,
        M: AutodiffModule<B>,
        O: Optimizer<M, B>,
    {
        let recorder   = SnapshotRecorder::default();
        let state_dict = <SnapshotRecorder as Recorder<B>>::record(
            &recorder, model.clone().into_record(), (),
        )
        .map_err(|e| CheckpointError::Record { what: "model", reason: format!("{e:?}") })?;
        let optim_dict = <SnapshotRecorder as Recorder<B>>::record(
            &recorder, optim.to_record(), (),
        )
        .map_err(|e| CheckpointError::Record { what: "optimizer", reason: format!("{e:?}") })?;

        Ok(Self { epoch, state_dict, optim_dict: Some(optim_dict) })
    }

    /// Capture only the model parameters.
    pub fn from_model<B: Backend, M: Module<B>>(epoch: usize, model: &M) -> Result<Self, CheckpointError> {
        let recorder   = SnapshotRecorder::default();
        let state_dict = <SnapshotRecorder as Recorder<B>>::record(
            &recorder, model.clone().into_record(), (),
        )
        .map_err(|e| CheckpointError::Record { what: "model", reason: format!("{e:?}") })?;

        Ok(Self { epoch, state_dict, optim_dict: None })
    }

    /// Load the stored parameters into `model`.
    /// Works for both the autodiff model and its inner (inference) module.
    pub fn restore_model<B: Backend, M: Module<B>>(
        &self,
        model:  M,
        device: &B::Device,
    ) -> Result<M, CheckpointError> {
        let recorder = SnapshotRecorder::default();
        let record   = <SnapshotRecorder as Recorder<B>>::load(
            &recorder, self.state_dict.clone(), device,
        )
        .map_err(|e| CheckpointError::Record { what: "model", reason: format!("{e:?}") })?;
        Ok(model.load_record(record))
    }

    /// Load the stored optimizer state into `optim`.
    /// A snapshot without optimizer state leaves `optim` untouched.
    pub fn restore_optimizer<B, M, O>(&self, optim: O, device: &B::Device) -> Result<O, CheckpointError>
    where
        B: AutodiffBackend,
        M: AutodiffModule<B>,
        O: Optimizer<M, B>,
    {
        let Some(bytes) = &self.optim_dict else {
            tracing::warn!("Checkpoint for epoch {} has no optimizer state", self.epoch);
            return Ok(optim);
        };
        let recorder = SnapshotRecorder::default();
        let record   = <SnapshotRecorder as Recorder<B>>::load(&recorder, bytes.clone(), device)
            .map_err(|e| CheckpointError::Record { what: "optimizer", reason: format!("{e:?}") })?;
        Ok(optim.load_record(record))
    }
}

// ─── CheckpointManager ────────────────────────────────────────────────────────
/// Manages the files of one checkpoint directory.
pub struct CheckpointManager {
    /// Path to the directory where checkpoints are stored
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create a new CheckpointManager.
    /// Creates the directory (and parents) if it doesn't exist yet.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, CheckpointError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Use an existing checkpoint directory without creating it.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of a file inside the checkpoint directory
    pub fn path(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    /// Write `last.pth`, and `best.pth` too when `is_best`.
    pub fn save(&self, snapshot: &TrainingSnapshot, is_best: bool) -> Result<(), CheckpointError> {
        let bytes = bincode::serialize(snapshot)?;

        let last = self.path(LAST_CHECKPOINT);
        fs::write(&last, &bytes)?;
        tracing::debug!("Saved '{}' (epoch {})", last.display(), snapshot.epoch);

        if is_best {
            let best = self.path(BEST_CHECKPOINT);
            fs::write(&best, &bytes)?;
            tracing::debug!("Saved '{}' (epoch {})", best.display(), snapshot.epoch);
        }
        Ok(())
    }

    /// Write the validation metric record for `last`, or for `best`.
    pub fn save_metrics(&self, metrics: &ValMetrics, best: bool) -> Result<(), CheckpointError> {
        let path = self.path(if best { BEST_METRICS } else { LAST_METRICS });
        fs::write(&path, serde_json::to_string_pretty(metrics)?)?;
        Ok(())
    }

    /// Read a metric record back.
    pub fn load_metrics(&self, best: bool) -> Result<ValMetrics, CheckpointError> {
        let path = self.path(if best { BEST_METRICS } else { LAST_METRICS });
        if !path.exists() {
            return Err(CheckpointError::NotFound(path));
        }
        Ok(serde_json::from_str(&fs::read_to_string(&path)?)?)
    }

    /// Save the training configuration to JSON.
    ///
    /// Called before training starts so inference can rebuild the
    /// same architecture later.
    pub fn save_config(&self, cfg: &TrainConfig) -> anyhow::Result<()> {
        let path = self.path(TRAIN_CONFIG);
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    /// Load the training configuration from JSON.
    pub fn load_config(&self) -> anyhow::Result<TrainConfig> {
        let path = self.path(TRAIN_CONFIG);
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. \
                 Make sure you have run 'train' before 'predict'.",
                path.display()
            )
        })?;
        Ok(serde_json::from_str(&json)?)
    }
}

// ─── Loading ──────────────────────────────────────────────────────────────────
/// Read a checkpoint file without touching any model.
/// Fails with `NotFound` when the path does not exist.
pub fn read_snapshot(path: &Path) -> Result<TrainingSnapshot, CheckpointError> {
    if !path.exists() {
        return Err(CheckpointError::NotFound(path.to_path_buf()));
    }
    let bytes = fs::read(path)?;
    bincode::deserialize(&bytes).map_err(|source| CheckpointError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

/// Load model parameters from `path`.
///
/// Returns the restored model and the raw snapshot so the caller
/// can read the epoch number.
pub fn load_checkpoint<B: Backend, M: Module<B>>(
    path:   &Path,
    model:  M,
    device: &B::Device,
) -> Result<(M, TrainingSnapshot), CheckpointError> {
    let snapshot = read_snapshot(path)?;
    let model    = snapshot.restore_model(model, device)?;
    tracing::info!("Loaded '{}' (epoch {})", path.display(), snapshot.epoch);
    Ok((model, snapshot))
}

/// Load model parameters and optimizer state from `path`, for resuming.
pub fn load_checkpoint_with_optimizer<B, M, O>(
    path:   &Path,
    model:  M,
    optim:  O,
    device: &B::Device,
) -> Result<(M, O, TrainingSnapshot), CheckpointError>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
    O: Optimizer<M, B>,
{
    let snapshot = read_snapshot(path)?;
    let model    = snapshot.restore_model(model, device)?;
    let optim    = snapshot.restore_optimizer::<B, M, O>(optim, device)?;
    tracing::info!("Resumed '{}' (epoch {})", path.display(), snapshot.epoch);
    Ok((model, optim, snapshot))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::nn::{Linear, LinearConfig};
    use burn::optim::{AdamConfig, GradientsParams};
    use crate::infra::reproducibility::backend_rng_lock;

    type TestBackend     = NdArray<f32>;
    type TestAutodiff    = Autodiff<TestBackend>;

    fn weights<B: Backend>(model: &Linear<B>) -> Vec<f32> {
        model.weight.val().into_data().to_vec::<f32>().unwrap()
    }

    fn dummy_snapshot(epoch: usize) -> TrainingSnapshot {
        TrainingSnapshot { epoch, state_dict: vec![epoch as u8; 4], optim_dict: Some(vec![1, 2, 3]) }
    }

    #[test]
    fn test_save_writes_last_always_and_best_on_request() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = CheckpointManager::new(dir.path()).unwrap();

        mgr.save(&dummy_snapshot(1), false).unwrap();
        assert!(mgr.path(LAST_CHECKPOINT).exists());
        assert!(!mgr.path(BEST_CHECKPOINT).exists());

        mgr.save(&dummy_snapshot(2), true).unwrap();
        let last = read_snapshot(&mgr.path(LAST_CHECKPOINT)).unwrap();
        let best = read_snapshot(&mgr.path(BEST_CHECKPOINT)).unwrap();
        assert_eq!(last, best);
        assert_eq!(best.epoch, 2);
    }

    #[test]
    fn test_model_round_trip_is_bit_identical() {
        let _guard = backend_rng_lock();
        let device = Default::default();
        let dir    = tempfile::tempdir().unwrap();
        let mgr    = CheckpointManager::new(dir.path()).unwrap();

        TestBackend::seed(7);
        let original: Linear<TestBackend> = LinearConfig::new(6, 3).init(&device);
        mgr.save(&TrainingSnapshot::from_model(4, &original).unwrap(), true).unwrap();

        TestBackend::seed(8);
        let fresh: Linear<TestBackend> = LinearConfig::new(6, 3).init(&device);
        assert_ne!(weights(&original), weights(&fresh));

        let (restored, snapshot) =
            load_checkpoint::<TestBackend, _>(&mgr.path(BEST_CHECKPOINT), fresh, &device).unwrap();
        assert_eq!(snapshot.epoch, 4);
        assert_eq!(weights(&original), weights(&restored));
    }

    #[test]
    fn test_optimizer_state_round_trip() {
        let _guard = backend_rng_lock();
        let device = Default::default();
        let dir    = tempfile::tempdir().unwrap();
        let mgr    = CheckpointManager::new(dir.path()).unwrap();

        let model: Linear<TestAutodiff> = LinearConfig::new(4, 2).init(&device);
        let mut optim = AdamConfig::new().init::<TestAutodiff, Linear<TestAutodiff>>();

        // One step so Adam has moment estimates to persist
        let x     = Tensor::<TestAutodiff, 2>::ones([3, 4], &device);
        let loss  = model.forward(x).sum();
        let grads = GradientsParams::from_grads(loss.backward(), &model);
        let model = optim.step(1e-3, model, grads);

        let snapshot = TrainingSnapshot::capture(1, &model, &optim).unwrap();
        mgr.save(&snapshot, false).unwrap();

        let fresh_model: Linear<TestAutodiff> = LinearConfig::new(4, 2).init(&device);
        let fresh_optim = AdamConfig::new().init::<TestAutodiff, Linear<TestAutodiff>>();
        assert!(fresh_optim.to_record().is_empty());

        let (restored, optim2, snap) = load_checkpoint_with_optimizer(
            &mgr.path(LAST_CHECKPOINT), fresh_model, fresh_optim, &device,
        )
        .unwrap();
        assert_eq!(snap.epoch, 1);
        assert_eq!(optim2.to_record().len(), optim.to_record().len());
        assert_eq!(weights(&restored), weights(&model));
    }

    #[test]
    fn test_missing_path_fails_before_touching_model() {
        let _guard = backend_rng_lock();
        let device = Default::default();
        let dir    = tempfile::tempdir().unwrap();
        let path   = dir.path().join("does_not_exist.pth");

        let model: Linear<TestBackend> = LinearConfig::new(2, 2).init(&device);
        let before = weights(&model);

        let err = load_checkpoint::<TestBackend, _>(&path, model.clone(), &device).unwrap_err();
        assert!(matches!(err, CheckpointError::NotFound(p) if p == path));
        assert_eq!(weights(&model), before);
    }

    #[test]
    fn test_metrics_records_are_separate() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = CheckpointManager::new(dir.path()).unwrap();

        mgr.save_metrics(&ValMetrics { val_acc: 0.55 }, true).unwrap();
        mgr.save_metrics(&ValMetrics { val_acc: 0.50 }, false).unwrap();

        assert_eq!(mgr.load_metrics(true).unwrap().val_acc, 0.55);
        assert_eq!(mgr.load_metrics(false).unwrap().val_acc, 0.50);
    }
}
