// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Train + validate loop using Burn's DataLoader, Adam and an
// exponential learning-rate schedule.
//
// Per epoch:
//   1. train_one_epoch — one pass over the shuffled training
//      batches: forward, cross-entropy, backward, Adam step.
//      The scheduler advances once after the pass.
//   2. validate        — model.valid() (inner backend, dropout
//      off, no autodiff) over the validation batches in order.
//   3. record_epoch    — best tracking and checkpoint writes:
//        last.pth + metrics_val_last_weights.json  every epoch
//        best.pth + metrics_val_best_weights.json  when val_acc
//                                                  >= best so far
//
// Key Burn insight:
//   - Training uses an AutodiffBackend for gradients
//   - model.valid() returns the model on B::InnerBackend
//   - Validation batcher must also use B::InnerBackend
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::{anyhow, ensure, Result};
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    lr_scheduler::{exponential::ExponentialLrSchedulerConfig, LrScheduler},
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use indicatif::{ProgressBar, ProgressStyle};

use crate::data::{
    batcher::{ClipBatch, ClipBatcher},
    dataset::ClipDataset,
};
use crate::domain::traits::MetricsSink;
use crate::infra::{
    checkpoint::{CheckpointManager, TrainingSnapshot},
    metrics::ValMetrics,
};
use crate::ml::model::{forward_loss, ActionClassifier};

// ─── Settings & summaries ─────────────────────────────────────────────────────
/// Loop hyperparameters, independent of the architecture.
#[derive(Debug, Clone)]
pub struct TrainSettings {
    pub max_epochs:      usize,
    pub batch_size:      usize,
    pub num_workers:     usize,
    pub lr:              f64,
    pub sl_gamma:        f64,
    pub seed:            u64,
    /// Send train/loss to the metrics sink every this many steps
    pub save_loss_steps: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochSummary {
    pub batches: usize,
    /// Running average of the training loss over the pass
    pub loss:    f64,
    /// Learning rate used for the pass
    pub lr:      f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValSummary {
    pub loss:    f64,
    pub acc:     f64,
    pub samples: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitReport {
    pub epochs:     usize,
    pub best_epoch: Option<usize>,
    pub best_acc:   f64,
}

// ─── RunningAverage ───────────────────────────────────────────────────────────
/// Mean of every value pushed so far.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunningAverage {
    total: f64,
    steps: usize,
}

impl RunningAverage {
    pub fn update(&mut self, value: f64) {
        self.total += value;
        self.steps += 1;
    }

    /// NaN before the first update.
    pub fn value(&self) -> f64 {
        if self.steps == 0 {
            f64::NAN
        } else {
            self.total / self.steps as f64
        }
    }
}

// ─── BestTracker ──────────────────────────────────────────────────────────────
/// Best validation accuracy so far, starting at 0.0.
/// A tie counts as an improvement so the newer epoch wins.
#[derive(Debug, Clone, Copy)]
pub struct BestTracker {
    best:  f64,
    epoch: Option<usize>,
}

impl Default for BestTracker {
    fn default() -> Self {
        Self { best: 0.0, epoch: None }
    }
}

impl BestTracker {
    /// Returns true when `acc` becomes the new best.
    pub fn update(&mut self, epoch: usize, acc: f64) -> bool {
        if acc >= self.best {
            self.best  = acc;
            self.epoch = Some(epoch);
            true
        } else {
            false
        }
    }

    pub fn best(&self) -> f64 {
        self.best
    }

    pub fn epoch(&self) -> Option<usize> {
        self.epoch
    }
}

// ─── LrSchedule ───────────────────────────────────────────────────────────────
/// A scheduler plus the rate it last produced.
///
/// Burn schedulers return the rate to use *now* on every step,
/// so the first step is taken up front and each later step
/// happens after a training pass.
pub struct LrSchedule<S: LrScheduler> {
    scheduler: S,
    current:   f64,
}

impl<S: LrScheduler> LrSchedule<S> {
    pub fn new(mut scheduler: S) -> Self {
        let current = scheduler.step();
        Self { scheduler, current }
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn advance(&mut self) -> f64 {
        self.current = self.scheduler.step();
        self.current
    }
}

// ─── One training pass ────────────────────────────────────────────────────────
pub fn train_one_epoch<B, M, O, S>(
    mut model:       M,
    loader:          &dyn DataLoader<ClipBatch<B>>,
    optim:           &mut O,
    schedule:        &mut LrSchedule<S>,
    sink:            &mut dyn MetricsSink,
    global_step:     &mut usize,
    save_loss_steps: usize,
) -> Result<(M, EpochSummary)>
where
    B: AutodiffBackend,
    M: ActionClassifier<B> + AutodiffModule<B>,
    O: Optimizer<M, B>,
    S: LrScheduler,
{
    let lr = schedule.current();
    let mut loss_avg = RunningAverage::default();
    let mut batches  = 0usize;
    let mut seen     = 0usize;

    let pb = ProgressBar::new(loader.num_items() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {bar:40.cyan/blue} {pos}/{len} [{elapsed_precise}] {msg}")
            .map_err(|e| anyhow!("progress bar template: {e}"))?,
    );

    for batch in loader.iter() {
        let batch_len = batch.labels.dims()[0];
        let (loss, _) = forward_loss(&model, batch.clips, batch.labels);
        loss_avg.update(loss.clone().into_scalar().elem::<f64>());

        // Backward pass + Adam update; the gradients are consumed here
        let grads = GradientsParams::from_grads(loss.backward(), &model);
        model = optim.step(lr, model, grads);

        // Global step of this batch, counted from 0 across epochs
        let step = *global_step;
        if save_loss_steps > 0 && step % save_loss_steps == 0 {
            sink.log_scalar("train/loss", loss_avg.value(), step)?;
            sink.log_scalar("train/lr", lr, step)?;
            sink.log_scalar("trainer/global_step", step as f64, step)?;
        }
        batches      += 1;
        seen         += batch_len;
        *global_step += 1;

        pb.set_message(format!("loss: {:.4}", loss_avg.value()));
        pb.inc(batch_len as u64);
    }
    pb.finish_and_clear();
    ensure_complete("training", seen, loader.num_items())?;

    schedule.advance();
    Ok((model, EpochSummary { batches, loss: loss_avg.value(), lr }))
}

// ─── Validation pass ──────────────────────────────────────────────────────────
pub fn validate<B, M>(model: &M, loader: &dyn DataLoader<ClipBatch<B>>) -> Result<ValSummary>
where
    B: Backend,
    M: ActionClassifier<B>,
{
    let mut loss_avg = RunningAverage::default();
    let mut correct  = 0usize;
    let mut samples  = 0usize;

    for batch in loader.iter() {
        samples += batch.labels.dims()[0];
        let (loss, logits) = forward_loss(model, batch.clips, batch.labels.clone());
        loss_avg.update(loss.into_scalar().elem::<f64>());

        // argmax(1) returns [batch, 1]; flatten before comparing with [batch]
        let predicted = logits.argmax(1).flatten::<1>(0, 1);
        let hits: i64 = predicted.equal(batch.labels).int().sum().into_scalar().elem::<i64>();
        correct += hits as usize;
    }

    ensure_complete("validation", samples, loader.num_items())?;

    let acc = if samples > 0 { correct as f64 / samples as f64 } else { 0.0 };
    Ok(ValSummary { loss: loss_avg.value(), acc, samples })
}

/// Burn's loaders stop at the first clip `Dataset::get` can't
/// produce, so a short pass means a clip failed to load.
fn ensure_complete(pass: &str, seen: usize, expected: usize) -> Result<()> {
    ensure!(
        seen == expected,
        "{} pass stopped after {} of {} clips: a clip failed to load (see the error above)",
        pass, seen, expected
    );
    Ok(())
}

// ─── Per-epoch bookkeeping ────────────────────────────────────────────────────
/// Best tracking, checkpoint and metric writes, validation metrics to the sink.
/// Returns whether this epoch was the best so far.
pub fn record_epoch(
    epoch:    usize,
    val:      &ValSummary,
    snapshot: &TrainingSnapshot,
    tracker:  &mut BestTracker,
    ckpt:     &CheckpointManager,
    sink:     &mut dyn MetricsSink,
) -> Result<bool> {
    let is_best = tracker.update(epoch, val.acc);
    if is_best {
        tracing::info!("- Found new best accuracy: {:.4}", val.acc);
    }

    ckpt.save(snapshot, is_best)?;

    let metrics = ValMetrics { val_acc: val.acc };
    ckpt.save_metrics(&metrics, false)?;
    if is_best {
        ckpt.save_metrics(&metrics, true)?;
    }

    sink.log_scalar("val/loss", val.loss, epoch)?;
    sink.log_scalar("val/acc", val.acc, epoch)?;
    sink.log_scalar("trainer/epoch", epoch as f64, epoch)?;
    Ok(is_best)
}

// ─── Full run ─────────────────────────────────────────────────────────────────
/// Train `model` for `settings.max_epochs` epochs, validating and
/// checkpointing after each one.
pub fn fit<B, M>(
    model:         M,
    settings:      &TrainSettings,
    train_dataset: ClipDataset,
    val_dataset:   ClipDataset,
    ckpt:          &CheckpointManager,
    sink:          &mut dyn MetricsSink,
    device:        &B::Device,
) -> Result<(M, FitReport)>
where
    B: AutodiffBackend,
    M: ActionClassifier<B> + AutodiffModule<B>,
    M::InnerModule: ActionClassifier<B::InnerBackend>,
{
    let mut model = model;

    // ── Adam optimiser ────────────────────────────────────────────────────────
    // m = β1*m + (1-β1)*g        (mean)
    // v = β2*v + (1-β2)*g²       (variance)
    // θ = θ - lr * m / (√v + ε)  (update)
    let mut optim = AdamConfig::new().init::<B, M>();

    let scheduler = ExponentialLrSchedulerConfig::new(settings.lr, settings.sl_gamma)
        .init()
        .map_err(|e| anyhow!("invalid learning-rate schedule: {e}"))?;
    let mut schedule = LrSchedule::new(scheduler);

    // ── Training data loader (AutodiffBackend, shuffled per epoch) ────────────
    let mut train_builder = DataLoaderBuilder::new(ClipBatcher::<B>::new(device.clone()))
        .batch_size(settings.batch_size)
        .shuffle(settings.seed);

    // ── Validation data loader (InnerBackend, dataset order) ──────────────────
    let mut val_builder = DataLoaderBuilder::new(ClipBatcher::<B::InnerBackend>::new(device.clone()))
        .batch_size(settings.batch_size);

    // 0 workers → load batches on the training thread. With workers,
    // batches arrive in completion order, so only the 0-worker loader
    // replays the same batch order for a given seed.
    if settings.num_workers > 0 {
        train_builder = train_builder.num_workers(settings.num_workers);
        val_builder   = val_builder.num_workers(settings.num_workers);
    }
    let train_loader = train_builder.build(train_dataset);
    let val_loader   = val_builder.build(val_dataset);

    let mut tracker     = BestTracker::default();
    let mut global_step = 0usize;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=settings.max_epochs {
        tracing::info!("Epoch {}/{}", epoch, settings.max_epochs);

        let (trained, train) = train_one_epoch(
            model,
            train_loader.as_ref(),
            &mut optim,
            &mut schedule,
            sink,
            &mut global_step,
            settings.save_loss_steps,
        )?;
        model = trained;

        let val = validate(&model.valid(), val_loader.as_ref())?;

        println!(
            "Epoch {:>3}/{} | train_loss={:.4} | lr={:.2e} | val_loss={:.4} | val_acc={:.1}%",
            epoch, settings.max_epochs, train.loss, train.lr, val.loss, val.acc * 100.0,
        );

        let snapshot = TrainingSnapshot::capture(epoch, &model, &optim)?;
        record_epoch(epoch, &val, &snapshot, &mut tracker, ckpt, sink)?;
    }

    sink.finish()?;
    tracing::info!("Training complete! Best val_acc={:.4}", tracker.best());

    Ok((model, FitReport {
        epochs:     settings.max_epochs,
        best_epoch: tracker.epoch(),
        best_acc:   tracker.best(),
    }))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use std::path::Path;
    use crate::data::dataset::{tests::write_dataset, SplitPhase};
    use crate::data::transform::FrameTransform;
    use crate::domain::dataset_kind::DataSplit;
    use crate::infra::checkpoint::{read_snapshot, BEST_CHECKPOINT, LAST_CHECKPOINT};
    use crate::infra::metrics::NoopSink;
    use crate::infra::reproducibility::{backend_rng_lock, seed_everything};
    use crate::ml::lrcn::{Lrcn, LrcnConfig};

    type TestBackend  = NdArray<f32>;
    type TestAutodiff = Autodiff<TestBackend>;

    /// Records every scalar it receives.
    #[derive(Default)]
    struct RecordingSink {
        rows: Vec<(String, f64, usize)>,
    }

    impl MetricsSink for RecordingSink {
        fn log_scalar(&mut self, key: &str, value: f64, step: usize) -> Result<()> {
            self.rows.push((key.to_string(), value, step));
            Ok(())
        }
    }

    impl RecordingSink {
        fn keys(&self, key: &str) -> Vec<usize> {
            self.rows.iter().filter(|(k, _, _)| k == key).map(|(_, _, s)| *s).collect()
        }
    }

    fn snapshot(epoch: usize) -> TrainingSnapshot {
        TrainingSnapshot { epoch, state_dict: vec![epoch as u8], optim_dict: None }
    }

    fn val(acc: f64) -> ValSummary {
        ValSummary { loss: 1.0, acc, samples: 20 }
    }

    #[test]
    fn test_best_is_epoch_with_highest_accuracy() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let mut tracker = BestTracker::default();
        let mut sink    = RecordingSink::default();

        let flags: Vec<bool> = [0.40, 0.55, 0.50]
            .iter()
            .enumerate()
            .map(|(i, acc)| {
                record_epoch(i + 1, &val(*acc), &snapshot(i + 1), &mut tracker, &ckpt, &mut sink).unwrap()
            })
            .collect();

        assert_eq!(flags, vec![true, true, false]);
        assert_eq!(read_snapshot(&ckpt.path(BEST_CHECKPOINT)).unwrap().epoch, 2);
        assert_eq!(read_snapshot(&ckpt.path(LAST_CHECKPOINT)).unwrap().epoch, 3);
        assert_eq!(ckpt.load_metrics(true).unwrap().val_acc, 0.55);
        assert_eq!(ckpt.load_metrics(false).unwrap().val_acc, 0.50);
        assert_eq!(sink.keys("val/acc"), vec![1, 2, 3]);
        assert_eq!(tracker.epoch(), Some(2));
    }

    #[test]
    fn test_tie_favours_latest_epoch() {
        let mut tracker = BestTracker::default();
        assert!(tracker.update(1, 0.5));
        assert!(tracker.update(2, 0.5));
        assert!(!tracker.update(3, 0.49));
        assert_eq!(tracker.epoch(), Some(2));
    }

    #[test]
    fn test_zero_accuracy_still_counts_as_best() {
        let mut tracker = BestTracker::default();
        assert!(tracker.update(1, 0.0));
    }

    #[test]
    fn test_running_average() {
        let mut avg = RunningAverage::default();
        assert!(avg.value().is_nan());
        for v in [1.0, 2.0, 6.0] {
            avg.update(v);
        }
        assert_eq!(avg.value(), 3.0);
    }

    #[test]
    fn test_schedule_decays_after_each_pass() {
        let scheduler = ExponentialLrSchedulerConfig::new(1e-2, 0.5).init().unwrap();
        let mut schedule = LrSchedule::new(scheduler);
        assert!((schedule.current() - 1e-2).abs() < 1e-12);
        assert!((schedule.advance() - 5e-3).abs() < 1e-12);
        assert!((schedule.current() - 5e-3).abs() < 1e-12);
    }

    fn tiny_lrcn(num_classes: usize, device: &<TestAutodiff as Backend>::Device) -> Lrcn<TestAutodiff> {
        LrcnConfig::new(num_classes)
            .with_latent_dim(8)
            .with_hidden_size(4)
            .with_lstm_layers(1)
            .init(device)
    }

    #[test]
    fn test_one_pass_consumes_every_batch() {
        let _guard = backend_rng_lock();
        let device = Default::default();
        seed_everything::<TestAutodiff>(73);

        // 70 clips at batch size 64 → 2 batches, the last one partial
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path(), 70, 5, 101);
        let train = ClipDataset::from_split(
            dir.path(), DataSplit::Split1, SplitPhase::Train, 101, 5, FrameTransform::new(8),
        )
        .unwrap();

        let loader = DataLoaderBuilder::new(ClipBatcher::<TestAutodiff>::new(device))
            .batch_size(64)
            .shuffle(73)
            .build(train);

        let model     = tiny_lrcn(101, &device);
        let mut optim = AdamConfig::new().init::<TestAutodiff, Lrcn<TestAutodiff>>();
        let mut schedule = LrSchedule::new(ExponentialLrSchedulerConfig::new(1e-4, 0.999).init().unwrap());
        let mut sink  = RecordingSink::default();
        let mut step  = 0usize;

        let (_model, summary) = train_one_epoch(
            model, loader.as_ref(), &mut optim, &mut schedule, &mut sink, &mut step, 1,
        )
        .unwrap();

        assert_eq!(summary.batches, 2);
        assert_eq!(step, 2);
        assert!(summary.loss.is_finite());
        assert!((summary.lr - 1e-4).abs() < 1e-12);
        assert!((schedule.current() - 1e-4 * 0.999).abs() < 1e-12);
        assert_eq!(sink.keys("train/loss"), vec![0, 1]);
    }

    /// 6 clips per phase with one unreadable frame in `broken`.
    fn dataset_with_corrupt_frame(root: &Path, broken: &str) -> (ClipDataset, ClipDataset) {
        write_dataset(root, 6, 5, 3);
        std::fs::write(root.join("frames").join(broken), b"not a png").unwrap();

        let open = |phase| {
            ClipDataset::from_split(root, DataSplit::Split1, phase, 3, 5, FrameTransform::new(8)).unwrap()
        };
        (open(SplitPhase::Train), open(SplitPhase::Val))
    }

    #[test]
    fn test_unreadable_frame_aborts_training_pass() {
        let _guard = backend_rng_lock();
        let device = Default::default();
        seed_everything::<TestAutodiff>(73);

        let dir = tempfile::tempdir().unwrap();
        let (train, _) = dataset_with_corrupt_frame(dir.path(), "Train_2_3.png");
        let loader = DataLoaderBuilder::new(ClipBatcher::<TestAutodiff>::new(device))
            .batch_size(2)
            .shuffle(73)
            .build(train);

        let mut optim    = AdamConfig::new().init::<TestAutodiff, Lrcn<TestAutodiff>>();
        let mut schedule = LrSchedule::new(ExponentialLrSchedulerConfig::new(1e-4, 0.999).init().unwrap());
        let mut step     = 0usize;

        let res = train_one_epoch(
            tiny_lrcn(3, &device), loader.as_ref(), &mut optim, &mut schedule, &mut NoopSink, &mut step, 10,
        );
        assert!(res.is_err());
        // A failed pass leaves the learning rate where it was
        assert!((schedule.current() - 1e-4).abs() < 1e-12);
    }

    #[test]
    fn test_unreadable_frame_aborts_validation() {
        let _guard = backend_rng_lock();
        let device = Default::default();
        seed_everything::<TestAutodiff>(73);

        let dir = tempfile::tempdir().unwrap();
        let (_, val) = dataset_with_corrupt_frame(dir.path(), "Val_4_1.png");
        let loader = DataLoaderBuilder::new(ClipBatcher::<TestBackend>::new(device))
            .batch_size(2)
            .build(val);

        let model = tiny_lrcn(3, &device).valid();
        let err   = validate(&model, loader.as_ref()).unwrap_err();
        assert!(err.to_string().contains("4 of 6"));
    }

    #[test]
    fn test_fit_writes_checkpoints_every_epoch() {
        let _guard = backend_rng_lock();
        let device = Default::default();
        seed_everything::<TestAutodiff>(73);

        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path(), 6, 5, 3);
        let open = |phase| {
            ClipDataset::from_split(dir.path(), DataSplit::Split1, phase, 3, 5, FrameTransform::new(8)).unwrap()
        };

        let ckpt_dir = tempfile::tempdir().unwrap();
        let ckpt     = CheckpointManager::new(ckpt_dir.path()).unwrap();
        let settings = TrainSettings {
            max_epochs:      2,
            batch_size:      4,
            num_workers:     0,
            lr:              1e-3,
            sl_gamma:        0.999,
            seed:            73,
            save_loss_steps: 10,
        };

        let (_model, report) = fit::<TestAutodiff, _>(
            tiny_lrcn(3, &device),
            &settings,
            open(SplitPhase::Train),
            open(SplitPhase::Val),
            &ckpt,
            &mut NoopSink,
            &device,
        )
        .unwrap();

        assert_eq!(report.epochs, 2);
        assert!(report.best_epoch.is_some());
        assert_eq!(read_snapshot(&ckpt.path(LAST_CHECKPOINT)).unwrap().epoch, 2);
        assert!(read_snapshot(&ckpt.path(LAST_CHECKPOINT)).unwrap().optim_dict.is_some());
        assert!(ckpt.path(BEST_CHECKPOINT).exists());
        assert_eq!(ckpt.load_metrics(true).unwrap().val_acc, report.best_acc);
    }
}
