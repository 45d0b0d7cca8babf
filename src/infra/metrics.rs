// ============================================================
// Layer 6 — Metrics Sinks
// ============================================================
// Implementations of the MetricsSink trait from Layer 3.
//
//   NoopSink       — used when tracking is disabled; every call
//                    is accepted and dropped, so the training
//                    loop never branches on "is tracking on?"
//
//   CsvMetricsSink — appends one row per scalar to a CSV file:
//
//     step,key,value
//     0,train/loss,4.615120
//     0,train/lr,0.000100
//     0,trainer/global_step,0.000000
//     1,val/loss,4.598731
//     ...
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::domain::traits::MetricsSink;

// ─── NoopSink ─────────────────────────────────────────────────────────────────
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl MetricsSink for NoopSink {
    fn log_scalar(&mut self, _key: &str, _value: f64, _step: usize) -> Result<()> {
        Ok(())
    }
}

// ─── CsvMetricsSink ───────────────────────────────────────────────────────────
/// Appends `step,key,value` rows to a CSV file.
pub struct CsvMetricsSink {
    csv_path: PathBuf,
    writer:   BufWriter<File>,
}

impl CsvMetricsSink {
    /// Open (or create) the CSV file.
    /// Writes the header only if the file is new, so several runs
    /// can share one log.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let csv_path = path.as_ref().to_path_buf();
        if let Some(parent) = csv_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let is_new = !csv_path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&csv_path)
            .with_context(|| format!("Cannot open metrics CSV '{}'", csv_path.display()))?;
        let mut writer = BufWriter::new(file);

        if is_new {
            writeln!(writer, "step,key,value")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path, writer })
    }
}

impl MetricsSink for CsvMetricsSink {
    fn log_scalar(&mut self, key: &str, value: f64, step: usize) -> Result<()> {
        writeln!(self.writer, "{},{},{:.6}", step, key, value)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        tracing::debug!("Flushed metrics to '{}'", self.csv_path.display());
        Ok(())
    }
}

impl Drop for CsvMetricsSink {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}

// ─── Metric record ────────────────────────────────────────────────────────────
/// Validation metrics persisted next to each checkpoint
/// (`metrics_val_last_weights.json`, `metrics_val_best_weights.json`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValMetrics {
    pub val_acc: f64,
}
