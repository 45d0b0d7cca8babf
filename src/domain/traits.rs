// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The two seams the rest of the pipeline is written against:
//
//   MetricsSink → where scalar training metrics go
//                 (a CSV file, or nowhere at all)
//   FrameSource → where video frames come from
//                 (a folder of decoded frames, an animated GIF)
//
// The training loop and the deployment path only see these
// traits, so turning experiment tracking off or adding a new
// video container never touches them.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use image::RgbImage;

use crate::error::ExtractError;

// ─── MetricsSink ──────────────────────────────────────────────────────────────
/// Receives named scalar metrics at a given step.
///
/// Keys follow a `group/name` convention: `train/loss`, `train/lr`,
/// `val/loss`, `val/acc`, `trainer/epoch`.
///
/// Implementations:
///   - NoopSink       → tracking disabled
///   - CsvMetricsSink → appends rows to a CSV file
pub trait MetricsSink {
    /// Record `value` for `key` at `step`.
    fn log_scalar(&mut self, key: &str, value: f64, step: usize) -> Result<()>;

    /// Flush anything buffered. Called once when training finishes.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

// ─── FrameSource ──────────────────────────────────────────────────────────────
/// Random access to the decoded frames of one video.
pub trait FrameSource {
    /// Total number of frames in the video
    fn frame_count(&self) -> usize;

    /// Decode frame `index` (0-based).
    /// Returns Ok(None) when the index is past the end of the video.
    fn read_frame(&mut self, index: usize) -> Result<Option<RgbImage>, ExtractError>;
}
