// ============================================================
// Layer 4 — Clip Batcher
// ============================================================
// Implements Burn's Batcher trait to convert a Vec<ClipSample>
// into one tensor batch.
//
// How batching works here:
//   Input:  Vec of N ClipSamples, each [K, C, H, W] flattened
//   Output: ClipBatch with clips [N, K, C, H, W] and labels [N]
//
//   All samples come from one dataset with one transform, so
//   they share dims; the frames are concatenated and reshaped.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::ClipSample;

// ─── ClipBatch ────────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct ClipBatch<B: Backend> {
    /// Frame sequences — shape: [batch_size, K, C, H, W]
    pub clips: Tensor<B, 5>,

    /// Class indices — shape: [batch_size]
    pub labels: Tensor<B, 1, Int>,
}

// ─── ClipBatcher ──────────────────────────────────────────────────────────────
/// Holds the target device so tensors are created on the right GPU/CPU.
#[derive(Clone, Debug)]
pub struct ClipBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> ClipBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<ClipSample, ClipBatch<B>> for ClipBatcher<B> {
    fn batch(&self, items: Vec<ClipSample>) -> ClipBatch<B> {
        let batch_size   = items.len();
        let [k, c, h, w] = items[0].dims;

        let pixels: Vec<f32> = items
            .iter()
            .flat_map(|s| s.frames.iter().copied())
            .collect();
        let labels: Vec<i32> = items.iter().map(|s| s.label as i32).collect();

        let clips = Tensor::<B, 1>::from_floats(pixels.as_slice(), &self.device)
            .reshape([batch_size, k, c, h, w]);
        let labels = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        ClipBatch { clips, labels }
    }
}
