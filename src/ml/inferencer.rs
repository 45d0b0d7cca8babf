// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Staged frames → one clip tensor [1, K, C, H, W] → logits →
// softmax → the k most likely classes.
use anyhow::{ensure, Context, Result};
use burn::{prelude::*, tensor::activation::softmax};
use std::path::PathBuf;

use crate::data::transform::{FrameTransform, CHANNELS};
use crate::domain::clip::Prediction;
use crate::ml::model::ActionClassifier;

/// Number of classes reported per prediction
pub const TOP_K: usize = 10;

pub struct Inferencer<B: Backend, M: ActionClassifier<B>> {
    model:     M,
    transform: FrameTransform,
    device:    B::Device,
}

impl<B: Backend, M: ActionClassifier<B>> Inferencer<B, M> {
    pub fn new(model: M, transform: FrameTransform, device: B::Device) -> Self {
        Self { model, transform, device }
    }

    /// Transform the staged frames (in order) and stack them into a
    /// batch of one clip.
    pub fn clip_tensor(&self, frames: &[PathBuf]) -> Result<Tensor<B, 5>> {
        ensure!(!frames.is_empty(), "no staged frames to classify");

        let side = self.transform.resize_to() as usize;
        let mut pixels = Vec::with_capacity(frames.len() * self.transform.frame_len());
        for path in frames {
            let frame = self
                .transform
                .load(path)
                .with_context(|| format!("Cannot read staged frame '{}'", path.display()))?;
            pixels.extend(frame);
        }

        Ok(Tensor::<B, 1>::from_floats(pixels.as_slice(), &self.device)
            .reshape([1, frames.len(), CHANNELS, side, side]))
    }

    /// Top-k classes for one clip of staged frames.
    pub fn predict(
        &self,
        frames:      &[PathBuf],
        k:           usize,
        class_names: Option<&[String]>,
    ) -> Result<Vec<Prediction>> {
        let clip   = self.clip_tensor(frames)?;
        let logits = self.model.forward(clip);
        tracing::debug!("Logits shape: {:?}", logits.dims());
        top_k(logits, k, class_names)
    }
}

/// Softmax over the single row of `logits` ([1, classes]) and the
/// `k` highest-scoring classes, best first. Equal scores keep
/// class-index order.
pub fn top_k<B: Backend>(
    logits:      Tensor<B, 2>,
    k:           usize,
    class_names: Option<&[String]>,
) -> Result<Vec<Prediction>> {
    let scores: Vec<f32> = softmax(logits, 1)
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| anyhow::anyhow!("Cannot read scores: {e:?}"))?;

    let mut ranked: Vec<(usize, f32)> = scores.into_iter().enumerate().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    Ok(ranked
        .into_iter()
        .take(k)
        .map(|(class_index, score)| Prediction {
            class_index,
            score,
            label: class_names.and_then(|names| names.get(class_index).cloned()),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn logits(values: &[f32]) -> Tensor<TestBackend, 2> {
        Tensor::<TestBackend, 1>::from_floats(values, &Default::default()).reshape([1, values.len()])
    }

    #[test]
    fn test_top_k_orders_by_score() {
        let preds = top_k(logits(&[0.0, 3.0, 1.0, 2.0]), 3, None).unwrap();
        let order: Vec<usize> = preds.iter().map(|p| p.class_index).collect();
        assert_eq!(order, vec![1, 3, 2]);
        assert!(preds[0].score > preds[1].score);
    }

    #[test]
    fn test_scores_are_probabilities() {
        let preds = top_k(logits(&[1.0, 1.0, 1.0, 1.0]), 10, None).unwrap();
        // Fewer classes than k → every class
        assert_eq!(preds.len(), 4);
        let total: f32 = preds.iter().map(|p| p.score).sum();
        assert!((total - 1.0).abs() < 1e-5);
        // Ties keep index order
        assert_eq!(preds[0].class_index, 0);
    }

    #[test]
    fn test_class_names_attached() {
        let names = vec!["walk".to_string(), "run".to_string()];
        let preds = top_k(logits(&[0.0, 5.0]), 1, Some(names.as_slice())).unwrap();
        assert_eq!(preds[0].label.as_deref(), Some("run"));
    }
}
