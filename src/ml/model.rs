// ============================================================
// Layer 5 — Model Selection
// ============================================================
// Every architecture is an ActionClassifier:
//
//   clips [N, K, C, H, W]  ──►  logits [N, num_classes]
//
// ModelSpec is the tagged description of which architecture to
// build and with which arguments. It is what the CLI produces,
// what train_config.json stores, and what inference reads back
// to rebuild the same network before loading weights.
//
//   {"model_name": "lrcn", "latent_dim": 512, ...}
//   {"model_name": "c3d",  "dropout": 0.5, ...}

use anyhow::{ensure, Result};
use burn::{
    nn::loss::CrossEntropyLossConfig,
    prelude::*,
};
use serde::{Deserialize, Serialize};

use crate::domain::clip::SamplingPolicy;
use crate::ml::{c3d::C3dConfig, lrcn::LrcnConfig};

/// Frames per clip the LRCN reads
pub const LRCN_FRAMES: usize = 5;
/// Frames per clip the C3D reads
pub const C3D_FRAMES:  usize = 16;

// ─── ActionClassifier ─────────────────────────────────────────────────────────
pub trait ActionClassifier<B: Backend>: Module<B> {
    /// clips: [N, K, C, H, W] → logits: [N, num_classes]
    fn forward(&self, clips: Tensor<B, 5>) -> Tensor<B, 2>;
}

/// Forward pass plus mean cross-entropy against `labels`.
pub fn forward_loss<B: Backend, M: ActionClassifier<B>>(
    model:  &M,
    clips:  Tensor<B, 5>,
    labels: Tensor<B, 1, Int>,
) -> (Tensor<B, 1>, Tensor<B, 2>) {
    let logits = model.forward(clips);
    let loss   = CrossEntropyLossConfig::new()
        .init(&logits.device())
        .forward(logits.clone(), labels);
    (loss, logits)
}

// ─── ModelSpec ────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model_name", rename_all = "lowercase")]
pub enum ModelSpec {
    /// CNN frame encoder + stacked LSTM
    Lrcn(LrcnArgs),

    /// 3D convolutions over the whole clip
    C3d(C3dArgs),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LrcnArgs {
    pub latent_dim:  usize,
    pub hidden_size: usize,
    pub lstm_layers: usize,
    pub dropout:     f64,
    pub resize_to:   u32,
}

impl Default for LrcnArgs {
    fn default() -> Self {
        Self { latent_dim: 512, hidden_size: 256, lstm_layers: 2, dropout: 0.5, resize_to: 256 }
    }
}

impl LrcnArgs {
    pub fn config(&self, num_classes: usize) -> LrcnConfig {
        LrcnConfig::new(num_classes)
            .with_latent_dim(self.latent_dim)
            .with_hidden_size(self.hidden_size)
            .with_lstm_layers(self.lstm_layers)
            .with_dropout(self.dropout)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct C3dArgs {
    pub dropout:   f64,
    pub resize_to: u32,
}

impl Default for C3dArgs {
    fn default() -> Self {
        Self { dropout: 0.5, resize_to: 112 }
    }
}

impl C3dArgs {
    pub fn config(&self, num_classes: usize) -> C3dConfig {
        C3dConfig::new(num_classes).with_dropout(self.dropout)
    }
}

impl ModelSpec {
    /// Name used for staging directories and logs
    pub fn name(&self) -> &'static str {
        match self {
            ModelSpec::Lrcn(_) => "lrcn",
            ModelSpec::C3d(_)  => "c3d",
        }
    }

    pub fn resize_to(&self) -> u32 {
        match self {
            ModelSpec::Lrcn(args) => args.resize_to,
            ModelSpec::C3d(args)  => args.resize_to,
        }
    }

    /// Sequence length K the architecture is trained on
    pub fn frames_per_clip(&self) -> usize {
        match self {
            ModelSpec::Lrcn(_) => LRCN_FRAMES,
            ModelSpec::C3d(_)  => C3D_FRAMES,
        }
    }

    /// How deployment samples frames from a raw video for this model
    pub fn sampling_policy(&self) -> SamplingPolicy {
        match self {
            ModelSpec::Lrcn(_) => SamplingPolicy::Uniform { frames: LRCN_FRAMES, resize: 256 },
            ModelSpec::C3d(_)  => SamplingPolicy::RandomWindow { frames: C3D_FRAMES },
        }
    }

    /// Reject argument combinations that can't build a network.
    pub fn validate(&self) -> Result<()> {
        match self {
            ModelSpec::Lrcn(args) => {
                ensure!(args.latent_dim > 0, "latent_dim must be positive");
                ensure!(args.hidden_size > 0, "hidden_size must be positive");
                ensure!(args.lstm_layers > 0, "lstm_layers must be at least 1");
                validate_dropout(args.dropout)?;
                validate_resize(args.resize_to)?;
            }
            ModelSpec::C3d(args) => {
                validate_dropout(args.dropout)?;
                validate_resize(args.resize_to)?;
            }
        }
        Ok(())
    }
}

fn validate_dropout(dropout: f64) -> Result<()> {
    ensure!((0.0..1.0).contains(&dropout), "dropout must be in [0, 1), got {}", dropout);
    Ok(())
}

fn validate_resize(resize_to: u32) -> Result<()> {
    // Three stride-2 stages need at least 8 pixels per side
    ensure!(resize_to >= 8, "resize_to must be at least 8, got {}", resize_to);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_is_tagged_by_model_name() {
        let spec = ModelSpec::C3d(C3dArgs::default());
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["model_name"], "c3d");
        assert_eq!(json["resize_to"], 112);

        let back: ModelSpec = serde_json::from_value(json).unwrap();
        assert_eq!(back, spec);
    }

    #[test]
    fn test_defaults_follow_architecture() {
        let lrcn = ModelSpec::Lrcn(LrcnArgs::default());
        assert_eq!(lrcn.name(), "lrcn");
        assert_eq!(lrcn.resize_to(), 256);
        assert_eq!(lrcn.frames_per_clip(), 5);
        assert_eq!(lrcn.sampling_policy(), SamplingPolicy::Uniform { frames: 5, resize: 256 });

        let c3d = ModelSpec::C3d(C3dArgs::default());
        assert_eq!(c3d.frames_per_clip(), 16);
        assert_eq!(c3d.sampling_policy(), SamplingPolicy::RandomWindow { frames: 16 });
    }

    #[test]
    fn test_validate_rejects_bad_arguments() {
        assert!(ModelSpec::Lrcn(LrcnArgs::default()).validate().is_ok());
        assert!(ModelSpec::C3d(C3dArgs { dropout: 1.0, resize_to: 112 }).validate().is_err());
        assert!(ModelSpec::Lrcn(LrcnArgs { lstm_layers: 0, ..LrcnArgs::default() }).validate().is_err());
        assert!(ModelSpec::C3d(C3dArgs { dropout: 0.5, resize_to: 4 }).validate().is_err());
    }

    #[test]
    fn test_args_carry_into_config() {
        let config = LrcnArgs { latent_dim: 64, ..LrcnArgs::default() }.config(101);
        assert_eq!(config.latent_dim, 64);
        assert_eq!(config.num_classes, 101);
    }
}
