// ============================================================
// Layer 5 — LRCN (Long-term Recurrent Convolutional Network)
// ============================================================
// Encode every frame with a small CNN, run the sequence of
// frame embeddings through stacked LSTMs, classify the mean
// hidden state.
//
//   [N, K, 3, H, W]
//     │ fold time into batch        → [N·K, 3, H, W]
//     │ 3 × (conv 3×3 /2, BN, ReLU) → [N·K, 128, H/8, W/8]
//     │ adaptive avg pool           → [N·K, 128]
//     │ linear + ReLU               → [N·K, latent_dim]
//     │ unfold time                 → [N, K, latent_dim]
//     │ LSTM × lstm_layers          → [N, K, hidden_size]
//     │ mean over K, dropout
//     ▼ linear                      → [N, num_classes]
//
// Reference: Donahue et al. (2015) Long-term Recurrent
//            Convolutional Networks for Visual Recognition

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig},
        BatchNorm, BatchNormConfig,
        Dropout, DropoutConfig,
        Linear, LinearConfig,
        Lstm, LstmConfig,
        PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::relu,
};

use crate::ml::model::ActionClassifier;

const ENCODER_CHANNELS: [usize; 4] = [3, 32, 64, 128];

#[derive(Config, Debug)]
pub struct LrcnConfig {
    pub num_classes: usize,
    #[config(default = 512)]
    pub latent_dim:  usize,
    #[config(default = 256)]
    pub hidden_size: usize,
    #[config(default = 2)]
    pub lstm_layers: usize,
    #[config(default = 0.5)]
    pub dropout:     f64,
}

impl LrcnConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Lrcn<B> {
        let encoder = ENCODER_CHANNELS
            .windows(2)
            .map(|pair| ConvBlock::new([pair[0], pair[1]], device))
            .collect();
        let pool      = AdaptiveAvgPool2dConfig::new([1, 1]).init();
        let embedding = LinearConfig::new(ENCODER_CHANNELS[3], self.latent_dim).init(device);

        let lstm = (0..self.lstm_layers)
            .map(|layer| {
                let d_input = if layer == 0 { self.latent_dim } else { self.hidden_size };
                LstmConfig::new(d_input, self.hidden_size, true).init(device)
            })
            .collect();

        Lrcn {
            encoder,
            pool,
            embedding,
            lstm,
            dropout: DropoutConfig::new(self.dropout).init(),
            head:    LinearConfig::new(self.hidden_size, self.num_classes).init(device),
        }
    }
}

// ─── Frame encoder block ──────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    conv: Conv2d<B>,
    norm: BatchNorm<B, 2>,
}

impl<B: Backend> ConvBlock<B> {
    fn new(channels: [usize; 2], device: &B::Device) -> Self {
        let conv = Conv2dConfig::new(channels, [3, 3])
            .with_stride([2, 2])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init(device);
        let norm = BatchNormConfig::new(channels[1]).init(device);
        Self { conv, norm }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        relu(self.norm.forward(self.conv.forward(x)))
    }
}

// ─── Lrcn ─────────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct Lrcn<B: Backend> {
    encoder:   Vec<ConvBlock<B>>,
    pool:      AdaptiveAvgPool2d,
    embedding: Linear<B>,
    lstm:      Vec<Lstm<B>>,
    dropout:   Dropout,
    head:      Linear<B>,
}

impl<B: Backend> Lrcn<B> {
    /// Per-frame embeddings: [N·K, C, H, W] → [N·K, latent_dim]
    fn encode_frames(&self, frames: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = frames;
        for block in &self.encoder {
            x = block.forward(x);
        }
        let [batch, channels, _, _] = x.dims();
        let x = self.pool.forward(x).reshape([batch, channels]);
        relu(self.embedding.forward(x))
    }
}

impl<B: Backend> ActionClassifier<B> for Lrcn<B> {
    fn forward(&self, clips: Tensor<B, 5>) -> Tensor<B, 2> {
        let [n, k, c, h, w] = clips.dims();

        let latent = self.encode_frames(clips.reshape([n * k, c, h, w]));
        let [_, latent_dim] = latent.dims();
        let mut seq = latent.reshape([n, k, latent_dim]);

        for layer in &self.lstm {
            let (output, _state) = layer.forward(seq, None);
            seq = output;
        }

        let [_, _, hidden] = seq.dims();
        let pooled = seq.mean_dim(1).reshape([n, hidden]);
        self.head.forward(self.dropout.forward(pooled))
    }
}
