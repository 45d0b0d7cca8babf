// ============================================================
// Layer 5 — C3D (3D Convolutional Network)
// ============================================================
// Convolves over time and space at once.
//
//   [N, K, 3, H, W] → swap to [N, 3, K, H, W]
//     │ conv3d 3³, stride (1,2,2) + ReLU  → 32 channels
//     │ conv3d 3³, stride (2,2,2) + ReLU  → 64
//     │ conv3d 3³, stride (2,2,2) + ReLU  → 128
//     │ conv3d 3³, stride (2,2,2) + ReLU  → 256
//     │ global average over (K, H, W)     → [N, 256]
//     │ linear + ReLU, dropout
//     ▼ linear                            → [N, num_classes]
//
// The first block keeps the temporal resolution so short
// clips still have depth left for the later blocks.
//
// Reference: Tran et al. (2015) Learning Spatiotemporal
//            Features with 3D Convolutional Networks

use burn::{
    nn::{
        conv::{Conv3d, Conv3dConfig},
        Dropout, DropoutConfig,
        Linear, LinearConfig,
        PaddingConfig3d,
    },
    prelude::*,
    tensor::activation::relu,
};

use crate::ml::model::ActionClassifier;

const CHANNELS: [usize; 5] = [3, 32, 64, 128, 256];

#[derive(Config, Debug)]
pub struct C3dConfig {
    pub num_classes: usize,
    #[config(default = 0.5)]
    pub dropout:     f64,
    #[config(default = 512)]
    pub fc_dim:      usize,
}

impl C3dConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> C3d<B> {
        let blocks = CHANNELS
            .windows(2)
            .enumerate()
            .map(|(i, pair)| {
                let stride = if i == 0 { [1, 2, 2] } else { [2, 2, 2] };
                Conv3dConfig::new([pair[0], pair[1]], [3, 3, 3])
                    .with_stride(stride)
                    .with_padding(PaddingConfig3d::Explicit(1, 1, 1))
                    .init(device)
            })
            .collect();

        C3d {
            blocks,
            fc:      LinearConfig::new(CHANNELS[4], self.fc_dim).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
            head:    LinearConfig::new(self.fc_dim, self.num_classes).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct C3d<B: Backend> {
    blocks:  Vec<Conv3d<B>>,
    fc:      Linear<B>,
    dropout: Dropout,
    head:    Linear<B>,
}

impl<B: Backend> ActionClassifier<B> for C3d<B> {
    fn forward(&self, clips: Tensor<B, 5>) -> Tensor<B, 2> {
        let [n, ..] = clips.dims();

        // Channels before time, as Conv3d expects
        let mut x = clips.swap_dims(1, 2);
        for conv in &self.blocks {
            x = relu(conv.forward(x));
        }

        let [_, channels, ..] = x.dims();
        let x = x.mean_dim(2).mean_dim(3).mean_dim(4).reshape([n, channels]);
        let x = self.dropout.forward(relu(self.fc.forward(x)));
        self.head.forward(x)
    }
}
