//! Burn models for SWAVE liver ultrasound classification.
//!
//! `SwaveCnn` is a small convolutional classifier: a few conv/relu/max-pool stages,
//! an adaptive average pool to a fixed grid, and a two-layer head producing one
//! logit per class. It is a plain Burn `Module`; training and checkpointing live in
//! the `training` crate.

use burn::module::Module;
use burn::nn;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig};
use burn::tensor::activation::{relu, softmax};
use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};

#[derive(Debug, Clone)]
pub struct SwaveCnnConfig {
    pub num_classes: usize,
    /// Output channels of each conv stage; each stage halves the spatial size.
    pub channels: Vec<usize>,
    /// Side of the grid the features are pooled to before the head.
    pub pooled: usize,
    pub hidden: usize,
    pub dropout: f64,
}

impl Default for SwaveCnnConfig {
    fn default() -> Self {
        Self {
            num_classes: 2,
            channels: vec![16, 32, 64],
            pooled: 4,
            hidden: 64,
            dropout: 0.3,
        }
    }
}

impl SwaveCnnConfig {
    /// Smallest input side that survives every pooling stage.
    pub fn min_input_side(&self) -> usize {
        1 << self.channels.len()
    }
}

#[derive(Debug, Module)]
pub struct SwaveCnn<B: Backend> {
    convs: Vec<Conv2d<B>>,
    pool: MaxPool2d,
    adaptive: AdaptiveAvgPool2d,
    fc1: nn::Linear<B>,
    dropout: nn::Dropout,
    fc2: nn::Linear<B>,
    num_classes: usize,
}

impl<B: Backend> SwaveCnn<B> {
    pub fn new(cfg: SwaveCnnConfig, device: &B::Device) -> Self {
        let mut convs = Vec::with_capacity(cfg.channels.len());
        let mut in_channels = 3;
        for out_channels in &cfg.channels {
            convs.push(
                Conv2dConfig::new([in_channels, *out_channels], [3, 3])
                    .with_padding(nn::PaddingConfig2d::Same)
                    .init(device),
            );
            in_channels = *out_channels;
        }
        let pooled = cfg.pooled.max(1);
        let features = in_channels * pooled * pooled;
        let num_classes = cfg.num_classes.max(1);
        Self {
            convs,
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            adaptive: AdaptiveAvgPool2dConfig::new([pooled, pooled]).init(),
            fc1: nn::LinearConfig::new(features, cfg.hidden).init(device),
            dropout: nn::DropoutConfig::new(cfg.dropout).init(),
            fc2: nn::LinearConfig::new(cfg.hidden, num_classes).init(device),
            num_classes,
        }
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Images `[batch, 3, height, width]` to logits `[batch, num_classes]`.
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = images;
        for conv in &self.convs {
            x = self.pool.forward(relu(conv.forward(x)));
        }
        let x = self.adaptive.forward(x);
        let x: Tensor<B, 2> = x.flatten(1, 3);
        let x = self.dropout.forward(relu(self.fc1.forward(x)));
        self.fc2.forward(x)
    }

    /// Class probabilities `[batch, num_classes]`.
    pub fn probabilities(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        softmax(self.forward(images), 1)
    }

    /// Most likely class per image, shape `[batch]`.
    pub fn predict(&self, images: Tensor<B, 4>) -> Tensor<B, 1, Int> {
        let logits = self.forward(images);
        let batch = logits.dims()[0];
        logits.argmax(1).reshape([batch])
    }
}

pub mod prelude {
    pub use super::{SwaveCnn, SwaveCnnConfig};
}
