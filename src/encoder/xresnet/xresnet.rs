use std::path::Path;

use burn::{
    config::Config,
    module::Module,
    nn::{
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        Linear, PaddingConfig2d,
    },
    tensor::{backend::Backend, Device, Tensor},
};

use crate::{
    encoder::Encoder,
    error::XResNetError,
    norm::NormKind,
};

use super::{
    block::{LayerBlock, LayerBlockConfig},
    conv_layer::{ConvLayer, ConvLayerConfig},
    init::init_linear,
};

/// Output widths of the three stem convolutions.
pub const STEM_WIDTHS: [usize; 3] = [32, 32, 64];

/// XResNet: a ResNet with a three-convolution stem, average-pooled shortcuts
/// and zero-initialized residual branches.
#[derive(Module, Debug)]
pub struct XResNet<B: Backend> {
    pub(crate) stem: Vec<ConvLayer<B>>,
    maxpool: MaxPool2d,
    pub(crate) stages: Vec<LayerBlock<B>>,
    avgpool: AdaptiveAvgPool2d,
    pub(crate) fc: Linear<B>,
}

impl<B: Backend> XResNet<B> {
    /// Class logits, `[batch, num_classes]`.
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.forward_embedding(x);
        self.fc.forward(x)
    }

    /// Pooled features ahead of the classifier, `[batch, embedding_dim]`.
    pub fn forward_embedding(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.forward_stem(x);
        let x = self.maxpool.forward(x);
        let x = self.stages.iter().fold(x, |x, stage| stage.forward(x));

        // [B, C, H, W] -> [B, C, 1, 1] -> [B, C]
        let x = self.avgpool.forward(x);
        x.flatten(1, 3)
    }

    fn forward_stem(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.stem.iter().fold(x, |x, conv| conv.forward(x))
    }

    pub fn embedding_dim(&self) -> usize {
        self.fc.weight.dims()[0]
    }

    pub fn num_classes(&self) -> usize {
        self.fc.weight.dims()[1]
    }

    pub fn num_stages(&self) -> usize {
        self.stages.len()
    }

    /// Re-initialize the classifier with the specified number of output classes.
    pub fn with_num_classes(mut self, num_classes: usize) -> Self {
        let device = self.fc.weight.device();
        self.fc = init_linear(self.embedding_dim(), num_classes, &device);
        self
    }
}

impl<B: Backend> Encoder for XResNet<B> {
    type Backend = B;

    fn forward_features(&self, x: Tensor<B, 4>) -> Vec<Tensor<B, 4>> {
        let mut features = Vec::with_capacity(self.stages.len() + 1);

        let x = self.forward_stem(x);
        features.push(x.clone());

        let mut x = self.maxpool.forward(x);
        for stage in &self.stages {
            x = stage.forward(x);
            features.push(x.clone());
        }

        features
    }

    fn feature_channels(&self) -> Vec<usize> {
        let stem = self.stem.last().map(ConvLayer::out_channels);
        let stages = self.stages.iter().map(|stage| {
            stage
                .blocks
                .last()
                .and_then(|block| block.convs.last())
                .map_or(0, ConvLayer::out_channels)
        });
        stem.into_iter().chain(stages).collect()
    }
}

/// [XResNet](XResNet) configuration.
#[derive(Config, Debug)]
pub struct XResNetConfig {
    /// Bottleneck expansion; `1` selects basic blocks.
    pub expansion: usize,
    /// Number of residual blocks in each stage.
    pub layers: Vec<usize>,
    #[config(default = 3)]
    pub in_channels: usize,
    #[config(default = 1000)]
    pub num_classes: usize,
    #[config(default = "NormKind::Batch")]
    pub norm: NormKind,
}

impl XResNetConfig {
    /// Load a config from a JSON file and validate it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, XResNetError> {
        let config =
            Self::load(path).map_err(|err| XResNetError::ConfigFile(format!("{err:?}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), XResNetError> {
        let invalid = |msg: String| Err(XResNetError::InvalidConfig(msg));

        if self.expansion == 0 || STEM_WIDTHS[2] % self.expansion != 0 {
            return invalid(format!(
                "expansion {} must divide the stem width {}",
                self.expansion, STEM_WIDTHS[2]
            ));
        }
        if self.layers.is_empty() {
            return invalid("at least one stage is required".to_string());
        }
        if let Some(idx) = self.layers.iter().position(|&blocks| blocks == 0) {
            return invalid(format!("stage {idx} has no blocks"));
        }
        if self.in_channels == 0 {
            return invalid("in_channels must be positive".to_string());
        }
        if self.num_classes == 0 {
            return invalid("num_classes must be positive".to_string());
        }
        Ok(())
    }

    /// Per-stage widths before expansion, led by the width feeding stage 0.
    ///
    /// `[64 / expansion, 64, 128, 256, 512]`, then `256` for every stage past the fourth.
    pub fn stage_widths(&self) -> Vec<usize> {
        let extra = self.layers.len().saturating_sub(4);
        [STEM_WIDTHS[2] / self.expansion.max(1), 64, 128, 256, 512]
            .into_iter()
            .chain(std::iter::repeat(256).take(extra))
            .collect()
    }

    pub fn embedding_dim(&self) -> usize {
        self.stage_widths()[self.layers.len()] * self.expansion
    }

    /// Channel counts of [`Encoder::forward_features`]: the stem, then each stage.
    pub fn feature_channels(&self) -> Vec<usize> {
        let widths = self.stage_widths();
        std::iter::once(STEM_WIDTHS[2])
            .chain(widths[1..=self.layers.len()].iter().map(|w| w * self.expansion))
            .collect()
    }

    fn stage_configs(&self) -> Vec<LayerBlockConfig> {
        let widths = self.stage_widths();
        self.layers
            .iter()
            .enumerate()
            .map(|(idx, &num_blocks)| {
                let stride = if idx == 0 { 1 } else { 2 };
                LayerBlockConfig::new(
                    num_blocks,
                    self.expansion,
                    widths[idx],
                    widths[idx + 1],
                    stride,
                )
                .with_norm(self.norm)
            })
            .collect()
    }

    /// Initialize a new [XResNet](XResNet) module.
    ///
    /// # Panics
    ///
    /// If the config is invalid; see [`XResNetConfig::try_init`].
    pub fn init<B: Backend>(&self, device: &Device<B>) -> XResNet<B> {
        match self.try_init(device) {
            Ok(model) => model,
            Err(err) => panic!("{err}"),
        }
    }

    pub fn try_init<B: Backend>(&self, device: &Device<B>) -> Result<XResNet<B>, XResNetError> {
        self.validate()?;

        let mut widths = vec![self.in_channels];
        widths.extend(STEM_WIDTHS);
        let stem = widths
            .windows(2)
            .enumerate()
            .map(|(idx, pair)| {
                ConvLayerConfig::new(pair[0], pair[1])
                    .with_stride(if idx == 0 { 2 } else { 1 })
                    .with_norm(self.norm)
                    .init(device)
            })
            .collect();

        let stages = self
            .stage_configs()
            .iter()
            .enumerate()
            .map(|(idx, stage)| {
                tracing::trace!(
                    stage = idx,
                    blocks = stage.num_blocks,
                    out_channels = stage.out_channels(),
                    stride = stage.stride,
                    "building stage"
                );
                stage.init(device)
            })
            .collect();

        let model = XResNet {
            stem,
            maxpool: MaxPool2dConfig::new([3, 3])
                .with_strides([2, 2])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(),
            stages,
            avgpool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            fc: init_linear(self.embedding_dim(), self.num_classes, device),
        };

        tracing::debug!(
            expansion = self.expansion,
            layers = ?self.layers,
            norm = ?self.norm,
            embedding_dim = self.embedding_dim(),
            num_params = model.num_params(),
            "initialized xresnet"
        );

        Ok(model)
    }
}
