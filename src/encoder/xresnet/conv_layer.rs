use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        PaddingConfig2d, Relu,
    },
    prelude::*,
};

use crate::norm::{Norm, NormKind};

use super::init::kaiming_normal;

/// `Conv2d -> Norm -> [ReLU]`, the unit every part of the network is built from.
#[derive(Module, Debug)]
pub struct ConvLayer<B: Backend> {
    pub(crate) conv: Conv2d<B>,
    pub(crate) norm: Norm<B>,
    relu: Option<Relu>,
}

impl<B: Backend> ConvLayer<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.norm.forward(x);

        match &self.relu {
            Some(relu) => relu.forward(x),
            None => x,
        }
    }

    pub fn out_channels(&self) -> usize {
        self.conv.weight.dims()[0]
    }
}

#[derive(Config, Debug)]
pub struct ConvLayerConfig {
    pub in_channels: usize,
    pub out_channels: usize,
    #[config(default = 3)]
    pub kernel_size: usize,
    #[config(default = 1)]
    pub stride: usize,
    /// Start the norm scale at zero.
    #[config(default = false)]
    pub zero_norm: bool,
    #[config(default = true)]
    pub activation: bool,
    #[config(default = "NormKind::Batch")]
    pub norm: NormKind,
}

impl ConvLayerConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ConvLayer<B> {
        let padding = self.kernel_size / 2;

        ConvLayer {
            conv: Conv2dConfig::new(
                [self.in_channels, self.out_channels],
                [self.kernel_size, self.kernel_size],
            )
            .with_stride([self.stride, self.stride])
            .with_padding(PaddingConfig2d::Explicit(padding, padding))
            .with_bias(false)
            .with_initializer(kaiming_normal())
            .init(device),
            norm: self.norm.init(self.out_channels, self.zero_norm, device),
            relu: self.activation.then(Relu::new),
        }
    }
}
