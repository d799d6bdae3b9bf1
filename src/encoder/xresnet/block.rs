use burn::{nn::Relu, prelude::*};

use crate::{
    norm::NormKind,
    pool::{CeilAvgPool2d, CeilAvgPool2dConfig},
};

use super::conv_layer::{ConvLayer, ConvLayerConfig};

/// Residual unit: `relu(convs(x) + idconv(pool(x)))`.
///
/// With `expansion == 1` the branch is two 3x3 convolutions, otherwise a
/// 1x1 / 3x3 / 1x1 bottleneck widening by `expansion`. The last norm of the
/// branch starts at zero, so a fresh block passes its shortcut through.
#[derive(Module, Debug)]
pub struct ResBlock<B: Backend> {
    pub(crate) convs: Vec<ConvLayer<B>>,
    pub(crate) idconv: Option<ConvLayer<B>>,
    pub(crate) pool: Option<CeilAvgPool2d>,
    relu: Relu,
}

impl<B: Backend> ResBlock<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let mut shortcut = x.clone();
        if let Some(pool) = &self.pool {
            shortcut = pool.forward(shortcut);
        }
        if let Some(idconv) = &self.idconv {
            shortcut = idconv.forward(shortcut);
        }

        let out = self.convs.iter().fold(x, |x, conv| conv.forward(x));

        self.relu.forward(out + shortcut)
    }
}

#[derive(Config, Debug)]
pub struct ResBlockConfig {
    pub expansion: usize,
    /// Input planes, before expansion.
    pub in_planes: usize,
    /// Hidden planes; the block outputs `planes * expansion`.
    pub planes: usize,
    #[config(default = 1)]
    pub stride: usize,
    #[config(default = "NormKind::Batch")]
    pub norm: NormKind,
}

impl ResBlockConfig {
    pub fn in_channels(&self) -> usize {
        self.in_planes * self.expansion
    }

    pub fn out_channels(&self) -> usize {
        self.planes * self.expansion
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> ResBlock<B> {
        let ni = self.in_channels();
        let nh = self.planes;
        let nf = self.out_channels();

        let convs = if self.expansion == 1 {
            vec![
                ConvLayerConfig::new(ni, nh)
                    .with_stride(self.stride)
                    .with_norm(self.norm),
                ConvLayerConfig::new(nh, nf)
                    .with_zero_norm(true)
                    .with_activation(false)
                    .with_norm(self.norm),
            ]
        } else {
            vec![
                ConvLayerConfig::new(ni, nh)
                    .with_kernel_size(1)
                    .with_norm(self.norm),
                ConvLayerConfig::new(nh, nh)
                    .with_stride(self.stride)
                    .with_norm(self.norm),
                ConvLayerConfig::new(nh, nf)
                    .with_kernel_size(1)
                    .with_zero_norm(true)
                    .with_activation(false)
                    .with_norm(self.norm),
            ]
        };

        let idconv = (ni != nf).then(|| {
            ConvLayerConfig::new(ni, nf)
                .with_kernel_size(1)
                .with_activation(false)
                .with_norm(self.norm)
                .init(device)
        });

        let pool = (self.stride != 1)
            .then(|| CeilAvgPool2dConfig::new([2, 2], [2, 2]).init());

        ResBlock {
            convs: convs.iter().map(|conv| conv.init(device)).collect(),
            idconv,
            pool,
            relu: Relu::new(),
        }
    }
}

/// A stage: `num_blocks` residual blocks, only the first of which changes
/// width or resolution.
#[derive(Module, Debug)]
pub struct LayerBlock<B: Backend> {
    pub(crate) blocks: Vec<ResBlock<B>>,
}

impl<B: Backend> LayerBlock<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.blocks.iter().fold(x, |x, block| block.forward(x))
    }
}

#[derive(Config, Debug)]
pub struct LayerBlockConfig {
    pub num_blocks: usize,
    pub expansion: usize,
    pub in_planes: usize,
    pub planes: usize,
    pub stride: usize,
    #[config(default = "NormKind::Batch")]
    pub norm: NormKind,
}

impl LayerBlockConfig {
    pub fn out_channels(&self) -> usize {
        self.planes * self.expansion
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> LayerBlock<B> {
        let blocks = (0..self.num_blocks)
            .map(|idx| {
                let (in_planes, stride) = if idx == 0 {
                    (self.in_planes, self.stride)
                } else {
                    (self.planes, 1)
                };
                ResBlockConfig::new(self.expansion, in_planes, self.planes)
                    .with_stride(stride)
                    .with_norm(self.norm)
                    .init(device)
            })
            .collect();

        LayerBlock { blocks }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::{Distribution, ElementConversion};

    type B = NdArray<f32>;

    #[test]
    fn test_basic_block_structure() {
        let device = Default::default();

        let block: ResBlock<B> = ResBlockConfig::new(1, 64, 64).init(&device);
        assert_eq!(block.convs.len(), 2);
        assert!(block.idconv.is_none());
        assert!(block.pool.is_none());

        let block: ResBlock<B> = ResBlockConfig::new(1, 64, 128).with_stride(2).init(&device);
        assert_eq!(block.convs.len(), 2);
        assert_eq!(block.convs[0].conv.weight.dims(), [128, 64, 3, 3]);
        assert_eq!(block.convs[0].conv.stride, [2, 2]);
        assert!(block.idconv.is_some());
        assert!(block.pool.is_some());
    }

    #[test]
    fn test_bottleneck_block_structure() {
        let device = Default::default();

        // First block of the first bottleneck stage: 16 * 4 = 64 in, 64 * 4 = 256 out.
        let block: ResBlock<B> = ResBlockConfig::new(4, 16, 64).init(&device);
        assert_eq!(block.convs.len(), 3);
        assert_eq!(block.convs[0].conv.weight.dims(), [64, 64, 1, 1]);
        assert_eq!(block.convs[1].conv.weight.dims(), [64, 64, 3, 3]);
        assert_eq!(block.convs[2].conv.weight.dims(), [256, 64, 1, 1]);
        assert_eq!(
            block.idconv.as_ref().map(|idconv| idconv.conv.weight.dims()),
            Some([256, 64, 1, 1])
        );
        assert!(block.pool.is_none());

        let y = block.forward(Tensor::ones([1, 64, 7, 7], &device));
        assert_eq!(y.dims(), [1, 256, 7, 7]);
    }

    #[test]
    fn test_downsample_odd_resolution() {
        let device = Default::default();

        let block: ResBlock<B> = ResBlockConfig::new(1, 8, 16).with_stride(2).init(&device);
        let y = block.forward(Tensor::ones([2, 8, 5, 5], &device));
        assert_eq!(y.dims(), [2, 16, 3, 3]);

        let block: ResBlock<B> = ResBlockConfig::new(4, 8, 16).with_stride(2).init(&device);
        let y = block.forward(Tensor::ones([2, 32, 5, 7], &device));
        assert_eq!(y.dims(), [2, 64, 3, 4]);
    }

    #[test]
    fn test_fresh_identity_block_passes_shortcut() {
        let device = Default::default();

        let block: ResBlock<B> = ResBlockConfig::new(1, 8, 8).init(&device);
        let x = Tensor::<B, 4>::random([2, 8, 6, 6], Distribution::Uniform(0.0, 1.0), &device);

        let y = block.forward(x.clone());
        let diff: f32 = (y - x).abs().max().into_scalar().elem();
        assert!(diff < 1e-6, "diff {diff}");
    }

    #[test]
    fn test_layer_block() {
        let device = Default::default();

        let config = LayerBlockConfig::new(3, 1, 64, 128, 2);
        assert_eq!(config.out_channels(), 128);

        let layer: LayerBlock<B> = config.init(&device);
        assert_eq!(layer.blocks.len(), 3);
        assert!(layer.blocks[0].pool.is_some());
        assert!(layer.blocks[0].idconv.is_some());
        for block in &layer.blocks[1..] {
            assert!(block.pool.is_none());
            assert!(block.idconv.is_none());
        }

        let y = layer.forward(Tensor::ones([1, 64, 8, 8], &device));
        assert_eq!(y.dims(), [1, 128, 4, 4]);
    }
}
