use burn::{
    module::Module,
    nn::{BatchNorm, BatchNormConfig, InstanceNorm, InstanceNormConfig},
    tensor::{backend::Backend, Tensor},
};

/// Normalization layer family used after every convolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum NormKind {
    #[default]
    Batch,
    /// Instance norm without affine parameters.
    Instance,
}

impl NormKind {
    /// Build a norm layer over `num_features` channels.
    ///
    /// With `zero_init`, a batch norm starts with its scale at zero, so the
    /// branch it closes contributes nothing until trained. Instance norm has
    /// no scale and ignores the flag.
    pub fn init<B: Backend>(
        &self,
        num_features: usize,
        zero_init: bool,
        device: &B::Device,
    ) -> Norm<B> {
        match self {
            Self::Batch => {
                let mut norm = BatchNormConfig::new(num_features).init(device);
                if zero_init {
                    norm.gamma = norm.gamma.map(|gamma| gamma.zeros_like());
                }
                Norm::Batch(norm)
            }
            Self::Instance => Norm::Instance(
                InstanceNormConfig::new(num_features)
                    .with_affine(false)
                    .init(device),
            ),
        }
    }
}

#[derive(Module, Debug)]
pub enum Norm<B: Backend> {
    Batch(BatchNorm<B, 2>),
    Instance(InstanceNorm<B>),
}

impl<B: Backend> Norm<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        match self {
            Self::Batch(norm) => norm.forward(x),
            Self::Instance(norm) => norm.forward(x),
        }
    }
}
