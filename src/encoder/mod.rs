pub mod xresnet;

use burn::{
    module::Module,
    tensor::{backend::Backend, Tensor},
};

/// A backbone that exposes its intermediate feature maps.
pub trait Encoder: Module<Self::Backend> {
    type Backend: Backend;

    /// Feature maps from the shallowest to the deepest reduction.
    fn forward_features(&self, x: Tensor<Self::Backend, 4>) -> Vec<Tensor<Self::Backend, 4>>;

    /// Channel count of each map returned by [`Encoder::forward_features`].
    fn feature_channels(&self) -> Vec<usize>;
}
