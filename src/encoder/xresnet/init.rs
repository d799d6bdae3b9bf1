use core::f64::consts::SQRT_2;

use burn::{
    nn::{Initializer, Linear, LinearConfig},
    tensor::backend::Backend,
};

/// Kaiming normal over fan-in, with the ReLU gain.
pub(crate) fn kaiming_normal() -> Initializer {
    Initializer::KaimingNormal {
        gain: SQRT_2,
        fan_out_only: false,
    }
}

/// A Kaiming-initialized linear layer whose bias starts at zero.
pub(crate) fn init_linear<B: Backend>(
    d_input: usize,
    d_output: usize,
    device: &B::Device,
) -> Linear<B> {
    let mut linear = LinearConfig::new(d_input, d_output)
        .with_initializer(kaiming_normal())
        .init(device);
    linear.bias = linear
        .bias
        .map(|bias| bias.map(|tensor| tensor.zeros_like()));
    linear
}
