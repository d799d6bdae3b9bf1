use burn::{
    config::Config,
    module::Module,
    nn::pool::{AvgPool2d, AvgPool2dConfig},
    tensor::{backend::Backend, Tensor},
};

/// Average pooling with ceil-mode output sizing.
///
/// When the windows do not tile the input, a trailing partial window is kept
/// and averaged over its in-bounds elements only.
#[derive(Module, Clone, Debug)]
pub struct CeilAvgPool2d {
    pool: AvgPool2d,
}

impl CeilAvgPool2d {
    pub fn forward<B: Backend>(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let [_, _, height, width] = input.dims();
        let pad_h = ceil_padding(height, self.pool.kernel_size[0], self.pool.stride[0]);
        let pad_w = ceil_padding(width, self.pool.kernel_size[1], self.pool.stride[1]);

        if pad_h == 0 && pad_w == 0 {
            return self.pool.forward(input);
        }

        // Pooling the padded validity mask gives the in-bounds fraction of each window.
        let mask = input.ones_like().pad((0, pad_w, 0, pad_h), 0.0);
        let x = input.pad((0, pad_w, 0, pad_h), 0.0);

        self.pool.forward(x) / self.pool.forward(mask)
    }
}

#[derive(Config, Debug)]
pub struct CeilAvgPool2dConfig {
    kernel_size: [usize; 2],
    strides: [usize; 2],
}

impl CeilAvgPool2dConfig {
    pub fn init(&self) -> CeilAvgPool2d {
        CeilAvgPool2d {
            pool: AvgPool2dConfig::new(self.kernel_size)
                .with_strides(self.strides)
                .init(),
        }
    }
}

/// Trailing padding needed along one axis so ceil-mode pooling covers it.
pub fn ceil_padding(size: usize, kernel: usize, stride: usize) -> usize {
    let out = size.saturating_sub(kernel).div_ceil(stride) + 1;
    (out - 1) * stride + kernel - size
}
