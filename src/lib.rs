//! XResNet image backbones for [burn](https://burn.dev).
//!
//! A ResNet variant with a three-convolution stem, average-pooled
//! downsampling shortcuts and zero-initialized residual branches, with
//! configurable bottleneck expansion and named presets:
//!
//! ```ignore
//! use xresnet_burn::encoder::xresnet::{xresnet, XResNetPreset};
//!
//! let model = xresnet::<B>("xresnet50_deep", false, 128, &device)?;
//! let embedding = model.forward_embedding(images);
//!
//! let config = XResNetPreset::XResNet18.config().with_in_channels(5);
//! let model = config.init::<B>(&device);
//! ```

pub mod encoder;
pub mod error;
pub mod norm;
pub mod pool;

pub use error::{Result, XResNetError};
