mod block;
mod conv_layer;
mod init;
mod presets;
pub mod xresnet;

pub use block::*;
pub use conv_layer::*;
pub use presets::*;
pub use xresnet::*;
