use core::{fmt, str::FromStr};

use burn::tensor::{backend::Backend, Device};

use crate::error::{Result, XResNetError};

use super::{XResNet, XResNetConfig};

/// The published XResNet variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum XResNetPreset {
    XResNet18,
    XResNet34,
    XResNet50,
    XResNet101,
    XResNet152,
    /// [`XResNetPreset::XResNet18`] with two extra single-block stages.
    XResNet18Deep,
    XResNet34Deep,
    XResNet50Deep,
    /// Same topology as [`XResNetPreset::XResNet18`], kept as a separate name.
    XResNet18C,
}

impl XResNetPreset {
    pub const ALL: [Self; 9] = [
        Self::XResNet18,
        Self::XResNet34,
        Self::XResNet50,
        Self::XResNet101,
        Self::XResNet152,
        Self::XResNet18Deep,
        Self::XResNet34Deep,
        Self::XResNet50Deep,
        Self::XResNet18C,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::XResNet18 => "xresnet18",
            Self::XResNet34 => "xresnet34",
            Self::XResNet50 => "xresnet50",
            Self::XResNet101 => "xresnet101",
            Self::XResNet152 => "xresnet152",
            Self::XResNet18Deep => "xresnet18_deep",
            Self::XResNet34Deep => "xresnet34_deep",
            Self::XResNet50Deep => "xresnet50_deep",
            Self::XResNet18C => "xresnet18_c",
        }
    }

    pub fn expansion(&self) -> usize {
        match self {
            Self::XResNet18 | Self::XResNet34 | Self::XResNet18Deep | Self::XResNet34Deep => 1,
            Self::XResNet18C => 1,
            Self::XResNet50 | Self::XResNet101 | Self::XResNet152 | Self::XResNet50Deep => 4,
        }
    }

    /// Residual blocks per stage.
    pub fn layers(&self) -> &'static [usize] {
        match self {
            Self::XResNet18 | Self::XResNet18C => &[2, 2, 2, 2],
            Self::XResNet34 | Self::XResNet50 => &[3, 4, 6, 3],
            Self::XResNet101 => &[3, 4, 23, 3],
            Self::XResNet152 => &[3, 8, 36, 3],
            Self::XResNet18Deep => &[2, 2, 2, 2, 1, 1],
            Self::XResNet34Deep | Self::XResNet50Deep => &[3, 4, 6, 3, 1, 1],
        }
    }

    /// The variant's config, with 3 input channels and 1000 classes.
    pub fn config(&self) -> XResNetConfig {
        XResNetConfig::new(self.expansion(), self.layers().to_vec())
    }

    /// Build the variant with a freshly initialized classifier of `num_classes` outputs.
    ///
    /// No weights are published for this family, so `pretrained` is an error.
    pub fn init<B: Backend>(
        &self,
        pretrained: bool,
        num_classes: usize,
        device: &Device<B>,
    ) -> Result<XResNet<B>> {
        if pretrained {
            tracing::warn!(variant = self.name(), "pretrained weights requested");
            return Err(XResNetError::PretrainedUnavailable(self.name().to_string()));
        }

        self.config().with_num_classes(num_classes).try_init(device)
    }
}

impl fmt::Display for XResNetPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for XResNetPreset {
    type Err = XResNetError;

    fn from_str(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|preset| preset.name() == name)
            .ok_or_else(|| XResNetError::UnknownVariant(name.to_string()))
    }
}

/// Build a named variant, e.g. `xresnet("xresnet50_deep", false, 128, &device)`.
pub fn xresnet<B: Backend>(
    name: &str,
    pretrained: bool,
    num_classes: usize,
    device: &Device<B>,
) -> Result<XResNet<B>> {
    name.parse::<XResNetPreset>()?
        .init(pretrained, num_classes, device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::Tensor;
    use std::collections::HashSet;

    type B = NdArray<f32>;

    #[test]
    fn test_names_round_trip() {
        let names: HashSet<&str> = XResNetPreset::ALL.iter().map(|p| p.name()).collect();
        assert_eq!(names.len(), XResNetPreset::ALL.len());

        for preset in XResNetPreset::ALL {
            assert_eq!(preset.to_string().parse::<XResNetPreset>().unwrap(), preset);
        }

        assert!(matches!(
            "xresnet19".parse::<XResNetPreset>(),
            Err(XResNetError::UnknownVariant(name)) if name == "xresnet19"
        ));
    }

    #[test]
    fn test_preset_shapes() {
        let table: [(&str, usize, &[usize], usize); 9] = [
            ("xresnet18", 1, &[2, 2, 2, 2], 512),
            ("xresnet34", 1, &[3, 4, 6, 3], 512),
            ("xresnet50", 4, &[3, 4, 6, 3], 2048),
            ("xresnet101", 4, &[3, 4, 23, 3], 2048),
            ("xresnet152", 4, &[3, 8, 36, 3], 2048),
            ("xresnet18_deep", 1, &[2, 2, 2, 2, 1, 1], 256),
            ("xresnet34_deep", 1, &[3, 4, 6, 3, 1, 1], 256),
            ("xresnet50_deep", 4, &[3, 4, 6, 3, 1, 1], 1024),
            ("xresnet18_c", 1, &[2, 2, 2, 2], 512),
        ];

        for (name, expansion, layers, embedding_dim) in table {
            let config = name.parse::<XResNetPreset>().unwrap().config();
            assert_eq!(config.expansion, expansion, "{name}");
            assert_eq!(config.layers, layers, "{name}");
            assert_eq!(config.embedding_dim(), embedding_dim, "{name}");
            assert_eq!(config.num_classes, 1000, "{name}");
            assert!(config.validate().is_ok(), "{name}");
        }
    }

    #[test]
    fn test_pretrained_is_unavailable() {
        let device = Default::default();
        let result = xresnet::<B>("xresnet18", true, 10, &device);
        assert!(matches!(
            result,
            Err(XResNetError::PretrainedUnavailable(name)) if name == "xresnet18"
        ));

        let result = xresnet::<B>("resnet18", false, 10, &device);
        assert!(matches!(result, Err(XResNetError::UnknownVariant(_))));
    }

    #[test]
    fn test_xresnet18() {
        let device = Default::default();
        let model = xresnet::<B>("xresnet18", false, 10, &device).unwrap();

        assert_eq!(model.num_stages(), 4);
        let blocks: Vec<usize> = model.stages.iter().map(|s| s.blocks.len()).collect();
        assert_eq!(blocks, vec![2, 2, 2, 2]);

        let y = model.forward(Tensor::ones([2, 3, 64, 64], &device));
        assert_eq!(y.dims(), [2, 10]);
    }

    #[test]
    fn test_xresnet50_deep() {
        let device = Default::default();
        let model = XResNetPreset::XResNet50Deep
            .init::<B>(false, 16, &device)
            .unwrap();

        assert_eq!(model.num_stages(), 6);
        assert_eq!(model.embedding_dim(), 1024);

        let x = Tensor::ones([1, 3, 32, 32], &device);
        assert_eq!(model.forward_embedding(x.clone()).dims(), [1, 1024]);
        assert_eq!(model.forward(x).dims(), [1, 16]);
    }
}
