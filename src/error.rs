use thiserror::Error;

pub type Result<T> = std::result::Result<T, XResNetError>;

#[derive(Debug, Error)]
pub enum XResNetError {
    #[error("unknown xresnet variant `{0}`")]
    UnknownVariant(String),

    #[error("no pretrained weights are available for `{0}`")]
    PretrainedUnavailable(String),

    #[error("invalid xresnet config: {0}")]
    InvalidConfig(String),

    #[error("could not read config file: {0}")]
    ConfigFile(String),
}
