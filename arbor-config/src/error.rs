// Configuration failures

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing configuration key `{0}`")]
    MissingKey(String),

    #[error("cannot load configuration: {0}")]
    Load(String),

    #[error("unsupported configuration format `{0}`")]
    UnsupportedFormat(String),

    #[error("malformed configuration: {0}")]
    Parse(String),

    /// Values parsed but do not fit the target type.
    #[error("configuration has the wrong shape: {0}")]
    Shape(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Env(#[from] std::env::VarError),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

impl From<ConfigError> for arbor_core::Error {
    fn from(err: ConfigError) -> Self {
        arbor_core::Error::Configuration(err.to_string())
    }
}
