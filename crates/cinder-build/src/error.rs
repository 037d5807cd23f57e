use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Why a `cinder.toml` could not be used.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read configuration: {0}")]
    Read(#[from] std::io::Error),

    #[error("malformed configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Well-formed TOML with a value outside its allowed range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
