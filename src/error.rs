use thiserror::Error as ThisError;

pub type OpaqueError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(ThisError, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("no interface matches `{0}`")]
    NoInterface(String),
    #[error("failed to open interface {interface}, reason: {source}")]
    Open {
        interface: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read captured traffic, reason: {0}")]
    Capture(#[source] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Opaque(#[from] OpaqueError),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("harshness must be a positive integer")]
    ZeroHarshness,
    #[error("unknown harshness `{0}`, expected slow, normal, fast, max or a positive integer")]
    UnknownHarshness(String),
    #[error("send repeat must be at least 1")]
    ZeroSendRepeat,
}
