/// Host error types
use qmusic_crossfade::CrossfadeError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, HostError>;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Crossfade error: {0}")]
    Crossfade(#[from] CrossfadeError),
}
