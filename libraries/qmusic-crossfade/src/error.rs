//! Error types for the crossfade controller

use thiserror::Error;

/// Crossfade errors
#[derive(Debug, Error)]
pub enum CrossfadeError {
    /// The player collaborator rejected a volume change
    #[error("Player error: {0}")]
    Player(String),

    /// Configuration failed validation
    #[error("Invalid crossfade config: {0}")]
    InvalidConfig(String),

    /// Controller was constructed outside of a tokio runtime
    #[error("No tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),

    /// A ramp task panicked or was aborted before it could report
    #[error("Ramp task failed: {0}")]
    RampTask(#[from] tokio::task::JoinError),
}

/// Result type for crossfade operations
pub type Result<T> = std::result::Result<T, CrossfadeError>;
