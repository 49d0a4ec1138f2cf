//! Error types for frame and detection operations.

use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur in the frame pipeline and detector.
///
/// `Upstream` and `OutputClosed` end a pipeline; inference failures are
/// recovered locally by returning the unannotated input frame.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Upstream read failed: {0}")]
    Upstream(String),

    #[error("Inference failed: {0}")]
    InferenceFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Output rejected frame: {0}")]
    OutputClosed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create an upstream read error (end of stream or transport failure).
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream(message.into())
    }

    /// Create an inference failure error.
    pub fn inference_failed(message: impl Into<String>) -> Self {
        Self::InferenceFailed(message.into())
    }

    /// Create a model not found error.
    pub fn model_not_found(path: impl Into<String>) -> Self {
        Self::ModelNotFound(path.into())
    }

    /// Create an invalid frame error.
    pub fn invalid_frame(message: impl Into<String>) -> Self {
        Self::InvalidFrame(message.into())
    }

    /// Create an output closed error.
    pub fn output_closed(message: impl Into<String>) -> Self {
        Self::OutputClosed(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether this error ends the owning pipeline.
    pub fn is_terminal(&self) -> bool {
        matches!(self, MediaError::Upstream(_) | MediaError::OutputClosed(_))
    }
}
