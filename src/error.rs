use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Missing/empty upload, disallowed extension, unusable filename.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Audio bytes could not be parsed; the pipeline stops here.
    #[error("failed to decode audio: {0}")]
    Decode(String),

    /// Feature vector and model parameters disagree on dimensionality.
    /// Indicates a corrupted or mispaired artifact, not bad user input.
    #[error("shape mismatch: expected {expected} dimensions, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// Classifier or scaler artifacts failed to load at startup.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// History or artifact write failure. Recovered locally: the
    /// classification result is still returned to the caller.
    #[error("persistence failure: {0}")]
    Persistence(String),

    #[error("visualization rendering failed: {0}")]
    Render(String),

    #[error("report generation failed: {0}")]
    Report(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Database(#[from] rusqlite::Error),
}
