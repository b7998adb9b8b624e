//! Error types for the screenshot service

use thiserror::Error;

/// Result type alias for service operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while producing a screenshot.
///
/// The type is `Clone` because a single render outcome is fanned out to
/// every request waiting on the same in-flight render.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// The requested URL could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The rendering engine failed to start, crashed, or exited with an error
    #[error("Render engine unavailable: {0}")]
    EngineUnavailable(String),

    /// The rendering engine did not complete within the configured bound
    #[error("Render timed out after {0}ms")]
    RenderTimeout(u64),

    /// The engine exited cleanly but left no usable artifact behind
    #[error("Render produced no artifact")]
    NoArtifactProduced,

    /// No worker slot became available within the configured wait bound
    #[error("Worker pool exhausted, gave up after {0}ms")]
    PoolExhausted(u64),

    /// Reading or writing the on-disk cache failed
    #[error("Cache error: {0}")]
    Cache(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the condition is transient and worth retrying as-is.
    ///
    /// Pool exhaustion clears up on its own once in-flight renders finish;
    /// the other kinds need a change (different URL, engine fixed) first.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::PoolExhausted(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Cache(err.to_string())
    }
}
