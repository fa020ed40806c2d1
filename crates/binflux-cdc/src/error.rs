//! Error types for the batching pipeline.

use binflux_core::CompressionError;
use thiserror::Error;

/// Pipeline-specific errors.
///
/// Errors arising inside a flush (compression, serialization, sink push) are
/// caught at the flush boundary and reported through notifications; only
/// construction-time errors reach callers directly.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Invalid configuration, surfaced at construction.
    #[error("configuration error: {0}")]
    Config(String),

    /// Event-to-bytes conversion failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Codec failure during compress/decompress.
    #[error("compression error: {0}")]
    Compression(#[from] CompressionError),

    /// Downstream push failure.
    #[error("sink error: {0}")]
    Sink(String),

    /// Sink push exceeded the configured deadline.
    #[error("sink timeout: {0}")]
    Timeout(String),

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

impl PipelineError {
    /// Create a new config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new sink error.
    pub fn sink(msg: impl Into<String>) -> Self {
        Self::Sink(msg.into())
    }

    /// Create a new timeout error.
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a generic error.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
