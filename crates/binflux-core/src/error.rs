//! Error types for the compression layer.

use thiserror::Error;

/// Compression-related errors.
#[derive(Debug, Error)]
pub enum CompressionError {
    /// Requested level is outside the codec's valid range.
    #[error("invalid {codec} level {level}: must be between {min} and {max}")]
    InvalidLevel {
        codec: &'static str,
        level: i32,
        min: i32,
        max: i32,
    },

    /// Algorithm name not present in the registry.
    #[error("unsupported compression algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Codec is registered but not compiled into this build.
    #[error("compression algorithm '{0}' is not available in this build")]
    Unavailable(String),

    /// No registered codec is usable.
    #[error("no compression codec available")]
    NoCodecAvailable,

    /// Backend failure during compress or decompress.
    #[error("{codec} codec error: {reason}")]
    Codec { codec: &'static str, reason: String },

    /// I/O error from a streaming backend.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CompressionError {
    /// Create a new backend codec error.
    pub fn codec(codec: &'static str, reason: impl Into<String>) -> Self {
        Self::Codec {
            codec,
            reason: reason.into(),
        }
    }
}

/// Result type for compression operations.
pub type Result<T> = std::result::Result<T, CompressionError>;
