//! Compression codec implementations.
//!
//! Each codec is a named, bounded-level, reversible byte transform:
//!
//! - **LZ4**: ultra-fast, moderate ratio, levels 1-12
//! - **Zstd**: high ratio, levels 1-22 (feature `zstd`)
//! - **Snappy**: fast, single fixed level (feature `snappy`)
//!
//! Codecs report availability at runtime so a registry built against a
//! feature-reduced binary can skip what the build does not carry. Level
//! validation happens at construction and fails fast with
//! [`CompressionError::InvalidLevel`].

use crate::error::{CompressionError, Result};
use std::ops::RangeInclusive;

/// A named, leveled, reversible byte transform.
///
/// `decompress(compress(x)) == x` must hold exactly for every input,
/// including empty input.
pub trait Codec: Send + Sync {
    /// Codec name as carried in payload descriptors (e.g. "lz4").
    fn name(&self) -> &'static str;

    /// Current compression level.
    fn level(&self) -> i32;

    /// Valid level range for this codec.
    fn level_range(&self) -> RangeInclusive<i32>;

    /// Whether the underlying capability is compiled into this build.
    fn is_available(&self) -> bool;

    /// Compress `data`.
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Decompress `data` previously produced by [`Codec::compress`].
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>>;
}

fn check_level(codec: &'static str, level: i32, range: &RangeInclusive<i32>) -> Result<()> {
    if range.contains(&level) {
        Ok(())
    } else {
        Err(CompressionError::InvalidLevel {
            codec,
            level,
            min: *range.start(),
            max: *range.end(),
        })
    }
}

// ============================================================================
// LZ4
// ============================================================================

/// LZ4 block codec, levels 1-12.
///
/// Frames are size-prepended so decompression needs no external size hint.
#[derive(Debug, Clone)]
pub struct Lz4Codec {
    level: i32,
}

impl Lz4Codec {
    pub const NAME: &'static str = "lz4";
    pub const LEVELS: RangeInclusive<i32> = 1..=12;

    /// Create with the default level (1, fastest).
    pub fn new() -> Self {
        Self { level: 1 }
    }

    /// Create with an explicit level, validating the range.
    pub fn with_level(level: i32) -> Result<Self> {
        check_level(Self::NAME, level, &Self::LEVELS)?;
        Ok(Self { level })
    }
}

impl Default for Lz4Codec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for Lz4Codec {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn level(&self) -> i32 {
        self.level
    }

    fn level_range(&self) -> RangeInclusive<i32> {
        Self::LEVELS
    }

    fn is_available(&self) -> bool {
        true
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mode = if self.level <= 1 {
            lz4::block::CompressionMode::DEFAULT
        } else {
            lz4::block::CompressionMode::HIGHCOMPRESSION(self.level)
        };
        lz4::block::compress(data, Some(mode), true)
            .map_err(|e| CompressionError::codec(Self::NAME, e.to_string()))
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        // Size is read from the prepended header.
        lz4::block::decompress(data, None)
            .map_err(|e| CompressionError::codec(Self::NAME, e.to_string()))
    }
}

// ============================================================================
// Zstd
// ============================================================================

/// Zstandard codec, levels 1-22.
#[derive(Debug, Clone)]
pub struct ZstdCodec {
    level: i32,
}

impl ZstdCodec {
    pub const NAME: &'static str = "zstd";
    pub const LEVELS: RangeInclusive<i32> = 1..=22;

    /// Create with the default level (3, the zstd default).
    pub fn new() -> Self {
        Self { level: 3 }
    }

    /// Create with an explicit level, validating the range.
    pub fn with_level(level: i32) -> Result<Self> {
        check_level(Self::NAME, level, &Self::LEVELS)?;
        Ok(Self { level })
    }
}

impl Default for ZstdCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for ZstdCodec {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn level(&self) -> i32 {
        self.level
    }

    fn level_range(&self) -> RangeInclusive<i32> {
        Self::LEVELS
    }

    fn is_available(&self) -> bool {
        cfg!(feature = "zstd")
    }

    #[cfg(feature = "zstd")]
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        zstd::bulk::compress(data, self.level)
            .map_err(|e| CompressionError::codec(Self::NAME, e.to_string()))
    }

    #[cfg(not(feature = "zstd"))]
    fn compress(&self, _data: &[u8]) -> Result<Vec<u8>> {
        Err(CompressionError::Unavailable(Self::NAME.to_string()))
    }

    #[cfg(feature = "zstd")]
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        zstd::stream::decode_all(data)
            .map_err(|e| CompressionError::codec(Self::NAME, e.to_string()))
    }

    #[cfg(not(feature = "zstd"))]
    fn decompress(&self, _data: &[u8]) -> Result<Vec<u8>> {
        Err(CompressionError::Unavailable(Self::NAME.to_string()))
    }
}

// ============================================================================
// Snappy
// ============================================================================

/// Snappy raw codec. Snappy has no tunable level; the range is the
/// degenerate 1..=1.
#[derive(Debug, Clone, Default)]
pub struct SnappyCodec;

impl SnappyCodec {
    pub const NAME: &'static str = "snappy";
    pub const LEVELS: RangeInclusive<i32> = 1..=1;

    pub fn new() -> Self {
        Self
    }

    /// Create with an explicit level; anything other than 1 is rejected.
    pub fn with_level(level: i32) -> Result<Self> {
        check_level(Self::NAME, level, &Self::LEVELS)?;
        Ok(Self)
    }
}

impl Codec for SnappyCodec {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn level(&self) -> i32 {
        1
    }

    fn level_range(&self) -> RangeInclusive<i32> {
        Self::LEVELS
    }

    fn is_available(&self) -> bool {
        cfg!(feature = "snappy")
    }

    #[cfg(feature = "snappy")]
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        snap::raw::Encoder::new()
            .compress_vec(data)
            .map_err(|e| CompressionError::codec(Self::NAME, e.to_string()))
    }

    #[cfg(not(feature = "snappy"))]
    fn compress(&self, _data: &[u8]) -> Result<Vec<u8>> {
        Err(CompressionError::Unavailable(Self::NAME.to_string()))
    }

    #[cfg(feature = "snappy")]
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        snap::raw::Decoder::new()
            .decompress_vec(data)
            .map_err(|e| CompressionError::codec(Self::NAME, e.to_string()))
    }

    #[cfg(not(feature = "snappy"))]
    fn decompress(&self, _data: &[u8]) -> Result<Vec<u8>> {
        Err(CompressionError::Unavailable(Self::NAME.to_string()))
    }
}
