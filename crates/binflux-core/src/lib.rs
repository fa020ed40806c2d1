//! # binflux-core - Compression layer for binflux
//!
//! Pluggable compression for the change-event delivery pipeline:
//!
//! - [`Codec`] - named, bounded-level, reversible byte transform
//! - [`Lz4Codec`] / [`ZstdCodec`] / [`SnappyCodec`] - concrete codecs
//! - [`CompressionManager`] - registry with sampled best-codec selection
//!
//! ## Example
//!
//! ```rust
//! use binflux_core::CompressionManager;
//!
//! let manager = CompressionManager::new();
//! let data = b"some payload worth compressing ".repeat(100);
//!
//! // Auto-select the best codec by sampling the payload prefix
//! let out = manager.compress(&data, None).unwrap();
//! assert!(out.info.compression_ratio < 1.0);
//!
//! // Decompression always names the algorithm explicitly
//! let restored = manager.decompress(&out.data, &out.info.algorithm).unwrap();
//! assert_eq!(restored, data);
//! ```

mod codec;
mod error;
mod manager;

pub use codec::{Codec, Lz4Codec, SnappyCodec, ZstdCodec};
pub use error::{CompressionError, Result};
pub use manager::{
    CodecStatus, Compressed, CompressionInfo, CompressionManager, SELECTION_SAMPLE_BYTES,
};
