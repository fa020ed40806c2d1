//! Codec registry and sampled auto-selection.
//!
//! The [`CompressionManager`] owns an ordered set of codecs and one designated
//! default. Callers either name an algorithm explicitly or let the manager pick
//! the best one by compressing a bounded prefix of the payload with every
//! available codec and keeping the lowest ratio.

use crate::codec::{Codec, Lz4Codec, SnappyCodec, ZstdCodec};
use crate::error::{CompressionError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Number of payload bytes sampled during auto-selection.
pub const SELECTION_SAMPLE_BYTES: usize = 1024;

/// Compression descriptor attached to delivered payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionInfo {
    /// Codec name, required for decompression (no auto-detection).
    pub algorithm: String,
    /// Codec level in effect.
    pub level: i32,
    /// Uncompressed size in bytes.
    pub original_size: u64,
    /// Compressed size in bytes.
    pub compressed_size: u64,
    /// `compressed_size / original_size` rounded to 4 decimals, 0 when the
    /// original was empty.
    pub compression_ratio: f64,
}

/// Output of a compression call: descriptor plus the compressed bytes.
#[derive(Debug, Clone)]
pub struct Compressed {
    pub info: CompressionInfo,
    pub data: Vec<u8>,
}

/// Registration-order status report for one codec.
#[derive(Debug, Clone, Serialize)]
pub struct CodecStatus {
    pub name: &'static str,
    pub available: bool,
    pub level: i32,
}

fn round_ratio(compressed: usize, original: usize) -> f64 {
    if original == 0 {
        0.0
    } else {
        (compressed as f64 / original as f64 * 10_000.0).round() / 10_000.0
    }
}

/// Registry of named codecs with sampled best-codec selection.
pub struct CompressionManager {
    // Vec keeps registration order; order is the tie-break for selection.
    codecs: Vec<Box<dyn Codec>>,
    default: Option<usize>,
}

impl CompressionManager {
    /// Create a manager with the standard codec lineup (lz4, zstd, snappy).
    ///
    /// The default codec is the first available of lz4, zstd, snappy.
    pub fn new() -> Self {
        let mut manager = Self {
            codecs: Vec::new(),
            default: None,
        };
        manager.register(Box::new(Lz4Codec::new()));
        manager.register(Box::new(ZstdCodec::new()));
        manager.register(Box::new(SnappyCodec::new()));

        for name in ["lz4", "zstd", "snappy"] {
            if manager.is_supported(name) {
                // Registered above, cannot fail.
                let _ = manager.set_default(name);
                break;
            }
        }
        manager
    }

    /// Create an empty manager with no codecs registered.
    pub fn empty() -> Self {
        Self {
            codecs: Vec::new(),
            default: None,
        }
    }

    /// Register a codec. A codec with the same name replaces the existing
    /// entry in place, keeping its registration position.
    pub fn register(&mut self, codec: Box<dyn Codec>) {
        if let Some(existing) = self.codecs.iter_mut().find(|c| c.name() == codec.name()) {
            *existing = codec;
        } else {
            self.codecs.push(codec);
        }
    }

    /// Look up a codec by name.
    pub fn get(&self, name: &str) -> Result<&dyn Codec> {
        self.codecs
            .iter()
            .find(|c| c.name() == name)
            .map(|c| c.as_ref())
            .ok_or_else(|| CompressionError::UnsupportedAlgorithm(name.to_string()))
    }

    /// Designate the default codec.
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        let idx = self
            .codecs
            .iter()
            .position(|c| c.name() == name)
            .ok_or_else(|| CompressionError::UnsupportedAlgorithm(name.to_string()))?;
        self.default = Some(idx);
        Ok(())
    }

    /// The designated default codec, if any.
    pub fn default_codec(&self) -> Option<&dyn Codec> {
        self.default.map(|i| self.codecs[i].as_ref())
    }

    /// Whether `name` is registered and available in this build.
    pub fn is_supported(&self, name: &str) -> bool {
        self.get(name).map(|c| c.is_available()).unwrap_or(false)
    }

    /// Names of all registered, available codecs in registration order.
    pub fn supported_algorithms(&self) -> Vec<&'static str> {
        self.codecs
            .iter()
            .filter(|c| c.is_available())
            .map(|c| c.name())
            .collect()
    }

    /// Availability and level for every registered codec.
    pub fn stats(&self) -> Vec<CodecStatus> {
        self.codecs
            .iter()
            .map(|c| CodecStatus {
                name: c.name(),
                available: c.is_available(),
                level: c.level(),
            })
            .collect()
    }

    /// Compress `data` with the named codec, or with the best-sampled codec
    /// when `algorithm` is omitted.
    pub fn compress(&self, data: &[u8], algorithm: Option<&str>) -> Result<Compressed> {
        match algorithm {
            Some(name) => {
                let codec = self.get(name)?;
                if !codec.is_available() {
                    return Err(CompressionError::Unavailable(name.to_string()));
                }
                let compressed = codec.compress(data)?;
                Ok(self.build_output(codec, data.len(), compressed))
            }
            None => self.compress_auto(data),
        }
    }

    /// Decompress `data` with an explicitly named codec. The algorithm must
    /// be carried alongside the payload; there is no auto-detection.
    pub fn decompress(&self, data: &[u8], algorithm: &str) -> Result<Vec<u8>> {
        let codec = self.get(algorithm)?;
        if !codec.is_available() {
            return Err(CompressionError::Unavailable(algorithm.to_string()));
        }
        codec.decompress(data)
    }

    /// Pick the codec with the best sampled ratio on the first
    /// [`SELECTION_SAMPLE_BYTES`] of `data`.
    ///
    /// The running best starts at a baseline ratio of 1.0, so a codec must
    /// strictly improve on 1:1 to win; on equal ratios the earlier-registered
    /// codec keeps the win. Unavailable or failing codecs are skipped. Falls
    /// back to the default codec when nothing qualifies.
    pub fn best_codec(&self, data: &[u8]) -> Result<&dyn Codec> {
        Ok(self.select_best(data)?.0)
    }

    /// Selection plus the winning sample output, so the auto path can reuse
    /// it when the sample covered the whole payload.
    fn select_best(&self, data: &[u8]) -> Result<(&dyn Codec, Option<Vec<u8>>)> {
        let sample = &data[..data.len().min(SELECTION_SAMPLE_BYTES)];

        let mut best: Option<(usize, Vec<u8>)> = None;
        let mut best_ratio = 1.0f64;

        if !sample.is_empty() {
            for (idx, codec) in self.codecs.iter().enumerate() {
                if !codec.is_available() {
                    continue;
                }
                let compressed = match codec.compress(sample) {
                    Ok(c) => c,
                    Err(_) => continue,
                };
                let ratio = compressed.len() as f64 / sample.len() as f64;
                if ratio < best_ratio {
                    best_ratio = ratio;
                    best = Some((idx, compressed));
                }
            }
        }

        match best {
            Some((idx, compressed)) => {
                let codec = self.codecs[idx].as_ref();
                debug!(
                    algorithm = codec.name(),
                    sampled_ratio = best_ratio,
                    sample_bytes = sample.len(),
                    "selected best codec"
                );
                let reusable = (data.len() == sample.len()).then_some(compressed);
                Ok((codec, reusable))
            }
            None => self
                .default_codec()
                .map(|c| (c, None))
                .ok_or(CompressionError::NoCodecAvailable),
        }
    }

    fn compress_auto(&self, data: &[u8]) -> Result<Compressed> {
        let (codec, reusable) = self.select_best(data)?;
        if !codec.is_available() {
            return Err(CompressionError::Unavailable(codec.name().to_string()));
        }
        // When the sample covered the whole payload the selection output is
        // the full compression; skip the second pass.
        let compressed = match reusable {
            Some(bytes) => bytes,
            None => codec.compress(data)?,
        };
        Ok(self.build_output(codec, data.len(), compressed))
    }

    fn build_output(&self, codec: &dyn Codec, original: usize, data: Vec<u8>) -> Compressed {
        Compressed {
            info: CompressionInfo {
                algorithm: codec.name().to_string(),
                level: codec.level(),
                original_size: original as u64,
                compressed_size: data.len() as u64,
                compression_ratio: round_ratio(data.len(), original),
            },
            data,
        }
    }
}

impl Default for CompressionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ops::RangeInclusive;

    /// Codec that "compresses" to a fixed output size, for deterministic
    /// selection tests.
    struct FixedCodec {
        name: &'static str,
        output_len: usize,
        available: bool,
    }

    impl Codec for FixedCodec {
        fn name(&self) -> &'static str {
            self.name
        }
        fn level(&self) -> i32 {
            1
        }
        fn level_range(&self) -> RangeInclusive<i32> {
            1..=1
        }
        fn is_available(&self) -> bool {
            self.available
        }
        fn compress(&self, _data: &[u8]) -> crate::error::Result<Vec<u8>> {
            Ok(vec![0u8; self.output_len])
        }
        fn decompress(&self, _data: &[u8]) -> crate::error::Result<Vec<u8>> {
            Ok(Vec::new())
        }
    }

    fn fixed(name: &'static str, output_len: usize) -> Box<dyn Codec> {
        Box::new(FixedCodec {
            name,
            output_len,
            available: true,
        })
    }

    #[test]
    fn test_default_manager_has_codecs() {
        let manager = CompressionManager::new();
        assert!(manager.is_supported("lz4"));
        assert!(manager.default_codec().is_some());
        assert_eq!(manager.default_codec().unwrap().name(), "lz4");
        assert!(manager
            .supported_algorithms()
            .contains(&"lz4"));
    }

    #[test]
    fn test_unknown_algorithm() {
        let manager = CompressionManager::new();
        assert!(matches!(
            manager.compress(b"data", Some("brotli")),
            Err(CompressionError::UnsupportedAlgorithm(_))
        ));
        assert!(matches!(
            manager.decompress(b"data", "brotli"),
            Err(CompressionError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_named_compress_roundtrip() {
        let manager = CompressionManager::new();
        let data = b"named compression roundtrip payload ".repeat(100);

        let out = manager.compress(&data, Some("lz4")).unwrap();
        assert_eq!(out.info.algorithm, "lz4");
        assert_eq!(out.info.original_size, data.len() as u64);
        assert_eq!(out.info.compressed_size, out.data.len() as u64);
        assert!(out.info.compression_ratio < 1.0);

        let restored = manager.decompress(&out.data, "lz4").unwrap();
        assert_eq!(restored, data);
    }

    #[test]
    fn test_auto_compress_roundtrip() {
        let manager = CompressionManager::new();
        let data = b"auto selection roundtrip payload ".repeat(200);

        let out = manager.compress(&data, None).unwrap();
        let restored = manager.decompress(&out.data, &out.info.algorithm).unwrap();
        assert_eq!(restored, data);
    }

    #[test]
    fn test_ratio_rounding() {
        assert_eq!(round_ratio(0, 0), 0.0);
        assert_eq!(round_ratio(1, 3), 0.3333);
        assert_eq!(round_ratio(2, 3), 0.6667);
        assert_eq!(round_ratio(500, 1000), 0.5);
    }

    #[test]
    fn test_empty_input_ratio_is_zero() {
        let manager = CompressionManager::new();
        let out = manager.compress(b"", Some("lz4")).unwrap();
        assert_eq!(out.info.original_size, 0);
        assert_eq!(out.info.compression_ratio, 0.0);
    }

    #[test]
    fn test_best_codec_prefers_lower_ratio() {
        let mut manager = CompressionManager::empty();
        manager.register(fixed("loose", 900));
        manager.register(fixed("tight", 100));
        manager.set_default("loose").unwrap();

        let data = vec![7u8; 1000];
        let best = manager.best_codec(&data).unwrap();
        assert_eq!(best.name(), "tight");
    }

    #[test]
    fn test_best_codec_tie_goes_to_first_registered() {
        let mut manager = CompressionManager::empty();
        manager.register(fixed("first", 100));
        manager.register(fixed("second", 100));
        manager.set_default("second").unwrap();

        let data = vec![7u8; 1000];
        let best = manager.best_codec(&data).unwrap();
        assert_eq!(best.name(), "first");
    }

    #[test]
    fn test_best_codec_requires_strict_improvement() {
        // Output equal to the sample size: ratio exactly 1.0, no winner.
        let mut manager = CompressionManager::empty();
        manager.register(fixed("noop", 1000));
        manager.register(fixed("fallback", 2000));
        manager.set_default("fallback").unwrap();

        let data = vec![7u8; 1000];
        let best = manager.best_codec(&data).unwrap();
        assert_eq!(best.name(), "fallback");
    }

    #[test]
    fn test_best_codec_skips_unavailable() {
        let mut manager = CompressionManager::empty();
        manager.register(Box::new(FixedCodec {
            name: "ghost",
            output_len: 1,
            available: false,
        }));
        manager.register(fixed("real", 100));
        manager.set_default("real").unwrap();

        let data = vec![7u8; 1000];
        let best = manager.best_codec(&data).unwrap();
        assert_eq!(best.name(), "real");
    }

    #[test]
    fn test_best_codec_samples_only_prefix() {
        // Payload larger than the sample window still selects fine.
        let manager = CompressionManager::new();
        let data = b"prefix sampling payload ".repeat(4096);
        assert!(data.len() > SELECTION_SAMPLE_BYTES);
        let best = manager.best_codec(&data).unwrap();
        assert!(best.is_available());
    }

    #[test]
    fn test_no_codec_available() {
        let manager = CompressionManager::empty();
        assert!(matches!(
            manager.compress(b"data", None),
            Err(CompressionError::NoCodecAvailable)
        ));
    }

    #[test]
    fn test_register_replaces_in_place() {
        let mut manager = CompressionManager::empty();
        manager.register(fixed("a", 10));
        manager.register(fixed("b", 20));
        manager.register(fixed("a", 30));

        let stats = manager.stats();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].name, "a");
        assert_eq!(stats[1].name, "b");
    }

    #[test]
    fn test_stats_report() {
        let manager = CompressionManager::new();
        let stats = manager.stats();
        assert_eq!(stats.len(), 3);
        assert_eq!(stats[0].name, "lz4");
        assert!(stats[0].available);
        assert_eq!(stats[0].level, 1);
    }
}
