//! Processor configuration.
//!
//! Every knob of the batching pipeline in one serde-deserializable struct,
//! with a builder for programmatic construction and fail-fast validation.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which compression algorithm the processor applies at flush time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AlgorithmChoice {
    /// Benchmark registered codecs against a payload sample and pick the
    /// best compressor per batch.
    #[default]
    Auto,
    /// Always use the named codec.
    #[serde(untagged)]
    Fixed(String),
}

impl AlgorithmChoice {
    /// The fixed codec name, if any.
    pub fn fixed(&self) -> Option<&str> {
        match self {
            AlgorithmChoice::Auto => None,
            AlgorithmChoice::Fixed(name) => Some(name),
        }
    }
}

/// Configuration for a [`BatchProcessor`](crate::processor::BatchProcessor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Maximum events per batch
    pub batch_size: usize,
    /// Maximum serialized event bytes per batch
    pub batch_memory: usize,
    /// Maximum age of an open batch before a timeout flush
    #[serde(with = "duration_secs")]
    pub batch_timeout: Duration,
    /// Whether flush-time compression is attempted at all
    pub compression_enabled: bool,
    /// Fixed codec name, or auto-selection per batch
    pub compression_algorithm: AlgorithmChoice,
    /// Minimum serialized event bytes before compression is worth it
    pub compression_threshold: usize,
    /// Whether payloads are pushed to the sink (disabled = build-and-drop)
    pub queue_enabled: bool,
    /// Connection name passed through to the sink
    pub queue_connection: String,
    /// Queue name passed through to the sink
    pub queue_name: String,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            batch_memory: 1024 * 1024,
            batch_timeout: Duration::from_secs(5),
            compression_enabled: true,
            compression_algorithm: AlgorithmChoice::Auto,
            compression_threshold: 1024,
            queue_enabled: true,
            queue_connection: "default".to_string(),
            queue_name: "binlog_batch".to_string(),
        }
    }
}

impl ProcessorConfig {
    pub fn builder() -> ProcessorConfigBuilder {
        ProcessorConfigBuilder::default()
    }

    /// Check the configuration for values the pipeline cannot run with.
    ///
    /// A fixed compression algorithm is validated against the manager's
    /// registry at processor construction, where the codec set is known.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(PipelineError::config("batch_size must be at least 1"));
        }
        if self.batch_memory == 0 {
            return Err(PipelineError::config("batch_memory must be at least 1 byte"));
        }
        if let Some(name) = self.compression_algorithm.fixed() {
            if name.is_empty() {
                return Err(PipelineError::config(
                    "compression_algorithm must be \"auto\" or a codec name",
                ));
            }
        }
        Ok(())
    }
}

/// Builder for [`ProcessorConfig`].
#[derive(Debug, Clone, Default)]
pub struct ProcessorConfigBuilder {
    config: ProcessorConfig,
}

impl ProcessorConfigBuilder {
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = batch_size;
        self
    }

    pub fn batch_memory(mut self, bytes: usize) -> Self {
        self.config.batch_memory = bytes;
        self
    }

    pub fn batch_timeout(mut self, timeout: Duration) -> Self {
        self.config.batch_timeout = timeout;
        self
    }

    pub fn compression_enabled(mut self, enabled: bool) -> Self {
        self.config.compression_enabled = enabled;
        self
    }

    /// Pin compression to a single codec instead of per-batch selection.
    pub fn compression_algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.config.compression_algorithm = AlgorithmChoice::Fixed(algorithm.into());
        self
    }

    pub fn compression_auto(mut self) -> Self {
        self.config.compression_algorithm = AlgorithmChoice::Auto;
        self
    }

    pub fn compression_threshold(mut self, bytes: usize) -> Self {
        self.config.compression_threshold = bytes;
        self
    }

    pub fn queue_enabled(mut self, enabled: bool) -> Self {
        self.config.queue_enabled = enabled;
        self
    }

    pub fn queue_connection(mut self, connection: impl Into<String>) -> Self {
        self.config.queue_connection = connection.into();
        self
    }

    pub fn queue_name(mut self, name: impl Into<String>) -> Self {
        self.config.queue_name = name.into();
        self
    }

    /// Validate and return the configuration.
    pub fn build(self) -> Result<ProcessorConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> std::result::Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}
