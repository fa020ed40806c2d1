//! Delivered payload shape.
//!
//! A [`BatchPayload`] is built exactly once per flush and owned by the sink
//! after hand-off. On the wire it serializes to:
//!
//! ```json
//! {
//!   "batch_id": "batch_9b2f…",
//!   "events": [ … ] | "<base64 blob>",
//!   "stats": { "total_events": 3, "memory_usage": 612, "age_seconds": 1, … },
//!   "compression": null | { "algorithm": "lz4", "level": 1, … },
//!   "created_at": 1705000000
//! }
//! ```

use crate::batch::BatchStats;
use crate::event::ChangeEvent;
use binflux_core::CompressionInfo;
use serde::{Deserialize, Serialize};

/// Event field of a payload: structured list, or an encoded compressed blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PayloadEvents {
    /// Events as a structured list (compression not applied).
    Structured(Vec<ChangeEvent>),
    /// Base64-encoded compressed event list; the algorithm lives in the
    /// payload's compression descriptor.
    Compressed(String),
}

impl PayloadEvents {
    /// Number of structured events, if not compressed.
    pub fn structured_len(&self) -> Option<usize> {
        match self {
            PayloadEvents::Structured(events) => Some(events.len()),
            PayloadEvents::Compressed(_) => None,
        }
    }
}

/// The value handed to the downstream sink, immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPayload {
    /// Unique id per flush (`batch_` prefix) or fallback (`single_` prefix)
    pub batch_id: String,
    /// The batch's events, structured or compressed
    pub events: PayloadEvents,
    /// Statistics snapshot taken at flush time
    pub stats: BatchStats,
    /// Compression descriptor, `null` when events are structured
    pub compression: Option<CompressionInfo>,
    /// Payload creation time (unix seconds)
    pub created_at: i64,
}

impl BatchPayload {
    /// Whether the events field carries a compressed blob.
    pub fn is_compressed(&self) -> bool {
        self.compression.is_some()
    }
}
