//! Batch lifecycle orchestration.
//!
//! The [`BatchProcessor`] owns exactly one open [`EventBatch`] and drives it
//! through accumulate → flush → deliver. Flush and delivery errors are
//! contained here: they are logged and broadcast as notifications, never
//! propagated back to the intake path, and failed payloads are dropped
//! rather than requeued.

use crate::batch::{BatchStats, EventBatch};
use crate::clock::{Clock, SystemClock};
use crate::config::ProcessorConfig;
use crate::error::{PipelineError, Result};
use crate::event::ChangeEvent;
use crate::notification::{Notifier, PipelineNotification};
use crate::payload::{BatchPayload, PayloadEvents};
use crate::sink::BatchSink;
use base64::prelude::*;
use binflux_core::CompressionManager;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Totals accumulated across successful deliveries.
///
/// Plain counters: the processor is driven by a single intake loop, so no
/// atomics are needed. Reset via
/// [`BatchProcessor::reset_stats`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CumulativeStats {
    /// Payloads accepted by the sink (batches and fallbacks)
    pub total_batches: u64,
    /// Events delivered across all payloads
    pub total_events: u64,
    /// Serialized event bytes before compression
    pub total_original_size: u64,
    /// Bytes after compression (equals original for uncompressed payloads)
    pub total_compressed_size: u64,
}

impl CumulativeStats {
    /// `total_compressed_size / total_original_size` rounded to 4 decimals,
    /// 0 when nothing has been delivered.
    pub fn overall_compression_ratio(&self) -> f64 {
        if self.total_original_size == 0 {
            return 0.0;
        }
        let ratio = self.total_compressed_size as f64 / self.total_original_size as f64;
        (ratio * 10_000.0).round() / 10_000.0
    }
}

/// Accumulates change events into one open batch and delivers flushed
/// payloads to a [`BatchSink`].
///
/// Single-owner by design: one processor per intake loop, `&mut self`
/// throughout. Concurrency lives at the channel boundaries (event intake,
/// sink hand-off, notifications), not inside the processor.
pub struct BatchProcessor {
    config: ProcessorConfig,
    batch: EventBatch,
    compression: Option<CompressionManager>,
    sink: Arc<dyn BatchSink>,
    clock: Arc<dyn Clock>,
    notifier: Notifier,
    stats: CumulativeStats,
}

impl std::fmt::Debug for BatchProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchProcessor")
            .field("config", &self.config)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl BatchProcessor {
    /// Create a processor using the real system clock.
    pub fn new(config: ProcessorConfig, sink: Arc<dyn BatchSink>) -> Result<Self> {
        Self::with_clock(config, sink, Arc::new(SystemClock))
    }

    /// Create a processor with an injected clock. Batch age, payload
    /// timestamps, and timeout flushes all follow this clock.
    pub fn with_clock(
        config: ProcessorConfig,
        sink: Arc<dyn BatchSink>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;

        let compression = if config.compression_enabled {
            Some(CompressionManager::new())
        } else {
            None
        };
        if let (Some(manager), Some(name)) =
            (compression.as_ref(), config.compression_algorithm.fixed())
        {
            if !manager.is_supported(name) {
                return Err(PipelineError::config(format!(
                    "unsupported compression algorithm: {name}"
                )));
            }
        }

        let batch = EventBatch::new(
            config.batch_size,
            config.batch_memory,
            config.batch_timeout,
            Arc::clone(&clock),
        );

        Ok(Self {
            config,
            batch,
            compression,
            sink,
            clock,
            notifier: Notifier::default(),
            stats: CumulativeStats::default(),
        })
    }

    /// Subscribe to delivery notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineNotification> {
        self.notifier.subscribe()
    }

    /// Feed one event through the pipeline.
    ///
    /// Adds to the open batch; if the batch rejects the event, flushes and
    /// retries on the fresh batch; if the fresh batch also rejects it (the
    /// event alone exceeds the memory bound), the event is delivered as a
    /// single-event fallback payload. The fallback is taken at most once,
    /// so an oversized event can never loop.
    pub async fn process_event(&mut self, event: ChangeEvent) {
        let event = match self.batch.add_event(event) {
            Ok(()) => {
                if self.batch.should_flush() {
                    self.flush().await;
                }
                return;
            }
            Err(event) => event,
        };

        self.flush().await;
        match self.batch.add_event(event) {
            Ok(()) => {
                if self.batch.should_flush() {
                    self.flush().await;
                }
            }
            Err(event) => self.process_single_event(event).await,
        }
    }

    /// Flush the open batch. No-op when the batch is empty.
    ///
    /// Errors are contained: a failed delivery is logged, broadcast as
    /// [`PipelineNotification::BatchFailed`], and its events are dropped.
    pub async fn flush(&mut self) {
        if self.batch.is_empty() {
            return;
        }

        let stats = self.batch.stats();
        let events = self.batch.take_events();
        self.batch.clear();

        let event_count = events.len();
        let batch_id = format!("batch_{}", Uuid::new_v4());

        match self.deliver_batch(&batch_id, events, stats).await {
            Ok((original, compressed)) => {
                self.stats.total_batches += 1;
                self.stats.total_events += event_count as u64;
                self.stats.total_original_size += original;
                self.stats.total_compressed_size += compressed;
                info!(
                    batch_id = %batch_id,
                    events = event_count,
                    original_bytes = original,
                    compressed_bytes = compressed,
                    "batch delivered"
                );
                self.notifier.notify(PipelineNotification::BatchDelivered {
                    batch_id,
                    event_count,
                });
            }
            Err(err) => {
                error!(
                    batch_id = %batch_id,
                    events = event_count,
                    error = %err,
                    "batch delivery failed, events dropped"
                );
                self.notifier.notify(PipelineNotification::BatchFailed {
                    batch_id,
                    event_count,
                    error: err.to_string(),
                });
            }
        }
    }

    /// Flush if the open batch has outlived its timeout. Called by the
    /// intake driver's interval tick. An empty expired batch only has its
    /// age clock restarted.
    pub async fn maybe_flush_expired(&mut self) {
        if !self.batch.is_expired() {
            return;
        }
        if self.batch.is_empty() {
            self.batch.clear();
            return;
        }
        debug!(events = self.batch.len(), "batch timeout reached");
        self.flush().await;
    }

    /// Statistics of the open batch.
    pub fn current_batch_info(&self) -> BatchStats {
        self.batch.stats()
    }

    /// Cumulative delivery totals.
    pub fn stats(&self) -> &CumulativeStats {
        &self.stats
    }

    /// Zero the cumulative totals. The open batch is untouched.
    pub fn reset_stats(&mut self) {
        self.stats = CumulativeStats::default();
    }

    /// Build, optionally compress, and push one batch payload. Returns
    /// (original, compressed) byte sizes for the cumulative totals.
    async fn deliver_batch(
        &self,
        batch_id: &str,
        events: Vec<ChangeEvent>,
        stats: BatchStats,
    ) -> Result<(u64, u64)> {
        let serialized = serde_json::to_vec(&events)?;
        let original = serialized.len() as u64;

        let mut payload_events = PayloadEvents::Structured(events);
        let mut compression = None;
        let mut compressed_size = original;

        if let Some(manager) = self.compression.as_ref() {
            if serialized.len() >= self.config.compression_threshold {
                let out =
                    manager.compress(&serialized, self.config.compression_algorithm.fixed())?;
                compressed_size = out.info.compressed_size;
                payload_events = PayloadEvents::Compressed(BASE64_STANDARD.encode(&out.data));
                compression = Some(out.info);
            }
        }

        let payload = BatchPayload {
            batch_id: batch_id.to_string(),
            events: payload_events,
            stats,
            compression,
            created_at: self.clock.unix_timestamp(),
        };

        self.push(payload).await?;
        Ok((original, compressed_size))
    }

    /// Deliver one event that no batch can hold: a minimal single-event
    /// payload, never compressed. Same containment as [`flush`](Self::flush).
    async fn process_single_event(&mut self, event: ChangeEvent) {
        let batch_id = format!("single_{}", Uuid::new_v4());
        let size = event.serialized_size() as u64;
        warn!(
            batch_id = %batch_id,
            size = size,
            database = %event.database,
            table = %event.table,
            "event exceeds batch memory bound, delivering individually"
        );

        let payload = BatchPayload {
            batch_id: batch_id.clone(),
            stats: single_event_stats(&event, size),
            events: PayloadEvents::Structured(vec![event]),
            compression: None,
            created_at: self.clock.unix_timestamp(),
        };

        match self.push(payload).await {
            Ok(()) => {
                self.stats.total_batches += 1;
                self.stats.total_events += 1;
                self.stats.total_original_size += size;
                self.stats.total_compressed_size += size;
                self.notifier
                    .notify(PipelineNotification::FallbackDelivered { batch_id });
            }
            Err(err) => {
                error!(
                    batch_id = %batch_id,
                    error = %err,
                    "fallback delivery failed, event dropped"
                );
                self.notifier.notify(PipelineNotification::FallbackFailed {
                    batch_id,
                    error: err.to_string(),
                });
            }
        }
    }

    async fn push(&self, payload: BatchPayload) -> Result<()> {
        if !self.config.queue_enabled {
            debug!(batch_id = %payload.batch_id, "queue disabled, payload discarded");
            return Ok(());
        }
        self.sink
            .push(
                &self.config.queue_name,
                &self.config.queue_connection,
                payload,
            )
            .await
    }
}

fn single_event_stats(event: &ChangeEvent, size: u64) -> BatchStats {
    let mut type_stats = HashMap::new();
    type_stats.insert(event.kind.as_str().to_string(), 1);
    let mut database_stats = HashMap::new();
    let mut table_stats = HashMap::new();
    if !event.database.is_empty() {
        database_stats.insert(event.database.clone(), 1);
        if !event.table.is_empty() {
            table_stats.insert(event.table_key(), 1);
        }
    }
    BatchStats {
        total_events: 1,
        memory_usage: size,
        age_seconds: 0,
        type_stats,
        database_stats,
        table_stats,
    }
}
