//! Change-event batching and delivery pipeline.
//!
//! Takes decoded database change events and turns them into bounded,
//! optionally compressed payloads for a downstream work queue:
//!
//! - **Bounded batching** — event count, serialized memory, and age limits
//!   with insertion order preserved ([`EventBatch`])
//! - **Flush-time compression** — threshold-gated, fixed codec or per-batch
//!   auto-selection via [`binflux_core`]
//! - **Pluggable delivery** — [`BatchSink`] seam with configurable
//!   backpressure; failed payloads are dropped, never requeued
//! - **Observability** — broadcast delivery notifications and cumulative
//!   statistics
//! - **Subscribers** — per-event fan-out with interest filtering
//!
//! # Example
//!
//! ```no_run
//! use binflux_cdc::{
//!     BatchProcessor, BatchSink, ChangeEvent, ChannelSink, IntakeLoop, ProcessorConfig,
//! };
//! use std::sync::Arc;
//!
//! # async fn run() -> binflux_cdc::Result<()> {
//! let (sink, mut deliveries) = ChannelSink::new(64);
//! let config = ProcessorConfig::builder()
//!     .batch_size(200)
//!     .queue_name("orders_cdc")
//!     .build()?;
//! let processor = BatchProcessor::new(config, Arc::new(sink) as Arc<dyn BatchSink>)?;
//!
//! let (events, intake_rx) = tokio::sync::mpsc::channel::<ChangeEvent>(1024);
//! tokio::spawn(IntakeLoop::new(processor).run(intake_rx));
//!
//! while let Some(message) = deliveries.recv().await {
//!     println!("{} -> {}", message.payload.batch_id, message.queue);
//! }
//! # drop(events);
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod listener;
pub mod notification;
pub mod payload;
pub mod processor;
pub mod sink;
pub mod subscriber;

pub use batch::{BatchStats, EventBatch};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AlgorithmChoice, ProcessorConfig, ProcessorConfigBuilder};
pub use error::{PipelineError, Result};
pub use event::{ChangeEvent, EventData, EventKind};
pub use listener::IntakeLoop;
pub use notification::{Notifier, PipelineNotification};
pub use payload::{BatchPayload, PayloadEvents};
pub use processor::{BatchProcessor, CumulativeStats};
pub use sink::{BatchSink, ChannelSink, MemorySink, OverflowPolicy, SinkMessage};
pub use subscriber::{BinlogSubscriber, SubscriberRegistry};
