//! Downstream sink seam.
//!
//! The pipeline hands every payload to a [`BatchSink`] and does not retry:
//! failure handling past the push is the sink's concern. The baseline
//! behavior is a blocking push (intake stalls while the sink is slow); the
//! [`OverflowPolicy`] makes that backpressure point configurable.

use crate::error::{PipelineError, Result};
use crate::payload::BatchPayload;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::warn;

/// Destination for flushed payloads.
///
/// `queue` and `connection` are routing parameters passed through opaquely
/// from configuration; the sink owns the payload after a successful push.
#[async_trait]
pub trait BatchSink: Send + Sync {
    async fn push(&self, queue: &str, connection: &str, payload: BatchPayload) -> Result<()>;
}

/// What to do when the sink's bounded queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Wait indefinitely for space. The default; preserves the original
    /// blocking hand-off semantics.
    #[default]
    Block,
    /// Wait up to the given duration, then fail the push with a timeout.
    Timeout(Duration),
    /// Fail the push immediately, dropping the payload. The failure is
    /// still reported so callers can observe the drop.
    Drop,
}

/// One pushed payload with its routing parameters.
#[derive(Debug, Clone)]
pub struct SinkMessage {
    pub queue: String,
    pub connection: String,
    pub payload: BatchPayload,
}

/// Bounded channel sink: hands payloads to an in-process consumer.
///
/// With [`OverflowPolicy::Block`] a full channel blocks the caller, which is
/// the pipeline's deliberate backpressure point.
pub struct ChannelSink {
    tx: mpsc::Sender<SinkMessage>,
    policy: OverflowPolicy,
}

impl ChannelSink {
    /// Create a sink with the given queue capacity and the default blocking
    /// policy. Returns the receiving half for the consumer.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<SinkMessage>) {
        Self::with_policy(capacity, OverflowPolicy::Block)
    }

    /// Create a sink with an explicit overflow policy.
    pub fn with_policy(
        capacity: usize,
        policy: OverflowPolicy,
    ) -> (Self, mpsc::Receiver<SinkMessage>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx, policy }, rx)
    }
}

#[async_trait]
impl BatchSink for ChannelSink {
    async fn push(&self, queue: &str, connection: &str, payload: BatchPayload) -> Result<()> {
        let message = SinkMessage {
            queue: queue.to_string(),
            connection: connection.to_string(),
            payload,
        };

        match self.policy {
            OverflowPolicy::Block => self
                .tx
                .send(message)
                .await
                .map_err(|_| PipelineError::sink("sink channel closed")),
            OverflowPolicy::Timeout(limit) => {
                match tokio::time::timeout(limit, self.tx.send(message)).await {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(_)) => Err(PipelineError::sink("sink channel closed")),
                    Err(_) => Err(PipelineError::timeout(format!(
                        "sink push exceeded {limit:?}"
                    ))),
                }
            }
            OverflowPolicy::Drop => match self.tx.try_send(message) {
                Ok(()) => Ok(()),
                Err(mpsc::error::TrySendError::Full(m)) => {
                    warn!(queue = %m.queue, batch_id = %m.payload.batch_id, "sink queue full, dropping payload");
                    Err(PipelineError::sink("sink queue full, payload dropped"))
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    Err(PipelineError::sink("sink channel closed"))
                }
            },
        }
    }
}

/// In-memory sink recording every push. Test double; can be armed to fail.
#[derive(Default)]
pub struct MemorySink {
    pushed: Mutex<Vec<SinkMessage>>,
    fail: AtomicBool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent push fail until disarmed.
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    /// Number of payloads accepted.
    pub fn len(&self) -> usize {
        self.pushed.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every accepted message.
    pub fn messages(&self) -> Vec<SinkMessage> {
        self.pushed.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl BatchSink for MemorySink {
    async fn push(&self, queue: &str, connection: &str, payload: BatchPayload) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PipelineError::sink("sink unavailable"));
        }
        if let Ok(mut pushed) = self.pushed.lock() {
            pushed.push(SinkMessage {
                queue: queue.to_string(),
                connection: connection.to_string(),
                payload,
            });
        }
        Ok(())
    }
}
