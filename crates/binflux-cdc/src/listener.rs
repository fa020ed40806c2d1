//! Intake driver.
//!
//! The [`IntakeLoop`] is the single task that owns the processor: it pulls
//! decoded change events off an mpsc channel, offers each to the subscriber
//! registry, feeds it to the batching pipeline, and runs an interval tick so
//! a quiet stream still flushes aged batches. On channel close it drains
//! with a final flush before returning.

use crate::event::ChangeEvent;
use crate::processor::BatchProcessor;
use crate::subscriber::SubscriberRegistry;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// Drives a [`BatchProcessor`] from a channel of change events.
pub struct IntakeLoop {
    processor: BatchProcessor,
    subscribers: SubscriberRegistry,
    tick_interval: Duration,
}

impl IntakeLoop {
    /// Default interval between timeout-flush checks.
    pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

    pub fn new(processor: BatchProcessor) -> Self {
        Self {
            processor,
            subscribers: SubscriberRegistry::new(),
            tick_interval: Self::DEFAULT_TICK,
        }
    }

    /// Use a custom timeout-check interval. It should be shorter than the
    /// processor's batch timeout or expired batches will linger.
    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    /// Access the subscriber registry for registration before the loop
    /// starts.
    pub fn subscribers_mut(&mut self) -> &mut SubscriberRegistry {
        &mut self.subscribers
    }

    pub fn processor(&self) -> &BatchProcessor {
        &self.processor
    }

    /// Consume events until the channel closes, then drain.
    ///
    /// Returns the processor so callers can inspect final statistics.
    pub async fn run(mut self, mut events: mpsc::Receiver<ChangeEvent>) -> BatchProcessor {
        let mut tick = interval(self.tick_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(tick = ?self.tick_interval, "intake loop started");
        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Some(event) => {
                            self.subscribers.dispatch(&event).await;
                            self.processor.process_event(event).await;
                        }
                        None => break,
                    }
                }
                _ = tick.tick() => {
                    self.processor.maybe_flush_expired().await;
                }
            }
        }

        debug!("event channel closed, draining");
        self.processor.flush().await;
        info!(
            batches = self.processor.stats().total_batches,
            events = self.processor.stats().total_events,
            "intake loop stopped"
        );
        self.processor
    }
}
