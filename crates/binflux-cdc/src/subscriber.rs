//! Event subscribers.
//!
//! Besides the batching path, consumers can observe individual change events
//! as they arrive. Subscribers declare their interest (databases, tables,
//! event kinds; an empty list means "all") and are registered explicitly on
//! a [`SubscriberRegistry`]. A subscriber error is logged and counted but
//! never aborts intake or affects other subscribers.

use crate::error::Result;
use crate::event::{ChangeEvent, EventKind};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error};

/// Consumer of individual change events.
#[async_trait]
pub trait BinlogSubscriber: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Handle one event that matched this subscriber's interest.
    async fn handle(&self, event: &ChangeEvent) -> Result<()>;

    /// Databases of interest; empty means all databases.
    fn databases(&self) -> &[String] {
        &[]
    }

    /// Tables of interest; empty means all tables.
    fn tables(&self) -> &[String] {
        &[]
    }

    /// Event kinds of interest; empty means all kinds.
    fn event_kinds(&self) -> &[EventKind] {
        &[]
    }
}

/// Explicit registry of subscribers, dispatched in registration order.
#[derive(Default)]
pub struct SubscriberRegistry {
    subscribers: Vec<Arc<dyn BinlogSubscriber>>,
    error_count: u64,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber. Registration order is dispatch order.
    pub fn register(&mut self, subscriber: Arc<dyn BinlogSubscriber>) {
        debug!(subscriber = subscriber.name(), "subscriber registered");
        self.subscribers.push(subscriber);
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Subscriber errors observed since construction.
    pub fn error_count(&self) -> u64 {
        self.error_count
    }

    /// Offer the event to every interested subscriber. Errors are contained
    /// per subscriber.
    pub async fn dispatch(&mut self, event: &ChangeEvent) {
        for subscriber in &self.subscribers {
            if !Self::interested(subscriber.as_ref(), event) {
                continue;
            }
            if let Err(err) = subscriber.handle(event).await {
                self.error_count += 1;
                error!(
                    subscriber = subscriber.name(),
                    database = %event.database,
                    table = %event.table,
                    error = %err,
                    "subscriber failed"
                );
            }
        }
    }

    fn interested(subscriber: &dyn BinlogSubscriber, event: &ChangeEvent) -> bool {
        let databases = subscriber.databases();
        if !databases.is_empty() && !databases.iter().any(|d| d == &event.database) {
            return false;
        }
        let tables = subscriber.tables();
        if !tables.is_empty() && !tables.iter().any(|t| t == &event.table) {
            return false;
        }
        let kinds = subscriber.event_kinds();
        if !kinds.is_empty() && !kinds.contains(&event.kind) {
            return false;
        }
        true
    }
}
