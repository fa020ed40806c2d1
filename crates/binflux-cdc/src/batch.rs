//! Bounded event accumulation.
//!
//! An [`EventBatch`] accumulates change events in insertion order under three
//! independent bounds: event count, serialized memory, and age. It never
//! flushes itself; the processor asks [`EventBatch::should_flush`] and owns
//! the batch lifecycle.

use crate::clock::Clock;
use crate::event::{ChangeEvent, EventKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Statistics snapshot taken at flush time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchStats {
    /// Number of events in the batch
    pub total_events: u64,
    /// Serialized memory accounted to the batch, in bytes
    pub memory_usage: u64,
    /// Batch age at snapshot time, in seconds
    pub age_seconds: u64,
    /// Event count per kind name
    pub type_stats: HashMap<String, u64>,
    /// Event count per database (events without a database are skipped)
    pub database_stats: HashMap<String, u64>,
    /// Event count per `database.table` (events without a table are skipped)
    pub table_stats: HashMap<String, u64>,
}

/// Ordered, bounded accumulator of change events.
///
/// Invariants:
/// - `memory_usage() == Σ serialized_size(e)` over the held events
/// - `len() <= max_count`
///
/// A batch is open until the processor flushes it; flushed batches are
/// discarded, never reused.
pub struct EventBatch {
    events: Vec<ChangeEvent>,
    memory_bytes: usize,
    created_at: Instant,
    max_count: usize,
    max_memory_bytes: usize,
    max_age: Duration,
    clock: Arc<dyn Clock>,
}

impl EventBatch {
    /// Create an empty batch with the given bounds.
    pub fn new(
        max_count: usize,
        max_memory_bytes: usize,
        max_age: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            events: Vec::with_capacity(max_count.min(1024)),
            memory_bytes: 0,
            created_at: clock.now(),
            max_count,
            max_memory_bytes,
            max_age,
            clock,
        }
    }

    /// Try to add an event.
    ///
    /// Rejects, returning the event unchanged, when the batch is at its count
    /// limit or the event's serialized size would push memory past the bound.
    /// An event larger than `max_memory_bytes` is rejected even by an empty
    /// batch; that case is what drives the processor's fallback path.
    pub fn add_event(&mut self, event: ChangeEvent) -> Result<(), ChangeEvent> {
        if self.is_full() {
            return Err(event);
        }

        let size = event.serialized_size();
        if self.memory_bytes + size > self.max_memory_bytes {
            return Err(event);
        }

        self.events.push(event);
        self.memory_bytes += size;
        Ok(())
    }

    /// Whether the batch should be flushed: full, memory-full, or expired.
    pub fn should_flush(&self) -> bool {
        self.is_full() || self.is_memory_full() || self.is_expired()
    }

    /// At the event-count limit.
    pub fn is_full(&self) -> bool {
        self.events.len() >= self.max_count
    }

    /// At or past the memory limit.
    pub fn is_memory_full(&self) -> bool {
        self.memory_bytes >= self.max_memory_bytes
    }

    /// At or past the age limit.
    pub fn is_expired(&self) -> bool {
        self.age() >= self.max_age
    }

    /// No events held.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of events held.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Serialized memory accounted to the batch, in bytes.
    pub fn memory_usage(&self) -> usize {
        self.memory_bytes
    }

    /// Time since the batch was created (or last cleared).
    pub fn age(&self) -> Duration {
        self.clock.now().duration_since(self.created_at)
    }

    /// The events in insertion order.
    pub fn events(&self) -> &[ChangeEvent] {
        &self.events
    }

    /// Take the events out, leaving the batch empty but not resetting its
    /// creation time. Used by the processor when building a payload.
    pub(crate) fn take_events(&mut self) -> Vec<ChangeEvent> {
        self.memory_bytes = 0;
        std::mem::take(&mut self.events)
    }

    /// Drop all events and restart the age clock.
    pub fn clear(&mut self) {
        self.events.clear();
        self.memory_bytes = 0;
        self.created_at = self.clock.now();
    }

    /// Events grouped by kind. Statistics only, not used for control flow.
    pub fn group_by_kind(&self) -> HashMap<EventKind, Vec<&ChangeEvent>> {
        let mut groups: HashMap<EventKind, Vec<&ChangeEvent>> = HashMap::new();
        for event in &self.events {
            groups.entry(event.kind).or_default().push(event);
        }
        groups
    }

    /// Events grouped by database.
    pub fn group_by_database(&self) -> HashMap<String, Vec<&ChangeEvent>> {
        let mut groups: HashMap<String, Vec<&ChangeEvent>> = HashMap::new();
        for event in &self.events {
            groups.entry(event.database.clone()).or_default().push(event);
        }
        groups
    }

    /// Events grouped by `database.table`.
    pub fn group_by_table(&self) -> HashMap<String, Vec<&ChangeEvent>> {
        let mut groups: HashMap<String, Vec<&ChangeEvent>> = HashMap::new();
        for event in &self.events {
            groups.entry(event.table_key()).or_default().push(event);
        }
        groups
    }

    /// Snapshot the batch statistics.
    pub fn stats(&self) -> BatchStats {
        let mut type_stats: HashMap<String, u64> = HashMap::new();
        let mut database_stats: HashMap<String, u64> = HashMap::new();
        let mut table_stats: HashMap<String, u64> = HashMap::new();

        for event in &self.events {
            *type_stats.entry(event.kind.as_str().to_string()).or_insert(0) += 1;

            if !event.database.is_empty() {
                *database_stats.entry(event.database.clone()).or_insert(0) += 1;
                if !event.table.is_empty() {
                    *table_stats.entry(event.table_key()).or_insert(0) += 1;
                }
            }
        }

        BatchStats {
            total_events: self.events.len() as u64,
            memory_usage: self.memory_bytes as u64,
            age_seconds: self.age().as_secs(),
            type_stats,
            database_stats,
            table_stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use serde_json::json;

    fn make_event(kind: EventKind, database: &str, table: &str) -> ChangeEvent {
        match kind {
            EventKind::Query => ChangeEvent::query(database, "SELECT 1", 0.0, 0),
            _ => ChangeEvent {
                kind,
                ..ChangeEvent::insert(
                    database,
                    table,
                    vec![json!({"id": 1})],
                    vec!["id".to_string()],
                    0,
                )
            },
        }
    }

    fn sized_event(bytes: usize) -> ChangeEvent {
        // Pad with a string column so the serialized size lands near `bytes`.
        let base = ChangeEvent::insert("db", "t", vec![json!({"pad": ""})], vec!["pad".into()], 0);
        let overhead = base.serialized_size();
        let pad = bytes.saturating_sub(overhead);
        ChangeEvent::insert(
            "db",
            "t",
            vec![json!({ "pad": "x".repeat(pad) })],
            vec!["pad".into()],
            0,
        )
    }

    fn batch(max_count: usize, max_memory: usize, max_age_secs: u64) -> (EventBatch, ManualClock) {
        let clock = ManualClock::new();
        let batch = EventBatch::new(
            max_count,
            max_memory,
            Duration::from_secs(max_age_secs),
            Arc::new(clock.clone()),
        );
        (batch, clock)
    }

    #[test]
    fn test_add_tracks_count_and_memory() {
        let (mut batch, _clock) = batch(10, 1 << 20, 60);

        let mut expected = 0;
        for _ in 0..5 {
            let event = make_event(EventKind::Insert, "db", "t");
            expected += event.serialized_size();
            assert!(batch.add_event(event).is_ok());
        }

        assert_eq!(batch.len(), 5);
        assert_eq!(batch.memory_usage(), expected);
    }

    #[test]
    fn test_rejects_at_count_limit() {
        let (mut batch, _clock) = batch(2, 1 << 20, 60);

        assert!(batch.add_event(make_event(EventKind::Insert, "db", "t")).is_ok());
        assert!(batch.add_event(make_event(EventKind::Insert, "db", "t")).is_ok());

        let rejected = batch.add_event(make_event(EventKind::Insert, "db", "t"));
        assert!(rejected.is_err());
        // No mutation on reject
        assert_eq!(batch.len(), 2);
        assert!(batch.is_full());
    }

    #[test]
    fn test_rejects_over_memory_and_leaves_state_unchanged() {
        let (mut batch, _clock) = batch(100, 500, 60);

        let small = sized_event(200);
        assert!(batch.add_event(small).is_ok());
        let memory_before = batch.memory_usage();

        let big = sized_event(400);
        let rejected = batch.add_event(big);
        assert!(rejected.is_err());
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.memory_usage(), memory_before);
    }

    #[test]
    fn test_oversized_event_rejected_by_empty_batch() {
        let (mut batch, _clock) = batch(100, 100, 60);
        assert!(batch.is_empty());

        let event = sized_event(500);
        assert!(event.serialized_size() > 100);
        assert!(batch.add_event(event).is_err());
        assert!(batch.is_empty());
    }

    #[test]
    fn test_rejected_event_returned_unchanged() {
        let (mut batch, _clock) = batch(0, 100, 60);
        let event = make_event(EventKind::Delete, "db", "t");
        let returned = batch.add_event(event.clone()).unwrap_err();
        assert_eq!(returned, event);
    }

    #[test]
    fn test_should_flush_on_count() {
        let (mut batch, _clock) = batch(2, 1 << 20, 60);
        assert!(batch.add_event(make_event(EventKind::Insert, "db", "t")).is_ok());
        assert!(!batch.should_flush());
        assert!(batch.add_event(make_event(EventKind::Insert, "db", "t")).is_ok());
        assert!(batch.should_flush());
    }

    #[test]
    fn test_should_flush_on_memory() {
        let (mut batch, _clock) = batch(100, 300, 60);
        assert!(batch.add_event(sized_event(300)).is_ok());
        assert!(batch.is_memory_full());
        assert!(batch.should_flush());
    }

    #[test]
    fn test_should_flush_on_age_without_sleeping() {
        let (mut batch, clock) = batch(100, 1 << 20, 5);
        assert!(batch.add_event(make_event(EventKind::Insert, "db", "t")).is_ok());
        assert!(!batch.should_flush());

        clock.advance(Duration::from_secs(4));
        assert!(!batch.is_expired());

        clock.advance(Duration::from_secs(1));
        assert!(batch.is_expired());
        assert!(batch.should_flush());
    }

    #[test]
    fn test_clear_resets_age_and_memory() {
        let (mut batch, clock) = batch(100, 1 << 20, 5);
        assert!(batch.add_event(make_event(EventKind::Insert, "db", "t")).is_ok());
        clock.advance(Duration::from_secs(10));
        assert!(batch.is_expired());

        batch.clear();
        assert!(batch.is_empty());
        assert_eq!(batch.memory_usage(), 0);
        assert!(!batch.is_expired());
    }

    #[test]
    fn test_stats_grouping() {
        let (mut batch, clock) = batch(100, 1 << 20, 60);
        assert!(batch.add_event(make_event(EventKind::Insert, "shop", "orders")).is_ok());
        assert!(batch.add_event(make_event(EventKind::Insert, "shop", "orders")).is_ok());
        assert!(batch.add_event(make_event(EventKind::Update, "shop", "users")).is_ok());
        assert!(batch.add_event(make_event(EventKind::Query, "crm", "")).is_ok());
        clock.advance(Duration::from_secs(2));

        let stats = batch.stats();
        assert_eq!(stats.total_events, 4);
        assert_eq!(stats.age_seconds, 2);
        assert_eq!(stats.type_stats["insert"], 2);
        assert_eq!(stats.type_stats["update"], 1);
        assert_eq!(stats.type_stats["query"], 1);
        assert_eq!(stats.database_stats["shop"], 3);
        assert_eq!(stats.database_stats["crm"], 1);
        assert_eq!(stats.table_stats["shop.orders"], 2);
        assert_eq!(stats.table_stats["shop.users"], 1);
        // Query event has no table, so no table entry for crm
        assert!(!stats.table_stats.keys().any(|k| k.starts_with("crm")));
    }

    #[test]
    fn test_group_accessors() {
        let (mut batch, _clock) = batch(100, 1 << 20, 60);
        assert!(batch.add_event(make_event(EventKind::Insert, "a", "t1")).is_ok());
        assert!(batch.add_event(make_event(EventKind::Delete, "a", "t2")).is_ok());
        assert!(batch.add_event(make_event(EventKind::Insert, "b", "t1")).is_ok());

        assert_eq!(batch.group_by_kind()[&EventKind::Insert].len(), 2);
        assert_eq!(batch.group_by_database()["a"].len(), 2);
        assert_eq!(batch.group_by_table()["a.t1"].len(), 1);
    }

    #[test]
    fn test_insertion_order_preserved() {
        let (mut batch, _clock) = batch(100, 1 << 20, 60);
        for i in 0..10 {
            let event = ChangeEvent::insert(
                "db",
                "t",
                vec![json!({ "seq": i })],
                vec!["seq".into()],
                i,
            );
            assert!(batch.add_event(event).is_ok());
        }
        let timestamps: Vec<i64> = batch.events().iter().map(|e| e.timestamp).collect();
        assert_eq!(timestamps, (0..10).collect::<Vec<_>>());
    }
}
