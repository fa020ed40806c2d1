//! Change-event representation.
//!
//! A [`ChangeEvent`] is the immutable snapshot handed to the pipeline by the
//! upstream binlog decode loop: an operation kind, origin database/table, a
//! payload (row data or statement text), a capture timestamp, and the binlog
//! position it was read from. Events are read-only once constructed.

use serde::{Deserialize, Serialize};

/// Source-reported change kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Row(s) inserted
    Insert,
    /// Row(s) updated
    Update,
    /// Row(s) deleted
    Delete,
    /// Statement executed (DDL or uncaptured DML)
    Query,
    /// Binlog file rotation
    Rotate,
    /// Any other source-reported kind
    Unknown,
}

impl EventKind {
    /// Stable name used in statistics keys and wire payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Insert => "insert",
            EventKind::Update => "update",
            EventKind::Delete => "delete",
            EventKind::Query => "query",
            EventKind::Rotate => "rotate",
            EventKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Event payload, shaped by the event kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EventData {
    /// Row data for insert/update/delete events.
    Rows {
        rows: Vec<serde_json::Value>,
        columns: Vec<String>,
    },
    /// Raw statement text for query events.
    Statement {
        query: String,
        execution_time: f64,
    },
    /// No payload (rotate, unknown).
    None,
}

/// One captured binlog change, immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Operation kind
    pub kind: EventKind,
    /// Originating database
    pub database: String,
    /// Originating table; empty for database-wide events
    pub table: String,
    /// Row data or statement text
    pub data: EventData,
    /// Capture timestamp (unix seconds)
    pub timestamp: i64,
    /// Binlog position the event was read at
    pub log_position: u64,
}

impl ChangeEvent {
    /// Create an insert event.
    pub fn insert(
        database: impl Into<String>,
        table: impl Into<String>,
        rows: Vec<serde_json::Value>,
        columns: Vec<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            kind: EventKind::Insert,
            database: database.into(),
            table: table.into(),
            data: EventData::Rows { rows, columns },
            timestamp,
            log_position: 0,
        }
    }

    /// Create an update event.
    pub fn update(
        database: impl Into<String>,
        table: impl Into<String>,
        rows: Vec<serde_json::Value>,
        columns: Vec<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            kind: EventKind::Update,
            ..Self::insert(database, table, rows, columns, timestamp)
        }
    }

    /// Create a delete event.
    pub fn delete(
        database: impl Into<String>,
        table: impl Into<String>,
        rows: Vec<serde_json::Value>,
        columns: Vec<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            kind: EventKind::Delete,
            ..Self::insert(database, table, rows, columns, timestamp)
        }
    }

    /// Create a query event. Query events are database-wide: the table name
    /// is empty.
    pub fn query(
        database: impl Into<String>,
        query: impl Into<String>,
        execution_time: f64,
        timestamp: i64,
    ) -> Self {
        Self {
            kind: EventKind::Query,
            database: database.into(),
            table: String::new(),
            data: EventData::Statement {
                query: query.into(),
                execution_time,
            },
            timestamp,
            log_position: 0,
        }
    }

    /// Set the binlog position.
    pub fn with_log_position(mut self, position: u64) -> Self {
        self.log_position = position;
        self
    }

    /// Byte length of the canonical JSON encoding. This is the size the
    /// batch memory accounting is defined over.
    ///
    /// Serialization of `ChangeEvent` cannot fail (all keys are strings),
    /// so an encoding failure is treated as a zero-size event.
    pub fn serialized_size(&self) -> usize {
        serde_json::to_vec(self).map(|b| b.len()).unwrap_or(0)
    }

    /// Whether this is a data-change event (insert/update/delete).
    pub fn is_data_change(&self) -> bool {
        matches!(
            self.kind,
            EventKind::Insert | EventKind::Update | EventKind::Delete
        )
    }

    /// Whether this is a query event.
    pub fn is_query(&self) -> bool {
        self.kind == EventKind::Query
    }

    /// The changed rows, empty for non-data-change events.
    pub fn changed_rows(&self) -> &[serde_json::Value] {
        match &self.data {
            EventData::Rows { rows, .. } if self.is_data_change() => rows,
            _ => &[],
        }
    }

    /// The statement text, empty for non-query events.
    pub fn statement(&self) -> &str {
        match &self.data {
            EventData::Statement { query, .. } if self.is_query() => query,
            _ => "",
        }
    }

    /// `database.table` key used in per-table statistics.
    pub fn table_key(&self) -> String {
        format!("{}.{}", self.database, self.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_event() {
        let event = ChangeEvent::insert(
            "shop",
            "orders",
            vec![json!({"id": 1, "total": 99.5})],
            vec!["id".to_string(), "total".to_string()],
            1_705_000_000,
        );

        assert_eq!(event.kind, EventKind::Insert);
        assert!(event.is_data_change());
        assert!(!event.is_query());
        assert_eq!(event.changed_rows().len(), 1);
        assert_eq!(event.table_key(), "shop.orders");
    }

    #[test]
    fn test_query_event_is_database_wide() {
        let event = ChangeEvent::query("shop", "ALTER TABLE orders ADD COLUMN note TEXT", 0.2, 0);

        assert_eq!(event.kind, EventKind::Query);
        assert!(event.table.is_empty());
        assert!(event.is_query());
        assert!(event.changed_rows().is_empty());
        assert!(event.statement().starts_with("ALTER TABLE"));
    }

    #[test]
    fn test_serialized_size_is_json_length() {
        let event = ChangeEvent::insert("db", "t", vec![json!({"a": 1})], vec!["a".into()], 0);
        let expected = serde_json::to_vec(&event).unwrap().len();
        assert_eq!(event.serialized_size(), expected);
        assert!(expected > 0);
    }

    #[test]
    fn test_serialized_size_grows_with_payload() {
        let small = ChangeEvent::insert("db", "t", vec![json!({"a": 1})], vec!["a".into()], 0);
        let large = ChangeEvent::insert(
            "db",
            "t",
            vec![json!({"a": "x".repeat(500)})],
            vec!["a".into()],
            0,
        );
        assert!(large.serialized_size() > small.serialized_size() + 400);
    }

    #[test]
    fn test_event_serde_roundtrip() {
        let event = ChangeEvent::update(
            "shop",
            "users",
            vec![json!({"id": 2, "name": "bob"})],
            vec!["id".into(), "name".into()],
            1_705_000_000,
        )
        .with_log_position(4242);

        let json = serde_json::to_string(&event).unwrap();
        let parsed: ChangeEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
        assert_eq!(parsed.log_position, 4242);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(EventKind::Insert.as_str(), "insert");
        assert_eq!(EventKind::Query.to_string(), "query");
        assert_eq!(EventKind::Unknown.as_str(), "unknown");
    }
}
