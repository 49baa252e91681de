//! Domain event infrastructure
//!
//! Provides the base trait and an in-memory store for lock and session
//! events. Events form an audit trail of who held what, and when.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{PoisonError, RwLock};
use uuid::Uuid;

/// Base trait for all domain events
pub trait DomainEvent: Send + Sync {
    /// Get the event type as a string
    fn event_type(&self) -> &str;

    /// Get the aggregate this event belongs to (resource or session id)
    fn aggregate_id(&self) -> String;

    /// Get the timestamp when this event occurred
    fn timestamp(&self) -> DateTime<Utc>;

    /// Get optional event data as JSON
    fn data(&self) -> Option<&serde_json::Value>;
}

/// A stored event record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEvent {
    /// Unique event ID
    pub id: Uuid,
    /// Aggregate this event belongs to
    pub aggregate_id: String,
    /// Event type string
    pub event_type: String,
    /// Event data as JSON
    pub data: Option<serde_json::Value>,
    /// When the event was created
    pub created_at: DateTime<Utc>,
}

impl StoredEvent {
    /// Create from a domain event
    pub fn from_event(event: &dyn DomainEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            aggregate_id: event.aggregate_id(),
            event_type: event.event_type().to_string(),
            data: event.data().cloned(),
            created_at: event.timestamp(),
        }
    }
}

/// A simple in-memory event store for recording events
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    events: RwLock<Vec<StoredEvent>>,
}

impl InMemoryEventStore {
    /// Create a new in-memory event store
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a domain event
    pub fn record(&self, event: &dyn DomainEvent) {
        self.events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(StoredEvent::from_event(event));
    }

    /// Get events for an aggregate
    pub fn events_for(&self, aggregate_id: &str) -> Vec<StoredEvent> {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .cloned()
            .collect()
    }

    /// Get all events
    pub fn all_events(&self) -> Vec<StoredEvent> {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Get events by type
    pub fn events_by_type(&self, event_type: &str) -> Vec<StoredEvent> {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }

    /// Number of recorded events
    pub fn len(&self) -> usize {
        self.events.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no events have been recorded
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear all events
    pub fn clear(&self) {
        self.events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestEvent {
        aggregate: String,
        event_type: String,
        data: Option<serde_json::Value>,
        timestamp: DateTime<Utc>,
    }

    impl DomainEvent for TestEvent {
        fn event_type(&self) -> &str {
            &self.event_type
        }

        fn aggregate_id(&self) -> String {
            self.aggregate.clone()
        }

        fn timestamp(&self) -> DateTime<Utc> {
            self.timestamp
        }

        fn data(&self) -> Option<&serde_json::Value> {
            self.data.as_ref()
        }
    }

    fn test_event(aggregate: &str, event_type: &str) -> TestEvent {
        TestEvent {
            aggregate: aggregate.to_string(),
            event_type: event_type.to_string(),
            data: Some(serde_json::json!({ "key": "value" })),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_record_and_query() {
        let store = InMemoryEventStore::new();
        assert!(store.is_empty());

        store.record(&test_event("resource:1", "lock_acquired"));
        store.record(&test_event("resource:1", "lock_released"));
        store.record(&test_event("resource:2", "lock_acquired"));

        assert_eq!(store.len(), 3);
        assert_eq!(store.events_for("resource:1").len(), 2);
        assert_eq!(store.events_by_type("lock_acquired").len(), 2);

        let first = &store.all_events()[0];
        assert_eq!(first.aggregate_id, "resource:1");
        assert_eq!(first.data.as_ref().unwrap()["key"], "value");
    }

    #[test]
    fn test_clear() {
        let store = InMemoryEventStore::new();
        store.record(&test_event("session:0", "session_started"));
        store.clear();
        assert!(store.is_empty());
    }
}
