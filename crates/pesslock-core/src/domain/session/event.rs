//! Session event types for tracking session activities
//!
//! Events provide an audit trail of session lifecycles and commits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::session::SessionId;
use crate::domain::events::DomainEvent;
use crate::domain::locking::ResourceId;

/// Type of session event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEventType {
    /// Session was created
    Started,
    /// Session was removed and its locks released
    Removed,
    /// A working copy was committed to the record store
    Committed,
    /// A working copy was dropped without committing
    Discarded,
}

impl SessionEventType {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "session_started",
            Self::Removed => "session_removed",
            Self::Committed => "record_committed",
            Self::Discarded => "record_discarded",
        }
    }
}

impl std::fmt::Display for SessionEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A session event representing an action or state change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEvent {
    /// Unique event identifier
    pub id: Uuid,

    /// Session this event belongs to
    pub session_id: SessionId,

    /// Type of event
    pub event_type: SessionEventType,

    /// Event data (JSON)
    pub data: Option<serde_json::Value>,

    /// When the event occurred
    pub created_at: DateTime<Utc>,
}

impl SessionEvent {
    /// Create a new session event
    pub fn new(
        session_id: SessionId,
        event_type: SessionEventType,
        data: Option<serde_json::Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            event_type,
            data,
            created_at: Utc::now(),
        }
    }

    /// Create a started event
    pub fn started(session_id: SessionId, user_name: &str) -> Self {
        let data = serde_json::json!({ "user_name": user_name });
        Self::new(session_id, SessionEventType::Started, Some(data))
    }

    /// Create a removed event
    pub fn removed(session_id: SessionId, released: &[ResourceId]) -> Self {
        let data = serde_json::json!({ "released": released });
        Self::new(session_id, SessionEventType::Removed, Some(data))
    }

    /// Create a committed event
    pub fn committed(session_id: SessionId, resource: ResourceId) -> Self {
        let data = serde_json::json!({ "resource": resource });
        Self::new(session_id, SessionEventType::Committed, Some(data))
    }

    /// Create a discarded event
    pub fn discarded(session_id: SessionId, resource: ResourceId) -> Self {
        let data = serde_json::json!({ "resource": resource });
        Self::new(session_id, SessionEventType::Discarded, Some(data))
    }
}

impl DomainEvent for SessionEvent {
    fn event_type(&self) -> &str {
        self.event_type.as_str()
    }

    fn aggregate_id(&self) -> String {
        format!("session:{}", self.session_id)
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn data(&self) -> Option<&serde_json::Value> {
        self.data.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_started_event() {
        let event = SessionEvent::started(SessionId::new(0), "Alice");

        assert_eq!(event.event_type, SessionEventType::Started);
        assert_eq!(event.aggregate_id(), "session:0");
        assert_eq!(event.data.unwrap()["user_name"], "Alice");
    }

    #[test]
    fn test_removed_event_lists_released_locks() {
        let event = SessionEvent::removed(SessionId::new(1), &[1, 4]);

        assert_eq!(event.event_type(), "session_removed");
        assert_eq!(event.data.unwrap()["released"], serde_json::json!([1, 4]));
    }

    #[test]
    fn test_commit_events() {
        let committed = SessionEvent::committed(SessionId::new(2), 9);
        let discarded = SessionEvent::discarded(SessionId::new(2), 9);

        assert_eq!(committed.event_type.to_string(), "record_committed");
        assert_eq!(discarded.event_type.to_string(), "record_discarded");
        assert_eq!(committed.data.unwrap()["resource"], 9);
    }
}
