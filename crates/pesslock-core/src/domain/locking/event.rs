//! Locking domain events
//!
//! Events for tracking lock-related activities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::{ResourceId, lock_key};
use crate::domain::events::DomainEvent;
use crate::domain::session::SessionId;

/// Type of lock event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockEventType {
    /// A lock was acquired
    LockAcquired,
    /// A lock was released
    LockReleased,
    /// Another session tried to acquire a held lock
    LockContention,
}

impl LockEventType {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LockAcquired => "lock_acquired",
            Self::LockReleased => "lock_released",
            Self::LockContention => "lock_contention",
        }
    }
}

impl std::fmt::Display for LockEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A locking domain event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockEvent {
    /// Unique event identifier
    pub id: Uuid,
    /// The resource being locked
    pub resource: ResourceId,
    /// Type of event
    pub event_type: LockEventType,
    /// Event data
    pub data: Option<serde_json::Value>,
    /// When the event occurred
    pub created_at: DateTime<Utc>,
}

impl LockEvent {
    fn new(resource: ResourceId, event_type: LockEventType, data: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            resource,
            event_type,
            data: Some(data),
            created_at: Utc::now(),
        }
    }

    /// Create a lock acquired event
    pub fn lock_acquired(resource: ResourceId, holder: &SessionId) -> Self {
        let data = serde_json::json!({ "holder_id": holder.to_string() });
        Self::new(resource, LockEventType::LockAcquired, data)
    }

    /// Create a lock released event
    pub fn lock_released(resource: ResourceId, holder: &SessionId, duration_ms: u64) -> Self {
        let data = serde_json::json!({
            "holder_id": holder.to_string(),
            "duration_ms": duration_ms,
        });
        Self::new(resource, LockEventType::LockReleased, data)
    }

    /// Create a lock contention event
    pub fn lock_contention(
        resource: ResourceId,
        current_holder: &SessionId,
        blocked_holder: &SessionId,
    ) -> Self {
        let data = serde_json::json!({
            "current_holder": current_holder.to_string(),
            "blocked_holder": blocked_holder.to_string(),
        });
        Self::new(resource, LockEventType::LockContention, data)
    }
}

impl DomainEvent for LockEvent {
    fn event_type(&self) -> &str {
        self.event_type.as_str()
    }

    fn aggregate_id(&self) -> String {
        lock_key(self.resource)
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn data(&self) -> Option<&serde_json::Value> {
        self.data.as_ref()
    }
}
