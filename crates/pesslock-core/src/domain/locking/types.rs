//! Lock types and error definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::domain::session::SessionId;

/// Identifier of a lockable record
pub type ResourceId = u64;

/// Result type for lock operations
pub type LockResult<T> = std::result::Result<T, LockError>;

/// Lock errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LockError {
    /// Resource is held by a different owner
    #[error("Lock cannot be obtained on resource {resource}: held by session '{holder}'")]
    Conflict {
        resource: ResourceId,
        holder: SessionId,
    },
}

impl LockError {
    /// Get error code for this lock error
    pub fn code(&self) -> &'static str {
        match self {
            Self::Conflict { .. } => "E300",
        }
    }
}

/// Lock status of a resource as seen by a prospective owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockStatus {
    /// Nobody holds the lock
    Available,
    /// The asking owner holds the lock
    HeldBySelf,
    /// Another owner holds the lock
    HeldByOther,
}

impl fmt::Display for LockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available => write!(f, "available"),
            Self::HeldBySelf => write!(f, "held_by_self"),
            Self::HeldByOther => write!(f, "held_by_other"),
        }
    }
}

/// Information about a held lock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    /// Locked resource
    pub resource: ResourceId,

    /// Session holding the lock
    pub owner: SessionId,

    /// When the lock was acquired
    pub acquired_at: DateTime<Utc>,
}

impl LockInfo {
    /// Get the lock key used for events and logs
    pub fn lock_key(&self) -> String {
        lock_key(self.resource)
    }
}

/// Lock key for a resource
pub(crate) fn lock_key(resource: ResourceId) -> String {
    format!("resource:{}", resource)
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`
pub(crate) fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
