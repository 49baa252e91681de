//! pesslock Core Library
//!
//! This crate provides pessimistic lock coordination for shared records:
//! - Lock table with non-blocking, owner-scoped exclusive locks
//! - Sessions holding private working copies of locked records
//! - Session manager running acquire, load, mutate, commit, release
//! - In-memory record store and audit trail
//! - Configuration with TOML persistence

pub mod config;
pub mod domain;
pub mod error;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::domain::locking::{LockStatus, LockTable, ResourceId};
    pub use crate::domain::records::{Book, BookField, InMemoryRecordRepository, RecordRepository};
    pub use crate::domain::session::{ManagerConfig, SessionId, SessionManager};
    pub use crate::error::{Error, Result};
}
