//! Session domain module
//!
//! Sessions hold the working copies of records they have locked, and the
//! [`SessionManager`] runs the pessimistic access protocol on their behalf.
//!
//! # Architecture
//!
//! - **Entities**: `Session`, `SessionEvent`, `SessionInfo`
//! - **Manager**: `SessionManager` for session lifecycle and record access
//!
//! # Example
//!
//! ```ignore
//! use pesslock_core::domain::records::{BookField, InMemoryRecordRepository};
//! use pesslock_core::domain::session::SessionManager;
//!
//! let manager = SessionManager::new(Arc::new(InMemoryRecordRepository::new()));
//! let alice = manager.new_session("Alice").await;
//!
//! manager.write(&alice, 1, BookField::Title, "Harry Potter").await?;
//! let title = manager.read(&alice, 1, BookField::Title).await?;
//!
//! manager.remove_session(&alice).await?;
//! ```

pub mod event;
pub mod manager;
pub mod session;

// Re-export main types
pub use event::{SessionEvent, SessionEventType};
pub use manager::{ManagerConfig, SessionManager};
pub use session::{Session, SessionId, SessionInfo};
