//! Resource locking for concurrent access
//!
//! Exclusive, non-blocking record locks keyed by resource id.
//!
//! # Architecture
//!
//! - **Lock Table**: `LockTable`, the single source of truth for lock owners
//! - **Guards**: `LockGuard`, RAII release on drop
//! - **Events**: `LockEvent` audit trail of acquire/release/contention
//!
//! # Example
//!
//! ```ignore
//! use pesslock_core::domain::locking::LockTable;
//!
//! let table = Arc::new(LockTable::new());
//!
//! let guard = table.lock(book_id, &session_id)?;
//!
//! // Read or mutate the record...
//!
//! // Lock is released when the guard is dropped
//! ```

pub mod event;
pub mod guard;
pub mod table;
pub mod types;

// Re-export main types
pub use event::{LockEvent, LockEventType};
pub use guard::LockGuard;
pub use table::LockTable;
pub use types::{LockError, LockInfo, LockResult, LockStatus, ResourceId};
