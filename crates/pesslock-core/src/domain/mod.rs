//! Domain layer
//!
//! Contains the lock table, sessions and the record store.

pub mod events;
pub mod locking;
pub mod records;
pub mod session;
