//! Lock guards for RAII-style lock management
//!
//! Guards release their lock when dropped, so early returns and cancelled
//! futures cannot leak a lock.

use super::table::LockTable;
use super::types::ResourceId;
use crate::domain::session::SessionId;
use std::fmt;
use std::sync::Arc;

/// A held lock on a single resource
///
/// Dropping the guard releases the lock. Note that a guard obtained by
/// re-acquiring a lock the owner already held still releases it entirely.
#[derive(Debug)]
pub struct LockGuard {
    table: Arc<LockTable>,
    resource: ResourceId,
    owner: SessionId,
    armed: bool,
}

impl LockGuard {
    pub(crate) fn new(table: Arc<LockTable>, resource: ResourceId, owner: SessionId) -> Self {
        Self {
            table,
            resource,
            owner,
            armed: true,
        }
    }

    /// Get the locked resource
    pub fn resource(&self) -> ResourceId {
        self.resource
    }

    /// Get the owning session
    pub fn owner(&self) -> &SessionId {
        &self.owner
    }

    /// Explicitly release the lock (normally done automatically on drop)
    pub fn release(mut self) {
        self.do_release();
    }

    /// Keep the lock held after the guard goes away.
    ///
    /// The owner becomes responsible for a later [`LockTable::release`] or
    /// [`LockTable::release_all`].
    pub fn persist(mut self) {
        self.armed = false;
    }

    fn do_release(&mut self) {
        if self.armed {
            self.armed = false;
            self.table.release(self.resource, &self.owner);
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.do_release();
    }
}

impl fmt::Display for LockGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Lock[resource:{} by {}]", self.resource, self.owner)
    }
}
