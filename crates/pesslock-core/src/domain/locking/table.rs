//! Lock table for exclusive record locks
//!
//! The lock table is the single source of truth for which session, if any,
//! owns a resource. All operations run under one mutex, which is never held
//! across an await point, so acquire is a non-blocking check-and-set.

use super::event::LockEvent;
use super::guard::LockGuard;
use super::types::{
    LockError, LockInfo, LockResult, LockStatus, ResourceId, saturating_millis,
};
use crate::domain::events::InMemoryEventStore;
use crate::domain::session::SessionId;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Clone)]
struct LockEntry {
    owner: SessionId,
    acquired_at: DateTime<Utc>,
    held_since: Instant,
}

/// Process-wide table of resource locks
#[derive(Debug, Default)]
pub struct LockTable {
    /// Active locks (resource -> holder)
    locks: Mutex<HashMap<ResourceId, LockEntry>>,

    /// Audit trail for acquire/release/contention
    events: Option<Arc<InMemoryEventStore>>,
}

impl LockTable {
    /// Create an empty lock table
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a lock table that records lock events into `events`
    pub fn with_event_store(events: Arc<InMemoryEventStore>) -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            events: Some(events),
        }
    }

    /// Acquire the lock on `resource` for `owner`.
    ///
    /// Re-acquiring a lock the owner already holds succeeds without creating
    /// a second entry. Fails immediately with [`LockError::Conflict`] when a
    /// different owner holds it; callers that want to wait must retry.
    pub fn acquire(&self, resource: ResourceId, owner: &SessionId) -> LockResult<()> {
        let mut locks = self.locks();

        if let Some(existing) = locks.get(&resource) {
            if existing.owner == *owner {
                debug!(resource, session_id = %owner, "Lock already held by requester");
                return Ok(());
            }

            let holder = existing.owner.clone();
            drop(locks);

            debug!(
                resource,
                session_id = %owner,
                holder = %holder,
                "Lock contention"
            );
            self.record(|| LockEvent::lock_contention(resource, &holder, owner));
            return Err(LockError::Conflict { resource, holder });
        }

        locks.insert(
            resource,
            LockEntry {
                owner: owner.clone(),
                acquired_at: Utc::now(),
                held_since: Instant::now(),
            },
        );
        drop(locks);

        info!(resource, session_id = %owner, "Lock acquired");
        self.record(|| LockEvent::lock_acquired(resource, owner));
        Ok(())
    }

    /// Acquire the lock and wrap it in a guard that releases it on drop
    pub fn lock(self: &Arc<Self>, resource: ResourceId, owner: &SessionId) -> LockResult<LockGuard> {
        self.acquire(resource, owner)?;
        Ok(LockGuard::new(Arc::clone(self), resource, owner.clone()))
    }

    /// Release `resource` if `owner` holds it.
    ///
    /// Always safe to call: releasing an unlocked resource, or one held by
    /// someone else, is a no-op. Returns whether a lock was removed.
    pub fn release(&self, resource: ResourceId, owner: &SessionId) -> bool {
        let mut locks = self.locks();

        let entry = match locks.get(&resource) {
            Some(entry) if entry.owner == *owner => locks.remove(&resource),
            _ => None,
        };
        drop(locks);

        match entry {
            Some(entry) => {
                self.released(resource, &entry);
                true
            }
            None => false,
        }
    }

    /// Release every lock held by `owner`, returning the released resources
    pub fn release_all(&self, owner: &SessionId) -> Vec<ResourceId> {
        let mut locks = self.locks();

        let mut released: Vec<(ResourceId, LockEntry)> = Vec::new();
        locks.retain(|resource, entry| {
            if entry.owner == *owner {
                released.push((*resource, entry.clone()));
                false
            } else {
                true
            }
        });
        drop(locks);

        released.sort_by_key(|(resource, _)| *resource);
        for (resource, entry) in &released {
            self.released(*resource, entry);
        }

        released.into_iter().map(|(resource, _)| resource).collect()
    }

    /// Status of `resource` from the point of view of `owner`
    pub fn status(&self, resource: ResourceId, owner: &SessionId) -> LockStatus {
        match self.locks().get(&resource) {
            None => LockStatus::Available,
            Some(entry) if entry.owner == *owner => LockStatus::HeldBySelf,
            Some(_) => LockStatus::HeldByOther,
        }
    }

    /// Current holder of `resource`, if any
    pub fn holder(&self, resource: ResourceId) -> Option<SessionId> {
        self.locks().get(&resource).map(|entry| entry.owner.clone())
    }

    /// Resources currently held by `owner`, sorted
    pub fn held_by(&self, owner: &SessionId) -> Vec<ResourceId> {
        let mut held: Vec<ResourceId> = self
            .locks()
            .iter()
            .filter(|(_, entry)| entry.owner == *owner)
            .map(|(resource, _)| *resource)
            .collect();
        held.sort_unstable();
        held
    }

    /// Snapshot of every active lock, sorted by resource
    pub fn snapshot(&self) -> Vec<LockInfo> {
        let mut infos: Vec<LockInfo> = self
            .locks()
            .iter()
            .map(|(resource, entry)| LockInfo {
                resource: *resource,
                owner: entry.owner.clone(),
                acquired_at: entry.acquired_at,
            })
            .collect();
        infos.sort_by_key(|info| info.resource);
        infos
    }

    /// Number of held locks
    pub fn len(&self) -> usize {
        self.locks().len()
    }

    /// Whether no lock is held
    pub fn is_empty(&self) -> bool {
        self.locks().is_empty()
    }

    // ========== Internal Methods ==========

    // Every mutation is a single insert or remove, so a poisoned map is
    // still consistent.
    fn locks(&self) -> MutexGuard<'_, HashMap<ResourceId, LockEntry>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn released(&self, resource: ResourceId, entry: &LockEntry) {
        let duration_ms = saturating_millis(entry.held_since.elapsed());
        info!(
            resource,
            session_id = %entry.owner,
            duration_ms,
            "Lock released"
        );
        self.record(|| LockEvent::lock_released(resource, &entry.owner, duration_ms));
    }

    fn record(&self, event: impl FnOnce() -> LockEvent) {
        if let Some(events) = &self.events {
            events.record(&event());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sid(n: u64) -> SessionId {
        SessionId::new(n)
    }

    #[test]
    fn test_acquire_and_release() {
        let table = LockTable::new();

        table.acquire(1, &sid(0)).expect("Failed to acquire lock");
        assert_eq!(table.status(1, &sid(0)), LockStatus::HeldBySelf);
        assert_eq!(table.status(1, &sid(1)), LockStatus::HeldByOther);
        assert_eq!(table.holder(1), Some(sid(0)));

        assert!(table.release(1, &sid(0)));
        assert_eq!(table.status(1, &sid(0)), LockStatus::Available);
        assert!(table.is_empty());
    }

    #[test]
    fn test_conflict_leaves_table_unchanged() {
        let table = LockTable::new();
        table.acquire(1, &sid(0)).unwrap();

        let err = table.acquire(1, &sid(1)).unwrap_err();
        assert_eq!(
            err,
            LockError::Conflict {
                resource: 1,
                holder: sid(0)
            }
        );
        assert_eq!(table.len(), 1);
        assert_eq!(table.holder(1), Some(sid(0)));
    }

    #[test]
    fn test_reentrant_acquire() {
        let table = LockTable::new();

        table.acquire(1, &sid(0)).unwrap();
        table.acquire(1, &sid(0)).expect("Re-acquire should succeed");

        assert_eq!(table.len(), 1);
        assert_eq!(table.held_by(&sid(0)), vec![1]);
    }

    #[test]
    fn test_release_is_always_safe() {
        let table = LockTable::new();

        // Unlocked
        assert!(!table.release(1, &sid(0)));

        // Held by someone else
        table.acquire(1, &sid(0)).unwrap();
        assert!(!table.release(1, &sid(1)));
        assert_eq!(table.holder(1), Some(sid(0)));
    }

    #[test]
    fn test_release_all() {
        let table = LockTable::new();
        table.acquire(3, &sid(0)).unwrap();
        table.acquire(1, &sid(0)).unwrap();
        table.acquire(2, &sid(1)).unwrap();

        let released = table.release_all(&sid(0));

        assert_eq!(released, vec![1, 3]);
        assert!(table.held_by(&sid(0)).is_empty());
        assert_eq!(table.holder(2), Some(sid(1)));
        assert!(table.release_all(&sid(0)).is_empty());
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let table = Arc::new(LockTable::new());

        {
            let guard = table.lock(1, &sid(0)).unwrap();
            assert_eq!(guard.resource(), 1);
            assert_eq!(table.holder(1), Some(sid(0)));
        }

        assert!(table.is_empty());
    }

    #[test]
    fn test_snapshot() {
        let table = LockTable::new();
        table.acquire(5, &sid(1)).unwrap();
        table.acquire(2, &sid(0)).unwrap();

        let snapshot = table.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].resource, 2);
        assert_eq!(snapshot[0].owner, sid(0));
        assert_eq!(snapshot[1].lock_key(), "resource:5");
    }

    #[test]
    fn test_events_recorded() {
        let events = Arc::new(InMemoryEventStore::new());
        let table = LockTable::with_event_store(events.clone());

        table.acquire(1, &sid(0)).unwrap();
        let _ = table.acquire(1, &sid(1));
        table.release(1, &sid(0));

        let types: Vec<String> = events
            .all_events()
            .into_iter()
            .map(|e| e.event_type)
            .collect();
        assert_eq!(
            types,
            vec!["lock_acquired", "lock_contention", "lock_released"]
        );
    }

    #[test]
    fn test_concurrent_acquire_single_winner() {
        const CONTENDERS: u64 = 16;

        let table = LockTable::new();
        let barrier = Barrier::new(CONTENDERS as usize);
        let winners = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for n in 0..CONTENDERS {
                let (table, barrier, winners) = (&table, &barrier, &winners);
                scope.spawn(move || {
                    barrier.wait();
                    if table.acquire(1, &sid(n)).is_ok() {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                });
            }
        });

        assert_eq!(winners.load(Ordering::SeqCst), 1);
        assert_eq!(table.len(), 1);
    }
}
