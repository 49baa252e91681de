//! Session manager for pessimistic record access
//!
//! Every read and write runs as one lock window:
//! acquire lock -> load into the session -> operate -> commit (writes) ->
//! release. The window is owned by a [`Checkout`] scope whose drop releases
//! both the working copy and the lock, so every exit path (errors, early
//! returns, cancelled futures) leaves no lock behind.

use super::event::SessionEvent;
use super::session::{Session, SessionId, SessionInfo};
use crate::domain::events::InMemoryEventStore;
use crate::domain::locking::types::saturating_millis;
use crate::domain::locking::{LockGuard, LockStatus, LockTable, ResourceId};
use crate::domain::records::{Book, BookField, RecordRepository};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info, warn};

/// Configuration for the session manager
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Simulated work between edit and commit, held inside the lock window
    pub write_delay: Duration,

    /// Simulated work between load and read, held inside the lock window
    pub read_delay: Duration,
}

impl ManagerConfig {
    /// Set the simulated write latency
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = delay;
        self
    }

    /// Set the simulated read latency
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = delay;
        self
    }
}

#[derive(Debug)]
struct SessionSlot {
    user_name: String,
    created_at: DateTime<Utc>,
    /// Set by `remove_session` while it holds the session lock
    closed: AtomicBool,
    session: Arc<Mutex<Session>>,
}

/// Lock window over one resource of one session.
///
/// Dropping it removes the working copy first and then releases the lock.
struct Checkout<'a> {
    session: &'a mut Session,
    resource: ResourceId,
    lock: Option<LockGuard>,
}

impl Checkout<'_> {
    fn session(&mut self) -> &mut Session {
        &mut *self.session
    }

    /// Keep both the working copy and the lock past the end of the request
    fn persist(mut self) {
        if let Some(lock) = self.lock.take() {
            lock.persist();
        }
    }
}

impl Drop for Checkout<'_> {
    fn drop(&mut self) {
        if let Some(lock) = self.lock.take() {
            self.session.release(self.resource);
            lock.release();
        }
    }
}

/// Orchestrates sessions and the pessimistic access protocol
#[derive(Clone)]
pub struct SessionManager {
    config: ManagerConfig,
    store: Arc<dyn RecordRepository>,
    locks: Arc<LockTable>,
    sessions: Arc<RwLock<HashMap<SessionId, Arc<SessionSlot>>>>,
    next_session_id: Arc<AtomicU64>,
    events: Arc<InMemoryEventStore>,
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("config", &self.config)
            .field("locks", &self.locks)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Create a session manager over `store` with default configuration
    pub fn new(store: Arc<dyn RecordRepository>) -> Self {
        Self::with_config(store, ManagerConfig::default())
    }

    /// Create a session manager with a custom configuration
    pub fn with_config(store: Arc<dyn RecordRepository>, config: ManagerConfig) -> Self {
        let events = Arc::new(InMemoryEventStore::new());
        Self {
            config,
            store,
            locks: Arc::new(LockTable::with_event_store(events.clone())),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            next_session_id: Arc::new(AtomicU64::new(0)),
            events,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Get the record store
    pub fn store(&self) -> &Arc<dyn RecordRepository> {
        &self.store
    }

    /// Get the lock table
    pub fn lock_table(&self) -> &LockTable {
        &self.locks
    }

    /// Get the lock and session audit trail
    pub fn events(&self) -> &InMemoryEventStore {
        &self.events
    }

    // ========== Session Lifecycle ==========

    /// Open a session for `user_name`
    pub async fn new_session(&self, user_name: impl Into<String>) -> SessionId {
        let user_name = user_name.into();
        let id = SessionId::new(self.next_session_id.fetch_add(1, Ordering::SeqCst));
        let session = Session::new(id.clone(), user_name.clone());

        let slot = Arc::new(SessionSlot {
            user_name: user_name.clone(),
            created_at: session.created_at,
            closed: AtomicBool::new(false),
            session: Arc::new(Mutex::new(session)),
        });
        self.sessions.write().await.insert(id.clone(), slot);

        self.events.record(&SessionEvent::started(id.clone(), &user_name));
        info!(session_id = %id, user = %user_name, "Session created");
        id
    }

    /// Remove a session, releasing every lock it holds.
    ///
    /// Uncommitted working copies are discarded. Waits for a request the
    /// session still has in flight; requests that looked the session up but
    /// had not started yet fail with `SessionNotFound`. Returns the released
    /// resources.
    pub async fn remove_session(&self, session_id: &SessionId) -> Result<Vec<ResourceId>> {
        let slot = self
            .sessions
            .write()
            .await
            .remove(session_id)
            .ok_or_else(|| Error::SessionNotFound(session_id.clone()))?;

        let mut session = slot.session.lock().await;
        slot.closed.store(true, Ordering::SeqCst);
        let released = self.locks.release_all(session_id);
        let discarded = session.clear();
        if !discarded.is_empty() {
            debug!(session_id = %session_id, discarded = ?discarded, "Discarded uncommitted working copies");
        }

        self.events
            .record(&SessionEvent::removed(session_id.clone(), &released));
        info!(session_id = %session_id, released = ?released, "Session removed");
        Ok(released)
    }

    /// Number of live sessions
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// List live sessions, ordered by id
    pub async fn sessions(&self) -> Vec<SessionInfo> {
        let mut infos: Vec<SessionInfo> = self
            .sessions
            .read()
            .await
            .iter()
            .map(|(id, slot)| SessionInfo {
                id: id.clone(),
                user_name: slot.user_name.clone(),
                checked_out: self.locks.held_by(id),
                created_at: slot.created_at,
            })
            .collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        infos
    }

    // ========== Single-shot Protocol ==========

    /// Write `value` into `field` of `resource` and commit it.
    ///
    /// Returns the committed copy. The lock is held from before the load
    /// until after the commit and released on every outcome.
    pub async fn write(
        &self,
        session_id: &SessionId,
        resource: ResourceId,
        field: BookField,
        value: impl Into<String>,
    ) -> Result<Book> {
        let value = value.into();
        let mut session = self.lock_session(session_id).await?;
        let mut checkout = self.open(&mut session, resource).await?;

        let updated = checkout.session().edit(resource, field, value)?;
        self.simulate_work(self.config.write_delay).await;
        self.store.update(&updated).await?;

        self.events
            .record(&SessionEvent::committed(session_id.clone(), resource));
        info!(
            session_id = %session_id,
            resource,
            field = %field,
            "Write committed"
        );
        Ok(updated)
    }

    /// Read `field` of `resource` under an exclusive lock
    pub async fn read(
        &self,
        session_id: &SessionId,
        resource: ResourceId,
        field: BookField,
    ) -> Result<String> {
        let mut session = self.lock_session(session_id).await?;
        let mut checkout = self.open(&mut session, resource).await?;

        self.simulate_work(self.config.read_delay).await;
        let value = checkout.session().read_field(resource, field)?;

        debug!(session_id = %session_id, resource, field = %field, "Read completed");
        Ok(value)
    }

    // ========== Multi-step Checkout ==========

    /// Lock and load `resource` into the session, keeping it checked out
    /// after the call returns. Returns the working copy.
    pub async fn checkout(&self, session_id: &SessionId, resource: ResourceId) -> Result<Book> {
        let mut session = self.lock_session(session_id).await?;
        let checkout = self.open(&mut session, resource).await?;
        checkout.persist();

        info!(session_id = %session_id, resource, "Record checked out");
        session
            .working_copy(resource)
            .cloned()
            .ok_or_else(|| Error::NotCheckedOut {
                session: session_id.clone(),
                resource,
            })
    }

    /// Edit the working copy of a checked-out resource without committing
    pub async fn edit(
        &self,
        session_id: &SessionId,
        resource: ResourceId,
        field: BookField,
        value: impl Into<String>,
    ) -> Result<Book> {
        let mut session = self.lock_session(session_id).await?;
        session.edit(resource, field, value)
    }

    /// Commit the working copy of a checked-out resource and release it.
    ///
    /// The resource is released even when the store rejects the commit.
    pub async fn commit(&self, session_id: &SessionId, resource: ResourceId) -> Result<Book> {
        let mut session = self.lock_session(session_id).await?;
        let working_copy = session
            .working_copy(resource)
            .cloned()
            .ok_or_else(|| Error::NotCheckedOut {
                session: session_id.clone(),
                resource,
            })?;

        let lock = self.locks.lock(resource, session_id)?;
        let _checkout = Checkout {
            session: &mut session,
            resource,
            lock: Some(lock),
        };
        self.store.update(&working_copy).await?;

        self.events
            .record(&SessionEvent::committed(session_id.clone(), resource));
        info!(session_id = %session_id, resource, "Checked-out record committed");
        Ok(working_copy)
    }

    /// Release a checked-out resource without committing its working copy.
    ///
    /// Returns whether the resource was checked out.
    pub async fn discard(&self, session_id: &SessionId, resource: ResourceId) -> Result<bool> {
        let mut session = self.lock_session(session_id).await?;

        let dropped = session.release(resource).is_some();
        self.locks.release(resource, session_id);

        if dropped {
            self.events
                .record(&SessionEvent::discarded(session_id.clone(), resource));
            info!(session_id = %session_id, resource, "Checked-out record discarded");
        }
        Ok(dropped)
    }

    // ========== Queries ==========

    /// Resources the session currently has checked out
    pub async fn locks_held(&self, session_id: &SessionId) -> Result<Vec<ResourceId>> {
        let session = self.lock_session(session_id).await?;
        Ok(session.locks_held())
    }

    /// Lock status of `resource` as seen by `session_id`
    pub fn lock_status(&self, resource: ResourceId, session_id: &SessionId) -> LockStatus {
        self.locks.status(resource, session_id)
    }

    // ========== Internal Methods ==========

    async fn slot(&self, session_id: &SessionId) -> Result<Arc<SessionSlot>> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| Error::SessionNotFound(session_id.clone()))
    }

    /// Resolve and lock a session for the duration of one request
    async fn lock_session(&self, session_id: &SessionId) -> Result<OwnedMutexGuard<Session>> {
        let slot = self.slot(session_id).await?;
        Self::lock_slot(&slot, session_id).await
    }

    /// Lock a resolved session, failing if it was removed while waiting
    async fn lock_slot(
        slot: &SessionSlot,
        session_id: &SessionId,
    ) -> Result<OwnedMutexGuard<Session>> {
        let session = Arc::clone(&slot.session).lock_owned().await;
        if slot.closed.load(Ordering::SeqCst) {
            return Err(Error::SessionNotFound(session_id.clone()));
        }
        Ok(session)
    }

    /// Acquire the lock on `resource` and load it into `session`
    async fn open<'a>(
        &self,
        session: &'a mut Session,
        resource: ResourceId,
    ) -> Result<Checkout<'a>> {
        let lock = self.locks.lock(resource, &session.id).map_err(|e| {
            warn!(session_id = %session.id, resource, "Another user has lock on resource");
            Error::from(e)
        })?;

        let mut checkout = Checkout {
            session,
            resource,
            lock: Some(lock),
        };

        let book = self.store.get(resource).await?;
        checkout.session().checkout(resource, book);
        Ok(checkout)
    }

    async fn simulate_work(&self, delay: Duration) {
        if !delay.is_zero() {
            debug!(
                delay_ms = saturating_millis(delay),
                "Simulating work inside lock window"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
