//! Session entity and related types
//!
//! A session is one connected user together with the working copies of the
//! records whose locks it currently holds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::domain::locking::ResourceId;
use crate::domain::records::{Book, BookField};
use crate::error::{Error, Result};

/// Session identifier, issued from a monotonically increasing counter
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(u64);

impl SessionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// A connected user and their checked-out working copies
#[derive(Debug, Clone)]
pub struct Session {
    /// Session identifier
    pub id: SessionId,

    /// Display name of the user
    pub user_name: String,

    /// When the session was created
    pub created_at: DateTime<Utc>,

    /// Working copies keyed by resource; present iff the lock is held
    checked_out: HashMap<ResourceId, Book>,
}

impl Session {
    /// Create a session with an empty working set
    pub fn new(id: SessionId, user_name: impl Into<String>) -> Self {
        Self {
            id,
            user_name: user_name.into(),
            created_at: Utc::now(),
            checked_out: HashMap::new(),
        }
    }

    /// Store a private copy of `book` under `resource`.
    ///
    /// An existing entry is left untouched so an in-progress edit is never
    /// overwritten. Returns whether the copy was stored.
    pub fn checkout(&mut self, resource: ResourceId, book: Book) -> bool {
        if self.checked_out.contains_key(&resource) {
            return false;
        }
        self.checked_out.insert(resource, book);
        true
    }

    /// Drop `resource` from the working set, returning the working copy
    pub fn release(&mut self, resource: ResourceId) -> Option<Book> {
        self.checked_out.remove(&resource)
    }

    /// Mutate the working copy of `resource` and return the updated copy
    pub fn edit(
        &mut self,
        resource: ResourceId,
        field: BookField,
        value: impl Into<String>,
    ) -> Result<Book> {
        let session = self.id.clone();
        let book = self
            .checked_out
            .get_mut(&resource)
            .ok_or(Error::NotCheckedOut { session, resource })?;

        book.set_field(field, value);
        Ok(book.clone())
    }

    /// Read a field from the working copy of `resource`
    pub fn read_field(&self, resource: ResourceId, field: BookField) -> Result<String> {
        self.working_copy(resource)
            .map(|book| book.field(field).to_string())
            .ok_or_else(|| Error::NotCheckedOut {
                session: self.id.clone(),
                resource,
            })
    }

    /// Get the working copy of `resource`
    pub fn working_copy(&self, resource: ResourceId) -> Option<&Book> {
        self.checked_out.get(&resource)
    }

    /// Whether `resource` is checked out
    pub fn is_checked_out(&self, resource: ResourceId) -> bool {
        self.checked_out.contains_key(&resource)
    }

    /// Checked-out resource ids, sorted
    pub fn locks_held(&self) -> Vec<ResourceId> {
        let mut held: Vec<ResourceId> = self.checked_out.keys().copied().collect();
        held.sort_unstable();
        held
    }

    /// Drop every working copy, returning the dropped resource ids
    pub fn clear(&mut self) -> Vec<ResourceId> {
        let held = self.locks_held();
        self.checked_out.clear();
        held
    }
}

/// Lightweight session info for listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Session ID
    pub id: SessionId,

    /// Display name of the user
    pub user_name: String,

    /// Resources currently checked out
    pub checked_out: Vec<ResourceId>,

    /// When created
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(SessionId::new(0), "Alice")
    }

    #[test]
    fn test_session_id_display_and_parse() {
        let id = SessionId::new(12);
        assert_eq!(id.to_string(), "12");
        assert_eq!("12".parse::<SessionId>().unwrap(), id);
        assert!("abc".parse::<SessionId>().is_err());
    }

    #[test]
    fn test_checkout_does_not_overwrite_edit() {
        let mut session = session();
        assert!(session.checkout(1, Book::new(1, "The Hobbit")));

        session.edit(1, BookField::Title, "Draft").unwrap();
        assert!(!session.checkout(1, Book::new(1, "The Hobbit")));

        assert_eq!(session.read_field(1, BookField::Title).unwrap(), "Draft");
    }

    #[test]
    fn test_edit_returns_updated_copy() {
        let mut session = session();
        session.checkout(1, Book::new(1, "The Hobbit"));

        let updated = session.edit(1, BookField::Author, "Tolkien").unwrap();

        assert_eq!(updated.author, "Tolkien");
        assert_eq!(updated.title, "The Hobbit");
    }

    #[test]
    fn test_edit_requires_checkout() {
        let mut session = session();

        let err = session.edit(3, BookField::Title, "x").unwrap_err();
        assert_eq!(
            err,
            Error::NotCheckedOut {
                session: SessionId::new(0),
                resource: 3
            }
        );
        assert!(session.read_field(3, BookField::Title).is_err());
    }

    #[test]
    fn test_release_and_clear() {
        let mut session = session();
        session.checkout(2, Book::new(2, "Two"));
        session.checkout(1, Book::new(1, "One"));
        assert_eq!(session.locks_held(), vec![1, 2]);

        let released = session.release(2).unwrap();
        assert_eq!(released.title, "Two");
        assert!(session.release(2).is_none());
        assert!(!session.is_checked_out(2));

        assert_eq!(session.clear(), vec![1]);
        assert!(session.locks_held().is_empty());
    }
}
