//! Record store
//!
//! The store owns committed state. Reads hand out copies and writes take
//! copies, so nothing a session does to its working copy is visible here
//! until it is passed to [`RecordRepository::update`].

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use super::book::Book;
use crate::domain::locking::ResourceId;
use crate::error::{Error, Result};

/// Repository trait for record persistence
#[async_trait]
pub trait RecordRepository: Send + Sync {
    /// Add a new record; fails with `DuplicateRecord` if the id exists
    async fn add(&self, book: &Book) -> Result<()>;

    /// Replace an existing record; fails with `RecordNotFound` if absent
    async fn update(&self, book: &Book) -> Result<()>;

    /// Get a copy of a record; fails with `RecordNotFound` if absent
    async fn get(&self, id: ResourceId) -> Result<Book>;

    /// Remove a record, returning whether it existed
    async fn remove(&self, id: ResourceId) -> Result<bool>;

    /// Check whether a record exists
    async fn contains(&self, id: ResourceId) -> Result<bool>;

    /// Number of stored records
    async fn len(&self) -> Result<usize>;
}

/// In-memory record store keyed by id
#[derive(Debug, Default)]
pub struct InMemoryRecordRepository {
    books: RwLock<HashMap<ResourceId, Book>>,
}

impl InMemoryRecordRepository {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `books` (later duplicates win)
    pub fn with_books(books: impl IntoIterator<Item = Book>) -> Self {
        Self {
            books: RwLock::new(books.into_iter().map(|b| (b.id, b)).collect()),
        }
    }
}

#[async_trait]
impl RecordRepository for InMemoryRecordRepository {
    async fn add(&self, book: &Book) -> Result<()> {
        let mut books = self.books.write().await;
        if books.contains_key(&book.id) {
            return Err(Error::DuplicateRecord(book.id));
        }
        books.insert(book.id, book.clone());
        debug!(book_id = book.id, title = %book.title, "Book added");
        Ok(())
    }

    async fn update(&self, book: &Book) -> Result<()> {
        let mut books = self.books.write().await;
        match books.get_mut(&book.id) {
            Some(stored) => {
                *stored = book.clone();
                debug!(book_id = book.id, "Book updated");
                Ok(())
            }
            None => Err(Error::RecordNotFound(book.id)),
        }
    }

    async fn get(&self, id: ResourceId) -> Result<Book> {
        self.books
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(Error::RecordNotFound(id))
    }

    async fn remove(&self, id: ResourceId) -> Result<bool> {
        Ok(self.books.write().await.remove(&id).is_some())
    }

    async fn contains(&self, id: ResourceId) -> Result<bool> {
        Ok(self.books.read().await.contains_key(&id))
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.books.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Verify trait is object-safe
    fn _assert_object_safe(_: &dyn RecordRepository) {}

    #[tokio::test]
    async fn test_add_book() {
        let repo = InMemoryRecordRepository::new();
        let book = Book::new(1, "Book One");

        repo.add(&book).await.expect("Failed to add book");
        let err = repo.add(&book).await.unwrap_err();

        assert_eq!(err, Error::DuplicateRecord(1));
        assert_eq!(err.to_string(), "Duplicate record with id 1.");
    }

    #[tokio::test]
    async fn test_get_book() {
        let repo = InMemoryRecordRepository::new();
        repo.add(&Book::new(1, "Book One")).await.unwrap();

        assert_eq!(repo.get(1).await.unwrap().title, "Book One");
        assert_eq!(repo.get(2).await.unwrap_err(), Error::RecordNotFound(2));
    }

    #[tokio::test]
    async fn test_update_book() {
        let repo = InMemoryRecordRepository::new();
        repo.add(&Book::new(1, "Book One")).await.unwrap();

        repo.update(&Book::new(1, "New Book One")).await.unwrap();
        assert_eq!(repo.get(1).await.unwrap().title, "New Book One");

        let err = repo.update(&Book::new(2, "Book Two")).await.unwrap_err();
        assert_eq!(err, Error::RecordNotFound(2));
    }

    #[tokio::test]
    async fn test_get_returns_copy() {
        let repo = InMemoryRecordRepository::with_books([Book::new(1, "The Hobbit")]);

        let mut copy = repo.get(1).await.unwrap();
        copy.title = "Edited locally".to_string();

        assert_eq!(repo.get(1).await.unwrap().title, "The Hobbit");
    }

    #[tokio::test]
    async fn test_remove_and_len() {
        let repo =
            InMemoryRecordRepository::with_books([Book::new(1, "One"), Book::new(2, "Two")]);
        assert_eq!(repo.len().await.unwrap(), 2);

        assert!(repo.remove(1).await.unwrap());
        assert!(!repo.remove(1).await.unwrap());
        assert!(!repo.contains(1).await.unwrap());
        assert_eq!(repo.len().await.unwrap(), 1);
    }
}
