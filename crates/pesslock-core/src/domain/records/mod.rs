//! Record store domain module
//!
//! Books and the repository that holds their committed state.

pub mod book;
pub mod repository;

pub use book::{Book, BookField};
pub use repository::{InMemoryRecordRepository, RecordRepository};
