//! Book record and its editable fields

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::locking::ResourceId;
use crate::error::Error;

/// A lockable book record
///
/// Sessions and the store each hold their own copy; a `Book` is never
/// shared by reference between them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: ResourceId,
    pub title: String,
    pub author: String,
}

impl Book {
    /// Create a book with a title and no author
    pub fn new(id: ResourceId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            author: String::new(),
        }
    }

    /// Set the author
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Read a field
    pub fn field(&self, field: BookField) -> &str {
        match field {
            BookField::Title => &self.title,
            BookField::Author => &self.author,
        }
    }

    /// Overwrite a field
    pub fn set_field(&mut self, field: BookField, value: impl Into<String>) {
        match field {
            BookField::Title => self.title = value.into(),
            BookField::Author => self.author = value.into(),
        }
    }
}

/// Editable book fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookField {
    Title,
    Author,
}

impl BookField {
    /// Every editable field
    pub const ALL: [BookField; 2] = [Self::Title, Self::Author];

    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "Title",
            Self::Author => "Author",
        }
    }
}

impl fmt::Display for BookField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BookField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Exact name or its lowercase form
        Self::ALL
            .into_iter()
            .find(|field| s == field.as_str() || s == field.as_str().to_lowercase())
            .ok_or_else(|| Error::InvalidField(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_is_independent() {
        let original = Book::new(1, "Book Title").with_author("Book Author");
        let mut copy = original.clone();

        copy.set_field(BookField::Title, "Changed");

        assert_eq!(original.title, "Book Title");
        assert_eq!(copy.title, "Changed");
        assert_eq!(copy.id, original.id);
        assert_eq!(copy.author, original.author);
    }

    #[test]
    fn test_field_access() {
        let mut book = Book::new(5, "The Hobbit");
        book.set_field(BookField::Author, "J. R. R. Tolkien");

        assert_eq!(book.field(BookField::Title), "The Hobbit");
        assert_eq!(book.field(BookField::Author), "J. R. R. Tolkien");
    }

    #[test]
    fn test_field_from_str() {
        assert_eq!("Title".parse::<BookField>(), Ok(BookField::Title));
        assert_eq!("author".parse::<BookField>(), Ok(BookField::Author));
        assert_eq!(
            "TITLE".parse::<BookField>(),
            Err(Error::InvalidField("TITLE".to_string()))
        );
        assert_eq!(
            "Editor".parse::<BookField>(),
            Err(Error::InvalidField("Editor".to_string()))
        );
    }

    #[test]
    fn test_field_display_round_trips() {
        for field in BookField::ALL {
            assert_eq!(field.to_string().parse::<BookField>(), Ok(field));
        }
    }
}
