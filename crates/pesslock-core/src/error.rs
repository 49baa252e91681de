//! Error types for Pesslock

use thiserror::Error;

use crate::domain::locking::{LockError, ResourceId};
use crate::domain::session::SessionId;

/// Result type alias using Pesslock's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Pesslock error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Entity errors (E001-E099)
    #[error("Session '{0}' not found. It may have been removed.")]
    SessionNotFound(SessionId),

    #[error("Record {0} not found in the record store.")]
    RecordNotFound(ResourceId),

    #[error("Session '{session}' does not have record {resource} checked out.")]
    NotCheckedOut {
        session: SessionId,
        resource: ResourceId,
    },

    #[error("Duplicate record with id {0}.")]
    DuplicateRecord(ResourceId),

    // Lock errors (E300-E399)
    #[error("Another user has lock on resource {resource} (held by session '{holder}').")]
    LockConflict {
        resource: ResourceId,
        holder: SessionId,
    },

    // Input errors (E800-E899)
    #[error("'{0}' is not a valid book field. Expected one of: Title, Author.")]
    InvalidField(String),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::SessionNotFound(_) => "E001",
            Self::RecordNotFound(_) => "E002",
            Self::NotCheckedOut { .. } => "E003",
            Self::DuplicateRecord(_) => "E004",
            Self::LockConflict { .. } => "E300",
            Self::InvalidField(_) => "E800",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::SessionNotFound(_) => Some("Open a new session and retry".to_string()),
            Self::LockConflict { .. } => {
                Some("Retry once the other session has finished".to_string())
            }
            Self::InvalidField(_) => Some("Use one of: Title, Author".to_string()),
            Self::NotCheckedOut { resource, .. } => {
                Some(format!("Check out record {} first", resource))
            }
            _ => None,
        }
    }

    /// Whether this error is a lock conflict
    pub fn is_lock_conflict(&self) -> bool {
        matches!(self, Self::LockConflict { .. })
    }
}

impl From<LockError> for Error {
    fn from(err: LockError) -> Self {
        match err {
            LockError::Conflict { resource, holder } => Self::LockConflict { resource, holder },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_not_found_error() {
        let error = Error::SessionNotFound(SessionId::new(7));
        assert_eq!(error.code(), "E001");
        assert!(error.to_string().contains("'7'"));
        assert!(error.suggestion().is_some());
    }

    #[test]
    fn test_record_not_found_error() {
        let error = Error::RecordNotFound(42);
        assert_eq!(error.code(), "E002");
        assert_eq!(error.suggestion(), None);
        assert!(error.to_string().contains("42"));
    }

    #[test]
    fn test_lock_conflict_message() {
        let error = Error::LockConflict {
            resource: 1,
            holder: SessionId::new(0),
        };
        assert_eq!(error.code(), "E300");
        assert!(error.is_lock_conflict());
        assert!(
            error
                .to_string()
                .starts_with("Another user has lock on resource 1")
        );
    }

    #[test]
    fn test_lock_error_conversion() {
        let err: Error = LockError::Conflict {
            resource: 3,
            holder: SessionId::new(2),
        }
        .into();

        assert_eq!(
            err,
            Error::LockConflict {
                resource: 3,
                holder: SessionId::new(2)
            }
        );
    }

    #[test]
    fn test_invalid_field_error() {
        let error = Error::InvalidField("Editor".to_string());
        assert_eq!(error.code(), "E800");
        assert!(error.to_string().contains("Editor"));
        assert_eq!(error.suggestion(), Some("Use one of: Title, Author".to_string()));
    }

    #[test]
    fn test_error_codes() {
        let errors = [
            Error::SessionNotFound(SessionId::new(0)),
            Error::RecordNotFound(1),
            Error::NotCheckedOut {
                session: SessionId::new(0),
                resource: 1,
            },
            Error::DuplicateRecord(1),
            Error::LockConflict {
                resource: 1,
                holder: SessionId::new(0),
            },
            Error::InvalidField("Editor".to_string()),
        ];

        let codes: std::collections::HashSet<&str> = errors.iter().map(Error::code).collect();
        assert_eq!(codes.len(), errors.len());
        assert_eq!(
            codes,
            ["E001", "E002", "E003", "E004", "E300", "E800"].into_iter().collect()
        );
    }

    #[test]
    fn test_not_checked_out_suggestion() {
        let error = Error::NotCheckedOut {
            session: SessionId::new(1),
            resource: 9,
        };
        assert_eq!(error.code(), "E003");
        assert_eq!(error.suggestion(), Some("Check out record 9 first".to_string()));
    }
}
