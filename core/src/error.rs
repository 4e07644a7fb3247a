//! Error taxonomy for the distribution ledger.
//!
//! Two layers:
//!
//! - [`StoreError`]: what a storage backend reports (missing rows, timeouts,
//!   connection failures).
//! - [`LedgerError`]: what callers of the engine see. Every failure carries one
//!   of four kinds ([`ErrorKind`]), so the boundary can decide between "fix the
//!   request", "try again later" and "reconcile by hand".

use crate::catalog::{CenterId, UserId};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Entity kinds that can be referenced by an operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// A field worker.
    User,
    /// A catalog book.
    Book,
    /// A regional center.
    Center,
    /// A stock entry.
    Stock,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::User => "user",
            Self::Book => "book",
            Self::Center => "center",
            Self::Stock => "stock entry",
        };
        f.write_str(name)
    }
}

/// Errors reported by storage backends.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of the missing record.
        entity: EntityKind,
        /// Identifier that was looked up.
        id: String,
    },

    /// A uniqueness constraint was violated (e.g. duplicate center name).
    #[error("Duplicate {entity}: {detail}")]
    Duplicate {
        /// Kind of the conflicting record.
        entity: EntityKind,
        /// Human-readable description of the conflict.
        detail: String,
    },

    /// The call did not complete within its deadline.
    #[error("Storage call {operation} timed out after {after:?}")]
    Timeout {
        /// Name of the storage operation.
        operation: &'static str,
        /// The deadline that elapsed.
        after: Duration,
    },

    /// The backend could not be reached.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Any other backend failure.
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Failure classification attached to every [`LedgerError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A referenced user, book, center or stock entry does not exist.
    NotFound,
    /// The request itself is malformed (missing or negative amounts, bad dates, bad ids).
    InvalidArgument,
    /// Storage timed out or was unavailable. On writes the outcome is unknown.
    Transient,
    /// The user-side update landed but the center-side update did not.
    Inconsistent,
}

impl ErrorKind {
    /// Stable lowercase label, used for metrics and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::InvalidArgument => "invalid_argument",
            Self::Transient => "transient",
            Self::Inconsistent => "inconsistent",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by ledger and analytics operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of the missing record.
        entity: EntityKind,
        /// Identifier that was looked up.
        id: String,
    },

    /// The request is malformed.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Storage timed out or was unavailable.
    ///
    /// For writes the append may or may not have landed; prefer manual
    /// reconciliation over a blind retry.
    #[error("Transient storage failure: {0}")]
    Transient(String),

    /// The user's aggregates were updated but the center's were not.
    #[error("Aggregates out of sync for user {user_id} and center {center_id}: {reason}")]
    Inconsistent {
        /// User whose totals already include the distribution.
        user_id: UserId,
        /// Center whose totals are missing it.
        center_id: CenterId,
        /// Underlying failure of the center update.
        reason: String,
    },
}

impl LedgerError {
    /// Shorthand for a missing record.
    pub fn not_found(entity: EntityKind, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Shorthand for a malformed request.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidArgument(reason.into())
    }

    /// The failure kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::Transient(_) => ErrorKind::Transient,
            Self::Inconsistent { .. } => ErrorKind::Inconsistent,
        }
    }

    /// Whether repeating the same call may succeed. Only reads should act on this.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => Self::NotFound { entity, id },
            StoreError::Duplicate { .. } => Self::InvalidArgument(err.to_string()),
            StoreError::Timeout { .. } | StoreError::Unavailable(_) | StoreError::Backend(_) => {
                Self::Transient(err.to_string())
            }
        }
    }
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_onto_the_engine_taxonomy() {
        let missing: LedgerError = StoreError::NotFound {
            entity: EntityKind::Book,
            id: "b-1".to_string(),
        }
        .into();
        assert_eq!(missing.kind(), ErrorKind::NotFound);

        let duplicate: LedgerError = StoreError::Duplicate {
            entity: EntityKind::Center,
            detail: "IYMF AECS".to_string(),
        }
        .into();
        assert_eq!(duplicate.kind(), ErrorKind::InvalidArgument);

        let timeout: LedgerError = StoreError::Timeout {
            operation: "increment_center",
            after: Duration::from_millis(50),
        }
        .into();
        assert_eq!(timeout.kind(), ErrorKind::Transient);
        assert!(timeout.is_retryable());

        let backend: LedgerError = StoreError::Backend("boom".to_string()).into();
        assert_eq!(backend.kind(), ErrorKind::Transient);
    }

    #[test]
    fn inconsistent_is_not_retryable() {
        let err = LedgerError::Inconsistent {
            user_id: UserId::new(),
            center_id: CenterId::new(),
            reason: "center update failed".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Inconsistent);
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("out of sync"));
    }

    #[test]
    fn not_found_display_names_the_entity() {
        let err = LedgerError::not_found(EntityKind::Center, "abc");
        assert_eq!(err.to_string(), "center not found: abc");
    }
}
