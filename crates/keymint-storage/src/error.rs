//! Storage error types for the persistence contract.

use std::fmt;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested entity was not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity that was not found (`client`, `code`, `token`).
        entity: &'static str,
        /// The key that was looked up.
        id: String,
    },

    /// A write violated a uniqueness or referential constraint.
    #[error("Constraint violation: {message}")]
    Constraint {
        /// Description of the violated constraint.
        message: String,
    },

    /// A stored row could not be decoded into an entity.
    #[error("Invalid stored data: {message}")]
    InvalidData {
        /// Description of the decoding problem.
        message: String,
    },

    /// The backend failed (I/O, connection loss, driver error).
    #[error("Storage backend error: {message}")]
    Backend {
        /// Description of the backend failure.
        message: String,
    },
}

impl StorageError {
    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Creates a new `Constraint` error.
    #[must_use]
    pub fn constraint(message: impl Into<String>) -> Self {
        Self::Constraint {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidData` error.
    #[must_use]
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Creates a new `Backend` error.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this is a constraint violation.
    #[must_use]
    pub fn is_constraint(&self) -> bool {
        matches!(self, Self::Constraint { .. })
    }

    /// Returns `true` if this is a backend failure.
    #[must_use]
    pub fn is_backend(&self) -> bool {
        matches!(self, Self::Backend { .. })
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Constraint { .. } => ErrorCategory::Conflict,
            Self::InvalidData { .. } => ErrorCategory::Validation,
            Self::Backend { .. } => ErrorCategory::Infrastructure,
        }
    }
}

/// Categories of storage errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Entity not found.
    NotFound,
    /// Uniqueness or foreign key conflict.
    Conflict,
    /// Stored data failed validation.
    Validation,
    /// Infrastructure/connection error.
    Infrastructure,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::Validation => write!(f, "validation"),
            Self::Infrastructure => write!(f, "infrastructure"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorageError::not_found("code", "abc");
        assert_eq!(err.to_string(), "code not found: abc");

        let err = StorageError::constraint("unknown client");
        assert_eq!(err.to_string(), "Constraint violation: unknown client");

        let err = StorageError::backend("connection reset");
        assert_eq!(err.to_string(), "Storage backend error: connection reset");
    }

    #[test]
    fn test_error_predicates() {
        assert!(StorageError::not_found("client", "x").is_not_found());
        assert!(!StorageError::backend("x").is_not_found());
        assert!(StorageError::constraint("x").is_constraint());
        assert!(StorageError::backend("x").is_backend());
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(
            StorageError::not_found("token", "t").category(),
            ErrorCategory::NotFound
        );
        assert_eq!(
            StorageError::constraint("dup").category(),
            ErrorCategory::Conflict
        );
        assert_eq!(
            StorageError::invalid_data("bad").category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            StorageError::backend("down").category(),
            ErrorCategory::Infrastructure
        );
        assert_eq!(ErrorCategory::Infrastructure.to_string(), "infrastructure");
    }
}
