//! Issuance engine error types.

use std::fmt;

use keymint_storage::StorageError;

use crate::oauth::PkceError;

/// Errors that can occur while issuing or redeeming credentials.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The code, refresh token or client binding does not check out.
    #[error("Invalid grant: {message}")]
    InvalidGrant {
        /// Description of why the grant is invalid.
        message: String,
    },

    /// The client credentials are invalid or the client is not registered.
    #[error("Invalid client: {message}")]
    InvalidClient {
        /// Description of why the client is invalid.
        message: String,
    },

    /// The code was issued with a PKCE method this engine does not implement.
    #[error("Unsupported code challenge method: {method}")]
    UnsupportedChallengeMethod {
        /// The unsupported method as recorded on the code.
        method: String,
    },

    /// The grant type is unknown or disabled.
    #[error("Unsupported grant type: {grant_type}")]
    UnsupportedGrantType {
        /// The unsupported grant type.
        grant_type: String,
    },

    /// A grant request is missing a required parameter.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of why the request is invalid.
        message: String,
    },

    /// The persistence layer failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The engine configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },
}

impl AuthError {
    /// Create an `InvalidGrant` error.
    #[must_use]
    pub fn invalid_grant(message: impl Into<String>) -> Self {
        Self::InvalidGrant {
            message: message.into(),
        }
    }

    /// Create an `InvalidClient` error.
    #[must_use]
    pub fn invalid_client(message: impl Into<String>) -> Self {
        Self::InvalidClient {
            message: message.into(),
        }
    }

    /// Create an `UnsupportedChallengeMethod` error.
    #[must_use]
    pub fn unsupported_challenge_method(method: impl Into<String>) -> Self {
        Self::UnsupportedChallengeMethod {
            method: method.into(),
        }
    }

    /// Create an `UnsupportedGrantType` error.
    #[must_use]
    pub fn unsupported_grant_type(grant_type: impl Into<String>) -> Self {
        Self::UnsupportedGrantType {
            grant_type: grant_type.into(),
        }
    }

    /// Create an `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_invalid_grant(&self) -> bool {
        matches!(self, Self::InvalidGrant { .. })
    }

    #[must_use]
    pub fn is_invalid_client(&self) -> bool {
        matches!(self, Self::InvalidClient { .. })
    }

    /// Returns `true` if the caller can fix the request and retry.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !self.is_server_error()
    }

    /// Returns `true` if the failure is on the server side.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Configuration { .. })
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidGrant { .. } => ErrorCategory::Grant,
            Self::InvalidClient { .. } => ErrorCategory::Authentication,
            Self::UnsupportedChallengeMethod { .. }
            | Self::UnsupportedGrantType { .. }
            | Self::InvalidRequest { .. } => ErrorCategory::Validation,
            Self::Storage(_) => ErrorCategory::Infrastructure,
            Self::Configuration { .. } => ErrorCategory::Configuration,
        }
    }

    /// Returns the OAuth 2.0 error code (RFC 6749 section 5.2).
    #[must_use]
    pub fn oauth_error_code(&self) -> &'static str {
        match self {
            Self::InvalidGrant { .. } => "invalid_grant",
            Self::InvalidClient { .. } => "invalid_client",
            Self::UnsupportedChallengeMethod { .. } | Self::InvalidRequest { .. } => {
                "invalid_request"
            }
            Self::UnsupportedGrantType { .. } => "unsupported_grant_type",
            Self::Storage(_) | Self::Configuration { .. } => "server_error",
        }
    }
}

impl From<PkceError> for AuthError {
    fn from(err: PkceError) -> Self {
        match err {
            PkceError::UnsupportedMethod(method) => Self::unsupported_challenge_method(method),
            PkceError::MissingVerifier | PkceError::VerificationFailed => {
                Self::invalid_grant(err.to_string())
            }
        }
    }
}

/// Categories of issuance errors for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Rejected code or refresh token.
    Grant,
    /// Client identity could not be verified.
    Authentication,
    /// Malformed or unsupported request.
    Validation,
    /// Storage failures.
    Infrastructure,
    /// Invalid engine configuration.
    Configuration,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grant => write!(f, "grant"),
            Self::Authentication => write!(f, "authentication"),
            Self::Validation => write!(f, "validation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}

/// Result type for issuance operations.
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthError::invalid_grant("code not found");
        assert_eq!(err.to_string(), "Invalid grant: code not found");

        let err = AuthError::unsupported_challenge_method("S512");
        assert_eq!(err.to_string(), "Unsupported code challenge method: S512");

        let err = AuthError::from(StorageError::backend("connection reset"));
        assert_eq!(
            err.to_string(),
            "Storage error: Storage backend error: connection reset"
        );
    }

    #[test]
    fn test_error_predicates() {
        let err = AuthError::invalid_grant("x");
        assert!(err.is_invalid_grant());
        assert!(err.is_client_error());
        assert!(!err.is_server_error());

        let err = AuthError::from(StorageError::backend("down"));
        assert!(err.is_server_error());
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_oauth_error_code() {
        assert_eq!(
            AuthError::invalid_grant("x").oauth_error_code(),
            "invalid_grant"
        );
        assert_eq!(
            AuthError::invalid_client("x").oauth_error_code(),
            "invalid_client"
        );
        assert_eq!(
            AuthError::unsupported_challenge_method("x").oauth_error_code(),
            "invalid_request"
        );
        assert_eq!(
            AuthError::unsupported_grant_type("x").oauth_error_code(),
            "unsupported_grant_type"
        );
        assert_eq!(
            AuthError::configuration("x").oauth_error_code(),
            "server_error"
        );
    }

    #[test]
    fn test_pkce_error_conversion() {
        assert!(matches!(
            AuthError::from(PkceError::UnsupportedMethod("S512".into())),
            AuthError::UnsupportedChallengeMethod { method } if method == "S512"
        ));
        assert!(AuthError::from(PkceError::VerificationFailed).is_invalid_grant());
        assert!(AuthError::from(PkceError::MissingVerifier).is_invalid_grant());
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            AuthError::invalid_client("x").category(),
            ErrorCategory::Authentication
        );
        assert_eq!(
            AuthError::from(StorageError::backend("x")).category(),
            ErrorCategory::Infrastructure
        );
        assert_eq!(ErrorCategory::Grant.to_string(), "grant");
    }
}
