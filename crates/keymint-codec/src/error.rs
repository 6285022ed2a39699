//! Codec error types.

/// Errors produced by the code codec.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// The envelope failed to open. Covers malformed input, failed
    /// authentication, an unknown key and an expired window alike.
    #[error("Invalid or expired code")]
    InvalidOrExpiredCode,

    /// Key material could not be parsed.
    #[error("Invalid codec key: {message}")]
    InvalidKey { message: String },

    /// Sealing failed.
    #[error("Failed to seal code: {message}")]
    Encoding { message: String },
}

impl CodecError {
    #[must_use]
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    /// Returns true if this is the generic rejection of an envelope.
    #[must_use]
    pub fn is_invalid_code(&self) -> bool {
        matches!(self, Self::InvalidOrExpiredCode)
    }
}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
