//! PKCE (Proof Key for Code Exchange), RFC 7636.
//!
//! Both `S256` and `plain` are accepted. A code recorded with a challenge
//! but no method is treated as `plain`, the RFC default.
//!
//! # Example
//!
//! ```
//! use keymint_auth::oauth::{PkceChallengeMethod, PkceVerifier, s256_challenge, verify_pkce};
//!
//! let verifier = PkceVerifier::generate();
//! let challenge = s256_challenge(verifier.as_str());
//!
//! assert!(verify_pkce(&challenge, Some("S256"), Some(verifier.as_str())).is_ok());
//! assert_eq!(PkceChallengeMethod::parse("plain").unwrap(), PkceChallengeMethod::Plain);
//! ```

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use sha2::{Digest, Sha256};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during PKCE verification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PkceError {
    /// The recorded challenge method is not `S256` or `plain`.
    #[error("Unsupported challenge method: {0}")]
    UnsupportedMethod(String),

    /// A challenge was recorded but no verifier was presented.
    #[error("PKCE verification failed: code_verifier is required")]
    MissingVerifier,

    /// The verifier does not match the challenge.
    #[error("PKCE verification failed: verifier does not match challenge")]
    VerificationFailed,
}

// =============================================================================
// PKCE Challenge Method
// =============================================================================

/// PKCE challenge method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PkceChallengeMethod {
    /// SHA-256 of the verifier, base64url without padding.
    S256,
    /// Verifier sent verbatim.
    #[default]
    Plain,
}

impl PkceChallengeMethod {
    /// Parses a method name. Matching is exact (`S256`, `plain`).
    ///
    /// # Errors
    ///
    /// Returns [`PkceError::UnsupportedMethod`] for any other value.
    pub fn parse(method: &str) -> Result<Self, PkceError> {
        match method {
            "S256" => Ok(Self::S256),
            "plain" => Ok(Self::Plain),
            other => Err(PkceError::UnsupportedMethod(other.to_string())),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::S256 => "S256",
            Self::Plain => "plain",
        }
    }

    /// Derives the challenge for `verifier` under this method.
    #[must_use]
    pub fn challenge_for(&self, verifier: &str) -> String {
        match self {
            Self::S256 => s256_challenge(verifier),
            Self::Plain => verifier.to_string(),
        }
    }
}

impl std::fmt::Display for PkceChallengeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Verifier and verification
// =============================================================================

/// A client-side code verifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkceVerifier(String);

impl PkceVerifier {
    /// Generates a 43-character verifier from 32 random bytes.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

/// `BASE64URL(SHA256(verifier))`, unpadded.
#[must_use]
pub fn s256_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

/// Checks a presented verifier against a recorded challenge.
///
/// `method` is the method recorded with the challenge; `None` means `plain`.
///
/// # Errors
///
/// - [`PkceError::UnsupportedMethod`] if the recorded method is unknown
/// - [`PkceError::MissingVerifier`] if no verifier was presented
/// - [`PkceError::VerificationFailed`] if the verifier does not match
pub fn verify_pkce(
    challenge: &str,
    method: Option<&str>,
    verifier: Option<&str>,
) -> Result<(), PkceError> {
    let method = method
        .map(PkceChallengeMethod::parse)
        .transpose()?
        .unwrap_or_default();
    let verifier = verifier.ok_or(PkceError::MissingVerifier)?;

    if method.challenge_for(verifier) == challenge {
        Ok(())
    } else {
        Err(PkceError::VerificationFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// RFC 7636 Appendix B.
    const RFC_VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
    const RFC_CHALLENGE: &str = "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM";

    #[test]
    fn test_rfc7636_appendix_b_test_vector() {
        assert_eq!(s256_challenge(RFC_VERIFIER), RFC_CHALLENGE);
        assert!(verify_pkce(RFC_CHALLENGE, Some("S256"), Some(RFC_VERIFIER)).is_ok());
    }

    #[test]
    fn test_s256_rejects_wrong_verifier() {
        assert_eq!(
            verify_pkce(RFC_CHALLENGE, Some("S256"), Some("wrong")),
            Err(PkceError::VerificationFailed)
        );
        // The raw challenge is not a valid S256 verifier for itself.
        assert_eq!(
            verify_pkce(RFC_CHALLENGE, Some("S256"), Some(RFC_CHALLENGE)),
            Err(PkceError::VerificationFailed)
        );
    }

    #[test]
    fn test_plain_requires_exact_match() {
        assert!(verify_pkce("abc", Some("plain"), Some("abc")).is_ok());
        assert_eq!(
            verify_pkce("abc", Some("plain"), Some("ABC")),
            Err(PkceError::VerificationFailed)
        );
    }

    #[test]
    fn test_missing_method_defaults_to_plain() {
        assert!(verify_pkce("abc", None, Some("abc")).is_ok());
        assert!(verify_pkce(RFC_CHALLENGE, None, Some(RFC_VERIFIER)).is_err());
    }

    #[test]
    fn test_missing_verifier() {
        assert_eq!(
            verify_pkce("abc", Some("S256"), None),
            Err(PkceError::MissingVerifier)
        );
    }

    #[test]
    fn test_unsupported_method_checked_first() {
        assert_eq!(
            verify_pkce("abc", Some("S512"), None),
            Err(PkceError::UnsupportedMethod("S512".to_string()))
        );
        // Method names are case-sensitive.
        assert!(PkceChallengeMethod::parse("s256").is_err());
        assert!(PkceChallengeMethod::parse("PLAIN").is_err());
    }

    #[test]
    fn test_generated_verifier() {
        let a = PkceVerifier::generate();
        let b = PkceVerifier::generate();
        assert_eq!(a.as_str().len(), 43);
        assert_ne!(a, b);
        assert!(
            a.as_str()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_challenge_method_display() {
        assert_eq!(PkceChallengeMethod::S256.to_string(), "S256");
        assert_eq!(PkceChallengeMethod::default(), PkceChallengeMethod::Plain);
    }
}
