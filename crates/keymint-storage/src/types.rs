//! Entity types persisted by every storage backend.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::StorageError;

// =============================================================================
// Client
// =============================================================================

/// A registered OAuth client.
///
/// The secret is a bearer credential compared by exact match. Clients have
/// no expiration and live until explicitly deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    /// Client identifier (primary key).
    pub client_id: String,
    /// Client secret.
    pub client_secret: String,
}

impl Client {
    /// Creates a new client record.
    #[must_use]
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

// =============================================================================
// Authorization Code
// =============================================================================

/// A store-backed authorization code.
///
/// Bound to exactly one client and one redirect target. A code must be
/// deleted on successful resolution and must never resolve twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Code {
    /// Opaque code identifier (primary key).
    pub code_id: String,
    /// Client the code was issued to.
    pub client_id: String,
    /// Redirect target the code is bound to.
    pub callback_url: String,
    /// Granted scope, carried over to the minted token.
    pub scope: String,
    /// PKCE challenge recorded at authorization time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_challenge: Option<String>,
    /// PKCE challenge method (`S256` or `plain`), as received.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_challenge_method: Option<String>,
    /// When the code was issued.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Code {
    /// Creates a code without PKCE metadata, issued now.
    #[must_use]
    pub fn new(
        code_id: impl Into<String>,
        client_id: impl Into<String>,
        callback_url: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            code_id: code_id.into(),
            client_id: client_id.into(),
            callback_url: callback_url.into(),
            scope: scope.into(),
            code_challenge: None,
            code_challenge_method: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// Attaches PKCE metadata.
    #[must_use]
    pub fn with_challenge(mut self, challenge: Option<String>, method: Option<String>) -> Self {
        self.code_challenge = challenge;
        self.code_challenge_method = method;
        self
    }

    /// Overrides the issue timestamp.
    #[must_use]
    pub fn issued_at(mut self, created_at: OffsetDateTime) -> Self {
        self.created_at = created_at;
        self
    }
}

// =============================================================================
// Token
// =============================================================================

/// Access token type. Only bearer tokens are issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TokenType {
    /// RFC 6750 bearer token.
    #[default]
    Bearer,
}

impl TokenType {
    /// Get the token type as its wire string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bearer => "Bearer",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenType {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Bearer" => Ok(Self::Bearer),
            other => Err(StorageError::invalid_data(format!(
                "unknown token type '{other}'"
            ))),
        }
    }
}

/// An issued access/refresh token pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Access token (primary key).
    pub access_token: String,
    /// Always `Bearer`.
    pub token_type: TokenType,
    /// Granted scope.
    pub scope: String,
    /// Refresh token (unique). Single-use: rotation replaces the whole pair.
    pub refresh_token: String,
}

impl Token {
    /// Creates a bearer token pair.
    #[must_use]
    pub fn bearer(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: TokenType::Bearer,
            scope: scope.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_type_wire_name() {
        assert_eq!(TokenType::Bearer.as_str(), "Bearer");
        assert_eq!("Bearer".parse::<TokenType>().unwrap(), TokenType::Bearer);
        assert!("bearer".parse::<TokenType>().is_err());
    }

    #[test]
    fn test_token_serializes_bearer() {
        let token = Token::bearer("at", "rt", "read");
        let json = serde_json::to_value(&token).unwrap();
        assert_eq!(json["token_type"], "Bearer");
        assert_eq!(json["scope"], "read");
    }

    #[test]
    fn test_code_omits_missing_challenge() {
        let code = Code::new("c1", "client", "https://cb", "read");
        let json = serde_json::to_value(&code).unwrap();
        assert!(json.get("code_challenge").is_none());
        assert!(json.get("code_challenge_method").is_none());

        let code = code.with_challenge(Some("abc".into()), Some("plain".into()));
        let json = serde_json::to_value(&code).unwrap();
        assert_eq!(json["code_challenge"], "abc");
        assert_eq!(json["code_challenge_method"], "plain");
    }
}
