//! OAuth 2.0 credential issuance for Keymint.
//!
//! The [`IssuanceEngine`](oauth::IssuanceEngine) mints and redeems
//! authorization codes, access tokens and refresh tokens on behalf of
//! registered clients. Storage is pluggable through the `AuthStore` trait
//! from `keymint-storage`.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use keymint_auth::{OAuthConfig, oauth::IssuanceEngine};
//! use keymint_db_memory::InMemoryAuthStore;
//!
//! let engine = IssuanceEngine::new(Arc::new(InMemoryAuthStore::new()), OAuthConfig::default());
//! let client = engine.generate_client().await?;
//! let code = engine
//!     .generate_code(&client.client_id, "https://app/cb", "read", None, None)
//!     .await?;
//! let token = engine
//!     .resolve_code(&code.code_id, "https://app/cb", &client.client_id, &client.client_secret, None)
//!     .await?;
//! assert_eq!(token.scope, "read");
//! ```

pub mod config;
pub mod error;
pub mod oauth;

pub use config::{ConfigError, OAuthConfig};
pub use error::{AuthError, AuthResult, ErrorCategory};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::config::OAuthConfig;
    pub use crate::error::{AuthError, AuthResult};
    pub use crate::oauth::{GrantType, IssuanceEngine, TokenGrant};
}
