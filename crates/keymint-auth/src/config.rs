//! Issuance engine configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::oauth::GrantType;

/// OAuth 2.0 issuance settings.
///
/// # Example (TOML)
///
/// ```toml
/// [oauth]
/// code_lifetime = "10m"
/// enforce_code_expiry = true
/// default_scope = "default"
/// grant_types = ["authorization_code", "refresh_token"]
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// How long a store-backed authorization code stays redeemable.
    #[serde(with = "humantime_serde")]
    pub code_lifetime: Duration,

    /// Reject codes older than `code_lifetime` on redemption.
    pub enforce_code_expiry: bool,

    /// Scope given to tokens minted by the password and client credentials
    /// grants.
    pub default_scope: String,

    /// Grants accepted by `IssuanceEngine::exchange`.
    pub grant_types: Vec<GrantType>,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            code_lifetime: Duration::from_secs(600), // 10 minutes
            enforce_code_expiry: true,
            default_scope: "default".to_string(),
            grant_types: GrantType::ALL.to_vec(),
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

impl OAuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - `code_lifetime` is zero while expiry is enforced
    /// - `default_scope` is blank
    ///
    /// Returns `ConfigError::Missing` if no grant type is enabled.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enforce_code_expiry && self.code_lifetime.is_zero() {
            return Err(ConfigError::InvalidValue(
                "code_lifetime must be greater than zero".to_string(),
            ));
        }

        if self.default_scope.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "default_scope cannot be empty".to_string(),
            ));
        }

        if self.grant_types.is_empty() {
            return Err(ConfigError::Missing("grant_types".to_string()));
        }

        Ok(())
    }

    /// Returns `true` if `grant_type` is enabled.
    #[must_use]
    pub fn allows(&self, grant_type: GrantType) -> bool {
        self.grant_types.contains(&grant_type)
    }
}
