//! Grant types and typed token requests.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// OAuth 2.0 grant types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    AuthorizationCode,
    Implicit,
    RefreshToken,
    Password,
    ClientCredentials,
}

impl GrantType {
    pub const ALL: [GrantType; 5] = [
        Self::AuthorizationCode,
        Self::Implicit,
        Self::RefreshToken,
        Self::Password,
        Self::ClientCredentials,
    ];

    /// Wire name of the grant.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::Implicit => "implicit",
            Self::RefreshToken => "refresh_token",
            Self::Password => "password",
            Self::ClientCredentials => "client_credentials",
        }
    }
}

impl FromStr for GrantType {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|grant| grant.as_str() == s)
            .ok_or_else(|| AuthError::unsupported_grant_type(s))
    }
}

impl fmt::Display for GrantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A token endpoint request, one variant per redeemable grant.
///
/// The implicit grant has no variant: its token is minted at authorization
/// time by `IssuanceEngine::generate_token`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenGrant {
    AuthorizationCode {
        code: String,
        redirect_uri: String,
        client_id: String,
        client_secret: String,
        code_verifier: Option<String>,
    },
    RefreshToken {
        refresh_token: String,
    },
    Password {
        client_id: String,
        client_secret: String,
    },
    ClientCredentials {
        client_id: String,
        client_secret: String,
    },
}

impl TokenGrant {
    #[must_use]
    pub fn grant_type(&self) -> GrantType {
        match self {
            Self::AuthorizationCode { .. } => GrantType::AuthorizationCode,
            Self::RefreshToken { .. } => GrantType::RefreshToken,
            Self::Password { .. } => GrantType::Password,
            Self::ClientCredentials { .. } => GrantType::ClientCredentials,
        }
    }
}

/// Flat token endpoint parameters as they arrive from a form body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenRequest {
    pub grant_type: String,
    pub code: Option<String>,
    pub redirect_uri: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub code_verifier: Option<String>,
    pub refresh_token: Option<String>,
}

fn required(value: Option<String>, name: &str) -> Result<String, AuthError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AuthError::invalid_request(format!("missing parameter: {name}")))
}

impl TryFrom<TokenRequest> for TokenGrant {
    type Error = AuthError;

    fn try_from(request: TokenRequest) -> Result<Self, Self::Error> {
        match request.grant_type.parse::<GrantType>()? {
            GrantType::AuthorizationCode => Ok(Self::AuthorizationCode {
                code: required(request.code, "code")?,
                redirect_uri: required(request.redirect_uri, "redirect_uri")?,
                client_id: required(request.client_id, "client_id")?,
                client_secret: required(request.client_secret, "client_secret")?,
                code_verifier: request.code_verifier,
            }),
            GrantType::RefreshToken => Ok(Self::RefreshToken {
                refresh_token: required(request.refresh_token, "refresh_token")?,
            }),
            GrantType::Password => Ok(Self::Password {
                client_id: required(request.client_id, "client_id")?,
                client_secret: required(request.client_secret, "client_secret")?,
            }),
            GrantType::ClientCredentials => Ok(Self::ClientCredentials {
                client_id: required(request.client_id, "client_id")?,
                client_secret: required(request.client_secret, "client_secret")?,
            }),
            GrantType::Implicit => Err(AuthError::unsupported_grant_type(
                GrantType::Implicit.as_str(),
            )),
        }
    }
}
