//! OAuth 2.0 flows: PKCE, grant types and the issuance engine.

mod engine;
mod grant;
mod pkce;

pub use engine::IssuanceEngine;
pub use grant::{GrantType, TokenGrant, TokenRequest};
pub use pkce::{PkceChallengeMethod, PkceError, PkceVerifier, s256_challenge, verify_pkce};
