//! The credential issuance engine.
//!
//! [`IssuanceEngine`] owns the lifecycle of clients, authorization codes and
//! tokens. It holds no mutable state of its own; every transition goes
//! through the [`AuthStore`] it was built with.
//!
//! Single-use artifacts (codes and refresh tokens) are consumed with the
//! store's atomic `delete_*` primitive. Only the caller whose delete reports
//! `true` goes on to mint a token, so two concurrent redemptions of the same
//! artifact can never both succeed.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use futures_util::TryStreamExt;
use rand::RngCore;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use keymint_storage::{
    Client, Code, DynAuthStore, EntityStream, StorageError, StorageResult, Token,
};

use super::grant::TokenGrant;
use super::pkce::verify_pkce;
use crate::config::OAuthConfig;
use crate::error::{AuthError, AuthResult};

/// Bytes of entropy in secrets, code ids and tokens.
const SECRET_BYTES: usize = 32;

/// Random 256-bit value, base64url without padding.
fn random_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// A fresh bearer pair, not yet stored.
fn new_token(scope: &str) -> Token {
    Token::bearer(random_secret(), random_secret(), scope)
}

/// Short, non-reversible prefix of a credential for log fields.
fn redact(value: &str) -> &str {
    value.get(..6).unwrap_or("")
}

/// Maps a missing entity onto `InvalidGrant`; other storage failures pass
/// through unchanged.
fn grant_lookup<T>(result: StorageResult<T>, what: &str) -> AuthResult<T> {
    result.map_err(|err| match err {
        StorageError::NotFound { .. } => AuthError::invalid_grant(format!("{what} not found")),
        other => AuthError::Storage(other),
    })
}

/// Issues and redeems OAuth 2.0 credentials.
#[derive(Clone)]
pub struct IssuanceEngine {
    store: DynAuthStore,
    config: OAuthConfig,
}

impl IssuanceEngine {
    /// Creates an engine over `store`.
    #[must_use]
    pub fn new(store: DynAuthStore, config: OAuthConfig) -> Self {
        Self { store, config }
    }

    #[must_use]
    pub fn store(&self) -> &DynAuthStore {
        &self.store
    }

    #[must_use]
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    // -------------------------------------------------------------------------
    // Issuance
    // -------------------------------------------------------------------------

    /// Registers a new client with a random id and secret.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be persisted.
    pub async fn generate_client(&self) -> AuthResult<Client> {
        let client = Client::new(Uuid::new_v4().to_string(), random_secret());
        let client = self.store.put_client(&client).await?;

        info!(client_id = %client.client_id, "registered client");
        Ok(client)
    }

    /// Issues an authorization code bound to a client and redirect target.
    ///
    /// The client is not looked up here; callers that need that check must
    /// perform it themselves. Backends that enforce referential integrity
    /// reject codes for unknown clients with a storage constraint error.
    ///
    /// # Errors
    ///
    /// Returns an error if the code cannot be persisted.
    pub async fn generate_code(
        &self,
        client_id: &str,
        callback_url: &str,
        scope: &str,
        code_challenge: Option<&str>,
        code_challenge_method: Option<&str>,
    ) -> AuthResult<Code> {
        let code = Code::new(random_secret(), client_id, callback_url, scope).with_challenge(
            code_challenge.map(str::to_string),
            code_challenge_method.map(str::to_string),
        );
        let code = self.store.put_code(&code).await?;

        info!(
            client_id,
            code = redact(&code.code_id),
            pkce = code.code_challenge.is_some(),
            "issued authorization code"
        );
        Ok(code)
    }

    /// Mints a token directly (implicit grant).
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be persisted.
    pub async fn generate_token(&self, client_id: &str, scope: &str) -> AuthResult<Token> {
        let token = self.mint_token(scope).await?;
        info!(client_id, grant = "implicit", "issued token");
        Ok(token)
    }

    async fn mint_token(&self, scope: &str) -> AuthResult<Token> {
        Ok(self.store.put_token(&new_token(scope)).await?)
    }

    // -------------------------------------------------------------------------
    // Redemption
    // -------------------------------------------------------------------------

    /// Redeems an authorization code for a token.
    ///
    /// Checks run in this order, each failing with `InvalidGrant` unless
    /// noted: the code exists, it has not outlived `code_lifetime`, it was
    /// issued to `client_id`, it was issued for `redirect_uri`, the PKCE
    /// verifier matches a recorded challenge (an unknown recorded method
    /// fails with `UnsupportedChallengeMethod`), and the client secret
    /// matches. A failed check leaves the code in place.
    ///
    /// On success the code is replaced by a token carrying the code's scope,
    /// in one storage operation. If the token cannot be stored the code
    /// survives.
    ///
    /// # Errors
    ///
    /// See above. Storage failures propagate as `AuthError::Storage`.
    pub async fn resolve_code(
        &self,
        code_id: &str,
        redirect_uri: &str,
        client_id: &str,
        client_secret: &str,
        code_verifier: Option<&str>,
    ) -> AuthResult<Token> {
        let code = grant_lookup(self.store.get_code(code_id).await, "authorization code")
            .inspect_err(|_| warn!(check = "exists", "rejected authorization code"))?;

        if self.config.enforce_code_expiry && self.is_expired(&code, OffsetDateTime::now_utc()) {
            warn!(check = "expiry", client_id, "rejected authorization code");
            return Err(AuthError::invalid_grant("authorization code expired"));
        }

        if code.client_id != client_id {
            warn!(check = "client_id", client_id, "rejected authorization code");
            return Err(AuthError::invalid_grant(
                "authorization code was issued to another client",
            ));
        }

        if code.callback_url != redirect_uri {
            warn!(check = "redirect_uri", client_id, "rejected authorization code");
            return Err(AuthError::invalid_grant("redirect_uri does not match"));
        }

        if let Some(challenge) = code.code_challenge.as_deref() {
            verify_pkce(
                challenge,
                code.code_challenge_method.as_deref(),
                code_verifier,
            )
            .inspect_err(|e| warn!(check = "pkce", client_id, error = %e, "rejected authorization code"))?;
        }

        let client = grant_lookup(self.store.get_client(client_id).await, "client")?;
        if client.client_secret != client_secret {
            warn!(check = "client_secret", client_id, "rejected authorization code");
            return Err(AuthError::invalid_grant("client authentication failed"));
        }

        let token = new_token(&code.scope);
        if !self.store.redeem_code(&code, &token).await? {
            warn!(check = "consumed", client_id, "rejected authorization code");
            return Err(AuthError::invalid_grant("authorization code already used"));
        }

        info!(client_id, grant = "authorization_code", "issued token");
        Ok(token)
    }

    /// Rotates a token pair: the token owning `refresh_token` is replaced by
    /// a new pair with the same scope. If the new pair cannot be stored the
    /// old one survives.
    ///
    /// # Errors
    ///
    /// Returns `InvalidGrant` if no token owns `refresh_token`, including
    /// when a concurrent rotation consumed it first.
    pub async fn refresh_token(&self, refresh_token: &str) -> AuthResult<Token> {
        let old = grant_lookup(
            self.store.get_token_by_refresh_token(refresh_token).await,
            "refresh token",
        )
        .inspect_err(|_| warn!(check = "exists", "rejected refresh token"))?;

        let token = new_token(&old.scope);
        if !self.store.rotate_token(&old, &token).await? {
            warn!(check = "consumed", "rejected refresh token");
            return Err(AuthError::invalid_grant("refresh token already used"));
        }

        info!(
            previous = redact(&old.access_token),
            grant = "refresh_token",
            "rotated token"
        );
        Ok(token)
    }

    /// Mints a token for a client authenticating with its secret (password
    /// and client credentials grants). The token carries `default_scope`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidClient` if the client is unknown or the secret does
    /// not match.
    pub async fn resolve_token(&self, client_id: &str, client_secret: &str) -> AuthResult<Token> {
        let client = match self.store.get_client(client_id).await {
            Ok(client) => client,
            Err(StorageError::NotFound { .. }) => {
                warn!(check = "client", client_id, "rejected client");
                return Err(AuthError::invalid_client("unknown client"));
            }
            Err(e) => return Err(e.into()),
        };

        if client.client_secret != client_secret {
            warn!(check = "client_secret", client_id, "rejected client");
            return Err(AuthError::invalid_client("client authentication failed"));
        }

        let token = self.mint_token(&self.config.default_scope).await?;
        info!(client_id, grant = "client_secret", "issued token");
        Ok(token)
    }

    /// Dispatches a token endpoint request to the matching flow.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedGrantType` if the grant is disabled in the
    /// configuration, otherwise whatever the flow returns.
    pub async fn exchange(&self, grant: TokenGrant) -> AuthResult<Token> {
        let grant_type = grant.grant_type();
        if !self.config.allows(grant_type) {
            warn!(grant = %grant_type, "grant type disabled");
            return Err(AuthError::unsupported_grant_type(grant_type.as_str()));
        }

        match grant {
            TokenGrant::AuthorizationCode {
                code,
                redirect_uri,
                client_id,
                client_secret,
                code_verifier,
            } => {
                self.resolve_code(
                    &code,
                    &redirect_uri,
                    &client_id,
                    &client_secret,
                    code_verifier.as_deref(),
                )
                .await
            }
            TokenGrant::RefreshToken { refresh_token } => self.refresh_token(&refresh_token).await,
            TokenGrant::Password {
                client_id,
                client_secret,
            }
            | TokenGrant::ClientCredentials {
                client_id,
                client_secret,
            } => self.resolve_token(&client_id, &client_secret).await,
        }
    }

    // -------------------------------------------------------------------------
    // Maintenance
    // -------------------------------------------------------------------------

    /// Returns `true` if `code` has outlived `code_lifetime` at `now`.
    #[must_use]
    pub fn is_expired(&self, code: &Code, now: OffsetDateTime) -> bool {
        let lifetime =
            time::Duration::try_from(self.config.code_lifetime).unwrap_or(time::Duration::MAX);
        now - code.created_at > lifetime
    }

    /// Deletes every expired code and returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if listing or deleting codes fails.
    pub async fn purge_expired_codes(&self) -> AuthResult<u64> {
        let now = OffsetDateTime::now_utc();
        // Collect first: some backends hold a connection for the duration of
        // the listing.
        let expired: Vec<String> = self
            .store
            .list_codes()
            .try_filter_map(|code| async move {
                Ok(self.is_expired(&code, now).then_some(code.code_id))
            })
            .try_collect()
            .await?;

        let mut purged = 0;
        for code_id in expired {
            if self.store.delete_code(&code_id).await? {
                purged += 1;
            }
        }

        info!(purged, "purged expired authorization codes");
        Ok(purged)
    }

    // -------------------------------------------------------------------------
    // Listing
    // -------------------------------------------------------------------------

    /// Streams all registered clients.
    pub fn list_clients(&self) -> EntityStream<'_, Client> {
        self.store.list_clients()
    }

    /// Streams all outstanding authorization codes.
    pub fn list_codes(&self) -> EntityStream<'_, Code> {
        self.store.list_codes()
    }

    /// Streams all live tokens.
    pub fn list_tokens(&self) -> EntityStream<'_, Token> {
        self.store.list_tokens()
    }
}

impl std::fmt::Debug for IssuanceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuanceEngine")
            .field("backend", &self.store.backend_name())
            .field("config", &self.config)
            .finish()
    }
}
