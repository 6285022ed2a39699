//! Storage traits for the persistence contract.
//!
//! This module defines the traits that all storage backends must implement.
//! The engine only ever talks to storage through [`AuthStore`], so any
//! backend satisfying these semantics is substitutable without engine
//! changes.

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::StorageResult;
use crate::types::{Client, Code, Token};

/// A finite stream of entities produced by a fresh backend query.
///
/// Each call to a `list_*` method starts a new query; streams are not
/// cached snapshots and can be consumed lazily.
pub type EntityStream<'a, T> = BoxStream<'a, StorageResult<T>>;

/// Storage operations for OAuth clients.
#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Inserts or replaces a client keyed by `client_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn put_client(&self, client: &Client) -> StorageResult<Client>;

    /// Fetches a client by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no client has this id.
    async fn get_client(&self, client_id: &str) -> StorageResult<Client>;

    /// Deletes a client and every code issued to it.
    ///
    /// Returns `true` if a client was removed, `false` if none existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn delete_client(&self, client_id: &str) -> StorageResult<bool>;

    /// Streams every stored client in backend iteration order.
    fn list_clients(&self) -> EntityStream<'_, Client>;
}

/// Storage operations for authorization codes.
#[async_trait]
pub trait CodeStore: Send + Sync {
    /// Inserts or replaces a code keyed by `code_id`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Constraint` if the code references a client
    /// that does not exist.
    async fn put_code(&self, code: &Code) -> StorageResult<Code>;

    /// Fetches a code by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no code has this id.
    async fn get_code(&self, code_id: &str) -> StorageResult<Code>;

    /// Atomically deletes a code if it is present.
    ///
    /// When several callers race to delete the same code, exactly one of
    /// them observes `true`. The engine treats `false` as "already
    /// consumed".
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn delete_code(&self, code_id: &str) -> StorageResult<bool>;

    /// Streams every stored code in backend iteration order.
    fn list_codes(&self) -> EntityStream<'_, Code>;
}

/// Storage operations for access/refresh token pairs.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Inserts or replaces a token keyed by `access_token`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Constraint` if the refresh token is already
    /// bound to a different access token.
    async fn put_token(&self, token: &Token) -> StorageResult<Token>;

    /// Fetches a token by access token.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no token has this access token.
    async fn get_token(&self, access_token: &str) -> StorageResult<Token>;

    /// Fetches a token by its refresh token.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no token has this refresh token.
    async fn get_token_by_refresh_token(&self, refresh_token: &str) -> StorageResult<Token>;

    /// Atomically deletes a token if it is present.
    ///
    /// Exactly one of several racing callers observes `true`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn delete_token(&self, access_token: &str) -> StorageResult<bool>;

    /// Streams every stored token in backend iteration order.
    fn list_tokens(&self) -> EntityStream<'_, Token>;
}

/// The complete persistence contract consumed by the issuance engine.
///
/// The two exchange operations consume a single-use artifact and persist
/// its replacement token as one unit: either both happen or neither does.
/// The provided implementations compose the per-entity primitives and put
/// the artifact back when the token write fails. Backends with
/// transactions override them.
#[async_trait]
pub trait AuthStore: ClientStore + CodeStore + TokenStore {
    /// Returns the name of the backend, for logging.
    fn backend_name(&self) -> &'static str;

    /// Deletes `code` and stores `token` in its place.
    ///
    /// Returns `false`, storing nothing, if the code was already gone.
    ///
    /// # Errors
    ///
    /// Returns the token write error after restoring the code. The code
    /// stays redeemable.
    async fn redeem_code(&self, code: &Code, token: &Token) -> StorageResult<bool> {
        if !self.delete_code(&code.code_id).await? {
            return Ok(false);
        }
        if let Err(err) = self.put_token(token).await {
            // The client may have been deleted meanwhile; the code then
            // stays gone with it.
            let _ = self.put_code(code).await;
            return Err(err);
        }
        Ok(true)
    }

    /// Deletes `old` and stores `new` in its place.
    ///
    /// Returns `false`, storing nothing, if `old` was already gone.
    ///
    /// # Errors
    ///
    /// Returns the token write error after restoring `old`, which stays
    /// refreshable.
    async fn rotate_token(&self, old: &Token, new: &Token) -> StorageResult<bool> {
        if !self.delete_token(&old.access_token).await? {
            return Ok(false);
        }
        if let Err(err) = self.put_token(new).await {
            let _ = self.put_token(old).await;
            return Err(err);
        }
        Ok(true)
    }
}
