//! Store trait implementations over the PostgreSQL pool.
//!
//! Upserts use `RETURNING` so callers get the row as stored. The two
//! exchanges are single statements: a data-modifying CTE deletes the
//! consumed row and inserts the replacement token, so a failed insert
//! leaves the consumed row untouched.

use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_core::query_scalar::query_scalar;
use sqlx_postgres::Postgres;
use tracing::debug;

use keymint_storage::row::{
    ClientRow, CodeRow, SELECT_CLIENTS, SELECT_CODES, SELECT_TOKENS, TokenRow,
};
use keymint_storage::{
    AuthStore, Client, ClientStore, Code, CodeStore, EntityStream, StorageError, StorageResult,
    Token, TokenStore,
};

use crate::{PostgresAuthStore, storage_error};

#[async_trait]
impl ClientStore for PostgresAuthStore {
    async fn put_client(&self, client: &Client) -> StorageResult<Client> {
        let row: ClientRow = query_as(
            r#"
            INSERT INTO oauth_clients (client_id, client_secret)
            VALUES ($1, $2)
            ON CONFLICT (client_id) DO UPDATE SET client_secret = EXCLUDED.client_secret
            RETURNING client_id, client_secret
            "#,
        )
        .bind(&client.client_id)
        .bind(&client.client_secret)
        .fetch_one(self.pool())
        .await
        .map_err(storage_error)?;

        Ok(row.into())
    }

    async fn get_client(&self, client_id: &str) -> StorageResult<Client> {
        query_as::<Postgres, ClientRow>(&format!("{SELECT_CLIENTS} WHERE client_id = $1"))
            .bind(client_id)
            .fetch_optional(self.pool())
            .await
            .map_err(storage_error)?
            .map(Client::from)
            .ok_or_else(|| StorageError::not_found("client", client_id))
    }

    async fn delete_client(&self, client_id: &str) -> StorageResult<bool> {
        // oauth_codes cascades on the foreign key.
        let removed = query("DELETE FROM oauth_clients WHERE client_id = $1")
            .bind(client_id)
            .execute(self.pool())
            .await
            .map_err(storage_error)?
            .rows_affected()
            > 0;

        debug!(client_id, removed, "deleted client");
        Ok(removed)
    }

    fn list_clients(&self) -> EntityStream<'_, Client> {
        query_as::<Postgres, ClientRow>(SELECT_CLIENTS)
            .fetch(self.pool())
            .map_ok(Client::from)
            .map_err(storage_error)
            .boxed()
    }
}

#[async_trait]
impl CodeStore for PostgresAuthStore {
    async fn put_code(&self, code: &Code) -> StorageResult<Code> {
        let row: CodeRow = query_as(
            r#"
            INSERT INTO oauth_codes (
                code_id, client_id, callback_url, scope,
                code_challenge, code_challenge_method, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (code_id) DO UPDATE SET
                client_id = EXCLUDED.client_id,
                callback_url = EXCLUDED.callback_url,
                scope = EXCLUDED.scope,
                code_challenge = EXCLUDED.code_challenge,
                code_challenge_method = EXCLUDED.code_challenge_method,
                created_at = EXCLUDED.created_at
            RETURNING code_id, client_id, callback_url, scope,
                      code_challenge, code_challenge_method, created_at
            "#,
        )
        .bind(&code.code_id)
        .bind(&code.client_id)
        .bind(&code.callback_url)
        .bind(&code.scope)
        .bind(&code.code_challenge)
        .bind(&code.code_challenge_method)
        .bind(code.created_at)
        .fetch_one(self.pool())
        .await
        .map_err(storage_error)?;

        Ok(row.into())
    }

    async fn get_code(&self, code_id: &str) -> StorageResult<Code> {
        query_as::<Postgres, CodeRow>(&format!("{SELECT_CODES} WHERE code_id = $1"))
            .bind(code_id)
            .fetch_optional(self.pool())
            .await
            .map_err(storage_error)?
            .map(Code::from)
            .ok_or_else(|| StorageError::not_found("code", code_id))
    }

    async fn delete_code(&self, code_id: &str) -> StorageResult<bool> {
        let removed = query("DELETE FROM oauth_codes WHERE code_id = $1")
            .bind(code_id)
            .execute(self.pool())
            .await
            .map_err(storage_error)?
            .rows_affected()
            > 0;

        debug!(removed, "deleted code");
        Ok(removed)
    }

    fn list_codes(&self) -> EntityStream<'_, Code> {
        query_as::<Postgres, CodeRow>(SELECT_CODES)
            .fetch(self.pool())
            .map_ok(Code::from)
            .map_err(storage_error)
            .boxed()
    }
}

#[async_trait]
impl TokenStore for PostgresAuthStore {
    async fn put_token(&self, token: &Token) -> StorageResult<Token> {
        let row: TokenRow = query_as(
            r#"
            INSERT INTO oauth_tokens (access_token, token_type, scope, refresh_token)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (access_token) DO UPDATE SET
                token_type = EXCLUDED.token_type,
                scope = EXCLUDED.scope,
                refresh_token = EXCLUDED.refresh_token
            RETURNING access_token, token_type, scope, refresh_token
            "#,
        )
        .bind(&token.access_token)
        .bind(token.token_type.as_str())
        .bind(&token.scope)
        .bind(&token.refresh_token)
        .fetch_one(self.pool())
        .await
        .map_err(storage_error)?;

        Token::try_from(row)
    }

    async fn get_token(&self, access_token: &str) -> StorageResult<Token> {
        query_as::<Postgres, TokenRow>(&format!("{SELECT_TOKENS} WHERE access_token = $1"))
            .bind(access_token)
            .fetch_optional(self.pool())
            .await
            .map_err(storage_error)?
            .map(Token::try_from)
            .transpose()?
            .ok_or_else(|| StorageError::not_found("token", access_token))
    }

    async fn get_token_by_refresh_token(&self, refresh_token: &str) -> StorageResult<Token> {
        query_as::<Postgres, TokenRow>(&format!("{SELECT_TOKENS} WHERE refresh_token = $1"))
            .bind(refresh_token)
            .fetch_optional(self.pool())
            .await
            .map_err(storage_error)?
            .map(Token::try_from)
            .transpose()?
            .ok_or_else(|| StorageError::not_found("token", refresh_token))
    }

    async fn delete_token(&self, access_token: &str) -> StorageResult<bool> {
        Ok(query("DELETE FROM oauth_tokens WHERE access_token = $1")
            .bind(access_token)
            .execute(self.pool())
            .await
            .map_err(storage_error)?
            .rows_affected()
            > 0)
    }

    fn list_tokens(&self) -> EntityStream<'_, Token> {
        query_as::<Postgres, TokenRow>(SELECT_TOKENS)
            .fetch(self.pool())
            .map_err(storage_error)
            .and_then(|row| async move { Token::try_from(row) })
            .boxed()
    }
}

#[async_trait]
impl AuthStore for PostgresAuthStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn redeem_code(&self, code: &Code, token: &Token) -> StorageResult<bool> {
        let issued: Option<String> = query_scalar(
            r#"
            WITH consumed AS (
                DELETE FROM oauth_codes WHERE code_id = $1 RETURNING code_id
            )
            INSERT INTO oauth_tokens (access_token, token_type, scope, refresh_token)
            SELECT $2, $3, $4, $5 FROM consumed
            RETURNING access_token
            "#,
        )
        .bind(&code.code_id)
        .bind(&token.access_token)
        .bind(token.token_type.as_str())
        .bind(&token.scope)
        .bind(&token.refresh_token)
        .fetch_optional(self.pool())
        .await
        .map_err(storage_error)?;

        Ok(issued.is_some())
    }

    async fn rotate_token(&self, old: &Token, new: &Token) -> StorageResult<bool> {
        let issued: Option<String> = query_scalar(
            r#"
            WITH consumed AS (
                DELETE FROM oauth_tokens WHERE access_token = $1 RETURNING access_token
            )
            INSERT INTO oauth_tokens (access_token, token_type, scope, refresh_token)
            SELECT $2, $3, $4, $5 FROM consumed
            RETURNING access_token
            "#,
        )
        .bind(&old.access_token)
        .bind(&new.access_token)
        .bind(new.token_type.as_str())
        .bind(&new.scope)
        .bind(&new.refresh_token)
        .fetch_optional(self.pool())
        .await
        .map_err(storage_error)?;

        Ok(issued.is_some())
    }
}
