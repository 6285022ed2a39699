//! Store trait implementations over the SQLite pool.

use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};
use sqlx_core::query::{Query, query};
use sqlx_core::query_as::query_as;
use sqlx_sqlite::{Sqlite, SqliteArguments};
use tracing::debug;

use keymint_storage::row::{
    ClientRow, CodeRow, SELECT_CLIENTS, SELECT_CODES, SELECT_TOKENS, TokenRow,
};
use keymint_storage::{
    AuthStore, Client, ClientStore, Code, CodeStore, EntityStream, StorageError, StorageResult,
    Token, TokenStore,
};

use crate::{SqliteAuthStore, storage_error};

fn upsert_token(token: &Token) -> Query<'_, Sqlite, SqliteArguments<'_>> {
    query(
        r#"
        INSERT INTO oauth_tokens (access_token, token_type, scope, refresh_token)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT (access_token) DO UPDATE SET
            token_type = excluded.token_type,
            scope = excluded.scope,
            refresh_token = excluded.refresh_token
        "#,
    )
    .bind(&token.access_token)
    .bind(token.token_type.as_str())
    .bind(&token.scope)
    .bind(&token.refresh_token)
}

// =============================================================================
// Clients
// =============================================================================

#[async_trait]
impl ClientStore for SqliteAuthStore {
    async fn put_client(&self, client: &Client) -> StorageResult<Client> {
        query(
            r#"
            INSERT INTO oauth_clients (client_id, client_secret)
            VALUES (?1, ?2)
            ON CONFLICT (client_id) DO UPDATE SET client_secret = excluded.client_secret
            "#,
        )
        .bind(&client.client_id)
        .bind(&client.client_secret)
        .execute(self.pool())
        .await
        .map_err(storage_error)?;

        Ok(client.clone())
    }

    async fn get_client(&self, client_id: &str) -> StorageResult<Client> {
        let sql = format!("{SELECT_CLIENTS} WHERE client_id = ?1");
        let row: Option<ClientRow> = query_as(&sql)
            .bind(client_id)
            .fetch_optional(self.pool())
            .await
            .map_err(storage_error)?;

        row.map(Client::from)
            .ok_or_else(|| StorageError::not_found("client", client_id))
    }

    async fn delete_client(&self, client_id: &str) -> StorageResult<bool> {
        let result = query("DELETE FROM oauth_clients WHERE client_id = ?1")
            .bind(client_id)
            .execute(self.pool())
            .await
            .map_err(storage_error)?;

        let removed = result.rows_affected() > 0;
        debug!(client_id, removed, "deleted client");
        Ok(removed)
    }

    fn list_clients(&self) -> EntityStream<'_, Client> {
        query_as::<Sqlite, ClientRow>(SELECT_CLIENTS)
            .fetch(self.pool())
            .map_ok(Client::from)
            .map_err(storage_error)
            .boxed()
    }
}

// =============================================================================
// Codes
// =============================================================================

#[async_trait]
impl CodeStore for SqliteAuthStore {
    async fn put_code(&self, code: &Code) -> StorageResult<Code> {
        query(
            r#"
            INSERT INTO oauth_codes (
                code_id, client_id, callback_url, scope,
                code_challenge, code_challenge_method, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT (code_id) DO UPDATE SET
                client_id = excluded.client_id,
                callback_url = excluded.callback_url,
                scope = excluded.scope,
                code_challenge = excluded.code_challenge,
                code_challenge_method = excluded.code_challenge_method,
                created_at = excluded.created_at
            "#,
        )
        .bind(&code.code_id)
        .bind(&code.client_id)
        .bind(&code.callback_url)
        .bind(&code.scope)
        .bind(&code.code_challenge)
        .bind(&code.code_challenge_method)
        .bind(code.created_at)
        .execute(self.pool())
        .await
        .map_err(storage_error)?;

        Ok(code.clone())
    }

    async fn get_code(&self, code_id: &str) -> StorageResult<Code> {
        let sql = format!("{SELECT_CODES} WHERE code_id = ?1");
        let row: Option<CodeRow> = query_as(&sql)
            .bind(code_id)
            .fetch_optional(self.pool())
            .await
            .map_err(storage_error)?;

        row.map(Code::from)
            .ok_or_else(|| StorageError::not_found("code", code_id))
    }

    async fn delete_code(&self, code_id: &str) -> StorageResult<bool> {
        let result = query("DELETE FROM oauth_codes WHERE code_id = ?1")
            .bind(code_id)
            .execute(self.pool())
            .await
            .map_err(storage_error)?;

        let removed = result.rows_affected() > 0;
        debug!(removed, "deleted code");
        Ok(removed)
    }

    fn list_codes(&self) -> EntityStream<'_, Code> {
        query_as::<Sqlite, CodeRow>(SELECT_CODES)
            .fetch(self.pool())
            .map_ok(Code::from)
            .map_err(storage_error)
            .boxed()
    }
}

// =============================================================================
// Tokens
// =============================================================================

#[async_trait]
impl TokenStore for SqliteAuthStore {
    async fn put_token(&self, token: &Token) -> StorageResult<Token> {
        upsert_token(token)
            .execute(self.pool())
            .await
            .map_err(storage_error)?;

        Ok(token.clone())
    }

    async fn get_token(&self, access_token: &str) -> StorageResult<Token> {
        let sql = format!("{SELECT_TOKENS} WHERE access_token = ?1");
        let row: Option<TokenRow> = query_as(&sql)
            .bind(access_token)
            .fetch_optional(self.pool())
            .await
            .map_err(storage_error)?;

        row.map(Token::try_from)
            .transpose()?
            .ok_or_else(|| StorageError::not_found("token", access_token))
    }

    async fn get_token_by_refresh_token(&self, refresh_token: &str) -> StorageResult<Token> {
        let sql = format!("{SELECT_TOKENS} WHERE refresh_token = ?1");
        let row: Option<TokenRow> = query_as(&sql)
            .bind(refresh_token)
            .fetch_optional(self.pool())
            .await
            .map_err(storage_error)?;

        row.map(Token::try_from)
            .transpose()?
            .ok_or_else(|| StorageError::not_found("token", refresh_token))
    }

    async fn delete_token(&self, access_token: &str) -> StorageResult<bool> {
        let result = query("DELETE FROM oauth_tokens WHERE access_token = ?1")
            .bind(access_token)
            .execute(self.pool())
            .await
            .map_err(storage_error)?;

        Ok(result.rows_affected() > 0)
    }

    fn list_tokens(&self) -> EntityStream<'_, Token> {
        query_as::<Sqlite, TokenRow>(SELECT_TOKENS)
            .fetch(self.pool())
            .map_err(storage_error)
            .and_then(|row| async move { Token::try_from(row) })
            .boxed()
    }
}

// =============================================================================
// Exchanges
// =============================================================================

#[async_trait]
impl AuthStore for SqliteAuthStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn redeem_code(&self, code: &Code, token: &Token) -> StorageResult<bool> {
        let mut tx = self.pool().begin().await.map_err(storage_error)?;

        let deleted = query("DELETE FROM oauth_codes WHERE code_id = ?1")
            .bind(&code.code_id)
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;
        if deleted.rows_affected() == 0 {
            return Ok(false);
        }

        // Dropping `tx` on a failed insert rolls the delete back.
        upsert_token(token)
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;
        tx.commit().await.map_err(storage_error)?;
        Ok(true)
    }

    async fn rotate_token(&self, old: &Token, new: &Token) -> StorageResult<bool> {
        let mut tx = self.pool().begin().await.map_err(storage_error)?;

        let deleted = query("DELETE FROM oauth_tokens WHERE access_token = ?1")
            .bind(&old.access_token)
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;
        if deleted.rows_affected() == 0 {
            return Ok(false);
        }

        upsert_token(new)
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;
        tx.commit().await.map_err(storage_error)?;
        Ok(true)
    }
}
