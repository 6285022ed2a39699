//! Token writes failing midway through a redemption or rotation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use keymint_auth::oauth::IssuanceEngine;
use keymint_auth::{AuthError, OAuthConfig};
use keymint_db_memory::InMemoryAuthStore;
use keymint_storage::{
    AuthStore, Client, ClientStore, Code, CodeStore, EntityStream, StorageError, StorageResult,
    Token, TokenStore,
};

const CALLBACK: &str = "https://app.example/cb";

/// In-memory store whose token writes can be switched off.
#[derive(Default)]
struct UnreliableTokenWrites {
    inner: InMemoryAuthStore,
    failing: AtomicBool,
}

impl UnreliableTokenWrites {
    fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl ClientStore for UnreliableTokenWrites {
    async fn put_client(&self, client: &Client) -> StorageResult<Client> {
        self.inner.put_client(client).await
    }

    async fn get_client(&self, client_id: &str) -> StorageResult<Client> {
        self.inner.get_client(client_id).await
    }

    async fn delete_client(&self, client_id: &str) -> StorageResult<bool> {
        self.inner.delete_client(client_id).await
    }

    fn list_clients(&self) -> EntityStream<'_, Client> {
        self.inner.list_clients()
    }
}

#[async_trait]
impl CodeStore for UnreliableTokenWrites {
    async fn put_code(&self, code: &Code) -> StorageResult<Code> {
        self.inner.put_code(code).await
    }

    async fn get_code(&self, code_id: &str) -> StorageResult<Code> {
        self.inner.get_code(code_id).await
    }

    async fn delete_code(&self, code_id: &str) -> StorageResult<bool> {
        self.inner.delete_code(code_id).await
    }

    fn list_codes(&self) -> EntityStream<'_, Code> {
        self.inner.list_codes()
    }
}

#[async_trait]
impl TokenStore for UnreliableTokenWrites {
    async fn put_token(&self, token: &Token) -> StorageResult<Token> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::backend("connection reset"));
        }
        self.inner.put_token(token).await
    }

    async fn get_token(&self, access_token: &str) -> StorageResult<Token> {
        self.inner.get_token(access_token).await
    }

    async fn get_token_by_refresh_token(&self, refresh_token: &str) -> StorageResult<Token> {
        self.inner.get_token_by_refresh_token(refresh_token).await
    }

    async fn delete_token(&self, access_token: &str) -> StorageResult<bool> {
        self.inner.delete_token(access_token).await
    }

    fn list_tokens(&self) -> EntityStream<'_, Token> {
        self.inner.list_tokens()
    }
}

impl AuthStore for UnreliableTokenWrites {
    fn backend_name(&self) -> &'static str {
        "unreliable"
    }
}

fn engine() -> (IssuanceEngine, Arc<UnreliableTokenWrites>) {
    let store = Arc::new(UnreliableTokenWrites::default());
    let engine = IssuanceEngine::new(store.clone(), OAuthConfig::default());
    (engine, store)
}

#[tokio::test]
async fn failed_token_write_keeps_code_redeemable() {
    let (engine, store) = engine();
    let client = engine.generate_client().await.unwrap();
    let code = engine
        .generate_code(&client.client_id, CALLBACK, "read", None, None)
        .await
        .unwrap();

    store.set_failing(true);
    let err = engine
        .resolve_code(
            &code.code_id,
            CALLBACK,
            &client.client_id,
            &client.client_secret,
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Storage(_)), "unexpected {err:?}");
    assert!(err.is_server_error());
    assert_eq!(store.get_code(&code.code_id).await.unwrap(), code);

    store.set_failing(false);
    let token = engine
        .resolve_code(
            &code.code_id,
            CALLBACK,
            &client.client_id,
            &client.client_secret,
            None,
        )
        .await
        .unwrap();
    assert_eq!(token.scope, "read");
}

#[tokio::test]
async fn failed_token_write_keeps_old_pair_refreshable() {
    let (engine, store) = engine();
    let old = engine.generate_token("client", "read").await.unwrap();

    store.set_failing(true);
    let err = engine.refresh_token(&old.refresh_token).await.unwrap_err();
    assert!(matches!(err, AuthError::Storage(_)), "unexpected {err:?}");
    assert_eq!(store.get_token(&old.access_token).await.unwrap(), old);

    store.set_failing(false);
    let rotated = engine.refresh_token(&old.refresh_token).await.unwrap();
    assert_eq!(rotated.scope, "read");
    assert!(store.get_token(&old.access_token).await.unwrap_err().is_not_found());
}
