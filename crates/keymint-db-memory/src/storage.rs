use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures_util::StreamExt;
use futures_util::stream;

use keymint_storage::{
    AuthStore, Client, ClientStore, Code, CodeStore, EntityStream, StorageError, StorageResult,
    Token, TokenStore,
};

/// In-memory auth storage backend.
///
/// This storage implementation provides:
/// - Lock-sharded concurrent access via `DashMap`
/// - Atomic delete-if-exists for codes and tokens (`DashMap::remove`)
/// - A refresh-token index enforcing refresh token uniqueness
/// - The same referential rules as the relational backends: codes must
///   reference an existing client, and deleting a client removes its codes
#[derive(Debug, Clone, Default)]
pub struct InMemoryAuthStore {
    clients: Arc<DashMap<String, Client>>,
    codes: Arc<DashMap<String, Code>>,
    tokens: Arc<DashMap<String, Token>>,
    /// refresh_token -> access_token
    refresh_index: Arc<DashMap<String, String>>,
}

impl InMemoryAuthStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with clients.
    pub fn with_clients(clients: impl IntoIterator<Item = Client>) -> Self {
        let store = Self::new();
        for client in clients {
            store.clients.insert(client.client_id.clone(), client);
        }
        store
    }
}

/// Snapshots the current values of a map into a stream.
fn snapshot<T: Clone + Send + 'static>(map: &DashMap<String, T>) -> EntityStream<'static, T> {
    let items: Vec<StorageResult<T>> = map.iter().map(|entry| Ok(entry.value().clone())).collect();
    stream::iter(items).boxed()
}

#[async_trait]
impl ClientStore for InMemoryAuthStore {
    async fn put_client(&self, client: &Client) -> StorageResult<Client> {
        self.clients
            .insert(client.client_id.clone(), client.clone());
        Ok(client.clone())
    }

    async fn get_client(&self, client_id: &str) -> StorageResult<Client> {
        self.clients
            .get(client_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StorageError::not_found("client", client_id))
    }

    async fn delete_client(&self, client_id: &str) -> StorageResult<bool> {
        let removed = self.clients.remove(client_id).is_some();
        if removed {
            self.codes.retain(|_, code| code.client_id != client_id);
            tracing::debug!(client_id, "removed client and its codes");
        }
        Ok(removed)
    }

    fn list_clients(&self) -> EntityStream<'_, Client> {
        snapshot(&self.clients)
    }
}

#[async_trait]
impl CodeStore for InMemoryAuthStore {
    async fn put_code(&self, code: &Code) -> StorageResult<Code> {
        // The read guard blocks `delete_client` from removing the client
        // until the code is in the map, so its cascade sees the code.
        let Some(_client) = self.clients.get(&code.client_id) else {
            return Err(StorageError::constraint(format!(
                "code references unknown client '{}'",
                code.client_id
            )));
        };
        self.codes.insert(code.code_id.clone(), code.clone());
        Ok(code.clone())
    }

    async fn get_code(&self, code_id: &str) -> StorageResult<Code> {
        self.codes
            .get(code_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StorageError::not_found("code", code_id))
    }

    async fn delete_code(&self, code_id: &str) -> StorageResult<bool> {
        Ok(self.codes.remove(code_id).is_some())
    }

    fn list_codes(&self) -> EntityStream<'_, Code> {
        snapshot(&self.codes)
    }
}

#[async_trait]
impl TokenStore for InMemoryAuthStore {
    async fn put_token(&self, token: &Token) -> StorageResult<Token> {
        // Claim the refresh token first; the entry guard serializes writers
        // racing for the same refresh token.
        match self.refresh_index.entry(token.refresh_token.clone()) {
            Entry::Occupied(owner) if owner.get() != &token.access_token => {
                return Err(StorageError::constraint(
                    "refresh token is already bound to another access token",
                ));
            }
            Entry::Occupied(_) => {}
            Entry::Vacant(slot) => {
                slot.insert(token.access_token.clone());
            }
        }

        if let Some(previous) = self
            .tokens
            .insert(token.access_token.clone(), token.clone())
            && previous.refresh_token != token.refresh_token
        {
            self.refresh_index
                .remove_if(&previous.refresh_token, |_, owner| owner == &token.access_token);
        }

        Ok(token.clone())
    }

    async fn get_token(&self, access_token: &str) -> StorageResult<Token> {
        self.tokens
            .get(access_token)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StorageError::not_found("token", access_token))
    }

    async fn get_token_by_refresh_token(&self, refresh_token: &str) -> StorageResult<Token> {
        let access_token = self
            .refresh_index
            .get(refresh_token)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StorageError::not_found("token", refresh_token))?;

        self.tokens
            .get(&access_token)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StorageError::not_found("token", refresh_token))
    }

    async fn delete_token(&self, access_token: &str) -> StorageResult<bool> {
        match self.tokens.remove(access_token) {
            Some((_, token)) => {
                self.refresh_index
                    .remove_if(&token.refresh_token, |_, owner| owner == access_token);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn list_tokens(&self) -> EntityStream<'_, Token> {
        snapshot(&self.tokens)
    }
}

impl AuthStore for InMemoryAuthStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
