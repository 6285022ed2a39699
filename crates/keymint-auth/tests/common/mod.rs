//! Engine fixtures over each in-process backend.

#![allow(dead_code)]

use std::sync::Arc;

use keymint_auth::OAuthConfig;
use keymint_auth::oauth::IssuanceEngine;
use keymint_db_memory::InMemoryAuthStore;
use keymint_db_sqlite::SqliteAuthStore;
use keymint_storage::Client;
use tempfile::TempDir;

/// Keeps the SQLite database directory alive for the test's duration.
pub struct Fixture {
    pub engine: IssuanceEngine,
    _dir: Option<TempDir>,
}

pub async fn memory(config: OAuthConfig) -> Fixture {
    Fixture {
        engine: IssuanceEngine::new(Arc::new(InMemoryAuthStore::new()), config),
        _dir: None,
    }
}

pub async fn sqlite(config: OAuthConfig) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("engine.db").display());
    let store = SqliteAuthStore::connect(&url, 4).await.unwrap();
    store.migrate().await.unwrap();

    Fixture {
        engine: IssuanceEngine::new(Arc::new(store), config),
        _dir: Some(dir),
    }
}

pub const CALLBACK: &str = "https://app.example/cb";

/// Registers a client and returns it.
pub async fn client(engine: &IssuanceEngine) -> Client {
    engine.generate_client().await.unwrap()
}
