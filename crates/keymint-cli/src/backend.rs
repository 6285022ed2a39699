//! Storage backend selection.

use std::sync::Arc;

use tracing::info;

use keymint_auth::oauth::IssuanceEngine;
use keymint_db_memory::InMemoryAuthStore;
use keymint_db_postgres::PostgresAuthStore;
use keymint_db_sqlite::SqliteAuthStore;
use keymint_storage::{AuthStore, Client, DynAuthStore, StorageResult};

use crate::config::{AppConfig, BootstrapClient, StorageBackend, StorageConfig};

/// Opens the configured backend, applying migrations when enabled.
pub async fn open_store(config: &StorageConfig) -> StorageResult<DynAuthStore> {
    let store: DynAuthStore = match config.backend {
        StorageBackend::Memory => Arc::new(InMemoryAuthStore::new()),
        StorageBackend::Sqlite => {
            let store =
                SqliteAuthStore::connect(&config.sqlite.url, config.sqlite.max_connections)
                    .await?;
            if config.sqlite.run_migrations {
                store.migrate().await?;
            }
            Arc::new(store)
        }
        StorageBackend::Postgres => Arc::new(PostgresAuthStore::open(&config.postgres).await?),
    };

    info!(backend = store.backend_name(), "opened auth store");
    Ok(store)
}

/// Applies pending migrations regardless of the `run_migrations` flags.
/// Returns the backend name.
pub async fn migrate(config: &StorageConfig) -> StorageResult<&'static str> {
    match config.backend {
        StorageBackend::Memory => {}
        StorageBackend::Sqlite => {
            SqliteAuthStore::connect(&config.sqlite.url, config.sqlite.max_connections)
                .await?
                .migrate()
                .await?;
        }
        StorageBackend::Postgres => {
            let postgres = config.postgres.clone().with_run_migrations(true);
            PostgresAuthStore::open(&postgres).await?;
        }
    }
    Ok(config.backend.as_str())
}

/// Upserts the bootstrap clients.
pub async fn seed_clients(store: &dyn AuthStore, clients: &[BootstrapClient]) -> StorageResult<()> {
    for seed in clients {
        store
            .put_client(&Client::new(&seed.client_id, &seed.client_secret))
            .await?;
        info!(client_id = %seed.client_id, "seeded bootstrap client");
    }
    Ok(())
}

/// Opens the store, seeds bootstrap clients and builds the engine.
pub async fn open_engine(config: &AppConfig) -> StorageResult<IssuanceEngine> {
    let store = open_store(&config.storage).await?;
    seed_clients(store.as_ref(), &config.bootstrap.clients).await?;
    Ok(IssuanceEngine::new(store, config.oauth.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::TryStreamExt;

    #[tokio::test]
    async fn test_memory_engine_is_seeded() {
        let mut config = AppConfig::default();
        config.storage.backend = StorageBackend::Memory;
        config.bootstrap.clients = vec![BootstrapClient {
            client_id: "20260104.apps.localhost".into(),
            client_secret: "20260104.secret".into(),
        }];

        let engine = open_engine(&config).await.unwrap();
        let clients: Vec<Client> = engine.list_clients().try_collect().await.unwrap();
        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0].client_id, "20260104.apps.localhost");

        let token = engine
            .resolve_token("20260104.apps.localhost", "20260104.secret")
            .await
            .unwrap();
        assert_eq!(token.scope, "default");
    }

    #[tokio::test]
    async fn test_sqlite_store_migrates_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = StorageConfig::default();
        config.sqlite.url = format!("sqlite://{}", dir.path().join("cli.db").display());

        let store = open_store(&config).await.unwrap();
        assert_eq!(store.backend_name(), "sqlite");
        store.put_client(&Client::new("c", "s")).await.unwrap();

        assert_eq!(migrate(&config).await.unwrap(), "sqlite");
        assert_eq!(store.get_client("c").await.unwrap().client_secret, "s");
    }
}
