//! Embedded SQLite storage backend for Keymint.
//!
//! Persists clients, authorization codes and tokens in three tables:
//!
//! - `oauth_clients` - keyed by `client_id`
//! - `oauth_codes` - keyed by `code_id`, foreign key to `oauth_clients`
//! - `oauth_tokens` - keyed by `access_token`, unique `refresh_token`
//!
//! Single-use artifacts are consumed with a plain `DELETE ... WHERE` whose
//! affected-row count decides the winner; SQLite serializes writers, so two
//! racing resolvers can never both observe a deleted row.
//!
//! # Example
//!
//! ```ignore
//! use keymint_db_sqlite::SqliteAuthStore;
//!
//! let store = SqliteAuthStore::connect("sqlite://keymint.db", 4).await?;
//! store.migrate().await?;
//! ```

mod error;
pub mod migrations;
mod storage;

use std::str::FromStr;
use std::time::Duration;

use sqlx_sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use keymint_storage::StorageResult;

pub(crate) use error::storage_error;

/// How long a connection waits on a locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite storage backend.
#[derive(Debug, Clone)]
pub struct SqliteAuthStore {
    pool: SqlitePool,
}

impl SqliteAuthStore {
    /// Create new storage with an existing connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database at `url`.
    ///
    /// In-memory databases (`sqlite::memory:`) are pinned to a single,
    /// never-recycled connection so the data outlives idle periods.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the connection fails.
    pub async fn connect(url: &str, max_connections: u32) -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(storage_error)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT);

        let pool_options = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(storage_error)?;

        tracing::info!(url, "connected to SQLite auth store");
        Ok(Self::new(pool))
    }

    /// Apply all pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if a migration fails to execute.
    pub async fn migrate(&self) -> StorageResult<()> {
        migrations::run(&self.pool).await
    }

    /// Get a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
