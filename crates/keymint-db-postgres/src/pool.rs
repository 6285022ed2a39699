//! Connection pool management.

use sqlx_postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info, instrument};

use keymint_storage::StorageResult;

use crate::config::PostgresConfig;
use crate::error::storage_error;

#[instrument(skip(config), fields(url = %mask_password(&config.url)))]
pub async fn create_pool(config: &PostgresConfig) -> StorageResult<PgPool> {
    info!(
        pool_size = config.pool_size,
        acquire_timeout = ?config.acquire_timeout,
        "creating postgres pool"
    );

    let options = PgPoolOptions::new()
        .max_connections(config.pool_size.max(1))
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout);

    let pool = options.connect(&config.url).await.map_err(storage_error)?;
    debug!(size = pool.size(), "postgres pool ready");

    Ok(pool)
}

/// Hides the password component of a connection URL.
pub(crate) fn mask_password(url: &str) -> String {
    let scheme_end = url.find("://").map(|p| p + 3).unwrap_or(0);
    if let Some(at_pos) = url.rfind('@')
        && let Some(colon_pos) = url[scheme_end..at_pos].find(':')
    {
        let colon_pos = scheme_end + colon_pos;
        return format!("{}:****{}", &url[..colon_pos], &url[at_pos..]);
    }
    url.to_string()
}
