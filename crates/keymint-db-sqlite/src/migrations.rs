//! Embedded schema migrations for the SQLite backend.

use std::borrow::Cow;

use sqlx_core::migrate::{Migration, MigrationType, Migrator};
use sqlx_sqlite::SqlitePool;
use tracing::{info, instrument};

use keymint_storage::{StorageError, StorageResult};

/// Add new migrations here in chronological order as
/// `(version, description, sql)`.
macro_rules! embedded_migrations {
    () => {
        &[(
            20260101000001i64,
            "oauth_schema",
            include_str!("../migrations/20260101000001_oauth_schema.sql"),
        )]
    };
}

fn build_migrations() -> Vec<Migration> {
    embedded_migrations!()
        .iter()
        .map(|(version, description, sql)| Migration {
            version: *version,
            description: Cow::Borrowed(description),
            migration_type: MigrationType::Simple,
            sql: Cow::Borrowed(sql),
            checksum: Cow::Borrowed(&[]),
            no_tx: false,
        })
        .collect()
}

/// Runs all pending migrations, tracked in `_sqlx_migrations`.
///
/// # Errors
///
/// Returns an error if a migration fails to execute.
#[instrument(skip(pool))]
pub async fn run(pool: &SqlitePool) -> StorageResult<()> {
    let migrations = build_migrations();
    info!("Applying {} SQLite migration(s)", migrations.len());

    let migrator = Migrator {
        migrations: Cow::Owned(migrations),
        ignore_missing: false,
        locking: true,
        no_tx: false,
    };

    migrator
        .run(pool)
        .await
        .map_err(|e| StorageError::backend(format!("Migration failed: {e}")))?;

    info!("SQLite migrations completed");
    Ok(())
}
