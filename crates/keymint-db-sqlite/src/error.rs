use keymint_storage::StorageError;

/// Maps a driver error onto the persistence contract's error taxonomy.
///
/// Unique and foreign key violations become `Constraint`; everything else
/// is a `Backend` failure.
pub(crate) fn storage_error(err: sqlx_core::Error) -> StorageError {
    if let sqlx_core::Error::Database(ref db_err) = err
        && (db_err.is_unique_violation() || db_err.is_foreign_key_violation())
    {
        return StorageError::constraint(db_err.message().to_string());
    }
    StorageError::backend(err.to_string())
}
