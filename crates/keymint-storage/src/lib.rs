//! # keymint-storage
//!
//! Persistence contract for the Keymint issuance engine.
//!
//! This crate defines the entities (clients, authorization codes, tokens)
//! and the traits every storage backend must implement. It does not contain
//! any implementations - those are provided by separate crates:
//!
//! - `keymint-db-memory` - in-process backend built on concurrent hash maps
//! - `keymint-db-sqlite` - embedded SQLite backend
//! - `keymint-db-postgres` - PostgreSQL backend
//!
//! ## Contract
//!
//! Every entity supports the same four operations:
//!
//! - `put_*` - idempotent upsert keyed by the primary key
//! - `get_*` - fails with [`StorageError::NotFound`] when absent
//! - `delete_*` - atomic delete-if-exists; returns `true` only for the
//!   caller that actually removed the row
//! - `list_*` - a finite stream bound to a fresh backend query per call
//!
//! The engine consumes authorization codes and refresh tokens through
//! [`AuthStore::redeem_code`] and [`AuthStore::rotate_token`], which build on
//! `delete_*` returning `false` to a losing concurrent caller. A code or
//! refresh token is consumed exactly once, and never without its
//! replacement token being stored.
//!
//! ## Example
//!
//! ```ignore
//! use futures_util::TryStreamExt;
//! use keymint_storage::{AuthStore, StorageResult};
//!
//! async fn client_ids(store: &dyn AuthStore) -> StorageResult<Vec<String>> {
//!     store
//!         .list_clients()
//!         .map_ok(|client| client.client_id)
//!         .try_collect()
//!         .await
//! }
//! ```

mod error;
pub mod row;
mod traits;
mod types;

pub use error::{ErrorCategory, StorageError};
pub use traits::{AuthStore, ClientStore, CodeStore, EntityStream, TokenStore};
pub use types::{Client, Code, Token, TokenType};

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shared storage trait object.
pub type DynAuthStore = std::sync::Arc<dyn AuthStore>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use keymint_storage::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{ErrorCategory, StorageError};
    pub use crate::traits::{AuthStore, ClientStore, CodeStore, EntityStream, TokenStore};
    pub use crate::types::{Client, Code, Token, TokenType};
    pub use crate::{DynAuthStore, StorageResult};
}
