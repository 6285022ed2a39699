//! In-memory storage backend for Keymint.
//!
//! Provides a process-local implementation of the persistence contract
//! using `DashMap` for concurrent access. Nothing survives a restart; the
//! backend is intended for tests, development and single-process
//! deployments that pair it with the stateless code codec.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use keymint_db_memory::InMemoryAuthStore;
//!
//! let store = Arc::new(InMemoryAuthStore::new());
//! let engine = IssuanceEngine::new(store, OAuthConfig::default());
//! ```

mod storage;

pub use storage::InMemoryAuthStore;
