//! Library half of the `keymint` operator binary: configuration, logging
//! setup and backend selection.

pub mod backend;
pub mod config;
pub mod observability;

pub use config::{AppConfig, StorageBackend, loader::load_config};
