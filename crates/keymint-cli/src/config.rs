//! Application configuration.
//!
//! Loaded from `keymint.toml` (or `--config`) and overridden by
//! `KEYMINT__SECTION__KEY` environment variables.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use keymint_auth::OAuthConfig;
use keymint_codec::{CodeCodec, CodecKey, DEFAULT_TTL};
use keymint_db_postgres::PostgresConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub oauth: OAuthConfig,
    pub codec: CodecConfig,
    pub logging: LoggingConfig,
    pub bootstrap: BootstrapConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        // Storage validations
        match self.storage.backend {
            StorageBackend::Sqlite => {
                if self.storage.sqlite.url.is_empty() {
                    return Err("storage.sqlite.url cannot be empty".into());
                }
                if self.storage.sqlite.max_connections == 0 {
                    return Err("storage.sqlite.max_connections must be > 0".into());
                }
            }
            StorageBackend::Postgres => {
                if self.storage.postgres.url.is_empty() {
                    return Err("storage.postgres.url cannot be empty".into());
                }
                if self.storage.postgres.pool_size == 0 {
                    return Err("storage.postgres.pool_size must be > 0".into());
                }
                if self.storage.postgres.acquire_timeout.is_zero() {
                    return Err("storage.postgres.acquire_timeout must be > 0".into());
                }
            }
            StorageBackend::Memory => {}
        }

        self.oauth.validate().map_err(|e| format!("oauth: {e}"))?;

        // Codec validations; the key itself is optional until an envelope
        // command needs it.
        if let Some(key) = &self.codec.key {
            CodecKey::parse(key).map_err(|e| format!("codec.key: {e}"))?;
        }
        for key in &self.codec.previous_keys {
            CodecKey::parse(key).map_err(|e| format!("codec.previous_keys: {e}"))?;
        }
        if self.codec.ttl.is_zero() {
            return Err("codec.ttl must be > 0".into());
        }

        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }

        if self
            .bootstrap
            .clients
            .iter()
            .any(|c| c.client_id.is_empty() || c.client_secret.is_empty())
        {
            return Err("bootstrap.clients entries need client_id and client_secret".into());
        }

        Ok(())
    }
}

// =============================================================================
// Storage
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local; contents vanish when the command exits.
    Memory,
    #[default]
    Sqlite,
    Postgres,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgres",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub sqlite: SqliteConfig,
    pub postgres: PostgresConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    pub url: String,
    pub max_connections: u32,
    pub run_migrations: bool,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://keymint.db".to_string(),
            max_connections: 4,
            run_migrations: true,
        }
    }
}

// =============================================================================
// Codec
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Current key, 64 hex characters or base64. Prefer setting it through
    /// `KEYMINT__CODEC__KEY`.
    pub key: Option<String>,
    /// Retired keys still accepted when opening envelopes.
    pub previous_keys: Vec<String>,
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            key: None,
            previous_keys: Vec::new(),
            ttl: DEFAULT_TTL,
        }
    }
}

impl CodecConfig {
    /// Builds the codec from the configured keys.
    pub fn build(&self) -> Result<CodeCodec, String> {
        let key = self
            .key
            .as_deref()
            .ok_or("codec.key is not configured (run `keymint key generate`)")?;
        let key = CodecKey::parse(key).map_err(|e| format!("codec.key: {e}"))?;

        let previous = self
            .previous_keys
            .iter()
            .map(|k| k.parse::<CodecKey>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("codec.previous_keys: {e}"))?;

        Ok(CodeCodec::new(key)
            .with_previous_keys(previous)
            .with_ttl(self.ttl))
    }
}

// =============================================================================
// Logging and bootstrap
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

/// Clients upserted every time a store is opened.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    pub clients: Vec<BootstrapClient>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapClient {
    pub client_id: String,
    pub client_secret: String,
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    /// Default config file looked up in the working directory.
    pub const DEFAULT_PATH: &str = "keymint.toml";

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                let pathbuf = PathBuf::from(p);
                if !pathbuf.exists() {
                    return Err(format!("config file not found: {p}"));
                }
                builder = builder.add_source(File::from(pathbuf));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_PATH);
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        // Environment variable overrides, e.g., KEYMINT__STORAGE__BACKEND=postgres
        builder = builder.add_source(
            Environment::with_prefix("KEYMINT")
                .try_parsing(true)
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("codec.previous_keys")
                .with_list_parse_key("oauth.grant_types"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}
