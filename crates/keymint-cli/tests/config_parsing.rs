//! Loading `keymint.toml` files and `KEYMINT__*` overrides.

use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

use keymint_auth::oauth::GrantType;
use keymint_cli::{StorageBackend, load_config};

// The loader reads the whole process environment, so tests that touch it
// run one at a time.
static ENV_LOCK: Mutex<()> = Mutex::new(());

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_full_file() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let file = write_config(
        r#"
[storage]
backend = "memory"

[oauth]
code_lifetime = "5m"
default_scope = "openid"
grant_types = ["authorization_code", "refresh_token"]

[codec]
key = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f"
ttl = "2m"

[logging]
level = "debug"

[[bootstrap.clients]]
client_id = "20260104.apps.localhost"
client_secret = "20260104.secret"
"#,
    );

    let config = load_config(file.path().to_str()).unwrap();
    assert_eq!(config.storage.backend, StorageBackend::Memory);
    assert_eq!(config.oauth.code_lifetime, Duration::from_secs(300));
    assert_eq!(config.oauth.default_scope, "openid");
    assert!(config.oauth.allows(GrantType::RefreshToken));
    assert!(!config.oauth.allows(GrantType::ClientCredentials));
    assert_eq!(config.codec.ttl, Duration::from_secs(120));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.bootstrap.clients.len(), 1);
    assert_eq!(config.bootstrap.clients[0].client_secret, "20260104.secret");
    assert!(config.codec.build().is_ok());
}

#[test]
fn test_partial_file_uses_defaults() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let file = write_config("[logging]\nlevel = \"info\"\n");

    let config = load_config(file.path().to_str()).unwrap();
    assert_eq!(config.storage.backend, StorageBackend::Sqlite);
    assert_eq!(config.storage.sqlite.url, "sqlite://keymint.db");
    assert_eq!(config.oauth.code_lifetime, Duration::from_secs(600));
    assert!(config.oauth.enforce_code_expiry);
    assert!(config.codec.key.is_none());
}

#[test]
fn test_missing_explicit_file() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let err = load_config(Some("/definitely/not/here/keymint.toml")).unwrap_err();
    assert!(err.contains("config file not found"));
}

#[test]
fn test_invalid_values_rejected() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let file = write_config("[storage.sqlite]\nmax_connections = 0\n");
    let err = load_config(file.path().to_str()).unwrap_err();
    assert!(err.contains("max_connections"));

    let file = write_config("[oauth]\ngrant_types = [\"implicit_magic\"]\n");
    assert!(load_config(file.path().to_str()).is_err());
}

#[test]
fn test_env_overrides_file() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let file = write_config("[storage]\nbackend = \"sqlite\"\n[logging]\nlevel = \"info\"\n");

    // SAFETY: ENV_LOCK serializes every test in this binary that reads the environment.
    unsafe {
        std::env::set_var("KEYMINT__STORAGE__BACKEND", "memory");
        std::env::set_var("KEYMINT__LOGGING__LEVEL", "error");
        std::env::set_var("KEYMINT__OAUTH__GRANT_TYPES", "authorization_code,implicit");
    }
    let result = load_config(file.path().to_str());
    unsafe {
        std::env::remove_var("KEYMINT__STORAGE__BACKEND");
        std::env::remove_var("KEYMINT__LOGGING__LEVEL");
        std::env::remove_var("KEYMINT__OAUTH__GRANT_TYPES");
    }

    let config = result.unwrap();
    assert_eq!(config.storage.backend, StorageBackend::Memory);
    assert_eq!(config.logging.level, "error");
    assert_eq!(
        config.oauth.grant_types,
        vec![GrantType::AuthorizationCode, GrantType::Implicit]
    );
}
