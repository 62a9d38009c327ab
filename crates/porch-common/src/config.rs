//! Application configuration loaded from environment variables and config files.
//!
//! Supports `.env` files for development and environment variables for everyday use.
//! Config precedence: env vars > .env file > porch.toml > defaults

use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Lowest accepted PBKDF2 iteration count for the key vault.
pub const MIN_KDF_ITERATIONS: u32 = 100_000;

/// Relays queried when neither the identifier nor the config names any.
pub const DEFAULT_RELAYS: &[&str] = &[
    "wss://relay.damus.io",
    "wss://nos.lol",
    "wss://relay.nostr.band",
];

/// Get the global application configuration.
///
/// # Panics
/// Panics if config has not been initialized via [`init`].
pub fn get() -> &'static AppConfig {
    CONFIG.get().expect("Config not initialized. Call porch_common::config::init() first.")
}

/// Initialize the global configuration from environment.
///
/// Should be called once at startup, before any other code accesses config.
pub fn init() -> Result<&'static AppConfig, config::ConfigError> {
    // Load .env file if present (development)
    let _ = dotenvy::dotenv();

    let app_config = AppConfig::load()?;
    Ok(CONFIG.get_or_init(|| app_config))
}

impl AppConfig {
    /// Build a configuration without touching the global slot.
    pub fn load() -> Result<Self, config::ConfigError> {
        let relays: Vec<String> = DEFAULT_RELAYS.iter().map(|r| r.to_string()).collect();

        let cfg = config::Config::builder()
            // Defaults
            .set_default("storage.data_dir", "./data")?
            .set_default("storage.durable_file", "durable.json")?
            .set_default("storage.session_file", "session.json")?
            .set_default("relays.urls", relays)?
            .set_default("relays.timeout_secs", 8)?
            .set_default("verification.timeout_secs", 5)?
            .set_default("verification.cache_ttl_secs", 3600)?
            .set_default("vault.kdf_iterations", i64::from(MIN_KDF_ITERATIONS))?
            // Optional config file
            .add_source(config::File::with_name("porch").required(false))
            // Environment variables (PORCH__RELAYS__URLS, PORCH__STORAGE__DATA_DIR, etc.)
            .add_source(
                config::Environment::with_prefix("PORCH")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("relays.urls")
                    .try_parsing(true),
            )
            .build()?;

        let app_config: AppConfig = cfg.try_deserialize()?;
        if app_config.vault.kdf_iterations < MIN_KDF_ITERATIONS {
            return Err(config::ConfigError::Message(format!(
                "vault.kdf_iterations must be at least {MIN_KDF_ITERATIONS}"
            )));
        }
        Ok(app_config)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub relays: RelaysConfig,
    pub verification: VerificationConfig,
    pub vault: VaultConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Directory holding the durable store file.
    pub data_dir: PathBuf,
    /// File name of the durable scope (identity record, activity ledger).
    pub durable_file: String,
    /// Directory of the session scope. Unset means the login's runtime directory.
    #[serde(default)]
    pub session_dir: Option<PathBuf>,
    /// File name of the session scope (cached unlocked key).
    /// Deleting this file ends the "browsing session".
    pub session_file: String,
}

impl StorageConfig {
    pub fn durable_path(&self) -> PathBuf {
        self.data_dir.join(&self.durable_file)
    }

    /// `session_dir`, else `$XDG_RUNTIME_DIR/porch` (emptied at logout), else the
    /// system temp dir. Never `data_dir`: the session scope holds a plaintext key.
    pub fn session_path(&self) -> PathBuf {
        session_dir(self.session_dir.as_deref(), std::env::var_os("XDG_RUNTIME_DIR")).join(&self.session_file)
    }
}

fn session_dir(configured: Option<&Path>, runtime_dir: Option<OsString>) -> PathBuf {
    match (configured, runtime_dir) {
        (Some(dir), _) => dir.to_path_buf(),
        (None, Some(run)) if !run.is_empty() => PathBuf::from(run).join("porch"),
        _ => std::env::temp_dir().join("porch"),
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RelaysConfig {
    /// Relay WebSocket URLs used when an identifier carries no hints.
    pub urls: Vec<String>,
    /// Per-relay timeout for a query or publish, in seconds.
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VerificationConfig {
    /// HTTP timeout for `/.well-known/nostr.json` lookups.
    pub timeout_secs: u64,
    /// How long a verification result is cached.
    pub cache_ttl_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VaultConfig {
    /// PBKDF2-HMAC-SHA256 iteration count (never below [`MIN_KDF_ITERATIONS`]).
    pub kdf_iterations: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load_without_sources() {
        let cfg = AppConfig::load().expect("defaults should deserialize");
        assert_eq!(cfg.vault.kdf_iterations, MIN_KDF_ITERATIONS);
        assert_eq!(cfg.relays.urls.len(), DEFAULT_RELAYS.len());
        assert!(cfg.storage.durable_path().ends_with("durable.json"));
        assert!(cfg.storage.session_path().ends_with("session.json"));
        assert!(!cfg.storage.session_path().starts_with(&cfg.storage.data_dir));
    }

    #[test]
    fn session_dir_prefers_config_then_runtime_dir() {
        let configured = Path::new("/custom/session");
        assert_eq!(session_dir(Some(configured), Some("/run/user/1000".into())), configured);
        assert_eq!(session_dir(None, Some("/run/user/1000".into())), Path::new("/run/user/1000/porch"));
        assert_eq!(session_dir(None, Some(OsString::new())), std::env::temp_dir().join("porch"));
        assert_eq!(session_dir(None, None), std::env::temp_dir().join("porch"));
    }
}
