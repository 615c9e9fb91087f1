//! Configuration loading and validation for the keyserve binary.
//!
//! All values are read from environment variables at startup. The process
//! exits with a clear error message if any value is present but invalid.
//! Literals the server bakes in (key-store file name, pass-phrase, default
//! alias) are constants in their owning modules, not configuration.

use anyhow::{Context, Result};
use serde::Deserialize;

/// Validated keyserve configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// TCP port the TLS server listens on.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Directory holding the bundled assets (`keychain.p12`, `embedded.png`).
    #[serde(default = "default_asset_dir")]
    pub asset_dir: String,

    /// Root directory of the platform trust-store adapter
    /// (one sub-directory per enrolled alias).
    #[serde(default = "default_truststore_dir")]
    pub truststore_dir: String,

    /// Path of the persisted preference file (selected alias).
    #[serde(default = "default_preference_file")]
    pub preference_file: String,

    /// Alias to persist as the selected identity before the accessibility
    /// check, standing in for the platform's identity-selection UI.
    #[serde(default)]
    pub select_alias: Option<String>,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_listen_port() -> u16 {
    8080
}
fn default_asset_dir() -> String {
    "assets".into()
}
fn default_truststore_dir() -> String {
    "truststore".into()
}
fn default_preference_file() -> String {
    "keychain-prefs.json".into()
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable is present but cannot be parsed, or
    /// if validation fails.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        ensure_non_empty(&self.asset_dir, "ASSET_DIR")?;
        ensure_non_empty(&self.truststore_dir, "TRUSTSTORE_DIR")?;
        ensure_non_empty(&self.preference_file, "PREFERENCE_FILE")?;
        Ok(())
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} must not be empty");
    }
    Ok(())
}
