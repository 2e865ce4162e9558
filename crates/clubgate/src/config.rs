//! Client configuration.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable prefix for overrides (`CLUBGATE_BASE_URL`, ...).
const ENV_PREFIX: &str = "CLUBGATE";

/// Default per-request timeout, in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying loader failure (bad file, bad env value).
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// `base_url` missing or empty.
    #[error("base_url must not be empty")]
    EmptyBaseUrl,

    /// `timeout_secs` of zero would disable the network upper bound.
    #[error("timeout_secs must be greater than zero")]
    ZeroTimeout,
}

/// Settings for the client core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the remote API, e.g. `https://club.example.org`.
    pub base_url: String,

    /// Upper bound for every outbound call, in seconds. A call exceeding it
    /// is treated as a network failure; no partial result is kept.
    pub timeout_secs: u64,

    /// Directory for the durable session snapshot. Defaults to the platform
    /// data directory when unset.
    pub storage_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            storage_dir: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration: defaults, then an optional TOML file, then
    /// `CLUBGATE_*` environment overrides.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("timeout_secs", DEFAULT_TIMEOUT_SECS as i64)?;

        if let Some(path) = file {
            builder = builder.add_source(
                File::from(path)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let built = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let config: ClientConfig = built.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the core cannot operate with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::EmptyBaseUrl);
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    /// Directory holding the session snapshot, falling back to the platform
    /// data dir.
    pub fn resolved_storage_dir(&self) -> PathBuf {
        if let Some(ref dir) = self.storage_dir {
            return dir.clone();
        }
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("clubgate")
    }

    /// The request timeout as a [`std::time::Duration`].
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}
