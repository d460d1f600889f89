//! Facade configuration.

use std::path::PathBuf;
use std::time::Duration;

use pruv_registry::DEFAULT_IO_TIMEOUT;

use crate::error::{PruvError, Result};

/// Environment variable naming the SQLite database file.
pub const ENV_DB_PATH: &str = "PRUV_DB_PATH";

/// Environment variable overriding the registry I/O timeout, in milliseconds.
pub const ENV_IO_TIMEOUT_MS: &str = "PRUV_IO_TIMEOUT_MS";

/// Configuration shared by both domain services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruvConfig {
    /// Upper bound on every registry call.
    pub io_timeout: Duration,
    /// SQLite database file. `None` keeps everything in memory.
    pub database_path: Option<PathBuf>,
}

impl Default for PruvConfig {
    fn default() -> Self {
        Self {
            io_timeout: DEFAULT_IO_TIMEOUT,
            database_path: None,
        }
    }
}

impl PruvConfig {
    /// Read `PRUV_DB_PATH` and `PRUV_IO_TIMEOUT_MS`, keeping defaults for
    /// unset variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = lookup(ENV_DB_PATH) {
            let path = path.trim();
            if path.is_empty() {
                return Err(PruvError::Config(format!("{ENV_DB_PATH} is set but empty")));
            }
            config.database_path = Some(PathBuf::from(path));
        }

        if let Some(raw) = lookup(ENV_IO_TIMEOUT_MS) {
            let millis: u64 = raw.trim().parse().map_err(|_| {
                PruvError::Config(format!(
                    "{ENV_IO_TIMEOUT_MS} must be a whole number of milliseconds, got {raw:?}"
                ))
            })?;
            if millis == 0 {
                return Err(PruvError::Config(format!(
                    "{ENV_IO_TIMEOUT_MS} must be greater than zero"
                )));
            }
            config.io_timeout = Duration::from_millis(millis);
        }

        Ok(config)
    }

    pub fn with_database(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = Some(path.into());
        self
    }

    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }
}
