
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::models::Category;
use crate::ports::CategoryRule;
use crate::types::BankId;

const DEFAULT_MAX_DAYS: i64 = 90;
const FIO_MAX_DAYS: i64 = 90;
const DEFAULT_PORT_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config error: unable to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error
    },
    #[error("Config error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Config error: {0}")]
    Invalid(String)
}

/// Settings shared by the services.
///
/// Every field has a default, so an empty document (or no file at all) is a valid config.
/// A `bank_max_days` table replaces the built-in one rather than extending it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Widest import range, in days, for banks without their own entry.
    pub default_max_days: i64,
    /// Widest import range per bank identifier, matched case-insensitively.
    pub bank_max_days: HashMap<BankId, i64>,
    /// Deadline for every call to an external provider.
    pub port_timeout_ms: u64,
    /// Categories seeded into the category repository.
    pub categories: Vec<Category>,
    /// Rules for the keyword categorizer.
    pub rules: Vec<CategoryRule>
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            default_max_days: DEFAULT_MAX_DAYS,
            bank_max_days: HashMap::from([("fio".to_string(), FIO_MAX_DAYS)]),
            port_timeout_ms: DEFAULT_PORT_TIMEOUT_MS,
            categories: Vec::new(),
            rules: Vec::new()
        }
    }
}

impl SyncConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let mut config: SyncConfig = toml::from_str(content)?;

        config.bank_max_days = config.bank_max_days.into_iter()
            .map(|(bank_id, days)| (bank_id.trim().to_lowercase(), days))
            .collect();

        config.validate()?;
        Ok(config)
    }

    /// Loads the config file, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content),
            Err(error) if error.kind() == ErrorKind::NotFound => {
                debug!("No config at [{}], using defaults", path.display());
                Ok(Self::default())
            },
            Err(source) => Err(ConfigError::Io {
                path: path.display().to_string(),
                source
            })
        }
    }

    pub fn max_days_for(&self, bank_id: &str) -> i64 {
        self.bank_max_days.get(&bank_id.trim().to_lowercase())
            .copied()
            .unwrap_or(self.default_max_days)
    }

    pub fn port_timeout(&self) -> Duration {
        Duration::from_millis(self.port_timeout_ms)
    }

    pub fn with_port_timeout(mut self, timeout: Duration) -> Self {
        self.port_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_max_days < 0 {
            return Err(ConfigError::Invalid(format!("default_max_days must not be negative, got {}", self.default_max_days)));
        }

        if let Some((bank_id, days)) = self.bank_max_days.iter().find(|(_, days)| **days < 0) {
            return Err(ConfigError::Invalid(format!("bank_max_days.{bank_id} must not be negative, got {days}")));
        }

        if self.port_timeout_ms == 0 {
            return Err(ConfigError::Invalid("port_timeout_ms must be greater than zero".to_string()));
        }

        Ok(())
    }
}
