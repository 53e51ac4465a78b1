//! Service configuration, read from `oms.toml`.
//!
//! ```toml
//! [resolver]
//! max_rows = 1000
//! max_batch_size = 100
//! timeout_ms = 30000
//! cache_ttl_secs = 300
//!
//! [tabular]
//! data_root = "/srv/oms/data"
//!
//! [relational]
//! database_path = "/srv/oms/hockey.db"
//!
//! [audit]
//! enabled = true
//! ```

use crate::error::ConfigError;
use oms_resolver::ResolverConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OmsConfig {
    pub resolver: ResolverSection,
    pub tabular: TabularSection,
    pub relational: RelationalSection,
    pub audit: AuditSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverSection {
    pub max_rows: usize,
    pub max_batch_size: usize,
    pub timeout_ms: u64,
    pub cache_ttl_secs: u64,
}

impl Default for ResolverSection {
    fn default() -> Self {
        let defaults = ResolverConfig::default();
        Self {
            max_rows: defaults.max_rows,
            max_batch_size: defaults.max_batch_size,
            timeout_ms: u64::try_from(defaults.timeout.as_millis()).unwrap_or(u64::MAX),
            cache_ttl_secs: defaults.cache_ttl.as_secs(),
        }
    }
}

/// Root directory that tabular locators resolve against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TabularSection {
    pub data_root: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationalSection {
    pub database_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditSection {
    pub enabled: bool,
}

impl Default for AuditSection {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl OmsConfig {
    /// Loads configuration from `path`. A missing file yields the defaults.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            info!("No config file found at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let config: Self = toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.validate()?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let r = &self.resolver;
        if r.max_rows == 0 {
            return Err(ConfigError::Invalid("resolver.max_rows must be positive".into()));
        }
        if r.max_batch_size == 0 {
            return Err(ConfigError::Invalid(
                "resolver.max_batch_size must be positive".into(),
            ));
        }
        if r.timeout_ms == 0 {
            return Err(ConfigError::Invalid("resolver.timeout_ms must be positive".into()));
        }
        Ok(())
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            max_rows: self.resolver.max_rows,
            max_batch_size: self.resolver.max_batch_size,
            timeout: Duration::from_millis(self.resolver.timeout_ms),
            cache_ttl: Duration::from_secs(self.resolver.cache_ttl_secs),
        }
    }
}
