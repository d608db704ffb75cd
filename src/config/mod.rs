//! Configuration management for brd-api
//!
//! Handles configuration loading (TOML or JSON), defaults, and validation.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::module::builtin;
use crate::module::CapabilityDomain;
use crate::storage::database::DatabaseBackend;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("Failed to parse config file {0}: {1}")]
    Parse(PathBuf, String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// One optional capability declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySpec {
    /// Human-readable capability name (unique across domains)
    pub name: String,

    /// Stable locator used for resolution
    pub locator: String,

    /// Disabled capabilities are reported unavailable without resolution
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl CapabilitySpec {
    pub fn new(name: impl Into<String>, locator: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            locator: locator.into(),
            enabled: true,
        }
    }
}

/// Optional capabilities grouped into the two fixed domains
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitiesConfig {
    /// App-domain capabilities (mounted first, in this order)
    #[serde(default = "default_app_capabilities")]
    pub app: Vec<CapabilitySpec>,

    /// Integration-domain capabilities (mounted after app, in this order)
    #[serde(default = "default_integration_capabilities")]
    pub integration: Vec<CapabilitySpec>,
}

fn default_app_capabilities() -> Vec<CapabilitySpec> {
    vec![
        CapabilitySpec::new("ingest", builtin::INGEST),
        CapabilitySpec::new("review", builtin::REVIEW),
        CapabilitySpec::new("brd", builtin::BRD),
    ]
}

fn default_integration_capabilities() -> Vec<CapabilitySpec> {
    vec![
        CapabilitySpec::new("gmail", builtin::GMAIL),
        CapabilitySpec::new("slack", builtin::SLACK),
        CapabilitySpec::new("pdf", builtin::PDF),
    ]
}

impl Default for CapabilitiesConfig {
    fn default() -> Self {
        Self {
            app: default_app_capabilities(),
            integration: default_integration_capabilities(),
        }
    }
}

impl CapabilitiesConfig {
    /// Specs for one domain
    pub fn domain(&self, domain: CapabilityDomain) -> &[CapabilitySpec] {
        match domain {
            CapabilityDomain::App => &self.app,
            CapabilityDomain::Integration => &self.integration,
        }
    }
}

/// Database backend selection (serializable)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackendConfig {
    #[default]
    Redb,
    Sled,
}

impl From<DatabaseBackendConfig> for DatabaseBackend {
    fn from(config: DatabaseBackendConfig) -> Self {
        match config {
            DatabaseBackendConfig::Redb => DatabaseBackend::Redb,
            DatabaseBackendConfig::Sled => DatabaseBackend::Sled,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the database files
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Preferred backend; the other compiled-in backend is the fallback
    #[serde(default)]
    pub backend: DatabaseBackendConfig,
}

fn default_data_dir() -> String {
    "data".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            backend: DatabaseBackendConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log filter (e.g. "info", "brd_api=debug"); RUST_LOG takes precedence
    #[serde(default)]
    pub filter: Option<String>,

    /// Emit JSON log lines (requires the `json-logging` feature)
    #[serde(default)]
    pub json_format: bool,
}

/// Service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service display name, used in the health message
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Address the listener binds to
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: Option<LoggingConfig>,

    /// Optional capabilities
    #[serde(default)]
    pub capabilities: CapabilitiesConfig,
}

fn default_true() -> bool {
    true
}

fn default_service_name() -> String {
    "BRD Generation API".to_string()
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8000))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            listen_addr: default_listen_addr(),
            storage: StorageConfig::default(),
            logging: None,
            capabilities: CapabilitiesConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a TOML or JSON file (chosen by extension)
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;

        let config: ServiceConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&contents)
                .map_err(|e| ConfigError::Parse(path.to_path_buf(), e.to_string()))?,
            _ => toml::from_str(&contents)
                .map_err(|e| ConfigError::Parse(path.to_path_buf(), e.to_string()))?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.trim().is_empty() {
            return Err(ConfigError::Invalid("service_name cannot be empty".to_string()));
        }
        if self.storage.data_dir.trim().is_empty() {
            return Err(ConfigError::Invalid("storage.data_dir cannot be empty".to_string()));
        }

        let mut names = HashSet::new();
        for spec in self
            .capabilities
            .app
            .iter()
            .chain(self.capabilities.integration.iter())
        {
            if spec.name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "Capability with locator '{}' has an empty name",
                    spec.locator
                )));
            }
            if spec.locator.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "Capability '{}' has an empty locator",
                    spec.name
                )));
            }
            if !names.insert(spec.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "Duplicate capability name: {}",
                    spec.name
                )));
            }
        }

        Ok(())
    }
}
