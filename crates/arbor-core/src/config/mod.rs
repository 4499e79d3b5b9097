//! Configuration system for arbor.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ArborError, ArborResult};

/// Store backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreProvider {
    #[default]
    Sqlite,
    Memory,
}

impl StoreProvider {
    /// Parse a provider name, case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "sqlite" => Some(Self::Sqlite),
            "memory" | "in-memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

/// Store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Backend type.
    pub provider: StoreProvider,
    /// Database path for the SQLite backend. `:memory:` opens an in-memory
    /// database.
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let arbor_dir = dirs::home_dir()
            .map(|h| h.join(".arbor"))
            .unwrap_or_else(|| PathBuf::from(".arbor"));

        Self {
            provider: StoreProvider::Sqlite,
            path: arbor_dir.join("arbor.db"),
        }
    }
}

impl StoreConfig {
    /// Whether the SQLite backend should use an in-memory database.
    pub fn is_in_memory(&self) -> bool {
        self.path.as_os_str().is_empty() || self.path.as_os_str() == ":memory:"
    }
}

/// Versioning engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersioningConfig {
    /// Prefix of the name given to forked versions; the tag name is appended.
    pub fork_name_prefix: String,
}

impl Default for VersioningConfig {
    fn default() -> Self {
        Self {
            fork_name_prefix: "New version from".to_string(),
        }
    }
}

impl VersioningConfig {
    /// Name for a version forked from `tag_name`.
    pub fn fork_name(&self, tag_name: &str) -> String {
        format!("{} {}", self.fork_name_prefix, tag_name)
    }
}

/// Main arbor configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArborConfig {
    /// Store configuration.
    pub store: StoreConfig,
    /// Versioning configuration.
    pub versioning: VersioningConfig,
}

impl ArborConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<std::path::Path>) -> ArborResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| ArborError::Configuration(e.to_string()))
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| ArborError::Configuration(e.to_string())),
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| ArborError::Configuration(e.to_string())),
            _ => Err(ArborError::Configuration(
                "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
            )),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Unknown provider names are rejected rather than silently defaulted.
    pub fn from_env() -> ArborResult<Self> {
        let mut config = Self::default();

        if let Ok(provider) = std::env::var("ARBOR_STORE_PROVIDER") {
            config.store.provider = StoreProvider::parse(&provider).ok_or_else(|| {
                ArborError::Configuration(format!("Unknown store provider '{}'", provider))
            })?;
        }

        if let Ok(path) = std::env::var("ARBOR_DB_PATH") {
            config.store.path = PathBuf::from(path);
        }

        if let Ok(prefix) = std::env::var("ARBOR_FORK_NAME_PREFIX") {
            config.versioning.fork_name_prefix = prefix;
        }

        Ok(config)
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> ArborConfigBuilder {
        ArborConfigBuilder::default()
    }
}

/// Builder for ArborConfig.
#[derive(Default)]
pub struct ArborConfigBuilder {
    config: ArborConfig,
}

impl ArborConfigBuilder {
    /// Set store provider.
    pub fn provider(mut self, provider: StoreProvider) -> Self {
        self.config.store.provider = provider;
        self
    }

    /// Set database path.
    pub fn db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.store.path = path.into();
        self
    }

    /// Set fork name prefix.
    pub fn fork_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.versioning.fork_name_prefix = prefix.into();
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ArborConfig {
        self.config
    }
}
