//! Cart store configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use marketplace_storage::storage_key;
use serde::{Deserialize, Serialize};

/// Cart store configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CartConfig {
    /// Where the snapshot lives.
    #[serde(default)]
    pub storage: StorageConfig,

    /// How persistence failures are handled.
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl CartConfig {
    /// Load config from a file.
    ///
    /// `.json` files are parsed as JSON, anything else as TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display()))
        }
    }
}

/// Snapshot location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Key namespace (default: `@CustomMarketplace`).
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Collection name within the namespace (default: `products`).
    #[serde(default = "default_collection")]
    pub collection: String,

    /// File used by file-backed stores.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    /// The fixed key the cart snapshot is stored under.
    pub fn key(&self) -> String {
        storage_key!(self.namespace.as_str(), self.collection)
    }
}

fn default_namespace() -> String {
    "@CustomMarketplace".to_string()
}

fn default_collection() -> String {
    "products".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            collection: default_collection(),
            path: None,
        }
    }
}

/// What to do when the durable store misbehaves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Log a warning and carry on with in-memory state.
    #[default]
    Log,
    /// Return the error to the caller.
    Propagate,
}

/// Failure handling for each persistence path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Snapshot write after a mutation.
    #[serde(default)]
    pub write_failure: FailurePolicy,

    /// Snapshot read during hydration.
    #[serde(default)]
    pub read_failure: FailurePolicy,

    /// Stored snapshot that doesn't parse as a cart.
    #[serde(default)]
    pub malformed_snapshot: FailurePolicy,
}

impl PersistenceConfig {
    /// Propagate every failure.
    pub fn strict() -> Self {
        Self {
            write_failure: FailurePolicy::Propagate,
            read_failure: FailurePolicy::Propagate,
            malformed_snapshot: FailurePolicy::Propagate,
        }
    }
}
