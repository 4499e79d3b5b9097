//! Factory for creating store backends.

use std::sync::Arc;

use super::{MemoryStore, SqliteStore, Store};
use crate::config::{StoreConfig, StoreProvider};
use crate::error::ArborResult;

/// Factory for creating store backends.
pub struct StoreFactory;

impl StoreFactory {
    /// Create a store from the given configuration.
    pub fn create(config: &StoreConfig) -> ArborResult<Arc<dyn Store>> {
        match config.provider {
            StoreProvider::Sqlite if config.is_in_memory() => {
                tracing::info!("Using in-memory SQLite store");
                Ok(Arc::new(SqliteStore::in_memory()?))
            }
            StoreProvider::Sqlite => {
                tracing::info!("Using SQLite store at {}", config.path.display());
                Ok(Arc::new(SqliteStore::new(&config.path)?))
            }
            StoreProvider::Memory => {
                tracing::info!("Using in-memory store");
                Ok(Arc::new(MemoryStore::new()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_memory_store() {
        let config = StoreConfig {
            provider: StoreProvider::Memory,
            ..Default::default()
        };
        let store = StoreFactory::create(&config).unwrap();
        assert!(store.list_versions().unwrap().is_empty());
    }

    #[test]
    fn test_create_sqlite_store_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            provider: StoreProvider::Sqlite,
            path: dir.path().join("arbor.db"),
        };

        let store = StoreFactory::create(&config).unwrap();
        store.create_version("Tree", None).unwrap();
        assert!(dir.path().join("arbor.db").exists());
    }
}
