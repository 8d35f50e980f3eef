//! # Storage Manager
//!
//! This module persists the reputation snapshot into one of the storage backends. The snapshot
//! is encoded with `bincode` and kept under a single key.
use anyhow::Context;

use crate::actors::storage_keys;
use gxs_config::config;
use gxs_reputation::{collaborators::Persistence, snapshot::ReputationSnapshot};
use gxs_storage::{backends, storage};

/// Create the storage backend selected in the configuration
pub fn create_appropriate_backend(
    conf: &config::Storage,
) -> anyhow::Result<Box<dyn storage::Storage>> {
    let backend: Box<dyn storage::Storage> = match conf.backend {
        config::StorageBackend::HashMap => Box::new(backends::hashmap::Backend::new()),
        config::StorageBackend::RocksDB => {
            Box::new(backends::rocksdb::open(conf.db_path.as_path())?)
        }
        config::StorageBackend::NoBackend => Box::new(backends::nobackend::Backend),
    };
    log::info!("Configured {:?} as the storage backend", conf.backend);

    Ok(backend)
}

/// Persistence of the reputation engine on top of a storage backend
pub struct StoragePersistence {
    backend: Box<dyn storage::Storage>,
    key: Vec<u8>,
}

impl StoragePersistence {
    /// Persist under the reputation key
    pub fn new(backend: Box<dyn storage::Storage>) -> Self {
        StoragePersistence {
            backend,
            key: storage_keys::REPUTATION_KEY.to_vec(),
        }
    }
}

impl Persistence for StoragePersistence {
    fn save(&mut self, snapshot: &ReputationSnapshot) -> anyhow::Result<()> {
        let bytes = bincode::serialize(snapshot).context("Failed to encode reputation data")?;
        log::trace!("Writing {} bytes of reputation data", bytes.len());

        self.backend.put(self.key.clone(), bytes)
    }

    fn load(&mut self) -> anyhow::Result<Option<ReputationSnapshot>> {
        match self.backend.get(&self.key)? {
            Some(bytes) => {
                let snapshot =
                    bincode::deserialize(&bytes).context("Failed to decode reputation data")?;
                Ok(Some(snapshot))
            }
            None => Ok(None),
        }
    }
}
