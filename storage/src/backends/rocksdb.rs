//! # Rocksdb storage backend
//!
//! Storage backend that persists data in the file system using a RocksDB database.
use std::path::Path;

use crate::storage::{Result, Storage};

/// Rocksdb backend
pub type Backend = rocksdb::DB;

#[derive(Debug, thiserror::Error)]
#[error("RocksDB error: {0}")]
struct Error(#[source] rocksdb::Error);

/// Open the database at `path`, creating it when missing
pub fn open<P: AsRef<Path>>(path: P) -> Result<Backend> {
    let backend = Backend::open_default(path.as_ref()).map_err(Error)?;
    log::debug!("RocksDB storage opened at {}", path.as_ref().display());

    Ok(backend)
}

impl Storage for Backend {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let result = Backend::get(self, key).map_err(Error)?;
        Ok(result)
    }

    fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        Backend::put(self, key, value).map_err(Error)?;
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        Backend::delete(self, key).map_err(Error)?;
        Ok(())
    }
}
