//! # NoBackend storage backend
//!
//! This backend performs no storage at all and always fails to do any operation.
use anyhow::bail;

use crate::storage::{Result, Storage};

/// A Backend that is not persisted
///
/// This backend fails to perform any operation defined in
/// [`Storage`](Storage)
pub struct Backend;

impl Storage for Backend {
    fn get(&self, _key: &[u8]) -> Result<Option<Vec<u8>>> {
        bail!("This is a no backend storage")
    }

    fn put(&mut self, _key: Vec<u8>, _value: Vec<u8>) -> Result<()> {
        bail!("This is a no backend storage")
    }

    fn delete(&mut self, _key: &[u8]) -> Result<()> {
        bail!("This is a no backend storage")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_operation_fails() {
        let mut storage = Backend;

        assert!(storage.get(b"key").is_err());
        assert!(storage.put(b"key".to_vec(), vec![0]).is_err());
        assert!(storage.delete(b"key").is_err());
    }
}
