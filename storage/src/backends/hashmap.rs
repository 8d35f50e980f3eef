//! # HashMap storage backend
//!
//! Storage backend that keeps data in a heap-allocated HashMap. Everything is lost when the
//! process exits.
use std::collections::HashMap;

use crate::storage::{Result, Storage};

/// HashMap backend
pub type Backend = HashMap<Vec<u8>, Vec<u8>>;

impl Storage for Backend {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(Backend::get(self, key).cloned())
    }

    fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        Backend::insert(self, key, value);
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        Backend::remove(self, key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hashmap() {
        let mut storage: Box<dyn Storage> = Box::new(Backend::new());

        assert_eq!(None, storage.get(b"reputation").unwrap());
        storage
            .put(b"reputation".to_vec(), vec![1, 2, 3])
            .unwrap();
        assert_eq!(Some(vec![1, 2, 3]), storage.get(b"reputation").unwrap());
        storage.put(b"reputation".to_vec(), vec![4]).unwrap();
        assert_eq!(Some(vec![4]), storage.get(b"reputation").unwrap());
        storage.delete(b"reputation").unwrap();
        assert_eq!(None, storage.get(b"reputation").unwrap());
        // Deleting a missing key is not an error
        storage.delete(b"reputation").unwrap();
    }
}
