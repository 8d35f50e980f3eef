//! Generic trait that can be implemented for different specific storage backends.

/// Result type of every storage operation
pub type Result<T> = anyhow::Result<T>;

/// This is a generic trait that exposes a very simple key/value CRUD API for data storage.
/// This trait can be easily implemented for any specific storage backend solution (databases,
/// volatile memory, flat files, etc.)
pub trait Storage {
    /// Retrieve an entry from the storage, identified by its key.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Create / update entries in the storage, identified by a key.
    fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<()>;

    /// Delete an entry from the storage, identified by its key.
    fn delete(&mut self, key: &[u8]) -> Result<()>;
}
