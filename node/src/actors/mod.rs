/// Module running system actor
pub mod node;

/// Actor messages module
pub mod messages;

/// Storage keys constants
pub mod storage_keys;

/// ReputationManager actor module
pub mod reputation_manager;
