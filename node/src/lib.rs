//! node

#![deny(rust_2018_idioms)]
#![deny(non_upper_case_globals)]
#![deny(non_camel_case_types)]
#![deny(non_snake_case)]
#![deny(unused_mut)]
#![deny(missing_docs)]

/// Actors module
pub mod actors;

/// Collaborators used when no host application provides its own
pub mod collaborators;

/// Storage backed persistence of the reputation data
pub mod storage_mngr;

/// Utilities for actor behaviour
pub mod utils;

pub use actors::reputation_manager::ReputationManager;
