//! Reputation engine
//!
//! Aggregates the opinions of the local user and of friends about pseudonymous personas into a
//! reputation score, exchanges own opinions with friends through a delta synchronisation protocol
//! and bans owner nodes whose personas were rated negatively too often.

#![deny(rust_2018_idioms)]
#![deny(non_upper_case_globals)]
#![deny(non_camel_case_types)]
#![deny(non_snake_case)]
#![deny(unused_mut)]
#![deny(missing_docs)]

pub mod classifier;
pub mod collaborators;
pub mod engine;
/// Module containing error definitions
pub mod error;
pub mod opinion;
pub mod record;
pub mod scheduler;
pub mod snapshot;
pub mod store;
pub mod sync;
pub mod types;

pub use engine::{Collaborators, EngineParams, ReputationEngine};
pub use opinion::{Opinion, OpinionDecoding};
pub use store::{Assessment, OpinionUpdate, ReputationInfo, ReputationStatistics, ReputationStore};
pub use sync::{SyncItem, UpdateBatch};
pub use types::{NodeId, PeerId, PersonaId};
