//! Error type definitions for the reputation module.

use thiserror::Error;

/// The error type for operations in the reputation module
#[derive(Debug, PartialEq, Eq, Error)]
pub enum ReputationError {
    /// A textual identifier could not be decoded
    #[error("Invalid {kind} \"{input}\": {msg}")]
    InvalidId {
        /// Name of the identifier type
        kind: &'static str,
        /// The offending input
        input: String,
        /// Decoder message
        msg: String,
    },
    /// Opinion value received from the network is out of range and the
    /// decoding policy rejects it
    #[error("Opinion value {0} is out of range")]
    InvalidOpinion(u32),
}

/// Reason why a local mutation was refused without touching the store
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectReason {
    /// The persona identifier is the all-zero identifier
    NullPersona,
}
