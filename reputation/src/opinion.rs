//! Trust opinions and how raw network values are turned into them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ReputationError;

/// Trust judgment about a persona, expressed either locally or by a friend
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Opinion {
    /// The persona should not be trusted
    Negative = 0,
    /// No opinion
    #[default]
    Neutral = 1,
    /// The persona is trusted
    Positive = 2,
}

impl Opinion {
    /// Ordinal value used on the wire and in the score formula
    pub fn ordinal(self) -> u32 {
        self as u32
    }

    /// Contribution of this opinion to the friend total: `-1`, `0` or `+1`
    pub fn vote(self) -> i32 {
        self.ordinal() as i32 - 1
    }

    /// Build an opinion from a raw network value.
    ///
    /// Values above the maximum become `Positive`, matching what existing peers expect.
    pub fn clamped(raw: u32) -> Self {
        match raw {
            0 => Opinion::Negative,
            1 => Opinion::Neutral,
            _ => Opinion::Positive,
        }
    }

    /// Build an opinion from a raw network value following a decoding policy
    pub fn decode(raw: u32, policy: OpinionDecoding) -> Result<Self, ReputationError> {
        match policy {
            OpinionDecoding::Clamp => Ok(Opinion::clamped(raw)),
            OpinionDecoding::Reject if raw > Opinion::Positive.ordinal() => {
                Err(ReputationError::InvalidOpinion(raw))
            }
            OpinionDecoding::Reject => Ok(Opinion::clamped(raw)),
        }
    }
}

impl fmt::Display for Opinion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Opinion::Negative => "negative",
            Opinion::Neutral => "neutral",
            Opinion::Positive => "positive",
        };

        f.write_str(s)
    }
}

/// What to do with opinion values outside `[0, 2]` received from friends
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OpinionDecoding {
    /// Out of range values count as `Positive`
    #[default]
    Clamp,
    /// Out of range values are dropped
    Reject,
}
