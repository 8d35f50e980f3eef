//! Per-persona reputation state and the score formula.

use std::{collections::BTreeMap, fmt, ops};

use serde::{Deserialize, Serialize};

use crate::{
    opinion::Opinion,
    types::{NodeId, PeerId},
};

/// Bit set describing what is known about the owner of a persona
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct IdentityFlags(u32);

impl IdentityFlags {
    /// The persona is signed by an owner node
    pub const OWNER_LINKED: IdentityFlags = IdentityFlags(0x1);
    /// The owner node is a known (trusted) node
    pub const OWNER_KNOWN: IdentityFlags = IdentityFlags(0x2);
    /// Owner information must be fetched again from the identity directory
    pub const NEEDS_REFRESH: IdentityFlags = IdentityFlags(0x4);

    /// No flag set
    pub const fn empty() -> Self {
        IdentityFlags(0)
    }

    /// Raw bits, as persisted
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Rebuild from persisted bits, ignoring unknown ones
    pub fn from_bits_truncate(bits: u32) -> Self {
        IdentityFlags(bits & 0x7)
    }

    /// Whether every flag in `other` is set
    pub fn contains(self, other: IdentityFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Set the flags in `other`
    pub fn insert(&mut self, other: IdentityFlags) {
        self.0 |= other.0;
    }

    /// Clear the flags in `other`
    pub fn remove(&mut self, other: IdentityFlags) {
        self.0 &= !other.0;
    }

    /// Set or clear the flags in `other`
    pub fn set(&mut self, other: IdentityFlags, value: bool) {
        if value {
            self.insert(other)
        } else {
            self.remove(other)
        }
    }
}

impl ops::BitOr for IdentityFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        IdentityFlags(self.0 | rhs.0)
    }
}

impl fmt::Display for IdentityFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = [
            (IdentityFlags::OWNER_LINKED, "linked"),
            (IdentityFlags::OWNER_KNOWN, "known"),
            (IdentityFlags::NEEDS_REFRESH, "refresh"),
        ]
        .iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, name)| *name)
        .collect();

        if names.is_empty() {
            f.write_str("-")
        } else {
            f.write_str(&names.join("|"))
        }
    }
}

/// Policy constants of the score formula
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoreParams {
    /// Friend opinion damping for personas whose owner node is known
    pub owner_known_bias: f32,
    /// Friend opinion damping for personas linked to an owner node
    pub owner_linked_bias: f32,
    /// Friend opinion damping for anonymous personas
    pub anonymous_bias: f32,
    /// Scores at or below this value are assessed as bad
    pub kill_threshold: f32,
}

impl Default for ScoreParams {
    fn default() -> Self {
        ScoreParams {
            owner_known_bias: 10.0,
            owner_linked_bias: 5.0,
            anonymous_bias: 2.0,
            kill_threshold: 0.5,
        }
    }
}

/// Aggregated reputation state of one persona
#[derive(Clone, Debug, PartialEq)]
pub struct ReputationRecord {
    /// Local opinion
    pub own_opinion: Opinion,
    /// When the local opinion last changed, 0 if never
    pub own_opinion_ts: i64,
    /// Opinions received from friends. Neutral opinions are never stored.
    pub friend_opinions: BTreeMap<PeerId, Opinion>,
    /// What is known about the owner node
    pub identity_flags: IdentityFlags,
    /// Owner node, once resolved
    pub owner_node: Option<NodeId>,
    friend_average: f32,
    overall_score: f32,
}

impl Default for ReputationRecord {
    fn default() -> Self {
        ReputationRecord {
            own_opinion: Opinion::Neutral,
            own_opinion_ts: 0,
            friend_opinions: BTreeMap::new(),
            identity_flags: IdentityFlags::NEEDS_REFRESH,
            owner_node: None,
            friend_average: 1.0,
            overall_score: 1.0,
        }
    }
}

impl ReputationRecord {
    /// Rebuild a record from its persisted fields. The score stays stale until the store
    /// recomputes it.
    pub(crate) fn restored(
        own_opinion: Opinion,
        own_opinion_ts: i64,
        friend_opinions: BTreeMap<PeerId, Opinion>,
        identity_flags: IdentityFlags,
        owner_node: Option<NodeId>,
    ) -> Self {
        ReputationRecord {
            own_opinion,
            own_opinion_ts,
            friend_opinions,
            identity_flags,
            owner_node,
            ..ReputationRecord::default()
        }
    }

    /// Mean friend opinion, mapped to `[0, 2]`
    pub fn friend_average(&self) -> f32 {
        self.friend_average
    }

    /// Final score, in `[0, 2]`
    pub fn overall_score(&self) -> f32 {
        self.overall_score
    }

    /// A record with no friend opinion and a neutral own opinion carries no information
    pub fn is_empty(&self) -> bool {
        self.friend_opinions.is_empty() && self.own_opinion == Opinion::Neutral
    }

    /// Number of positive and negative friend opinions
    pub fn friend_votes(&self) -> (u32, u32) {
        self.friend_opinions
            .values()
            .fold((0, 0), |(pos, neg), opinion| match opinion {
                Opinion::Positive => (pos + 1, neg),
                Opinion::Negative => (pos, neg + 1),
                Opinion::Neutral => (pos, neg),
            })
    }

    fn bias(&self, params: &ScoreParams) -> f32 {
        if self.identity_flags.contains(IdentityFlags::OWNER_KNOWN) {
            params.owner_known_bias
        } else if self.identity_flags.contains(IdentityFlags::OWNER_LINKED) {
            params.owner_linked_bias
        } else {
            params.anonymous_bias
        }
    }

    /// Recompute `friend_average` and `overall_score` from the current opinions and flags.
    ///
    /// The exponential saturates towards 0 or 2 as more friends agree, while a non-neutral own
    /// opinion always wins.
    pub fn update_reputation(&mut self, params: &ScoreParams) {
        let friend_total: i32 = self.friend_opinions.values().map(|o| o.vote()).sum();
        let bias = self.bias(params);
        let total = friend_total as f32;

        self.friend_average = if self.friend_opinions.is_empty() {
            1.0
        } else if friend_total > 0 {
            2.0 - (-total / bias).exp()
        } else {
            (total / bias).exp()
        };

        self.overall_score = if self.own_opinion != Opinion::Neutral {
            self.own_opinion.ordinal() as f32
        } else {
            self.friend_average
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(n: u8) -> PeerId {
        PeerId([n; 16])
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn single_positive_friend_anonymous() {
        let mut rec = ReputationRecord::default();
        rec.friend_opinions.insert(peer(1), Opinion::Positive);
        rec.update_reputation(&ScoreParams::default());

        assert!(close(rec.friend_average(), 1.3935));
        assert!(close(rec.overall_score(), 1.3935));
    }

    #[test]
    fn own_negative_dominates() {
        let mut rec = ReputationRecord {
            own_opinion: Opinion::Negative,
            ..ReputationRecord::default()
        };
        for i in 1..=50 {
            rec.friend_opinions.insert(peer(i), Opinion::Positive);
        }
        rec.update_reputation(&ScoreParams::default());

        assert_eq!(rec.overall_score(), 0.0);
        assert!(rec.friend_average() > 1.99);
    }

    #[test]
    fn negative_consensus_with_linked_owner() {
        let mut rec = ReputationRecord::default();
        rec.identity_flags = IdentityFlags::OWNER_LINKED;
        rec.friend_opinions.insert(peer(1), Opinion::Negative);
        rec.friend_opinions.insert(peer(2), Opinion::Negative);
        rec.update_reputation(&ScoreParams::default());

        // exp(-2 / 5)
        assert!(close(rec.friend_average(), 0.67032));
    }

    #[test]
    fn known_owner_is_harder_to_swing() {
        let params = ScoreParams::default();
        let mut anonymous = ReputationRecord::default();
        anonymous.identity_flags = IdentityFlags::empty();
        anonymous.friend_opinions.insert(peer(1), Opinion::Negative);
        anonymous.update_reputation(&params);

        let mut known = anonymous.clone();
        known.identity_flags = IdentityFlags::OWNER_KNOWN | IdentityFlags::OWNER_LINKED;
        known.update_reputation(&params);

        assert!(known.overall_score() > anonymous.overall_score());
    }

    #[test]
    fn empty_record_scores_one() {
        let mut rec = ReputationRecord::default();
        rec.update_reputation(&ScoreParams::default());

        assert!(rec.is_empty());
        assert_eq!(rec.friend_average(), 1.0);
        assert_eq!(rec.overall_score(), 1.0);
    }

    #[test]
    fn scores_stay_in_bounds() {
        let params = ScoreParams::default();
        for n in 0..40u8 {
            for opinion in &[Opinion::Negative, Opinion::Positive] {
                let mut rec = ReputationRecord::default();
                for i in 0..n {
                    rec.friend_opinions.insert(peer(i + 1), *opinion);
                }
                rec.update_reputation(&params);

                assert!((0.0..=2.0).contains(&rec.friend_average()));
                assert!((0.0..=2.0).contains(&rec.overall_score()));
            }
        }
    }

    #[test]
    fn flags() {
        let mut flags = IdentityFlags::NEEDS_REFRESH;
        flags.insert(IdentityFlags::OWNER_LINKED);
        assert!(flags.contains(IdentityFlags::OWNER_LINKED));
        flags.set(IdentityFlags::NEEDS_REFRESH, false);
        assert!(!flags.contains(IdentityFlags::NEEDS_REFRESH));
        assert_eq!(flags.to_string(), "linked");
        assert_eq!(IdentityFlags::from_bits_truncate(0xff).bits(), 0x7);
    }

    #[test]
    fn friend_votes() {
        let mut rec = ReputationRecord::default();
        rec.friend_opinions.insert(peer(1), Opinion::Negative);
        rec.friend_opinions.insert(peer(2), Opinion::Positive);
        rec.friend_opinions.insert(peer(3), Opinion::Positive);

        assert_eq!(rec.friend_votes(), (2, 1));
    }
}
