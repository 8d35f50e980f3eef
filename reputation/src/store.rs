//! Reputation record store
//!
//! Owns every `ReputationRecord`, the per-peer synchronisation state, the update log used to
//! answer delta requests and the banned owner nodes. All the mutations go through methods of
//! `ReputationStore`, so that a record with no friend opinion and a neutral own opinion never
//! survives a public operation.

use std::collections::{btree_map::Entry, BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{
    error::RejectReason,
    opinion::Opinion,
    record::{ReputationRecord, ScoreParams},
    types::{NodeId, PeerId, PersonaId},
};

/// Synchronisation bookkeeping for one friend
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct PeerSyncState {
    /// Most recent own-opinion timestamp of that friend we already know about
    pub latest_update_watermark: i64,
    /// Last time that friend asked us for updates
    pub last_query_time: i64,
}

/// Outcome of a local opinion change
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpinionUpdate {
    /// The store was modified
    Changed,
    /// The opinion was already the requested one
    Unchanged,
    /// Nothing was modified because the input is malformed
    Rejected(RejectReason),
}

impl OpinionUpdate {
    /// Whether the store was modified
    pub fn is_changed(self) -> bool {
        self == OpinionUpdate::Changed
    }
}

/// Coarse verdict about a persona
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Assessment {
    /// Usable
    Ok,
    /// Banned, either directly or through its owner node
    Bad,
}

/// Reputation as seen by callers
#[derive(Clone, Debug, PartialEq)]
pub struct ReputationInfo {
    /// Local opinion
    pub own_opinion: Opinion,
    /// Final score in `[0, 2]`
    pub overall_score: f32,
    /// Friend consensus in `[0, 2]`
    pub friend_average: f32,
    /// Verdict
    pub assessment: Assessment,
    /// Number of friends with a positive opinion
    pub friends_positive_votes: u32,
    /// Number of friends with a negative opinion
    pub friends_negative_votes: u32,
    /// Owner node used for the assessment
    pub owner_node: Option<NodeId>,
}

/// Counters describing the store
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationStatistics {
    /// Number of reputation records
    pub records: usize,
    /// Number of owner nodes banned by the classifier
    pub auto_banned_nodes: usize,
    /// Number of owner nodes banned by hand
    pub explicitly_banned_nodes: usize,
    /// Number of friends with synchronisation state
    pub peers: usize,
    /// Friends seen online recently, as of the last refresh
    pub active_friends: usize,
}

/// Reputation record store
#[derive(Debug, Default)]
pub struct ReputationStore {
    pub(crate) records: HashMap<PersonaId, ReputationRecord>,
    pub(crate) peers: HashMap<PeerId, PeerSyncState>,
    // (own opinion timestamp, persona), ordered by timestamp
    pub(crate) update_log: BTreeSet<(i64, PersonaId)>,
    // Personas whose own opinion was withdrawn and whose record is gone, with the timestamp of
    // the withdrawal. Their update log entry is kept so friends learn about it.
    pub(crate) withdrawn: HashMap<PersonaId, i64>,
    pub(crate) banned_nodes: HashSet<NodeId>,
    pub(crate) explicitly_banned_nodes: BTreeSet<NodeId>,
    pub(crate) active_friends: usize,
    params: ScoreParams,
    dirty: bool,
}

impl ReputationStore {
    /// Create an empty store
    pub fn new(params: ScoreParams) -> Self {
        ReputationStore {
            params,
            ..Default::default()
        }
    }

    /// Score formula constants in use
    pub fn score_params(&self) -> &ScoreParams {
        &self.params
    }

    /// Replace the score formula constants and recompute every record
    pub fn set_score_params(&mut self, params: ScoreParams) {
        self.params = params;
        for record in self.records.values_mut() {
            record.update_reputation(&self.params);
        }
    }

    /// Set the local opinion about a persona, stamped at `now`
    pub fn set_own_opinion(
        &mut self,
        persona: PersonaId,
        opinion: Opinion,
        now: i64,
    ) -> OpinionUpdate {
        if persona.is_null() {
            log::warn!("Refusing to set an opinion on the null persona");
            return OpinionUpdate::Rejected(RejectReason::NullPersona);
        }

        if opinion == Opinion::Neutral && !self.records.contains_key(&persona) {
            return OpinionUpdate::Unchanged;
        }

        let params = self.params;
        let record = self.records.entry(persona).or_default();
        if record.own_opinion == opinion {
            return OpinionUpdate::Unchanged;
        }

        let previous_ts = match self.withdrawn.remove(&persona) {
            Some(ts) => ts,
            None => record.own_opinion_ts,
        };
        if previous_ts != 0 {
            self.update_log.remove(&(previous_ts, persona));
        }

        // Two changes within the same second must not share the log slot of the previous one
        let stamp = if previous_ts == now { now - 1 } else { now };

        record.own_opinion = opinion;
        record.own_opinion_ts = stamp;
        record.update_reputation(&params);
        self.update_log.insert((stamp, persona));

        log::debug!("Own opinion on {} set to {} at {}", persona, opinion, stamp);

        self.drop_if_empty(&persona);
        self.dirty = true;

        OpinionUpdate::Changed
    }

    /// Store the opinion of a friend about a persona. Returns whether the store changed.
    pub fn update_friend_opinion(
        &mut self,
        peer: PeerId,
        persona: PersonaId,
        opinion: Opinion,
    ) -> bool {
        if !self.records.contains_key(&persona) {
            if opinion == Opinion::Neutral {
                return false;
            }
            let record = self.records.entry(persona).or_default();
            // Adopt a pending withdrawal so that its log entry keeps pointing to a record
            if let Some(ts) = self.withdrawn.remove(&persona) {
                record.own_opinion_ts = ts;
            }
        }

        let params = self.params;
        let record = match self.records.get_mut(&persona) {
            Some(record) => record,
            None => return false,
        };

        let changed = match record.friend_opinions.entry(peer) {
            Entry::Vacant(_) if opinion == Opinion::Neutral => false,
            Entry::Vacant(entry) => {
                entry.insert(opinion);
                true
            }
            Entry::Occupied(entry) if opinion == Opinion::Neutral => {
                entry.remove();
                true
            }
            Entry::Occupied(entry) if *entry.get() == opinion => false,
            Entry::Occupied(mut entry) => {
                entry.insert(opinion);
                true
            }
        };

        if changed {
            record.update_reputation(&params);
            log::trace!("Friend {} now rates {} as {}", peer, persona, opinion);
            self.drop_if_empty(&persona);
            self.dirty = true;
        }

        changed
    }

    /// Reputation of a persona. `owner_node` is the owner as known by the caller; when absent, the
    /// owner recorded by the classifier is used.
    pub fn get_reputation_info(
        &self,
        persona: &PersonaId,
        owner_node: Option<NodeId>,
    ) -> ReputationInfo {
        let record = self.records.get(persona);
        let owner_node = owner_node.or_else(|| record.and_then(|r| r.owner_node));
        let node_banned = owner_node.map_or(false, |node| self.is_node_banned(&node));

        let (own_opinion, overall_score, friend_average, (pos, neg)) = match record {
            Some(r) => (
                r.own_opinion,
                r.overall_score(),
                r.friend_average(),
                r.friend_votes(),
            ),
            None => (Opinion::Neutral, 1.0, 1.0, (0, 0)),
        };

        let assessment = if node_banned || overall_score <= self.params.kill_threshold {
            Assessment::Bad
        } else {
            Assessment::Ok
        };

        ReputationInfo {
            own_opinion,
            overall_score,
            friend_average,
            assessment,
            friends_positive_votes: pos,
            friends_negative_votes: neg,
            owner_node,
        }
    }

    /// Whether a persona is assessed as bad
    pub fn is_banned(&self, persona: &PersonaId, owner_node: Option<NodeId>) -> bool {
        self.get_reputation_info(persona, owner_node).assessment == Assessment::Bad
    }

    /// Whether an owner node is banned, automatically or by hand
    pub fn is_node_banned(&self, node: &NodeId) -> bool {
        self.banned_nodes.contains(node) || self.explicitly_banned_nodes.contains(node)
    }

    /// Ban or unban an owner node by hand. Returns whether anything changed.
    pub fn ban_node(&mut self, node: NodeId, banned: bool) -> bool {
        let changed = if banned {
            self.explicitly_banned_nodes.insert(node)
        } else {
            self.explicitly_banned_nodes.remove(&node)
        };
        if changed {
            log::info!(
                "Owner node {} {}",
                node,
                if banned { "banned" } else { "unbanned" }
            );
            self.dirty = true;
        }

        changed
    }

    /// Owner nodes banned by the classifier
    pub fn banned_owner_nodes(&self) -> impl Iterator<Item = &NodeId> {
        self.banned_nodes.iter()
    }

    /// Owner nodes banned by hand
    pub fn explicitly_banned_nodes(&self) -> impl Iterator<Item = &NodeId> {
        self.explicitly_banned_nodes.iter()
    }

    /// Record of a persona, if any
    pub fn record(&self, persona: &PersonaId) -> Option<&ReputationRecord> {
        self.records.get(persona)
    }

    /// Every record in the store
    pub fn records(&self) -> impl Iterator<Item = (&PersonaId, &ReputationRecord)> {
        self.records.iter()
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no record
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Synchronisation state of a friend
    pub fn peer_state(&self, peer: &PeerId) -> Option<&PeerSyncState> {
        self.peers.get(peer)
    }

    /// Watermark to use when asking a friend for updates
    pub fn watermark(&self, peer: &PeerId) -> i64 {
        self.peers
            .get(peer)
            .map_or(0, |state| state.latest_update_watermark)
    }

    /// Number of entries in the update log
    pub fn update_log_len(&self) -> usize {
        self.update_log.len()
    }

    /// Update log entries strictly newer than `since`, oldest first
    pub fn updates_since(&self, since: i64) -> impl Iterator<Item = &(i64, PersonaId)> {
        self.update_log
            .range((since.saturating_add(1), PersonaId::null())..)
    }

    /// Whether there are changes not yet persisted
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Forget that there are changes not yet persisted
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Counters describing the store
    pub fn statistics(&self) -> ReputationStatistics {
        ReputationStatistics {
            records: self.records.len(),
            auto_banned_nodes: self.banned_nodes.len(),
            explicitly_banned_nodes: self.explicitly_banned_nodes.len(),
            peers: self.peers.len(),
            active_friends: self.active_friends,
        }
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn peer_state_mut(&mut self, peer: PeerId) -> &mut PeerSyncState {
        self.peers.entry(peer).or_default()
    }

    /// Timestamp of the withdrawal of the own opinion on a persona that has no record left
    pub fn withdrawal(&self, persona: &PersonaId) -> Option<i64> {
        self.withdrawn.get(persona).copied()
    }

    /// Delete a record that carries no information. A withdrawn own opinion leaves its timestamp
    /// behind so that the update log entry stays answerable.
    fn drop_if_empty(&mut self, persona: &PersonaId) {
        if let Some(record) = self.records.get(persona) {
            if record.is_empty() {
                if record.own_opinion_ts != 0 {
                    self.withdrawn.insert(*persona, record.own_opinion_ts);
                }
                self.records.remove(persona);
            }
        }
    }

    /// Remove a record together with its update log entry
    pub(crate) fn remove_record(&mut self, persona: &PersonaId) -> Option<ReputationRecord> {
        let record = self.records.remove(persona)?;
        if record.own_opinion_ts != 0 {
            self.update_log.remove(&(record.own_opinion_ts, *persona));
        }
        self.dirty = true;

        Some(record)
    }

    /// Forget a withdrawal together with its update log entry
    pub(crate) fn remove_withdrawal(&mut self, persona: &PersonaId) {
        if let Some(ts) = self.withdrawn.remove(persona) {
            self.update_log.remove(&(ts, *persona));
            self.dirty = true;
        }
    }

    /// Insert a record as read from persistence
    pub(crate) fn insert_record(&mut self, persona: PersonaId, mut record: ReputationRecord) {
        record.update_reputation(&self.params);
        if record.own_opinion_ts != 0 {
            self.update_log.insert((record.own_opinion_ts, persona));
        }
        self.records.insert(persona, record);
        self.drop_if_empty(&persona);
    }
}
