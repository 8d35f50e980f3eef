//! Persistable image of the engine state.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{
    opinion::Opinion,
    record::{IdentityFlags, ReputationRecord},
    store::{PeerSyncState, ReputationStore},
    types::{NodeId, PeerId, PersonaId},
};

/// Synchronisation state of one friend
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerSyncEntry {
    /// The friend
    pub peer: PeerId,
    /// See `PeerSyncState::latest_update_watermark`
    pub watermark: i64,
    /// See `PeerSyncState::last_query_time`
    pub last_query: i64,
}

/// Reputation state of one persona
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordEntry {
    /// The persona
    pub persona: PersonaId,
    /// Local opinion
    pub own_opinion: Opinion,
    /// When the local opinion last changed
    pub own_opinion_ts: i64,
    /// `IdentityFlags` bits
    pub flags: u32,
    /// Owner node, when resolved
    pub owner_node: Option<NodeId>,
    /// Opinions of friends, sorted by friend
    pub friend_opinions: Vec<(PeerId, Opinion)>,
}

/// Everything the engine persists
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationSnapshot {
    /// Friends synchronisation state, sorted by friend
    pub peers: Vec<PeerSyncEntry>,
    /// Reputation records, sorted by persona. Withdrawn own opinions are kept as entries with a
    /// neutral opinion and no friend opinion.
    pub records: Vec<RecordEntry>,
    /// Owner nodes banned by hand
    pub banned_nodes: Vec<NodeId>,
}

impl ReputationStore {
    /// Build a snapshot, dropping everything that belongs to peers outside `friends`
    pub fn snapshot(&self, friends: &HashSet<PeerId>) -> ReputationSnapshot {
        let mut peers: Vec<_> = self
            .peers
            .iter()
            .filter(|(peer, _)| friends.contains(*peer))
            .map(|(peer, state)| PeerSyncEntry {
                peer: *peer,
                watermark: state.latest_update_watermark,
                last_query: state.last_query_time,
            })
            .collect();
        peers.sort_by_key(|entry| entry.peer);

        let mut records: Vec<_> = self
            .records
            .iter()
            .filter_map(|(persona, record)| {
                let friend_opinions: Vec<_> = record
                    .friend_opinions
                    .iter()
                    .filter(|(peer, _)| friends.contains(*peer))
                    .map(|(peer, opinion)| (*peer, *opinion))
                    .collect();
                if friend_opinions.is_empty()
                    && record.own_opinion == Opinion::Neutral
                    && record.own_opinion_ts == 0
                {
                    return None;
                }

                Some(RecordEntry {
                    persona: *persona,
                    own_opinion: record.own_opinion,
                    own_opinion_ts: record.own_opinion_ts,
                    flags: record.identity_flags.bits(),
                    owner_node: record.owner_node,
                    friend_opinions,
                })
            })
            .chain(self.withdrawn.iter().map(|(persona, ts)| RecordEntry {
                persona: *persona,
                own_opinion: Opinion::Neutral,
                own_opinion_ts: *ts,
                flags: IdentityFlags::NEEDS_REFRESH.bits(),
                owner_node: None,
                friend_opinions: vec![],
            }))
            .collect();
        records.sort_by_key(|entry| entry.persona);

        ReputationSnapshot {
            peers,
            records,
            banned_nodes: self.explicitly_banned_nodes.iter().cloned().collect(),
        }
    }

    /// Replace the store content with a snapshot, dropping everything that belongs to peers
    /// outside `friends`. The update log is rebuilt from the opinion timestamps.
    pub fn load_snapshot(&mut self, snapshot: ReputationSnapshot, friends: &HashSet<PeerId>) {
        self.records.clear();
        self.peers.clear();
        self.update_log.clear();
        self.withdrawn.clear();
        self.banned_nodes.clear();

        for entry in snapshot.peers {
            if !friends.contains(&entry.peer) {
                log::debug!("Dropping sync state of former friend {}", entry.peer);
                continue;
            }
            self.peers.insert(
                entry.peer,
                PeerSyncState {
                    latest_update_watermark: entry.watermark,
                    last_query_time: entry.last_query,
                },
            );
        }

        for entry in snapshot.records {
            if entry.persona.is_null() {
                continue;
            }
            let friend_opinions: BTreeMap<_, _> = entry
                .friend_opinions
                .into_iter()
                .filter(|(peer, opinion)| friends.contains(peer) && *opinion != Opinion::Neutral)
                .collect();
            let record = ReputationRecord::restored(
                entry.own_opinion,
                entry.own_opinion_ts,
                friend_opinions,
                IdentityFlags::from_bits_truncate(entry.flags),
                entry.owner_node,
            );
            if record.is_empty() && record.own_opinion_ts == 0 {
                continue;
            }
            self.insert_record(entry.persona, record);
        }

        self.explicitly_banned_nodes = snapshot.banned_nodes.into_iter().collect();
        self.mark_clean();

        log::info!(
            "Loaded {} reputation records and {} friends sync states",
            self.records.len(),
            self.peers.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn persona(n: u8) -> PersonaId {
        PersonaId([n; 16])
    }

    fn peer(n: u8) -> PeerId {
        PeerId([n; 16])
    }

    fn friends(ids: &[u8]) -> HashSet<PeerId> {
        ids.iter().map(|n| peer(*n)).collect()
    }

    #[test]
    fn round_trip_keeps_records_and_log() {
        let mut store = ReputationStore::default();
        store.set_own_opinion(persona(1), Opinion::Negative, 100);
        store.set_own_opinion(persona(2), Opinion::Positive, 200);
        store.update_friend_opinion(peer(1), persona(2), Opinion::Negative);
        store.update_friend_opinion(peer(1), persona(3), Opinion::Positive);
        store.set_own_opinion(persona(4), Opinion::Positive, 300);
        store.set_own_opinion(persona(4), Opinion::Neutral, 400);
        store.ban_node(NodeId([9; 8]), true);
        store.peer_state_mut(peer(1)).latest_update_watermark = 77;

        let snapshot = store.snapshot(&friends(&[1]));
        let mut loaded = ReputationStore::default();
        loaded.load_snapshot(snapshot.clone(), &friends(&[1]));

        assert_eq!(loaded.snapshot(&friends(&[1])), snapshot);
        assert_eq!(
            loaded.updates_since(0).cloned().collect::<Vec<_>>(),
            store.updates_since(0).cloned().collect::<Vec<_>>()
        );
        assert_eq!(loaded.withdrawal(&persona(4)), Some(400));
        assert_eq!(loaded.watermark(&peer(1)), 77);
        assert!(loaded.is_node_banned(&NodeId([9; 8])));
        assert!(!loaded.is_dirty());
        for (id, record) in store.records() {
            assert_eq!(loaded.record(id), Some(record));
        }
    }

    #[test]
    fn round_trip_keeps_refreshed_flags() {
        let mut store = ReputationStore::default();
        store.set_own_opinion(persona(1), Opinion::Negative, 100);
        store.set_own_opinion(persona(2), Opinion::Positive, 200);
        let record = store.records.get_mut(&persona(1)).unwrap();
        record.identity_flags = IdentityFlags::OWNER_LINKED;
        record.owner_node = Some(NodeId([3; 8]));

        let snapshot = store.snapshot(&friends(&[]));
        let mut loaded = ReputationStore::default();
        loaded.load_snapshot(snapshot.clone(), &friends(&[]));

        assert_eq!(loaded.snapshot(&friends(&[])), snapshot);
        let reloaded = loaded.record(&persona(1)).unwrap();
        assert_eq!(reloaded.identity_flags, IdentityFlags::OWNER_LINKED);
        assert_eq!(reloaded.owner_node, Some(NodeId([3; 8])));
        assert_eq!(
            loaded.record(&persona(2)).unwrap().identity_flags,
            IdentityFlags::NEEDS_REFRESH
        );
    }

    #[test]
    fn former_friends_are_dropped() {
        let mut store = ReputationStore::default();
        store.update_friend_opinion(peer(1), persona(1), Opinion::Positive);
        store.update_friend_opinion(peer(2), persona(1), Opinion::Negative);
        store.update_friend_opinion(peer(2), persona(2), Opinion::Negative);
        store.peer_state_mut(peer(2)).latest_update_watermark = 10;

        let snapshot = store.snapshot(&friends(&[1]));
        assert_eq!(snapshot.peers, vec![]);
        assert_eq!(snapshot.records.len(), 1);
        assert_eq!(
            snapshot.records[0].friend_opinions,
            vec![(peer(1), Opinion::Positive)]
        );

        // The allowlist also applies on load
        let full = store.snapshot(&friends(&[1, 2]));
        let mut loaded = ReputationStore::default();
        loaded.load_snapshot(full, &friends(&[2]));
        assert_eq!(loaded.len(), 2);
        assert!(loaded.peer_state(&peer(2)).is_some());
        assert_eq!(
            loaded.record(&persona(1)).unwrap().friend_opinions.len(),
            1
        );
    }
}
