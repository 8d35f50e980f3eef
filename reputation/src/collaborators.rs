//! Interfaces of the services the engine depends on but does not implement.

use crate::{
    snapshot::ReputationSnapshot,
    sync::SyncItem,
    types::{NodeId, PeerId, PersonaId},
};

/// Owner information about a persona, as reported by the identity directory
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OwnerLink {
    /// The persona is signed by an owner node
    pub is_owner_linked: bool,
    /// The owner node is a known node
    pub is_owner_known: bool,
    /// The owner node, when linked
    pub owner_node: Option<NodeId>,
}

/// Directory of personas and the nodes owning them
pub trait IdentityDirectory {
    /// Owner information of a persona. `None` when the directory cannot answer yet.
    fn resolve_owner(&self, persona: &PersonaId) -> Option<OwnerLink>;

    /// Last time the persona was seen. `None` when unknown.
    fn last_seen_timestamp(&self, persona: &PersonaId) -> Option<i64>;
}

/// Friend list and online status provider
pub trait FriendRegistry {
    /// Every friend
    fn friends(&self) -> Vec<PeerId>;

    /// Friends currently connected
    fn online_peers(&self) -> Vec<PeerId>;

    /// Last time a friend was connected. `None` when never seen.
    fn last_connect_timestamp(&self, peer: &PeerId) -> Option<i64>;
}

/// Outbound side of the transport delivering opinion exchange items
pub trait Transport {
    /// Send an item to a friend. Delivery is not confirmed.
    fn send(&self, peer: PeerId, item: SyncItem);
}

/// Durable storage of the engine state
pub trait Persistence {
    /// Store a snapshot, replacing the previous one
    fn save(&mut self, snapshot: &ReputationSnapshot) -> anyhow::Result<()>;

    /// Read the last stored snapshot, if any
    fn load(&mut self) -> anyhow::Result<Option<ReputationSnapshot>>;
}

/// Persistence keeping the last snapshot in memory
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    /// Last saved snapshot
    pub snapshot: Option<ReputationSnapshot>,
    /// Number of successful saves
    pub saves: usize,
}

impl Persistence for MemoryPersistence {
    fn save(&mut self, snapshot: &ReputationSnapshot) -> anyhow::Result<()> {
        self.snapshot = Some(snapshot.clone());
        self.saves += 1;

        Ok(())
    }

    fn load(&mut self) -> anyhow::Result<Option<ReputationSnapshot>> {
        Ok(self.snapshot.clone())
    }
}
