//! Simple implementations of the engine collaborators. They let the node run on its own, with a
//! fixed list of friends and without any identity directory or network.
use gxs_reputation::{
    collaborators::{FriendRegistry, IdentityDirectory, OwnerLink, Transport},
    PeerId, PersonaId, SyncItem,
};
use gxs_util::timestamp::get_timestamp;

/// Fixed friend list. Every friend is considered online and connected right now.
#[derive(Clone, Debug, Default)]
pub struct StaticFriends {
    peers: Vec<PeerId>,
}

impl StaticFriends {
    /// Registry holding the given friends
    pub fn new(peers: Vec<PeerId>) -> Self {
        StaticFriends { peers }
    }
}

impl FriendRegistry for StaticFriends {
    fn friends(&self) -> Vec<PeerId> {
        self.peers.clone()
    }

    fn online_peers(&self) -> Vec<PeerId> {
        self.peers.clone()
    }

    fn last_connect_timestamp(&self, peer: &PeerId) -> Option<i64> {
        if self.peers.contains(peer) {
            Some(get_timestamp())
        } else {
            None
        }
    }
}

/// Directory that knows no persona. Identity flags stay pending and personas are never pruned
/// for being stale.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullDirectory;

impl IdentityDirectory for NullDirectory {
    fn resolve_owner(&self, _persona: &PersonaId) -> Option<OwnerLink> {
        None
    }

    fn last_seen_timestamp(&self, _persona: &PersonaId) -> Option<i64> {
        None
    }
}

/// Transport that only logs the outbound items
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingTransport;

impl Transport for LoggingTransport {
    fn send(&self, peer: PeerId, item: SyncItem) {
        match item {
            SyncItem::Request { since } => {
                log::info!("-> {}: update request since {}", peer, since)
            }
            SyncItem::Update(batch) => log::info!(
                "-> {}: {} opinions up to {}",
                peer,
                batch.opinions.len(),
                batch.watermark
            ),
        }
    }
}
