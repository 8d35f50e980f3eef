use actix::Message;

use gxs_reputation::{
    NodeId, Opinion, OpinionUpdate, PeerId, PersonaId, ReputationInfo, ReputationStatistics,
    SyncItem,
};

////////////////////////////////////////////////////////////////////////////////////////
// MESSAGES FROM LOCAL USERS
////////////////////////////////////////////////////////////////////////////////////////

/// Set the local opinion about a persona, timestamped with the current time
pub struct SetOwnOpinion {
    /// Persona being rated
    pub persona: PersonaId,
    /// New opinion
    pub opinion: Opinion,
}

impl Message for SetOwnOpinion {
    type Result = OpinionUpdate;
}

/// Ask for the reputation of a persona
pub struct GetReputationInfo {
    /// Persona
    pub persona: PersonaId,
    /// Owner node of the persona, when the caller knows it
    pub owner_node: Option<NodeId>,
}

impl Message for GetReputationInfo {
    type Result = ReputationInfo;
}

/// Ask whether a persona is assessed as bad
pub struct IsBanned {
    /// Persona
    pub persona: PersonaId,
    /// Owner node of the persona, when the caller knows it
    pub owner_node: Option<NodeId>,
}

impl Message for IsBanned {
    type Result = bool;
}

/// Ban or unban an owner node by hand
pub struct BanNode {
    /// Owner node
    pub node: NodeId,
    /// `true` to ban, `false` to lift the ban
    pub banned: bool,
}

impl Message for BanNode {
    /// Whether the explicit ban list changed
    type Result = bool;
}

/// Ask for the automatic ban threshold
pub struct GetBanThreshold;

impl Message for GetBanThreshold {
    type Result = u32;
}

/// Change the automatic ban threshold
pub struct SetBanThreshold(pub u32);

impl Message for SetBanThreshold {
    type Result = ();
}

/// Ask for the counters describing the store
pub struct GetStatistics;

impl Message for GetStatistics {
    type Result = ReputationStatistics;
}

/// Stop the manager. The store is saved and the actor system stops with it.
pub struct Shutdown;

impl Message for Shutdown {
    type Result = ();
}

////////////////////////////////////////////////////////////////////////////////////////
// MESSAGES FROM THE TRANSPORT
////////////////////////////////////////////////////////////////////////////////////////

/// Opinion exchange item received from a friend. It is queued and dispatched on the next tick.
pub struct InboundSyncItem {
    /// Sender
    pub peer: PeerId,
    /// Received item
    pub item: SyncItem,
}

impl Message for InboundSyncItem {
    type Result = ();
}
