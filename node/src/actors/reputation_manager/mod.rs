//! # ReputationManager actor
//!
//! This module contains the `ReputationManager` actor, which owns the reputation engine. Every
//! operation on the engine goes through the actor mailbox, so they never overlap. Items received
//! from friends are queued and dispatched by the periodic tick, and the items the engine wants to
//! send are handed to the transport once the tick returns.
use std::{fmt, time::Duration};

use gxs_reputation::{
    collaborators::{FriendRegistry, IdentityDirectory, Persistence, Transport},
    Collaborators, EngineParams, PeerId, ReputationEngine, SyncItem,
};

mod actor;
mod handlers;

/// Services the `ReputationManager` relies on
pub struct ManagerCollaborators {
    /// Owner information of personas
    pub directory: Box<dyn IdentityDirectory>,
    /// Friend list and online status
    pub friends: Box<dyn FriendRegistry>,
    /// Outbound side of the opinion exchange
    pub transport: Box<dyn Transport>,
    /// Durable storage of the engine state
    pub persistence: Box<dyn Persistence>,
}

/// ReputationManager actor
pub struct ReputationManager {
    engine: ReputationEngine,
    collaborators: ManagerCollaborators,
    /// Items received since the last tick
    inbound: Vec<(PeerId, SyncItem)>,
    tick_period: Duration,
}

impl fmt::Debug for ReputationManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReputationManager")
            .field("engine", &self.engine)
            .field("inbound", &self.inbound.len())
            .field("tick_period", &self.tick_period)
            .finish()
    }
}

impl ReputationManager {
    /// Create a manager with an empty engine. The persisted state is loaded when the actor starts.
    pub fn new(
        params: EngineParams,
        tick_period: Duration,
        collaborators: ManagerCollaborators,
    ) -> Self {
        ReputationManager {
            engine: ReputationEngine::new(params),
            collaborators,
            inbound: Vec::new(),
            tick_period,
        }
    }

    /// Read access to the engine
    pub fn engine(&self) -> &ReputationEngine {
        &self.engine
    }

    /// Run one engine tick at `now` and send the resulting items
    fn tick(&mut self, now: i64) {
        let inbound = std::mem::take(&mut self.inbound);
        let mut collaborators = Collaborators {
            directory: self.collaborators.directory.as_ref(),
            friends: self.collaborators.friends.as_ref(),
            persistence: self.collaborators.persistence.as_mut(),
        };

        let outbound = self.engine.tick(now, inbound, &mut collaborators);
        if !outbound.is_empty() {
            log::trace!("Sending {} opinion exchange items", outbound.len());
        }
        for (peer, item) in outbound {
            self.collaborators.transport.send(peer, item);
        }
    }

    /// Persist the engine state, logging failures
    fn persist(&mut self) {
        let result = self.engine.save(
            self.collaborators.persistence.as_mut(),
            self.collaborators.friends.as_ref(),
        );
        if let Err(e) = result {
            log::error!("Failed to save reputation data: {:#}", e);
        }
    }
}
