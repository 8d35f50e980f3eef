use std::sync::Arc;

pub use actix::System;
use actix::{Actor, Addr};

use gxs_config::config::Config;
use gxs_reputation::collaborators::{FriendRegistry, IdentityDirectory, Transport};

use crate::{
    actors::{
        messages::Shutdown,
        reputation_manager::{ManagerCollaborators, ReputationManager},
    },
    storage_mngr::{self, StoragePersistence},
};

/// Services provided by the host application
pub struct NodeServices {
    /// Owner information of personas
    pub directory: Box<dyn IdentityDirectory>,
    /// Friend list and online status
    pub friends: Box<dyn FriendRegistry>,
    /// Outbound side of the opinion exchange
    pub transport: Box<dyn Transport>,
}

/// Function to run the main system.
///
/// The callback receives the address of the reputation manager once it is started, typically to
/// register interrupt handlers that call [`close`](close).
pub fn run<F>(config: Arc<Config>, services: NodeServices, callback: F) -> anyhow::Result<()>
where
    F: FnOnce(Addr<ReputationManager>),
{
    // Init system
    let system = System::new();

    let backend = storage_mngr::create_appropriate_backend(&config.storage)?;
    let params = config.reputation.engine_params();

    // Init actors
    system.block_on(async {
        let collaborators = ManagerCollaborators {
            directory: services.directory,
            friends: services.friends,
            transport: services.transport,
            persistence: Box::new(StoragePersistence::new(backend)),
        };
        let manager =
            ReputationManager::new(params, config.reputation.tick_period, collaborators);
        let addr = manager.start();

        // Call cb function (register interrupt handlers)
        callback(addr);
    });

    // Run system
    system.run().map_err(|error| error.into())
}

/// Function to close the main system. The reputation manager saves its data before the system
/// stops.
pub fn close(addr: &Addr<ReputationManager>) {
    log::info!("Closing node");

    addr.do_send(Shutdown);
}
