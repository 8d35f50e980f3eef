use actix::prelude::*;

use gxs_util::timestamp::{get_timestamp, seconds_to_human_string};

use super::ReputationManager;
use crate::utils::stop_system_if_panicking;

/// Implement Actor trait for `ReputationManager`
impl Actor for ReputationManager {
    /// Every actor has to provide execution `Context` in which it can run
    type Context = Context<Self>;

    /// Method to be executed when the actor is started
    fn started(&mut self, ctx: &mut Self::Context) {
        log::debug!("ReputationManager actor has been started!");

        let loaded = self.engine.load(
            self.collaborators.persistence.as_mut(),
            self.collaborators.friends.as_ref(),
        );
        if loaded {
            log::info!(
                "Loaded {} reputation records",
                self.engine.statistics().records
            );
        }

        let periods = self.engine.params().periods;
        log::info!(
            "Requesting opinion updates every {}, maintenance tick every {}",
            seconds_to_human_string(periods.request.as_secs()),
            seconds_to_human_string(self.tick_period.as_secs())
        );

        self.tick(get_timestamp());
        ctx.run_interval(self.tick_period, |act, _ctx| {
            act.tick(get_timestamp());
        });
    }

    /// Save the store before going away
    fn stopping(&mut self, _ctx: &mut Self::Context) -> Running {
        log::debug!("ReputationManager actor is stopping, saving reputation data");
        self.persist();

        Running::Stop
    }

    /// The node has nothing left to do without its reputation manager
    fn stopped(&mut self, _ctx: &mut Self::Context) {
        log::debug!("ReputationManager actor has been stopped");
        System::current().stop();
    }
}

impl Drop for ReputationManager {
    fn drop(&mut self) {
        log::trace!("Dropping ReputationManager");
        stop_system_if_panicking("ReputationManager");
    }
}
