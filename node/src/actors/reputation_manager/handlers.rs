//! Message handlers for `ReputationManager`
use actix::{ActorContext, Context, Handler, Message, MessageResult};

use gxs_util::timestamp::get_timestamp;

use super::ReputationManager;
use crate::actors::messages::{
    BanNode, GetBanThreshold, GetReputationInfo, GetStatistics, InboundSyncItem, IsBanned,
    SetBanThreshold, SetOwnOpinion, Shutdown,
};

impl Handler<SetOwnOpinion> for ReputationManager {
    type Result = MessageResult<SetOwnOpinion>;

    fn handle(&mut self, msg: SetOwnOpinion, _ctx: &mut Context<Self>) -> Self::Result {
        let result = self
            .engine
            .set_own_opinion(msg.persona, msg.opinion, get_timestamp());
        log::debug!(
            "Own opinion about {} set to {:?}: {:?}",
            msg.persona,
            msg.opinion,
            result
        );

        MessageResult(result)
    }
}

impl Handler<GetReputationInfo> for ReputationManager {
    type Result = MessageResult<GetReputationInfo>;

    fn handle(&mut self, msg: GetReputationInfo, _ctx: &mut Context<Self>) -> Self::Result {
        MessageResult(self.engine.get_reputation_info(&msg.persona, msg.owner_node))
    }
}

impl Handler<IsBanned> for ReputationManager {
    type Result = <IsBanned as Message>::Result;

    fn handle(&mut self, msg: IsBanned, _ctx: &mut Context<Self>) -> Self::Result {
        self.engine.is_banned(&msg.persona, msg.owner_node)
    }
}

impl Handler<BanNode> for ReputationManager {
    type Result = <BanNode as Message>::Result;

    fn handle(&mut self, msg: BanNode, _ctx: &mut Context<Self>) -> Self::Result {
        self.engine.ban_node(msg.node, msg.banned)
    }
}

impl Handler<GetBanThreshold> for ReputationManager {
    type Result = <GetBanThreshold as Message>::Result;

    fn handle(&mut self, _msg: GetBanThreshold, _ctx: &mut Context<Self>) -> Self::Result {
        self.engine.ban_threshold()
    }
}

impl Handler<SetBanThreshold> for ReputationManager {
    type Result = <SetBanThreshold as Message>::Result;

    fn handle(&mut self, msg: SetBanThreshold, _ctx: &mut Context<Self>) -> Self::Result {
        self.engine.set_ban_threshold(msg.0);
    }
}

impl Handler<GetStatistics> for ReputationManager {
    type Result = MessageResult<GetStatistics>;

    fn handle(&mut self, _msg: GetStatistics, _ctx: &mut Context<Self>) -> Self::Result {
        MessageResult(self.engine.statistics())
    }
}

impl Handler<InboundSyncItem> for ReputationManager {
    type Result = <InboundSyncItem as Message>::Result;

    fn handle(&mut self, msg: InboundSyncItem, _ctx: &mut Context<Self>) -> Self::Result {
        log::trace!("Queued opinion exchange item from {}", msg.peer);
        self.inbound.push((msg.peer, msg.item));
    }
}

impl Handler<Shutdown> for ReputationManager {
    type Result = <Shutdown as Message>::Result;

    fn handle(&mut self, _msg: Shutdown, ctx: &mut Context<Self>) -> Self::Result {
        log::info!("Shutting down reputation manager");
        ctx.stop();
    }
}
