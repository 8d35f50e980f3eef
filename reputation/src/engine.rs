//! The reputation engine: the store, its maintenance timers and the policy values, behind one
//! owner.

use std::{collections::HashSet, time::Duration};

use crate::{
    classifier,
    collaborators::{FriendRegistry, IdentityDirectory, Persistence},
    opinion::{Opinion, OpinionDecoding},
    record::ScoreParams,
    scheduler::{self, MaintenanceScheduler, SchedulerPeriods},
    store::{OpinionUpdate, ReputationInfo, ReputationStatistics, ReputationStore},
    sync::{self, SyncItem},
    types::{NodeId, PeerId, PersonaId},
};

/// Policy values of the engine
#[derive(Clone, Debug, PartialEq)]
pub struct EngineParams {
    /// Negative own opinions on linked personas needed to ban their owner node. 0 disables
    /// automatic bans.
    pub ban_threshold: u32,
    /// Maximum number of opinions per update batch
    pub max_items_per_batch: usize,
    /// What to do with out of range opinions received from friends
    pub opinion_decoding: OpinionDecoding,
    /// Maintenance periods
    pub periods: SchedulerPeriods,
    /// How long a persona absent from the identity directory is remembered
    pub retention: Duration,
    /// How recently a friend must have been connected to count as active
    pub active_friend_window: Duration,
    /// Score formula constants
    pub score: ScoreParams,
}

impl Default for EngineParams {
    fn default() -> Self {
        EngineParams {
            ban_threshold: 2,
            max_items_per_batch: 256,
            opinion_decoding: OpinionDecoding::Clamp,
            periods: SchedulerPeriods::default(),
            retention: Duration::from_secs(35 * 24 * 3600),
            active_friend_window: Duration::from_secs(7 * 24 * 3600),
            score: ScoreParams::default(),
        }
    }
}

/// Services used by a maintenance tick
pub struct Collaborators<'a> {
    /// Owner information of personas
    pub directory: &'a dyn IdentityDirectory,
    /// Friends and their online status
    pub friends: &'a dyn FriendRegistry,
    /// Durable storage
    pub persistence: &'a mut dyn Persistence,
}

/// Reputation engine
#[derive(Debug)]
pub struct ReputationEngine {
    store: ReputationStore,
    scheduler: MaintenanceScheduler,
    params: EngineParams,
    // Set by `load`: the next flag refresh resolves every record again
    resolve_loaded: bool,
}

impl ReputationEngine {
    /// Create an engine with an empty store
    pub fn new(params: EngineParams) -> Self {
        ReputationEngine {
            store: ReputationStore::new(params.score),
            scheduler: MaintenanceScheduler::new(params.periods),
            params,
            resolve_loaded: false,
        }
    }

    /// Replace the store content with the last persisted snapshot.
    ///
    /// A failed or missing load leaves the store empty. Returns whether a snapshot was loaded.
    pub fn load(&mut self, persistence: &mut dyn Persistence, friends: &dyn FriendRegistry) -> bool {
        let allowed: HashSet<_> = friends.friends().into_iter().collect();

        match persistence.load() {
            Ok(Some(snapshot)) => {
                self.store.load_snapshot(snapshot, &allowed);
                self.resolve_loaded = true;
                true
            }
            Ok(None) => {
                log::info!("No reputation data stored yet, starting empty");
                false
            }
            Err(e) => {
                log::error!("Failed to load reputation data, starting empty: {:#}", e);
                self.store = ReputationStore::new(self.params.score);
                false
            }
        }
    }

    /// Run the maintenance activities that are due and dispatch the inbound items.
    ///
    /// Returns the items to send to friends.
    pub fn tick(
        &mut self,
        now: i64,
        inbound: Vec<(PeerId, SyncItem)>,
        collaborators: &mut Collaborators<'_>,
    ) -> Vec<(PeerId, SyncItem)> {
        let mut outbound = Vec::new();

        for (peer, item) in inbound {
            match item {
                SyncItem::Request { since } => {
                    let batches = sync::handle_request(
                        &mut self.store,
                        peer,
                        since,
                        now,
                        self.params.max_items_per_batch,
                    );
                    outbound.extend(
                        batches
                            .into_iter()
                            .map(|batch| (peer, SyncItem::Update(batch))),
                    );
                }
                SyncItem::Update(batch) => {
                    sync::handle_update(
                        &mut self.store,
                        peer,
                        &batch,
                        self.params.opinion_decoding,
                    );
                }
            }
        }

        if self.scheduler.poll_broadcast(now) {
            let online = collaborators.friends.online_peers();
            log::debug!("Asking {} online friends for opinion updates", online.len());
            outbound.extend(online.into_iter().map(|peer| {
                let since = self.store.watermark(&peer);
                (peer, SyncItem::Request { since })
            }));
        }

        if self.scheduler.store_flush_due(now) && self.store.is_dirty() {
            self.flush(now, collaborators);
        }

        if self.scheduler.poll_active_friends(now) {
            self.store.active_friends = scheduler::count_active_friends(
                collaborators.friends,
                now,
                self.params.active_friend_window,
            );
            let allowed: HashSet<_> = collaborators.friends.friends().into_iter().collect();
            scheduler::prune(
                &mut self.store,
                collaborators.directory,
                &allowed,
                now,
                self.params.retention,
            );
        }

        if self.scheduler.poll_flag_refresh(now) {
            if self.resolve_loaded {
                classifier::refresh_all_flags(&mut self.store, collaborators.directory);
                self.resolve_loaded = false;
            } else {
                classifier::refresh_flags(&mut self.store, collaborators.directory);
            }
        }

        if self.scheduler.poll_ban_refresh(now) {
            classifier::refresh_flags(&mut self.store, collaborators.directory);
            classifier::recompute_banned_owner_nodes(&mut self.store, self.params.ban_threshold);
        }

        outbound
    }

    fn flush(&mut self, now: i64, collaborators: &mut Collaborators<'_>) {
        match self.save(collaborators.persistence, collaborators.friends) {
            Ok(()) => self.scheduler.store_flushed(now),
            Err(e) => {
                log::error!("Failed to save reputation data: {:#}", e);
                self.scheduler.store_flush_failed(now);
            }
        }
    }

    /// Persist the store now, whether it changed or not
    pub fn save(
        &mut self,
        persistence: &mut dyn Persistence,
        friends: &dyn FriendRegistry,
    ) -> anyhow::Result<()> {
        let allowed: HashSet<_> = friends.friends().into_iter().collect();
        let snapshot = self.store.snapshot(&allowed);
        persistence.save(&snapshot)?;

        log::debug!("Saved {} reputation records", snapshot.records.len());
        self.store.mark_clean();

        Ok(())
    }

    /// Set the local opinion about a persona
    pub fn set_own_opinion(
        &mut self,
        persona: PersonaId,
        opinion: Opinion,
        now: i64,
    ) -> OpinionUpdate {
        self.store.set_own_opinion(persona, opinion, now)
    }

    /// Reputation of a persona
    pub fn get_reputation_info(
        &self,
        persona: &PersonaId,
        owner_node: Option<NodeId>,
    ) -> ReputationInfo {
        self.store.get_reputation_info(persona, owner_node)
    }

    /// Whether a persona is assessed as bad
    pub fn is_banned(&self, persona: &PersonaId, owner_node: Option<NodeId>) -> bool {
        self.store.is_banned(persona, owner_node)
    }

    /// Whether an owner node is banned
    pub fn is_node_banned(&self, node: &NodeId) -> bool {
        self.store.is_node_banned(node)
    }

    /// Ban or unban an owner node by hand
    pub fn ban_node(&mut self, node: NodeId, banned: bool) -> bool {
        self.store.ban_node(node, banned)
    }

    /// Current automatic ban threshold
    pub fn ban_threshold(&self) -> u32 {
        self.params.ban_threshold
    }

    /// Change the automatic ban threshold. The banned owner nodes are recomputed on the next tick.
    pub fn set_ban_threshold(&mut self, threshold: u32) {
        if threshold != self.params.ban_threshold {
            log::info!(
                "Ban threshold changed from {} to {}",
                self.params.ban_threshold,
                threshold
            );
            self.params.ban_threshold = threshold;
            self.scheduler.force_ban_refresh();
        }
    }

    /// Counters describing the store
    pub fn statistics(&self) -> ReputationStatistics {
        self.store.statistics()
    }

    /// Read access to the store
    pub fn store(&self) -> &ReputationStore {
        &self.store
    }

    /// Maintenance timers
    pub fn scheduler(&self) -> &MaintenanceScheduler {
        &self.scheduler
    }

    /// Policy values in use
    pub fn params(&self) -> &EngineParams {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::{
        collaborators::{MemoryPersistence, OwnerLink},
        snapshot::ReputationSnapshot,
        sync::UpdateBatch,
    };

    #[derive(Default)]
    struct Directory(HashMap<PersonaId, OwnerLink>);

    impl IdentityDirectory for Directory {
        fn resolve_owner(&self, persona: &PersonaId) -> Option<OwnerLink> {
            self.0.get(persona).copied()
        }

        fn last_seen_timestamp(&self, _persona: &PersonaId) -> Option<i64> {
            None
        }
    }

    struct Registry(Vec<PeerId>);

    impl FriendRegistry for Registry {
        fn friends(&self) -> Vec<PeerId> {
            self.0.clone()
        }

        fn online_peers(&self) -> Vec<PeerId> {
            self.0.clone()
        }

        fn last_connect_timestamp(&self, _peer: &PeerId) -> Option<i64> {
            None
        }
    }

    struct FailingPersistence;

    impl Persistence for FailingPersistence {
        fn save(&mut self, _snapshot: &ReputationSnapshot) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }

        fn load(&mut self) -> anyhow::Result<Option<ReputationSnapshot>> {
            anyhow::bail!("corrupted")
        }
    }

    fn persona(n: u8) -> PersonaId {
        PersonaId([n; 16])
    }

    fn peer(n: u8) -> PeerId {
        PeerId([n; 16])
    }

    #[test]
    fn first_tick_broadcasts_requests() {
        let mut engine = ReputationEngine::new(EngineParams::default());
        let directory = Directory::default();
        let registry = Registry(vec![peer(1), peer(2)]);
        let mut persistence = MemoryPersistence::default();
        let mut collaborators = Collaborators {
            directory: &directory,
            friends: &registry,
            persistence: &mut persistence,
        };

        let outbound = engine.tick(1000, vec![], &mut collaborators);
        assert_eq!(
            outbound,
            vec![
                (peer(1), SyncItem::Request { since: 0 }),
                (peer(2), SyncItem::Request { since: 0 }),
            ]
        );
        assert!(engine.tick(1001, vec![], &mut collaborators).is_empty());
    }

    #[test]
    fn inbound_request_is_answered() {
        let mut engine = ReputationEngine::new(EngineParams::default());
        engine.set_own_opinion(persona(1), Opinion::Negative, 500);
        let directory = Directory::default();
        let registry = Registry(vec![]);
        let mut persistence = MemoryPersistence::default();
        let mut collaborators = Collaborators {
            directory: &directory,
            friends: &registry,
            persistence: &mut persistence,
        };

        let outbound = engine.tick(
            1000,
            vec![(peer(1), SyncItem::Request { since: 0 })],
            &mut collaborators,
        );
        assert_eq!(
            outbound,
            vec![(
                peer(1),
                SyncItem::Update(UpdateBatch {
                    watermark: 500,
                    opinions: vec![(persona(1), 0)],
                })
            )]
        );
    }

    #[test]
    fn store_is_flushed_after_the_wait() {
        let mut engine = ReputationEngine::new(EngineParams::default());
        let directory = Directory::default();
        let registry = Registry(vec![peer(1)]);
        let mut persistence = MemoryPersistence::default();

        {
            let mut collaborators = Collaborators {
                directory: &directory,
                friends: &registry,
                persistence: &mut persistence,
            };
            engine.tick(1000, vec![], &mut collaborators);
            let batch = UpdateBatch {
                watermark: 900,
                opinions: vec![(persona(1), 2)],
            };
            engine.tick(
                1010,
                vec![(peer(1), SyncItem::Update(batch))],
                &mut collaborators,
            );
            engine.tick(1179, vec![], &mut collaborators);
        }
        assert_eq!(persistence.saves, 0);

        {
            let mut collaborators = Collaborators {
                directory: &directory,
                friends: &registry,
                persistence: &mut persistence,
            };
            engine.tick(1180, vec![], &mut collaborators);
        }
        assert_eq!(persistence.saves, 1);
        assert!(!engine.store().is_dirty());
        let snapshot = persistence.snapshot.as_ref().unwrap();
        assert_eq!(snapshot.records.len(), 1);
        assert_eq!(snapshot.peers[0].watermark, 900);
    }

    #[test]
    fn failed_save_keeps_data_dirty() {
        let mut engine = ReputationEngine::new(EngineParams::default());
        engine.set_own_opinion(persona(1), Opinion::Positive, 10);
        let directory = Directory::default();
        let registry = Registry(vec![]);
        let mut persistence = FailingPersistence;
        let mut collaborators = Collaborators {
            directory: &directory,
            friends: &registry,
            persistence: &mut persistence,
        };

        engine.tick(1000, vec![], &mut collaborators);
        engine.tick(1180, vec![], &mut collaborators);
        assert!(engine.store().is_dirty());
        // Retried after another wait
        assert_eq!(engine.scheduler().next_store_flush, 1360);
    }

    #[test]
    fn failed_load_starts_empty() {
        let mut engine = ReputationEngine::new(EngineParams::default());
        engine.set_own_opinion(persona(1), Opinion::Positive, 10);
        let registry = Registry(vec![]);

        assert!(!engine.load(&mut FailingPersistence, &registry));
        assert!(engine.store().is_empty());
    }

    #[test]
    fn ban_threshold_change_forces_recompute() {
        let node = NodeId([5; 8]);
        let link = OwnerLink {
            is_owner_linked: true,
            is_owner_known: false,
            owner_node: Some(node),
        };
        let directory = Directory(vec![(persona(1), link)].into_iter().collect());
        let registry = Registry(vec![]);
        let mut persistence = MemoryPersistence::default();
        let mut collaborators = Collaborators {
            directory: &directory,
            friends: &registry,
            persistence: &mut persistence,
        };

        let mut engine = ReputationEngine::new(EngineParams::default());
        engine.set_own_opinion(persona(1), Opinion::Negative, 10);
        engine.tick(1000, vec![], &mut collaborators);
        assert!(!engine.is_node_banned(&node));

        engine.set_ban_threshold(1);
        assert_eq!(engine.ban_threshold(), 1);
        engine.tick(1001, vec![], &mut collaborators);
        assert!(engine.is_node_banned(&node));
        assert!(engine.is_banned(&persona(2), Some(node)));
    }
}
