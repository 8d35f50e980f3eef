use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use actix::{Actor, Addr, System};

use gxs_node::{
    actors::{
        messages::{
            BanNode, GetBanThreshold, GetReputationInfo, GetStatistics, InboundSyncItem, IsBanned,
            SetBanThreshold, SetOwnOpinion, Shutdown,
        },
        reputation_manager::ManagerCollaborators,
    },
    collaborators::{NullDirectory, StaticFriends},
    utils::test_actix_system,
    ReputationManager,
};
use gxs_reputation::{
    collaborators::{MemoryPersistence, Persistence, Transport},
    snapshot::ReputationSnapshot,
    EngineParams, NodeId, Opinion, OpinionUpdate, PeerId, PersonaId, SyncItem,
};

type Sent = Arc<Mutex<Vec<(PeerId, SyncItem)>>>;

#[derive(Clone, Default)]
struct RecordingTransport(Sent);

impl Transport for RecordingTransport {
    fn send(&self, peer: PeerId, item: SyncItem) {
        self.0.lock().unwrap().push((peer, item));
    }
}

#[derive(Clone, Default)]
struct SharedPersistence(Arc<Mutex<MemoryPersistence>>);

impl Persistence for SharedPersistence {
    fn save(&mut self, snapshot: &ReputationSnapshot) -> anyhow::Result<()> {
        self.0.lock().unwrap().save(snapshot)
    }

    fn load(&mut self) -> anyhow::Result<Option<ReputationSnapshot>> {
        self.0.lock().unwrap().load()
    }
}

fn friend() -> PeerId {
    PeerId([2; 16])
}

fn manager(
    transport: RecordingTransport,
    persistence: SharedPersistence,
    tick_period: Duration,
) -> ReputationManager {
    ReputationManager::new(
        EngineParams::default(),
        tick_period,
        ManagerCollaborators {
            directory: Box::new(NullDirectory),
            friends: Box::new(StaticFriends::new(vec![friend()])),
            transport: Box::new(transport),
            persistence: Box::new(persistence),
        },
    )
}

fn start(transport: RecordingTransport, tick_period: Duration) -> Addr<ReputationManager> {
    manager(transport, SharedPersistence::default(), tick_period).start()
}

#[test]
fn local_operations() {
    test_actix_system(|| async {
        let addr = start(RecordingTransport::default(), Duration::from_secs(60));
        let persona = PersonaId([1; 16]);

        let update = addr
            .send(SetOwnOpinion {
                persona,
                opinion: Opinion::Negative,
            })
            .await
            .unwrap();
        assert_eq!(update, OpinionUpdate::Changed);

        let info = addr
            .send(GetReputationInfo {
                persona,
                owner_node: None,
            })
            .await
            .unwrap();
        assert_eq!(info.own_opinion, Opinion::Negative);
        assert_eq!(info.overall_score, 0.0);

        let banned = addr
            .send(IsBanned {
                persona,
                owner_node: None,
            })
            .await
            .unwrap();
        assert!(banned);

        let node = NodeId([5; 8]);
        assert!(addr.send(BanNode { node, banned: true }).await.unwrap());
        assert!(!addr.send(BanNode { node, banned: true }).await.unwrap());

        addr.send(SetBanThreshold(5)).await.unwrap();
        assert_eq!(addr.send(GetBanThreshold).await.unwrap(), 5);

        let stats = addr.send(GetStatistics).await.unwrap();
        assert_eq!(stats.records, 1);
        assert_eq!(stats.explicitly_banned_nodes, 1);
    });
}

#[test]
fn requests_updates_on_start() {
    test_actix_system(|| async {
        let transport = RecordingTransport::default();
        let addr = start(transport.clone(), Duration::from_secs(60));

        // Any answer means the actor has started
        addr.send(GetStatistics).await.unwrap();

        let sent = transport.0.lock().unwrap().clone();
        assert_eq!(sent, vec![(friend(), SyncItem::Request { since: 0 })]);
    });
}

#[test]
fn inbound_items_are_handled_on_tick() {
    test_actix_system(|| async {
        let transport = RecordingTransport::default();
        let addr = start(transport.clone(), Duration::from_millis(20));
        let persona = PersonaId([1; 16]);

        addr.send(SetOwnOpinion {
            persona,
            opinion: Opinion::Positive,
        })
        .await
        .unwrap();
        addr.send(InboundSyncItem {
            peer: friend(),
            item: SyncItem::Request { since: 0 },
        })
        .await
        .unwrap();

        actix::clock::sleep(Duration::from_millis(200)).await;

        let sent = transport.0.lock().unwrap().clone();
        let answered = sent.iter().any(|(peer, item)| {
            *peer == friend()
                && matches!(item, SyncItem::Update(batch) if batch.opinions == vec![(persona, 2)])
        });
        assert!(answered, "no update sent, got {:?}", sent);
    });
}

#[test]
fn shutdown_saves_the_store() {
    let persistence = SharedPersistence::default();
    let persona = PersonaId([3; 16]);

    let system = System::new();
    system.block_on(async {
        let addr = manager(
            RecordingTransport::default(),
            persistence.clone(),
            Duration::from_secs(60),
        )
        .start();
        addr.send(SetOwnOpinion {
            persona,
            opinion: Opinion::Negative,
        })
        .await
        .unwrap();
        addr.do_send(Shutdown);
    });
    system.run().unwrap();

    let saved = persistence.0.lock().unwrap().snapshot.clone().unwrap();
    assert_eq!(saved.records.len(), 1);
    assert_eq!(saved.records[0].persona, persona);
    assert_eq!(saved.records[0].own_opinion, Opinion::Negative);
}

#[test]
fn persisted_state_is_loaded_on_start() {
    let persistence = SharedPersistence::default();
    let persona = PersonaId([4; 16]);

    // First run
    let system = System::new();
    system.block_on(async {
        let addr = manager(
            RecordingTransport::default(),
            persistence.clone(),
            Duration::from_secs(60),
        )
        .start();
        addr.send(SetOwnOpinion {
            persona,
            opinion: Opinion::Positive,
        })
        .await
        .unwrap();
        addr.do_send(Shutdown);
    });
    system.run().unwrap();

    // Second run
    let persistence_2 = persistence.clone();
    test_actix_system(move || async move {
        let addr = manager(
            RecordingTransport::default(),
            persistence_2,
            Duration::from_secs(60),
        )
        .start();

        let info = addr
            .send(GetReputationInfo {
                persona,
                owner_node: None,
            })
            .await
            .unwrap();
        assert_eq!(info.own_opinion, Opinion::Positive);
    });
}
