//! Maintenance timers and housekeeping passes
//!
//! Every periodic activity of the engine has its own deadline. The engine polls them on each tick,
//! so a slow or skipped tick only delays work, it never runs it twice.

use std::{collections::HashSet, time::Duration};

use crate::{
    collaborators::{FriendRegistry, IdentityDirectory},
    store::ReputationStore,
    types::PeerId,
};

/// Periods of the maintenance activities
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulerPeriods {
    /// Between two broadcasts of update requests to online friends
    pub request: Duration,
    /// Between a broadcast and the next store flush, so that answers are persisted together
    pub store_wait: Duration,
    /// Between two refreshes of the active friends count, which also prune the store
    pub active_friends: Duration,
    /// Between two identity flags refreshes
    pub flag_refresh: Duration,
    /// Between two banned owner nodes recomputations
    pub ban_refresh: Duration,
}

impl Default for SchedulerPeriods {
    fn default() -> Self {
        SchedulerPeriods {
            request: Duration::from_secs(600),
            store_wait: Duration::from_secs(180),
            active_friends: Duration::from_secs(600),
            flag_refresh: Duration::from_secs(100),
            ban_refresh: Duration::from_secs(313),
        }
    }
}

impl SchedulerPeriods {
    /// Whether the flag and ban refreshes would keep firing on the same ticks
    pub fn are_synchronized(&self) -> bool {
        let flag = self.flag_refresh.as_secs();
        let ban = self.ban_refresh.as_secs();
        if flag == 0 || ban == 0 {
            return false;
        }

        flag % ban == 0 || ban % flag == 0
    }
}

pub(crate) fn secs(duration: Duration) -> i64 {
    i64::try_from(duration.as_secs()).unwrap_or(i64::MAX)
}

/// Deadlines of the maintenance activities, as UNIX timestamps
#[derive(Clone, Debug)]
pub struct MaintenanceScheduler {
    periods: SchedulerPeriods,
    /// Next broadcast of update requests
    pub next_broadcast_request: i64,
    /// Earliest time to persist the store
    pub next_store_flush: i64,
    /// Next active friends refresh and prune pass
    pub next_active_friends_refresh: i64,
    /// Next identity flags refresh
    pub next_flag_refresh: i64,
    /// Next banned owner nodes recomputation
    pub next_ban_refresh: i64,
}

impl MaintenanceScheduler {
    /// Create a scheduler with every activity due on the first tick
    pub fn new(periods: SchedulerPeriods) -> Self {
        if periods.are_synchronized() {
            log::warn!(
                "Flag refresh period ({}s) and ban refresh period ({}s) are multiples of each other",
                periods.flag_refresh.as_secs(),
                periods.ban_refresh.as_secs()
            );
        }

        MaintenanceScheduler {
            periods,
            next_broadcast_request: 0,
            next_store_flush: 0,
            next_active_friends_refresh: 0,
            next_flag_refresh: 0,
            next_ban_refresh: 0,
        }
    }

    /// Periods in use
    pub fn periods(&self) -> &SchedulerPeriods {
        &self.periods
    }

    /// Whether requests must be broadcast now. When they must, the next broadcast is rescheduled
    /// and the store flush is delayed to collect the answers.
    pub fn poll_broadcast(&mut self, now: i64) -> bool {
        if now < self.next_broadcast_request {
            return false;
        }
        self.next_broadcast_request = now.saturating_add(secs(self.periods.request));
        self.next_store_flush = now.saturating_add(secs(self.periods.store_wait));

        true
    }

    /// Whether the store may be persisted now
    pub fn store_flush_due(&self, now: i64) -> bool {
        now >= self.next_store_flush
    }

    /// Reschedule the store flush after a successful save
    pub fn store_flushed(&mut self, now: i64) {
        self.next_store_flush = now.saturating_add(secs(self.periods.request));
    }

    /// Reschedule the store flush after a failed save
    pub fn store_flush_failed(&mut self, now: i64) {
        self.next_store_flush = now.saturating_add(secs(self.periods.store_wait));
    }

    /// Whether the active friends count must be refreshed now
    pub fn poll_active_friends(&mut self, now: i64) -> bool {
        if now < self.next_active_friends_refresh {
            return false;
        }
        self.next_active_friends_refresh = now.saturating_add(secs(self.periods.active_friends));

        true
    }

    /// Whether the identity flags must be refreshed now
    pub fn poll_flag_refresh(&mut self, now: i64) -> bool {
        if now < self.next_flag_refresh {
            return false;
        }
        self.next_flag_refresh = now.saturating_add(secs(self.periods.flag_refresh));

        true
    }

    /// Whether the banned owner nodes must be recomputed now
    pub fn poll_ban_refresh(&mut self, now: i64) -> bool {
        if now < self.next_ban_refresh {
            return false;
        }
        self.next_ban_refresh = now.saturating_add(secs(self.periods.ban_refresh));

        true
    }

    /// Make the banned owner nodes recomputation due on the next tick
    pub fn force_ban_refresh(&mut self) {
        self.next_ban_refresh = i64::MIN;
    }
}

/// Number of friends connected within `window` seconds before `now`
pub fn count_active_friends(registry: &dyn FriendRegistry, now: i64, window: Duration) -> usize {
    let since = now.saturating_sub(secs(window));

    registry
        .friends()
        .iter()
        .filter(|peer| {
            registry
                .last_connect_timestamp(peer)
                .map_or(false, |ts| ts >= since)
        })
        .count()
}

/// What a prune pass removed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PruneReport {
    /// Records removed
    pub records: usize,
    /// Withdrawn opinions forgotten
    pub withdrawals: usize,
    /// Synchronisation states of former friends removed
    pub peers: usize,
}

/// Remove what the store no longer needs to keep.
///
/// * records carrying no information
/// * records of personas the directory last saw more than `retention` ago. Personas with an
///   unknown last seen time are kept.
/// * withdrawn opinions older than `retention`
/// * synchronisation state of peers that are not in `friends`
pub fn prune(
    store: &mut ReputationStore,
    directory: &dyn IdentityDirectory,
    friends: &HashSet<PeerId>,
    now: i64,
    retention: Duration,
) -> PruneReport {
    let oldest = now.saturating_sub(secs(retention));
    let mut report = PruneReport::default();

    let stale: Vec<_> = store
        .records
        .iter()
        .filter(|(persona, record)| {
            record.is_empty()
                || directory
                    .last_seen_timestamp(persona)
                    .map_or(false, |ts| ts < oldest)
        })
        .map(|(persona, _)| *persona)
        .collect();
    for persona in stale {
        if store.remove_record(&persona).is_some() {
            log::debug!("Pruned reputation record of {}", persona);
            report.records += 1;
        }
    }

    let expired: Vec<_> = store
        .withdrawn
        .iter()
        .filter(|(_, ts)| **ts < oldest)
        .map(|(persona, _)| *persona)
        .collect();
    for persona in expired {
        store.remove_withdrawal(&persona);
        report.withdrawals += 1;
    }

    let former_friends: Vec<_> = store
        .peers
        .keys()
        .filter(|peer| !friends.contains(*peer))
        .copied()
        .collect();
    for peer in former_friends {
        store.peers.remove(&peer);
        log::debug!("Dropped sync state of former friend {}", peer);
        report.peers += 1;
    }
    if report.peers > 0 {
        store.mark_dirty();
    }

    if report != PruneReport::default() {
        log::info!(
            "Pruned {} records, {} withdrawn opinions and {} former friends",
            report.records,
            report.withdrawals,
            report.peers
        );
    }

    report
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::{collaborators::OwnerLink, opinion::Opinion, types::PersonaId};

    struct Directory(HashMap<PersonaId, i64>);

    impl IdentityDirectory for Directory {
        fn resolve_owner(&self, _persona: &PersonaId) -> Option<OwnerLink> {
            None
        }

        fn last_seen_timestamp(&self, persona: &PersonaId) -> Option<i64> {
            self.0.get(persona).copied()
        }
    }

    struct Registry(Vec<(PeerId, Option<i64>)>);

    impl FriendRegistry for Registry {
        fn friends(&self) -> Vec<PeerId> {
            self.0.iter().map(|(peer, _)| *peer).collect()
        }

        fn online_peers(&self) -> Vec<PeerId> {
            vec![]
        }

        fn last_connect_timestamp(&self, peer: &PeerId) -> Option<i64> {
            self.0
                .iter()
                .find(|(p, _)| p == peer)
                .and_then(|(_, ts)| *ts)
        }
    }

    fn persona(n: u8) -> PersonaId {
        PersonaId([n; 16])
    }

    fn peer(n: u8) -> PeerId {
        PeerId([n; 16])
    }

    #[test]
    fn default_periods_are_staggered() {
        assert!(!SchedulerPeriods::default().are_synchronized());

        let periods = SchedulerPeriods {
            flag_refresh: Duration::from_secs(100),
            ban_refresh: Duration::from_secs(300),
            ..SchedulerPeriods::default()
        };
        assert!(periods.are_synchronized());
    }

    #[test]
    fn everything_is_due_on_first_tick() {
        let mut scheduler = MaintenanceScheduler::new(SchedulerPeriods::default());

        assert!(scheduler.poll_broadcast(1000));
        assert!(scheduler.poll_active_friends(1000));
        assert!(scheduler.poll_flag_refresh(1000));
        assert!(scheduler.poll_ban_refresh(1000));
    }

    #[test]
    fn timers_are_independent() {
        let mut scheduler = MaintenanceScheduler::new(SchedulerPeriods::default());
        scheduler.poll_flag_refresh(1000);
        scheduler.poll_ban_refresh(1000);

        assert!(!scheduler.poll_flag_refresh(1099));
        assert!(scheduler.poll_flag_refresh(1100));
        assert!(!scheduler.poll_ban_refresh(1200));
        assert!(scheduler.poll_ban_refresh(1313));
    }

    #[test]
    fn broadcast_delays_store_flush() {
        let mut scheduler = MaintenanceScheduler::new(SchedulerPeriods::default());
        assert!(scheduler.store_flush_due(1000));

        assert!(scheduler.poll_broadcast(1000));
        assert_eq!(scheduler.next_broadcast_request, 1600);
        assert!(!scheduler.store_flush_due(1179));
        assert!(scheduler.store_flush_due(1180));

        scheduler.store_flushed(1180);
        assert_eq!(scheduler.next_store_flush, 1780);
    }

    #[test]
    fn forced_ban_refresh() {
        let mut scheduler = MaintenanceScheduler::new(SchedulerPeriods::default());
        scheduler.poll_ban_refresh(1000);
        assert!(!scheduler.poll_ban_refresh(1001));

        scheduler.force_ban_refresh();
        assert!(scheduler.poll_ban_refresh(1001));
        assert_eq!(scheduler.next_ban_refresh, 1314);
    }

    #[test]
    fn active_friends_window() {
        let registry = Registry(vec![
            (peer(1), Some(1000)),
            (peer(2), Some(400)),
            (peer(3), None),
        ]);

        assert_eq!(
            count_active_friends(&registry, 1000, Duration::from_secs(500)),
            1
        );
        assert_eq!(
            count_active_friends(&registry, 1000, Duration::from_secs(600)),
            2
        );
    }

    #[test]
    fn prune_removes_stale_records_and_former_friends() {
        let mut store = ReputationStore::default();
        store.update_friend_opinion(peer(1), persona(1), Opinion::Positive);
        store.update_friend_opinion(peer(1), persona(2), Opinion::Positive);
        store.update_friend_opinion(peer(1), persona(3), Opinion::Positive);
        store.set_own_opinion(persona(4), Opinion::Negative, 10);
        store.set_own_opinion(persona(4), Opinion::Neutral, 20);
        store.set_own_opinion(persona(5), Opinion::Negative, 900);
        store.set_own_opinion(persona(5), Opinion::Neutral, 950);
        store.peer_state_mut(peer(1));
        store.peer_state_mut(peer(2));

        let directory = Directory(
            vec![(persona(1), 100), (persona(2), 950)]
                .into_iter()
                .collect(),
        );
        let friends = vec![peer(1)].into_iter().collect();

        let report = prune(&mut store, &directory, &friends, 1000, Duration::from_secs(500));
        assert_eq!(
            report,
            PruneReport {
                records: 1,
                withdrawals: 1,
                peers: 1,
            }
        );
        assert!(store.record(&persona(1)).is_none());
        assert!(store.record(&persona(2)).is_some());
        // Unknown last seen time
        assert!(store.record(&persona(3)).is_some());
        assert_eq!(store.withdrawal(&persona(4)), None);
        assert_eq!(store.withdrawal(&persona(5)), Some(950));
        assert_eq!(store.update_log_len(), 1);
        assert!(store.peer_state(&peer(2)).is_none());
    }
}
