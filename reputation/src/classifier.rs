//! Identity trust classifier
//!
//! Keeps the owner information of every record in line with the identity directory, and derives
//! the owner nodes that are banned because too many of their personas were rated negatively.

use std::collections::{HashMap, HashSet};

use crate::{
    collaborators::IdentityDirectory,
    opinion::Opinion,
    record::IdentityFlags,
    store::ReputationStore,
    types::NodeId,
};

/// Resolve the owner of every record flagged `NEEDS_REFRESH`.
///
/// Records the directory cannot resolve keep the flag and are retried on a later pass. Returns
/// the number of records that were refreshed.
pub fn refresh_flags(store: &mut ReputationStore, directory: &dyn IdentityDirectory) -> usize {
    resolve_owners(store, directory, false)
}

/// Resolve the owner of every record, flagged or not.
///
/// Used once after loading persisted data, since the directory may have changed while the node
/// was down. Records the directory cannot resolve keep the flags they had.
pub fn refresh_all_flags(store: &mut ReputationStore, directory: &dyn IdentityDirectory) -> usize {
    resolve_owners(store, directory, true)
}

fn resolve_owners(
    store: &mut ReputationStore,
    directory: &dyn IdentityDirectory,
    all: bool,
) -> usize {
    let params = *store.score_params();
    let mut refreshed = 0;
    let mut pending = 0;

    for (persona, record) in store.records.iter_mut() {
        if !all && !record.identity_flags.contains(IdentityFlags::NEEDS_REFRESH) {
            continue;
        }

        match directory.resolve_owner(persona) {
            Some(link) => {
                record.identity_flags.remove(IdentityFlags::NEEDS_REFRESH);
                record
                    .identity_flags
                    .set(IdentityFlags::OWNER_LINKED, link.is_owner_linked);
                record
                    .identity_flags
                    .set(IdentityFlags::OWNER_KNOWN, link.is_owner_known);
                record.owner_node = link.owner_node;
                record.update_reputation(&params);
                refreshed += 1;
            }
            None if record.identity_flags.contains(IdentityFlags::NEEDS_REFRESH) => pending += 1,
            None => {}
        }
    }

    if refreshed > 0 {
        store.mark_dirty();
    }
    log::debug!(
        "Identity flags refreshed for {} records, {} still pending",
        refreshed,
        pending
    );

    refreshed
}

/// Rebuild the set of automatically banned owner nodes.
///
/// An owner node is banned when at least `threshold` of its linked personas carry a negative own
/// opinion. A threshold of 0 disables automatic bans. The previous set is replaced as a whole.
pub fn recompute_banned_owner_nodes(store: &mut ReputationStore, threshold: u32) {
    let mut banned = HashSet::new();

    if threshold > 0 {
        let mut negative_counts: HashMap<NodeId, u32> = HashMap::new();
        for record in store.records.values() {
            if !record.identity_flags.contains(IdentityFlags::OWNER_LINKED)
                || record.own_opinion != Opinion::Negative
            {
                continue;
            }
            if let Some(node) = record.owner_node.filter(|node| !node.is_null()) {
                *negative_counts.entry(node).or_default() += 1;
            }
        }

        banned.extend(
            negative_counts
                .into_iter()
                .filter(|(_, count)| *count >= threshold)
                .map(|(node, _)| node),
        );
    }

    for node in banned.difference(&store.banned_nodes) {
        log::info!("Owner node {} is now banned", node);
    }
    for node in store.banned_nodes.difference(&banned) {
        log::info!("Owner node {} is no longer banned", node);
    }

    store.banned_nodes = banned;
}
