//! Delta synchronisation of own opinions between friends
//!
//! A friend asks for every own opinion that changed after a timestamp (its watermark for us), and
//! we answer with one or more bounded batches. Opinions received that way are stored as friend
//! opinions and never re-broadcast.

use serde::{Deserialize, Serialize};

use crate::{
    opinion::{Opinion, OpinionDecoding},
    store::ReputationStore,
    types::{PeerId, PersonaId},
};

/// A bounded set of own opinions sent to a friend
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateBatch {
    /// Most recent opinion timestamp covered by this batch
    pub watermark: i64,
    /// Opinions as raw ordinals
    pub opinions: Vec<(PersonaId, u32)>,
}

/// Items exchanged with friends
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncItem {
    /// Ask for every own opinion changed strictly after `since`
    Request {
        /// Watermark of the requester
        since: i64,
    },
    /// Answer to a request
    Update(UpdateBatch),
}

/// Answer an update request from a friend
pub fn handle_request(
    store: &mut ReputationStore,
    peer: PeerId,
    since: i64,
    now: i64,
    max_items: usize,
) -> Vec<UpdateBatch> {
    store.peer_state_mut(peer).last_query_time = now;

    let max_items = max_items.max(1);
    let mut batches = Vec::new();
    let mut current = UpdateBatch::default();

    for (ts, persona) in store.updates_since(since) {
        let opinion = match store.record(persona) {
            Some(record) => record.own_opinion,
            None if store.withdrawal(persona) == Some(*ts) => Opinion::Neutral,
            None => {
                log::warn!(
                    "Update log entry ({}, {}) has no matching record, skipping",
                    ts,
                    persona
                );
                continue;
            }
        };

        current.opinions.push((*persona, opinion.ordinal()));
        current.watermark = current.watermark.max(*ts);

        if current.opinions.len() >= max_items {
            batches.push(std::mem::take(&mut current));
        }
    }

    if !current.opinions.is_empty() {
        batches.push(current);
    }

    // Something else may still change during this second: let the requester ask for it again
    for batch in batches.iter_mut() {
        if batch.watermark == now {
            batch.watermark -= 1;
        }
    }

    log::debug!(
        "Answering {} with {} batches of opinions newer than {}",
        peer,
        batches.len(),
        since
    );

    batches
}

/// Ingest a batch of opinions received from a friend. Returns the number of opinions that changed
/// the store.
pub fn handle_update(
    store: &mut ReputationStore,
    peer: PeerId,
    batch: &UpdateBatch,
    decoding: OpinionDecoding,
) -> usize {
    let mut changed = 0;

    for (persona, raw) in batch.opinions.iter() {
        let opinion = match Opinion::decode(*raw, decoding) {
            Ok(opinion) => opinion,
            Err(e) => {
                log::warn!("Dropping opinion from {} about {}: {}", peer, persona, e);
                continue;
            }
        };
        if store.update_friend_opinion(peer, *persona, opinion) {
            changed += 1;
        }
    }

    let state = store.peer_state_mut(peer);
    if batch.watermark > state.latest_update_watermark {
        state.latest_update_watermark = batch.watermark;
    }
    store.mark_dirty();

    log::debug!(
        "Received {} opinions from {} ({} changes), watermark {}",
        batch.opinions.len(),
        peer,
        changed,
        batch.watermark
    );

    changed
}
