//! # Default per-environment values
//!
//! This module contains per-environment default values for the reputation node params.
use std::{path::PathBuf, time::Duration};

use gxs_reputation::{OpinionDecoding, PeerId};

use crate::{config::StorageBackend, dirs};

// The flag and ban refresh periods must never be multiples of each other, otherwise both passes
// keep running on the same tick.

/// Trait defining all the configuration params that have a suitable default value depending on
/// the environment.
pub trait Defaults {
    /// Default log level
    fn log_level(&self) -> log::LevelFilter {
        log::LevelFilter::Info
    }

    /// Default storage backend
    fn storage_backend(&self) -> StorageBackend {
        StorageBackend::RocksDB
    }

    /// Default path for the database
    fn storage_db_path(&self) -> PathBuf;

    /// Default period of the update requests broadcast: 10 minutes
    fn reputation_request_period(&self) -> Duration {
        Duration::from_secs(600)
    }

    /// Default wait between a broadcast and the store flush: 3 minutes
    fn reputation_store_wait(&self) -> Duration {
        Duration::from_secs(180)
    }

    /// Default period of the active friends refresh: 10 minutes
    fn reputation_active_friends_period(&self) -> Duration {
        Duration::from_secs(600)
    }

    /// Default period of the identity flags refresh
    fn reputation_flag_refresh_period(&self) -> Duration {
        Duration::from_secs(100)
    }

    /// Default period of the banned owner nodes recomputation
    fn reputation_ban_refresh_period(&self) -> Duration {
        Duration::from_secs(313)
    }

    /// Default period of the maintenance tick
    fn reputation_tick_period(&self) -> Duration {
        Duration::from_secs(5)
    }

    /// Default retention of personas absent from the directory: 35 days
    fn reputation_retention(&self) -> Duration {
        Duration::from_secs(35 * 24 * 3600)
    }

    /// Default window for a friend to count as active: one week
    fn reputation_active_friend_window(&self) -> Duration {
        Duration::from_secs(7 * 24 * 3600)
    }

    /// Default ban threshold
    fn reputation_ban_threshold(&self) -> u32 {
        2
    }

    /// Default maximum number of opinions per update batch
    fn reputation_max_items_per_batch(&self) -> usize {
        256
    }

    /// Default damping for personas whose owner is known
    fn reputation_owner_known_bias(&self) -> f32 {
        10.0
    }

    /// Default damping for personas linked to an owner
    fn reputation_owner_linked_bias(&self) -> f32 {
        5.0
    }

    /// Default damping for anonymous personas
    fn reputation_anonymous_bias(&self) -> f32 {
        2.0
    }

    /// Default kill threshold
    fn reputation_kill_threshold(&self) -> f32 {
        0.5
    }

    /// Out of range opinions are clamped by default
    fn reputation_opinion_decoding(&self) -> OpinionDecoding {
        OpinionDecoding::Clamp
    }

    /// Default friends: none
    fn friends_peers(&self) -> Vec<PeerId> {
        vec![]
    }
}

/// Struct that will implement all the production defaults
pub struct Production;

/// Struct that will implement all the development defaults
pub struct Development;

impl Defaults for Production {
    fn storage_db_path(&self) -> PathBuf {
        dirs::data_dir().join("reputation")
    }
}

impl Defaults for Development {
    fn log_level(&self) -> log::LevelFilter {
        log::LevelFilter::Debug
    }

    fn storage_db_path(&self) -> PathBuf {
        PathBuf::from(".gxsrep-dev")
    }

    fn reputation_request_period(&self) -> Duration {
        Duration::from_secs(60)
    }

    fn reputation_store_wait(&self) -> Duration {
        Duration::from_secs(20)
    }

    fn reputation_active_friends_period(&self) -> Duration {
        Duration::from_secs(60)
    }

    fn reputation_flag_refresh_period(&self) -> Duration {
        Duration::from_secs(10)
    }

    fn reputation_ban_refresh_period(&self) -> Duration {
        Duration::from_secs(31)
    }

    fn reputation_tick_period(&self) -> Duration {
        Duration::from_secs(1)
    }
}
