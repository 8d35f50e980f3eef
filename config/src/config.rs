//! # Config
//!
//! This module contains the `Config` struct, which holds all the configuration params of the
//! reputation node. The `Config` struct in this module is __total__, that is, it contains all the
//! fields needed by the rest of the application, unlike [PartialConfig](PartialConfig) which is
//! __partial__: most fields are optional and, when missing from the configuration file, the
//! default value for the environment is used.
//!
//! The [loaders](crate::loaders) always return a partial configuration. Use
//! `Config::from_partial` to obtain a total one:
//! ```
//! use gxs_config::config::{Config, PartialConfig};
//!
//! // Default config for production
//! let config = Config::from_partial(&PartialConfig::default());
//! assert_eq!(config, Config::default());
//! ```
use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::defaults::{Defaults, Development, Production};
use gxs_reputation::{
    engine::EngineParams, record::ScoreParams, scheduler::SchedulerPeriods, OpinionDecoding,
    PeerId,
};

/// Environment the node runs in. Each one has its own defaults.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Long periods, persistent storage
    #[default]
    Production,
    /// Short periods, useful to watch the engine at work
    Development,
}

impl Environment {
    /// Defaults of this environment
    pub fn defaults(self) -> &'static dyn Defaults {
        match self {
            Environment::Production => &Production,
            Environment::Development => &Development,
        }
    }
}

/// The total configuration object
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Environment whose defaults fill the missing values
    pub environment: Environment,
    /// Logging configuration
    pub log: Log,
    /// Storage configuration
    pub storage: Storage,
    /// Reputation engine configuration
    pub reputation: Reputation,
    /// Friends configuration
    pub friends: Friends,
}

/// Partial version of [Config](Config), as read from a file
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct PartialConfig {
    /// See `Config::environment`
    #[serde(default)]
    pub environment: Environment,
    /// See `Config::log`
    #[serde(default)]
    pub log: PartialLog,
    /// See `Config::storage`
    #[serde(default)]
    pub storage: PartialStorage,
    /// See `Config::reputation`
    #[serde(default)]
    pub reputation: PartialReputation,
    /// See `Config::friends`
    #[serde(default)]
    pub friends: PartialFriends,
}

/// Logging configuration
#[derive(Clone, Debug, PartialEq)]
pub struct Log {
    /// Level of the gxs crates
    pub level: log::LevelFilter,
}

/// Partial version of [Log](Log)
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct PartialLog {
    /// See `Log::level`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<log::LevelFilter>,
}

/// Available storage backends
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum StorageBackend {
    /// In memory, lost on exit
    #[serde(rename = "hashmap")]
    HashMap,
    /// RocksDB database under `db_path`
    #[serde(rename = "rocksdb")]
    RocksDB,
    /// Every operation fails
    #[serde(rename = "nobackend")]
    NoBackend,
}

/// Storage configuration
#[derive(Clone, Debug, PartialEq)]
pub struct Storage {
    /// Storage backend to use
    pub backend: StorageBackend,
    /// Directory of the database. Used only if backend is RocksDB.
    pub db_path: PathBuf,
}

/// Partial version of [Storage](Storage)
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct PartialStorage {
    /// See `Storage::backend`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<StorageBackend>,
    /// See `Storage::db_path`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,
}

/// Reputation engine configuration
#[derive(Clone, Debug, PartialEq)]
pub struct Reputation {
    /// Period of the update requests broadcast
    pub request_period: Duration,
    /// Delay between a broadcast and the next store flush
    pub store_wait: Duration,
    /// Period of the active friends refresh and prune pass
    pub active_friends_period: Duration,
    /// Period of the identity flags refresh
    pub flag_refresh_period: Duration,
    /// Period of the banned owner nodes recomputation. Should not be a multiple of
    /// `flag_refresh_period`, nor the opposite.
    pub ban_refresh_period: Duration,
    /// Period of the maintenance tick
    pub tick_period: Duration,
    /// How long personas absent from the identity directory are remembered
    pub retention: Duration,
    /// How recently a friend must have been connected to count as active
    pub active_friend_window: Duration,
    /// Negative own opinions on linked personas needed to ban their owner node, 0 to disable
    pub ban_threshold: u32,
    /// Maximum number of opinions per update batch
    pub max_items_per_batch: usize,
    /// Friend opinion damping for personas whose owner is known
    pub owner_known_bias: f32,
    /// Friend opinion damping for personas linked to an owner
    pub owner_linked_bias: f32,
    /// Friend opinion damping for anonymous personas
    pub anonymous_bias: f32,
    /// Scores at or below this value are assessed as bad
    pub kill_threshold: f32,
    /// What to do with out of range opinions received from friends
    pub opinion_decoding: OpinionDecoding,
}

/// Partial version of [Reputation](Reputation)
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct PartialReputation {
    /// See `Reputation::request_period`
    #[serde(
        default,
        deserialize_with = "from_secs",
        serialize_with = "to_secs",
        skip_serializing_if = "Option::is_none",
        rename = "request_period_seconds"
    )]
    pub request_period: Option<Duration>,
    /// See `Reputation::store_wait`
    #[serde(
        default,
        deserialize_with = "from_secs",
        serialize_with = "to_secs",
        skip_serializing_if = "Option::is_none",
        rename = "store_wait_seconds"
    )]
    pub store_wait: Option<Duration>,
    /// See `Reputation::active_friends_period`
    #[serde(
        default,
        deserialize_with = "from_secs",
        serialize_with = "to_secs",
        skip_serializing_if = "Option::is_none",
        rename = "active_friends_period_seconds"
    )]
    pub active_friends_period: Option<Duration>,
    /// See `Reputation::flag_refresh_period`
    #[serde(
        default,
        deserialize_with = "from_secs",
        serialize_with = "to_secs",
        skip_serializing_if = "Option::is_none",
        rename = "flag_refresh_period_seconds"
    )]
    pub flag_refresh_period: Option<Duration>,
    /// See `Reputation::ban_refresh_period`
    #[serde(
        default,
        deserialize_with = "from_secs",
        serialize_with = "to_secs",
        skip_serializing_if = "Option::is_none",
        rename = "ban_refresh_period_seconds"
    )]
    pub ban_refresh_period: Option<Duration>,
    /// See `Reputation::tick_period`
    #[serde(
        default,
        deserialize_with = "from_secs",
        serialize_with = "to_secs",
        skip_serializing_if = "Option::is_none",
        rename = "tick_period_seconds"
    )]
    pub tick_period: Option<Duration>,
    /// See `Reputation::retention`
    #[serde(
        default,
        deserialize_with = "from_secs",
        serialize_with = "to_secs",
        skip_serializing_if = "Option::is_none",
        rename = "retention_seconds"
    )]
    pub retention: Option<Duration>,
    /// See `Reputation::active_friend_window`
    #[serde(
        default,
        deserialize_with = "from_secs",
        serialize_with = "to_secs",
        skip_serializing_if = "Option::is_none",
        rename = "active_friend_window_seconds"
    )]
    pub active_friend_window: Option<Duration>,
    /// See `Reputation::ban_threshold`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ban_threshold: Option<u32>,
    /// See `Reputation::max_items_per_batch`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items_per_batch: Option<usize>,
    /// See `Reputation::owner_known_bias`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_known_bias: Option<f32>,
    /// See `Reputation::owner_linked_bias`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_linked_bias: Option<f32>,
    /// See `Reputation::anonymous_bias`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anonymous_bias: Option<f32>,
    /// See `Reputation::kill_threshold`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kill_threshold: Option<f32>,
    /// See `Reputation::opinion_decoding`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opinion_decoding: Option<OpinionDecoding>,
}

/// Friends configuration
#[derive(Clone, Debug, PartialEq)]
pub struct Friends {
    /// Peers opinions are exchanged with
    pub peers: Vec<PeerId>,
}

/// Partial version of [Friends](Friends)
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct PartialFriends {
    /// See `Friends::peers`, as hex strings
    #[serde(
        default,
        deserialize_with = "peers_from_hex",
        serialize_with = "peers_to_hex",
        skip_serializing_if = "Option::is_none"
    )]
    pub peers: Option<Vec<PeerId>>,
}

fn from_secs<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_secs))
}

fn to_secs<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match duration {
        Some(duration) => serializer.serialize_u64(duration.as_secs()),
        None => serializer.serialize_none(),
    }
}

fn peers_from_hex<'de, D>(deserializer: D) -> Result<Option<Vec<PeerId>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Vec<String>>::deserialize(deserializer)?
        .map(|peers| {
            peers
                .iter()
                .map(|peer| {
                    peer.parse::<PeerId>()
                        .map_err(<D::Error as serde::de::Error>::custom)
                })
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()
}

fn peers_to_hex<S>(peers: &Option<Vec<PeerId>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match peers {
        Some(peers) => serializer.collect_seq(peers.iter().map(|peer| peer.to_string())),
        None => serializer.serialize_none(),
    }
}

impl Config {
    /// Merge a partial configuration on top of the defaults of its environment
    pub fn from_partial(config: &PartialConfig) -> Self {
        let defaults = config.environment.defaults();

        Config {
            environment: config.environment,
            log: Log::from_partial(&config.log, defaults),
            storage: Storage::from_partial(&config.storage, defaults),
            reputation: Reputation::from_partial(&config.reputation, defaults),
            friends: Friends::from_partial(&config.friends, defaults),
        }
    }

    /// Partial configuration with every field set, suitable for writing back to a file
    pub fn to_partial(&self) -> PartialConfig {
        PartialConfig {
            environment: self.environment,
            log: PartialLog {
                level: Some(self.log.level),
            },
            storage: PartialStorage {
                backend: Some(self.storage.backend),
                db_path: Some(self.storage.db_path.clone()),
            },
            reputation: self.reputation.to_partial(),
            friends: PartialFriends {
                peers: Some(self.friends.peers.clone()),
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::from_partial(&PartialConfig::default())
    }
}

impl Log {
    /// Fill the missing values from the defaults
    pub fn from_partial(config: &PartialLog, defaults: &dyn Defaults) -> Self {
        Log {
            level: config.level.unwrap_or_else(|| defaults.log_level()),
        }
    }
}

impl Storage {
    /// Fill the missing values from the defaults
    pub fn from_partial(config: &PartialStorage, defaults: &dyn Defaults) -> Self {
        Storage {
            backend: config
                .backend
                .unwrap_or_else(|| defaults.storage_backend()),
            db_path: config
                .db_path
                .clone()
                .unwrap_or_else(|| defaults.storage_db_path()),
        }
    }
}

impl Reputation {
    /// Fill the missing values from the defaults
    pub fn from_partial(config: &PartialReputation, defaults: &dyn Defaults) -> Self {
        Reputation {
            request_period: config
                .request_period
                .unwrap_or_else(|| defaults.reputation_request_period()),
            store_wait: config
                .store_wait
                .unwrap_or_else(|| defaults.reputation_store_wait()),
            active_friends_period: config
                .active_friends_period
                .unwrap_or_else(|| defaults.reputation_active_friends_period()),
            flag_refresh_period: config
                .flag_refresh_period
                .unwrap_or_else(|| defaults.reputation_flag_refresh_period()),
            ban_refresh_period: config
                .ban_refresh_period
                .unwrap_or_else(|| defaults.reputation_ban_refresh_period()),
            tick_period: config
                .tick_period
                .unwrap_or_else(|| defaults.reputation_tick_period()),
            retention: config
                .retention
                .unwrap_or_else(|| defaults.reputation_retention()),
            active_friend_window: config
                .active_friend_window
                .unwrap_or_else(|| defaults.reputation_active_friend_window()),
            ban_threshold: config
                .ban_threshold
                .unwrap_or_else(|| defaults.reputation_ban_threshold()),
            max_items_per_batch: config
                .max_items_per_batch
                .unwrap_or_else(|| defaults.reputation_max_items_per_batch()),
            owner_known_bias: config
                .owner_known_bias
                .unwrap_or_else(|| defaults.reputation_owner_known_bias()),
            owner_linked_bias: config
                .owner_linked_bias
                .unwrap_or_else(|| defaults.reputation_owner_linked_bias()),
            anonymous_bias: config
                .anonymous_bias
                .unwrap_or_else(|| defaults.reputation_anonymous_bias()),
            kill_threshold: config
                .kill_threshold
                .unwrap_or_else(|| defaults.reputation_kill_threshold()),
            opinion_decoding: config
                .opinion_decoding
                .unwrap_or_else(|| defaults.reputation_opinion_decoding()),
        }
    }

    fn to_partial(&self) -> PartialReputation {
        PartialReputation {
            request_period: Some(self.request_period),
            store_wait: Some(self.store_wait),
            active_friends_period: Some(self.active_friends_period),
            flag_refresh_period: Some(self.flag_refresh_period),
            ban_refresh_period: Some(self.ban_refresh_period),
            tick_period: Some(self.tick_period),
            retention: Some(self.retention),
            active_friend_window: Some(self.active_friend_window),
            ban_threshold: Some(self.ban_threshold),
            max_items_per_batch: Some(self.max_items_per_batch),
            owner_known_bias: Some(self.owner_known_bias),
            owner_linked_bias: Some(self.owner_linked_bias),
            anonymous_bias: Some(self.anonymous_bias),
            kill_threshold: Some(self.kill_threshold),
            opinion_decoding: Some(self.opinion_decoding),
        }
    }

    /// Parameters of the reputation engine
    pub fn engine_params(&self) -> EngineParams {
        EngineParams {
            ban_threshold: self.ban_threshold,
            max_items_per_batch: self.max_items_per_batch,
            opinion_decoding: self.opinion_decoding,
            periods: SchedulerPeriods {
                request: self.request_period,
                store_wait: self.store_wait,
                active_friends: self.active_friends_period,
                flag_refresh: self.flag_refresh_period,
                ban_refresh: self.ban_refresh_period,
            },
            retention: self.retention,
            active_friend_window: self.active_friend_window,
            score: ScoreParams {
                owner_known_bias: self.owner_known_bias,
                owner_linked_bias: self.owner_linked_bias,
                anonymous_bias: self.anonymous_bias,
                kill_threshold: self.kill_threshold,
            },
        }
    }
}

impl Friends {
    /// Fill the missing values from the defaults
    pub fn from_partial(config: &PartialFriends, defaults: &dyn Defaults) -> Self {
        Friends {
            peers: config
                .peers
                .clone()
                .unwrap_or_else(|| defaults.friends_peers()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_default_from_partial() {
        let partial_config = PartialStorage::default();
        let config = Storage::from_partial(&partial_config, &Development);

        assert_eq!(config.backend, Development.storage_backend());
        assert_eq!(config.db_path, Development.storage_db_path());
    }

    #[test]
    fn test_storage_from_partial() {
        let partial_config = PartialStorage {
            backend: Some(StorageBackend::HashMap),
            db_path: Some(PathBuf::from("other")),
        };
        let config = Storage::from_partial(&partial_config, &Production);

        assert_eq!(config.backend, StorageBackend::HashMap);
        assert_eq!(config.db_path.to_str(), Some("other"));
    }

    #[test]
    fn test_reputation_default_from_partial() {
        let config = Reputation::from_partial(&PartialReputation::default(), &Production);

        assert_eq!(config.request_period, Duration::from_secs(600));
        assert_eq!(config.flag_refresh_period, Duration::from_secs(100));
        assert_eq!(config.ban_refresh_period, Duration::from_secs(313));
        assert_eq!(config.ban_threshold, 2);
        assert_eq!(config.opinion_decoding, OpinionDecoding::Clamp);
        assert_eq!(config.engine_params(), EngineParams::default());
    }

    #[test]
    fn test_reputation_from_partial() {
        let partial_config = PartialReputation {
            request_period: Some(Duration::from_secs(30)),
            ban_threshold: Some(0),
            kill_threshold: Some(0.25),
            opinion_decoding: Some(OpinionDecoding::Reject),
            ..PartialReputation::default()
        };
        let config = Reputation::from_partial(&partial_config, &Production);
        let params = config.engine_params();

        assert_eq!(params.periods.request, Duration::from_secs(30));
        assert_eq!(params.periods.store_wait, Duration::from_secs(180));
        assert_eq!(params.ban_threshold, 0);
        assert_eq!(params.score.kill_threshold, 0.25);
        assert_eq!(params.opinion_decoding, OpinionDecoding::Reject);
    }

    #[test]
    fn test_development_periods_are_staggered() {
        let config = Config::from_partial(&PartialConfig {
            environment: Environment::Development,
            ..PartialConfig::default()
        });

        assert!(!config.reputation.engine_params().periods.are_synchronized());
        assert!(config.reputation.request_period < Duration::from_secs(600));
    }

    #[test]
    fn test_config_default_from_partial() {
        let config = Config::from_partial(&PartialConfig::default());

        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.log.level, Production.log_level());
        assert!(config.friends.peers.is_empty());
    }

    #[test]
    fn test_to_partial_round_trip() {
        let mut config = Config::default();
        config.friends.peers = vec![PeerId([1; 16])];
        config.reputation.ban_threshold = 7;

        assert_eq!(Config::from_partial(&config.to_partial()), config);
    }
}
