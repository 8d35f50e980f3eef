use std::{path::PathBuf, sync::Arc, time::Duration};

use structopt::StructOpt;

use gxs_config::config::Config;
use gxs_node::{
    actors::node::{self, NodeServices},
    collaborators::{LoggingTransport, NullDirectory, StaticFriends},
};
use gxs_reputation::PeerId;

pub fn run(params: NodeParams, mut config: Config) -> anyhow::Result<()> {
    if let Some(db) = params.db {
        config.storage.db_path = db;
    }

    if let Some(threshold) = params.ban_threshold {
        config.reputation.ban_threshold = threshold;
    }

    if let Some(period) = params.tick_period_seconds {
        config.reputation.tick_period = Duration::from_secs(period);
    }

    for friend in params.friends {
        if !config.friends.peers.contains(&friend) {
            config.friends.peers.push(friend);
        }
    }

    if config.friends.peers.is_empty() {
        log::warn!("No friends configured, opinions will not be exchanged");
    }

    let services = NodeServices {
        directory: Box::new(NullDirectory),
        friends: Box::new(StaticFriends::new(config.friends.peers.clone())),
        transport: Box::new(LoggingTransport),
    };

    node::run(Arc::new(config), services, |addr| {
        let result = ctrlc::set_handler(move || {
            node::close(&addr);
        });
        if let Err(e) = result {
            log::error!(
                "Error setting handler for both SIGINT (Ctrl+C) and SIGTERM (kill): {}",
                e
            );
        }
    })
}

pub fn show_config(config: &Config) -> anyhow::Result<()> {
    let serialized = toml::to_string(&config.to_partial())?;
    println!("{}", serialized);

    Ok(())
}

#[derive(Debug, StructOpt)]
pub struct NodeParams {
    /// Friend to exchange opinions with, as a hex peer id. Added to the ones in the config.
    #[structopt(long = "friend")]
    friends: Vec<PeerId>,
    #[structopt(long = "db", help = NODE_DB_HELP)]
    db: Option<PathBuf>,
    /// Negative own opinions on the personas of an owner node needed to ban it, 0 to disable.
    #[structopt(long = "ban-threshold")]
    ban_threshold: Option<u32>,
    /// Period of the maintenance tick (in seconds).
    #[structopt(long = "tick-period")]
    tick_period_seconds: Option<u64>,
}

static NODE_DB_HELP: &str = r#"Path to the reputation database, used by the `rocksdb` storage backend. If not specified will use the platform data directory in production, or '.gxsrep-dev' in development."#;
