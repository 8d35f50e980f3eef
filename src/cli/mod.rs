use std::{env, path::PathBuf};

use lazy_static::lazy_static;
use structopt::StructOpt;
use terminal_size as term;

use gxs_config as config;

mod list;
mod node;

pub fn from_args() -> Cli {
    Cli::from_args()
}

pub fn exec(command: Cli) -> anyhow::Result<()> {
    let Cli {
        config,
        debug,
        trace,
        no_timestamp,
        no_module_path,
        cmd,
    } = command;

    let mut log_opts = LogOptions::default();
    let config = get_config(config.or_else(config::dirs::find_config))?;

    log_opts.level = config.log.level;
    log_opts.source = LogOptionsSource::Config;
    log_opts.timestamp = !no_timestamp;
    log_opts.module_path = !no_module_path;

    if let Ok(rust_log) = env::var("RUST_LOG") {
        if rust_log.contains("gxs") {
            log_opts.level = env_logger::Logger::from_default_env().filter();
            log_opts.source = LogOptionsSource::Env;
        }
    }

    if trace {
        log_opts.level = log::LevelFilter::Trace;
        log_opts.source = LogOptionsSource::Flag;
    } else if debug {
        log_opts.level = log::LevelFilter::Debug;
        log_opts.source = LogOptionsSource::Flag;
    }

    init_logger(log_opts);

    exec_cmd(cmd, config)
}

fn exec_cmd(command: Command, config: config::config::Config) -> anyhow::Result<()> {
    match command {
        Command::Node(params) => node::run(params, config),
        Command::ShowConfig => node::show_config(&config),
        Command::List(params) => list::exec(params, &config),
    }
}

fn init_logger(opts: LogOptions) {
    println!(
        "Setting log level to: {}, source: {:?}",
        opts.level, opts.source
    );
    env_logger::Builder::from_env(env_logger::Env::default())
        .format_timestamp(if opts.timestamp {
            Some(env_logger::TimestampPrecision::Seconds)
        } else {
            None
        })
        .format_module_path(opts.module_path)
        .filter_level(log::LevelFilter::Info)
        .filter_module("gxs", opts.level)
        .init();
}

fn get_config(path: Option<PathBuf>) -> anyhow::Result<config::config::Config> {
    match path {
        Some(p) => {
            println!("Loading config from: {}", p.display());
            let config = config::loaders::toml::from_file(p)
                .map(|p| config::config::Config::from_partial(&p))?;
            Ok(config)
        }
        None => {
            println!("HEADS UP! No configuration specified/found. Using default one!");
            Ok(config::config::Config::default())
        }
    }
}

/// Peer reputation node for friend-to-friend networks
#[derive(Debug, StructOpt)]
#[structopt(max_term_width = *TERM_WIDTH)]
pub struct Cli {
    /// Load configuration from this file. If not specified will try to find a `gxsrep.toml`
    /// configuration in the current path, the standard configuration path of the platform and
    /// `/etc/gxsrep` in a *nix platform. If no configuration is found, the default configuration
    /// is used, see the `show-config` subcommand.
    #[structopt(short = "c", long = "config")]
    config: Option<PathBuf>,
    /// Turn on DEBUG logging.
    #[structopt(long = "debug")]
    debug: bool,
    /// Turn on TRACE logging.
    #[structopt(long = "trace")]
    trace: bool,
    /// Do not show timestamps in logs.
    #[structopt(long = "no-timestamp")]
    no_timestamp: bool,
    /// Do not show module path in logs.
    #[structopt(long = "no-module-path")]
    no_module_path: bool,
    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    #[structopt(name = "node", about = "Run the reputation node.")]
    Node(node::NodeParams),
    #[structopt(
        name = "show-config",
        about = "Dump the loaded config in Toml format to stdout."
    )]
    ShowConfig,
    #[structopt(name = "list", about = "List the persisted reputation records.")]
    List(list::ListParams),
}

struct LogOptions {
    level: log::LevelFilter,
    timestamp: bool,
    module_path: bool,
    source: LogOptionsSource,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            level: log::LevelFilter::Error,
            timestamp: true,
            module_path: true,
            source: LogOptionsSource::Defaults,
        }
    }
}

#[derive(Debug)]
enum LogOptionsSource {
    Defaults,
    Config,
    Env,
    Flag,
}

lazy_static! {
    static ref TERM_WIDTH: usize = {
        let size = term::terminal_size();
        if let Some((term::Width(w), _)) = size {
            w as usize
        } else {
            120
        }
    };
}
