//! configuration
//!
//! Configuration is loaded as a [PartialConfig](config::PartialConfig) from a TOML file and then
//! merged on top of the defaults of its environment with `Config::from_partial`.

#![deny(rust_2018_idioms)]
#![deny(non_upper_case_globals)]
#![deny(non_camel_case_types)]
#![deny(non_snake_case)]
#![deny(unused_mut)]
#![deny(missing_docs)]

pub mod config;
pub mod defaults;
pub mod dirs;
pub mod loaders;
