//! Loaders of the partial configuration

pub mod toml;
