//! Load the configuration from a file or a `String` written in [Toml format](https://en.wikipedia.org/wiki/TOML)

use std::{fs, io, path::Path};

use thiserror::Error;

use crate::config::PartialConfig;

/// Error type denoting the different errors this module can fail with. Parsing the configuration
/// from Toml might fail with a `toml::de::Error`, but loading that configuration from a file might
/// also fail with a `std::io::Error`.
#[derive(Debug, Error)]
pub enum Error {
    /// Indicates there was an error when trying to load configuration from a file.
    #[error("{0}")]
    IOError(#[from] io::Error),
    /// Indicates there was an error when trying to build a `PartialConfig` instance out of the
    /// Toml string given.
    #[error("{0}")]
    ParseError(#[from] toml::de::Error),
}

/// Just like `std::result::Result` but with the error param fixed to `Error` type in this module.
pub type Result<T> = std::result::Result<T, Error>;

/// Load configuration from a file written in Toml format.
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<PartialConfig> {
    let contents = fs::read_to_string(path)?;

    from_str(&contents)
}

/// Load configuration from a string written in Toml format.
pub fn from_str(contents: &str) -> Result<PartialConfig> {
    Ok(toml::from_str(contents)?)
}

/// Write a partial configuration as a Toml string.
pub fn to_string(config: &PartialConfig) -> std::result::Result<String, toml::ser::Error> {
    toml::to_string(config)
}
