//! The `util` package contains small helpers that are shared across the whole GXS reputation
//! workspace.

#![deny(rust_2018_idioms)]
#![deny(non_upper_case_globals)]
#![deny(non_camel_case_types)]
#![deny(non_snake_case)]
#![deny(unused_mut)]
#![deny(missing_docs)]

/// Timestamp as UTC
pub mod timestamp;
