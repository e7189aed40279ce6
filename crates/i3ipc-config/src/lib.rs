//! Configuration parsing for i3ipc
//!
//! This crate handles parsing the KDL configuration file read by the
//! `i3ipc` command-line client.

mod error;
mod model;
mod parser;

pub use error::ConfigError;
pub use model::*;
pub use parser::{load_config, parse_config, parse_config_str};
