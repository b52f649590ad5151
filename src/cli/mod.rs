//! CLI module
//!
//! Command-line interface over the search client.
//!
//! # Commands
//!
//! - `search` - Walk a (multi-category) search, one line per page or record
//! - `get` - Raw request against any endpoint
//! - `cache purge|clear` - Durable cache housekeeping

mod commands;
mod runner;

pub use commands::{CacheAction, Cli, Commands, OutputFormat};
pub use runner::{Runner, SearchArgs};
