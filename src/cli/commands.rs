//! CLI commands and argument parsing

use crate::types::{Category, RecordLevel, SortBy};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Catalog search client
#[derive(Parser, Debug)]
#[command(name = "catalog-client")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML, or JSON with a .json extension)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// API key (overrides the config file and CATALOG_API_KEY)
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Use the durable file cache in this directory
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search, printing one line per (category, page)
    Search {
        /// Free-text query
        query: Option<String>,

        /// Categories to search (comma-separated)
        #[arg(short = 'c', long = "category", value_delimiter = ',', required = true)]
        categories: Vec<Category>,

        /// Filter as name=value, e.g. decade=190 (repeatable)
        #[arg(short = 'l', long = "filter", value_parser = parse_key_val)]
        filters: Vec<(String, String)>,

        /// Facet to request (repeatable)
        #[arg(long)]
        facet: Vec<String>,

        /// Optional record field to include (repeatable)
        #[arg(long)]
        include: Vec<String>,

        /// Records per page
        #[arg(short = 'n', long)]
        page_size: Option<u32>,

        /// relevance, datedesc or dateasc
        #[arg(long)]
        sort: Option<SortBy>,

        /// brief or full
        #[arg(long)]
        reclevel: Option<RecordLevel>,

        /// Flag the search as a bulk harvest
        #[arg(long)]
        bulk: bool,

        /// Stop after this many pages
        #[arg(long)]
        pages: Option<usize>,

        /// Print individual records instead of pages
        #[arg(long)]
        records: bool,
    },

    /// Send a raw GET to an endpoint, e.g. `work/12345`
    Get {
        endpoint: String,

        /// Query parameter as name=value (repeatable)
        #[arg(short = 'p', long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,
    },

    /// Cache housekeeping
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

/// Cache subcommands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAction {
    /// Remove expired entries
    Purge,
    /// Remove every entry
    Clear,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}

fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{s}'"))?;
    if key.trim().is_empty() {
        return Err(format!("missing name in '{s}'"));
    }
    Ok((key.trim().to_string(), value.to_string()))
}
