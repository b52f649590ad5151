//! CLI runner - executes commands

use crate::cache;
use crate::cli::commands::{CacheAction, Cli, Commands, OutputFormat};
use crate::config::{CacheConfig, ClientConfig};
use crate::error::Result;
use crate::pagination::{SearchClient, SearchQuery};
use crate::types::{Category, Payload, RecordLevel, SortBy};
use serde::Serialize;
use serde_json::json;
use tracing::info;

/// Options of the `search` command
#[derive(Debug, Clone, Default)]
pub struct SearchArgs {
    pub query: Option<String>,
    pub categories: Vec<Category>,
    pub filters: Vec<(String, String)>,
    pub facets: Vec<String>,
    pub include: Vec<String>,
    pub page_size: Option<u32>,
    pub sort: Option<SortBy>,
    pub record_level: Option<RecordLevel>,
    pub bulk: bool,
    pub max_pages: Option<usize>,
    pub records: bool,
}

impl SearchArgs {
    fn to_query(&self) -> SearchQuery {
        let mut query = SearchQuery::new(self.categories.iter().copied()).bulk_harvest(self.bulk);
        query.text = self.query.clone();
        query.page_size = self.page_size;
        query.sort = self.sort;
        query.record_level = self.record_level;
        for (name, value) in &self.filters {
            query = query.filter(name.as_str(), value.as_str());
        }
        query.facets = self.facets.clone();
        query.include = self.include.clone();
        query
    }
}

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Search {
                query,
                categories,
                filters,
                facet,
                include,
                page_size,
                sort,
                reclevel,
                bulk,
                pages,
                records,
            } => {
                let args = SearchArgs {
                    query: query.clone(),
                    categories: categories.clone(),
                    filters: filters.clone(),
                    facets: facet.clone(),
                    include: include.clone(),
                    page_size: *page_size,
                    sort: *sort,
                    record_level: *reclevel,
                    bulk: *bulk,
                    max_pages: *pages,
                    records: *records,
                };
                self.search(&args).await
            }
            Commands::Get { endpoint, params } => self.get(endpoint, params).await,
            Commands::Cache { action } => self.cache(*action).await,
        }
    }

    /// Assemble the client config: file (or defaults), then environment,
    /// then command-line flags
    pub fn load_config(&self) -> Result<ClientConfig> {
        let config = match &self.cli.config {
            Some(path) => ClientConfig::from_file(path)?,
            None => ClientConfig::default(),
        };
        let mut config = config.with_env_overrides();
        if let Some(key) = &self.cli.api_key {
            config.api_key = Some(key.clone());
        }
        if let Some(dir) = &self.cli.cache_dir {
            config.cache = CacheConfig {
                max_entries: config.cache.max_entries,
                ..CacheConfig::file(dir)
            };
        }
        config.validate()?;
        Ok(config)
    }

    async fn search(&self, args: &SearchArgs) -> Result<()> {
        let client = SearchClient::from_config(self.load_config()?).await?;
        let mut pager = client.multi_category_pager(args.to_query())?;

        let mut fetched = 0usize;
        while args.max_pages.map_or(true, |max| fetched < max) {
            let Some((category, page)) = pager.next_page().await else {
                break;
            };
            fetched += 1;
            if args.records {
                for record in page.records() {
                    self.output(&record)?;
                }
            } else {
                self.output(&json!({ "category": category, "page": page }))?;
            }
        }

        let stats = client.transport().stats();
        info!(
            pages = fetched,
            cache_hits = stats.cache_hits,
            network_attempts = stats.network_attempts,
            retries = stats.retries,
            "Search finished"
        );
        match pager.take_error() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn get(&self, endpoint: &str, params: &[(String, String)]) -> Result<()> {
        let client = SearchClient::from_config(self.load_config()?).await?;
        match client.request(endpoint, params).await? {
            Payload::Json(body) => self.output(&body),
            Payload::Xml(text) => {
                println!("{text}");
                Ok(())
            }
        }
    }

    async fn cache(&self, action: CacheAction) -> Result<()> {
        let config = self.load_config()?;
        let backend = cache::from_config(&config.cache).await?;
        match action {
            CacheAction::Purge => {
                let purged = backend.purge_expired().await?;
                self.output(&json!({ "purged": purged }))
            }
            CacheAction::Clear => {
                backend.clear().await?;
                self.output(&json!({ "cleared": true }))
            }
        }
    }

    /// Output a message
    fn output(&self, msg: &impl Serialize) -> Result<()> {
        let line = match self.cli.format {
            OutputFormat::Json => serde_json::to_string(msg)?,
            OutputFormat::Pretty => serde_json::to_string_pretty(msg)?,
        };
        println!("{line}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheBackendKind;
    use clap::Parser;

    #[test]
    fn test_search_args_to_query() {
        let args = SearchArgs {
            query: Some("cats".into()),
            categories: vec![Category::Book],
            filters: vec![("l-decade".into(), "190".into())],
            bulk: true,
            ..SearchArgs::default()
        };
        let query = args.to_query();
        assert_eq!(query.text.as_deref(), Some("cats"));
        assert_eq!(query.filters, vec![("decade".to_string(), "190".to_string())]);
        assert!(query.bulk_harvest);
    }

    #[test]
    fn test_load_config_applies_flags() {
        let dir = tempfile::tempdir().unwrap();
        let cache_dir = dir.path().to_string_lossy().to_string();
        let cli = Cli::try_parse_from([
            "catalog-client",
            "--api-key",
            "flag-key",
            "--cache-dir",
            cache_dir.as_str(),
            "cache",
            "purge",
        ])
        .unwrap();

        let config = Runner::new(cli).load_config().unwrap();
        assert_eq!(config.api_key.as_deref(), Some("flag-key"));
        assert_eq!(config.cache.backend, CacheBackendKind::File);
        assert_eq!(config.cache.directory.as_deref(), Some(dir.path()));
    }

    #[test]
    fn test_load_config_missing_file() {
        let cli = Cli::try_parse_from(["catalog-client", "-C", "/nonexistent/config.yaml", "cache", "purge"])
            .unwrap();
        assert!(Runner::new(cli).load_config().is_err());
    }
}
