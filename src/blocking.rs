//! Blocking entry points
//!
//! Thin wrappers that drive the async transport and pagers on a private
//! current-thread tokio runtime, so both execution models share one
//! retry/backoff/pagination implementation. Backoff and admission waits
//! park the calling thread.
//!
//! Do not call these from inside an async runtime; block_on panics there.

use crate::config::ClientConfig;
use crate::error::{Error, Result, ResultExt};
use crate::http::{self, TransportStats};
use crate::pagination::{self, CategoryPager, MultiCategoryPager, Record, SearchPage, SearchQuery};
use crate::types::{Category, JsonValue, Payload};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::runtime::Runtime;

fn build_runtime() -> Result<Arc<Runtime>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start blocking runtime")?;
    Ok(Arc::new(runtime))
}

/// Blocking [`crate::http::Transport`]
#[derive(Debug, Clone)]
pub struct Transport {
    inner: Arc<http::Transport>,
    runtime: Arc<Runtime>,
}

impl Transport {
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let runtime = build_runtime()?;
        let inner = runtime.block_on(http::Transport::from_config(config))?;
        Ok(Self {
            inner: Arc::new(inner),
            runtime,
        })
    }

    /// Wrap a transport assembled with [`crate::http::Transport::builder`].
    ///
    /// The transport's HTTP client must not be tied to another runtime.
    pub fn from_async(inner: Arc<http::Transport>) -> Result<Self> {
        Ok(Self {
            inner,
            runtime: build_runtime()?,
        })
    }

    pub fn inner(&self) -> &Arc<http::Transport> {
        &self.inner
    }

    pub fn config(&self) -> &ClientConfig {
        self.inner.config()
    }

    pub fn stats(&self) -> TransportStats {
        self.inner.stats()
    }

    pub fn request(&self, endpoint: &str, params: &[(String, String)]) -> Result<Payload> {
        self.runtime.block_on(self.inner.request(endpoint, params))
    }

    pub fn request_json(&self, endpoint: &str, params: &[(String, String)]) -> Result<JsonValue> {
        self.runtime.block_on(self.inner.request_json(endpoint, params))
    }

    /// Remove expired cache entries
    pub fn purge_cache(&self) -> Result<usize> {
        self.runtime.block_on(self.inner.cache().purge_expired())
    }
}

/// Blocking [`crate::pagination::SearchClient`]
#[derive(Debug, Clone)]
pub struct SearchClient {
    inner: pagination::SearchClient,
    runtime: Arc<Runtime>,
}

impl SearchClient {
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        Ok(Self::new(&Transport::from_config(config)?))
    }

    /// Search through an existing blocking transport, sharing its runtime
    pub fn new(transport: &Transport) -> Self {
        Self {
            inner: pagination::SearchClient::new(Arc::clone(&transport.inner)),
            runtime: Arc::clone(&transport.runtime),
        }
    }

    pub fn request(&self, endpoint: &str, params: &[(String, String)]) -> Result<Payload> {
        self.runtime.block_on(self.inner.request(endpoint, params))
    }

    pub fn first_page(&self, query: &SearchQuery) -> Result<SearchPage> {
        self.runtime.block_on(self.inner.first_page(query))
    }

    /// Pages of a single-category query
    pub fn iterate_pages(&self, query: SearchQuery) -> Result<Pages> {
        Ok(Pages {
            pager: self.inner.category_pager(query)?,
            runtime: Arc::clone(&self.runtime),
        })
    }

    /// `(category, page)` pairs of a multi-category query
    pub fn iterate_pages_by_category(&self, query: SearchQuery) -> Result<CategoryPages> {
        Ok(CategoryPages {
            pager: self.inner.multi_category_pager(query)?,
            runtime: Arc::clone(&self.runtime),
        })
    }

    /// Individual records across every category of `query`
    pub fn iterate_records(&self, query: SearchQuery) -> Result<Records> {
        Ok(Records {
            pages: self.iterate_pages_by_category(query)?,
            buffer: VecDeque::new(),
        })
    }
}

/// Iterator over single-category pages
#[derive(Debug)]
pub struct Pages {
    pager: CategoryPager,
    runtime: Arc<Runtime>,
}

impl Pages {
    /// Why iteration ended early, if it did
    pub fn last_error(&self) -> Option<&Error> {
        self.pager.last_error()
    }
}

impl Iterator for Pages {
    type Item = SearchPage;

    fn next(&mut self) -> Option<SearchPage> {
        self.runtime.block_on(self.pager.next_page())
    }
}

/// Iterator over `(category, page)` pairs
#[derive(Debug)]
pub struct CategoryPages {
    pager: MultiCategoryPager,
    runtime: Arc<Runtime>,
}

impl CategoryPages {
    pub fn last_error(&self) -> Option<&Error> {
        self.pager.last_error()
    }
}

impl Iterator for CategoryPages {
    type Item = (Category, SearchPage);

    fn next(&mut self) -> Option<Self::Item> {
        self.runtime.block_on(self.pager.next_page())
    }
}

/// Iterator over records, fetching pages as the buffer drains
#[derive(Debug)]
pub struct Records {
    pages: CategoryPages,
    buffer: VecDeque<Record>,
}

impl Records {
    pub fn last_error(&self) -> Option<&Error> {
        self.pages.last_error()
    }
}

impl Iterator for Records {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        loop {
            if let Some(record) = self.buffer.pop_front() {
                return Some(record);
            }
            let (_, page) = self.pages.next()?;
            self.buffer.extend(page.into_records());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use crate::error::ErrorKind;
    use crate::rate_limit::RateLimiterConfig;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Mock server on its own runtime, so the blocking client can run on the test thread
    fn start_server() -> (Runtime, MockServer) {
        let runtime = Runtime::new().unwrap();
        let server = runtime.block_on(MockServer::start());
        (runtime, server)
    }

    fn config_for(server: &MockServer, retry: RetryConfig) -> ClientConfig {
        ClientConfig::builder()
            .base_url(server.uri())
            .api_key("test-key")
            .retry(retry)
            .rate_limit(RateLimiterConfig::unthrottled())
            .build()
    }

    fn page(code: &str, ids: &[&str], next: Option<&str>) -> JsonValue {
        let mut records = json!({
            "total": 10,
            "work": ids.iter().map(|id| json!({"id": id})).collect::<Vec<_>>()
        });
        if let Some(next) = next {
            records["nextStart"] = json!(next);
        }
        json!({"query": "cats", "category": [{"code": code, "records": records}]})
    }

    #[test]
    fn test_blocking_request_retries() {
        let (rt, server) = start_server();
        rt.block_on(async {
            Mock::given(method("GET"))
                .and(path("/result"))
                .respond_with(ResponseTemplate::new(502))
                .up_to_n_times(1)
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path("/result"))
                .respond_with(ResponseTemplate::new(200).set_body_json(page("book", &["1"], None)))
                .mount(&server)
                .await;
        });

        let transport = Transport::from_config(config_for(
            &server,
            RetryConfig::fixed(2, Duration::from_millis(5)),
        ))
        .unwrap();
        let body = transport.request_json("result", &[]).unwrap();
        assert_eq!(body["query"], "cats");

        let stats = transport.stats();
        assert_eq!(stats.network_attempts, 2);
        assert_eq!(stats.retries, 1);
    }

    #[test]
    fn test_blocking_pages_iterator() {
        let (rt, server) = start_server();
        rt.block_on(async {
            for (cursor, body) in [
                ("*", page("book", &["1"], Some("c2"))),
                ("c2", page("book", &["2"], Some("c3"))),
                ("c3", page("book", &["3"], None)),
            ] {
                Mock::given(method("GET"))
                    .and(path("/result"))
                    .and(query_param("s", cursor))
                    .respond_with(ResponseTemplate::new(200).set_body_json(body))
                    .expect(1)
                    .mount(&server)
                    .await;
            }
        });

        let client = SearchClient::from_config(config_for(&server, RetryConfig::none())).unwrap();
        let pages: Vec<SearchPage> = client
            .iterate_pages(SearchQuery::new([Category::Book]))
            .unwrap()
            .collect();
        assert_eq!(pages.len(), 3);
        assert!(pages[2].cursors.is_empty());

        let records: Vec<Record> = client
            .iterate_records(SearchQuery::new([Category::Book]))
            .unwrap()
            .collect();
        // Second walk is served from the cache.
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn test_blocking_iterator_failure_is_inspectable() {
        let (rt, server) = start_server();
        rt.block_on(async {
            Mock::given(method("GET"))
                .and(path("/result"))
                .respond_with(ResponseTemplate::new(401))
                .mount(&server)
                .await;
        });

        let client = SearchClient::from_config(config_for(&server, RetryConfig::none())).unwrap();
        let mut pages = client
            .iterate_pages_by_category(SearchQuery::new([Category::Book, Category::Image]))
            .unwrap();
        assert!(pages.next().is_none());
        assert_eq!(
            pages.last_error().map(Error::kind),
            Some(ErrorKind::Authentication)
        );
    }
}
