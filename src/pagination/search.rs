//! Search entry points built on the transport

use super::page::SearchPage;
use super::pager::{
    CategoryPageStream, CategoryPager, MultiCategoryPager, PageStream, RecordStream,
    SEARCH_ENDPOINT,
};
use super::query::{Cursor, SearchQuery};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::http::Transport;
use crate::types::Payload;
use std::sync::Arc;

/// Search client; cheap to clone, all clones share one transport
#[derive(Debug, Clone)]
pub struct SearchClient {
    transport: Arc<Transport>,
}

impl SearchClient {
    pub fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    /// Build a transport from `config` and wrap it
    pub async fn from_config(config: ClientConfig) -> Result<Self> {
        Ok(Self::new(Arc::new(Transport::from_config(config).await?)))
    }

    pub fn transport(&self) -> &Arc<Transport> {
        &self.transport
    }

    /// Raw GET through the transport
    pub async fn request(&self, endpoint: &str, params: &[(String, String)]) -> Result<Payload> {
        self.transport.request(endpoint, params).await
    }

    /// First page of `query` across all its categories. Errors propagate.
    pub async fn first_page(&self, query: &SearchQuery) -> Result<SearchPage> {
        query.validate()?;
        let body = self
            .transport
            .request_json(SEARCH_ENDPOINT, &query.to_params(&Cursor::First))
            .await?;
        SearchPage::from_json(&body)
    }

    /// Pager over a single-category query
    pub fn category_pager(&self, query: SearchQuery) -> Result<CategoryPager> {
        CategoryPager::new(Arc::clone(&self.transport), query)
    }

    /// Pager over a query with any number of categories
    pub fn multi_category_pager(&self, query: SearchQuery) -> Result<MultiCategoryPager> {
        MultiCategoryPager::new(Arc::clone(&self.transport), query)
    }

    /// Pages of a single-category query. Invalid queries fail here, before
    /// any request; transport failures end the stream.
    pub fn iterate_pages(&self, query: SearchQuery) -> Result<PageStream> {
        Ok(self.category_pager(query)?.into_stream())
    }

    /// Individual records of `query`, across all its categories
    pub fn iterate_records(&self, query: SearchQuery) -> Result<RecordStream> {
        Ok(self.multi_category_pager(query)?.into_record_stream())
    }

    /// `(category, page)` pairs of a multi-category query
    pub fn iterate_pages_by_category(&self, query: SearchQuery) -> Result<CategoryPageStream> {
        Ok(self.multi_category_pager(query)?.into_stream())
    }
}
