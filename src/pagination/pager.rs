//! Cursor-driven pagers
//!
//! Pagers never raise past pages they have already produced: a failed
//! request ends the sequence and is kept for [`CategoryPager::last_error`]
//! / [`MultiCategoryPager::last_error`].

use super::page::{Record, SearchPage};
use super::query::SearchQuery;
use super::state::PaginationState;
use crate::error::{Error, Result};
use crate::http::Transport;
use crate::types::{Category, Params};
use futures::stream::{self, Stream, StreamExt};
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, warn};

/// Search endpoint, relative to the base URL
pub const SEARCH_ENDPOINT: &str = "result";

/// Lazily fetched pages of a single category
pub type PageStream = Pin<Box<dyn Stream<Item = SearchPage> + Send>>;

/// Lazily fetched `(category, page)` pairs
pub type CategoryPageStream = Pin<Box<dyn Stream<Item = (Category, SearchPage)> + Send>>;

/// Lazily fetched records
pub type RecordStream = Pin<Box<dyn Stream<Item = Record> + Send>>;

async fn fetch_page(transport: &Transport, params: &Params) -> Result<SearchPage> {
    let body = transport.request_json(SEARCH_ENDPOINT, params).await?;
    SearchPage::from_json(&body)
}

// ============================================================================
// Single Category
// ============================================================================

/// Walks one category from the first page until its cursor runs out
#[derive(Debug)]
pub struct CategoryPager {
    transport: Arc<Transport>,
    category: Category,
    state: PaginationState,
    last_error: Option<Error>,
}

impl CategoryPager {
    /// Fails with `Validation` unless `query` names exactly one category
    pub fn new(transport: Arc<Transport>, query: SearchQuery) -> Result<Self> {
        query.validate()?;
        let &[category] = query.categories.as_slice() else {
            return Err(Error::validation(format!(
                "single-category pagination needs exactly one category, got {}",
                query.categories.len()
            )));
        };
        Ok(Self {
            transport,
            category,
            state: PaginationState::new(query),
            last_error: None,
        })
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn state(&self) -> &PaginationState {
        &self.state
    }

    pub fn is_exhausted(&self) -> bool {
        self.state.is_done()
    }

    pub fn pages_fetched(&self) -> u64 {
        self.state.pages_fetched(self.category)
    }

    /// Why the sequence ended early, if it did
    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    pub fn take_error(&mut self) -> Option<Error> {
        self.last_error.take()
    }

    /// Fetch the next page; `None` once exhausted or after a failure
    pub async fn next_page(&mut self) -> Option<SearchPage> {
        let params = self.state.scoped_params(self.category)?;
        match fetch_page(&self.transport, &params).await {
            Ok(page) => {
                self.state
                    .record_page(self.category, page.next_cursor(self.category));
                if self.state.is_done() {
                    debug!(
                        category = %self.category,
                        pages = self.pages_fetched(),
                        "Category exhausted"
                    );
                }
                Some(page)
            }
            Err(error) => {
                warn!(
                    category = %self.category,
                    pages = self.pages_fetched(),
                    error = %error,
                    "Pagination stopped after failure"
                );
                self.state.exhaust_all();
                self.last_error = Some(error);
                None
            }
        }
    }

    pub fn into_stream(self) -> PageStream {
        Box::pin(stream::unfold(self, |mut pager| async move {
            let page = pager.next_page().await?;
            Some((page, pager))
        }))
    }
}

// ============================================================================
// Multiple Categories
// ============================================================================

/// Walks several categories: one combined first request, then a
/// category-scoped continuation per category that still has a cursor.
///
/// Every first-page block is yielded before any continuation, then each
/// category runs to completion in request order. A failed continuation
/// ends only that category; `last_error` keeps the most recent failure.
#[derive(Debug)]
pub struct MultiCategoryPager {
    transport: Arc<Transport>,
    state: PaginationState,
    started: bool,
    ready: VecDeque<(Category, SearchPage)>,
    last_error: Option<Error>,
}

impl MultiCategoryPager {
    pub fn new(transport: Arc<Transport>, query: SearchQuery) -> Result<Self> {
        query.validate()?;
        Ok(Self {
            transport,
            state: PaginationState::new(query),
            started: false,
            ready: VecDeque::new(),
            last_error: None,
        })
    }

    pub fn state(&self) -> &PaginationState {
        &self.state
    }

    pub fn is_exhausted(&self) -> bool {
        self.started && self.ready.is_empty() && self.state.is_done()
    }

    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    pub fn take_error(&mut self) -> Option<Error> {
        self.last_error.take()
    }

    /// Fetch the next `(category, page)` pair
    pub async fn next_page(&mut self) -> Option<(Category, SearchPage)> {
        if !self.started {
            self.started = true;
            self.start().await;
        }
        if let Some(item) = self.ready.pop_front() {
            return Some(item);
        }

        // A failed continuation ends only its own category.
        loop {
            let category = self.state.next_pending()?;
            let Some(params) = self.state.scoped_params(category) else {
                self.state.exhaust(category);
                continue;
            };
            match fetch_page(&self.transport, &params).await {
                Ok(page) => {
                    self.state.record_page(category, page.next_cursor(category));
                    return Some((category, page));
                }
                Err(error) => self.fail(Some(category), error),
            }
        }
    }

    pub fn into_stream(self) -> CategoryPageStream {
        Box::pin(stream::unfold(self, |mut pager| async move {
            let item = pager.next_page().await?;
            Some((item, pager))
        }))
    }

    /// Records of every page, in page order
    pub fn into_record_stream(self) -> RecordStream {
        Box::pin(
            self.into_stream()
                .flat_map(|(_, page)| stream::iter(page.into_records())),
        )
    }

    /// Issue the combined request and queue one page per returned category
    async fn start(&mut self) {
        let params = self.state.combined_params();
        let page = match fetch_page(&self.transport, &params).await {
            Ok(page) => page,
            Err(error) => {
                self.fail(None, error);
                return;
            }
        };

        for (category, page) in page.split_by_category() {
            if self.state.is_exhausted(category) || self.state.pages_fetched(category) > 0 {
                debug!(category = %category, "Ignoring unrequested or duplicate category block");
                continue;
            }
            self.state.record_page(category, page.next_cursor(category));
            self.ready.push_back((category, page));
        }

        let missing: Vec<Category> = self
            .state
            .entries()
            .iter()
            .filter(|e| e.pages == 0)
            .map(|e| e.category)
            .collect();
        for category in missing {
            debug!(category = %category, "Category absent from combined response");
            self.state.exhaust(category);
        }
    }

    /// Stop `category` after a failure, or every category when the combined
    /// request itself failed
    fn fail(&mut self, category: Option<Category>, error: Error) {
        match category {
            Some(category) => {
                warn!(
                    category = %category,
                    pages = self.state.pages_fetched(category),
                    error = %error,
                    "Category pagination stopped after failure"
                );
                self.state.exhaust(category);
            }
            None => {
                warn!(error = %error, "Combined search request failed");
                self.state.exhaust_all();
            }
        }
        self.last_error = Some(error);
    }
}
