//! Per-category cursor bookkeeping

use super::query::{Cursor, SearchQuery};
use crate::types::{Category, Params};
use tracing::warn;

/// Where one category stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCursor {
    pub category: Category,
    /// Cursor of the next page to fetch; `None` once exhausted
    pub cursor: Option<Cursor>,
    /// Pages fetched so far
    pub pages: u64,
}

impl CategoryCursor {
    pub fn is_exhausted(&self) -> bool {
        self.cursor.is_none()
    }
}

/// Cursor state of a (multi-category) pagination sequence.
///
/// Created from the base query with every category at the first page,
/// advanced one category at a time, and done once every category is
/// exhausted.
#[derive(Debug, Clone)]
pub struct PaginationState {
    base: SearchQuery,
    entries: Vec<CategoryCursor>,
}

impl PaginationState {
    pub fn new(base: SearchQuery) -> Self {
        let entries = base
            .categories
            .iter()
            .map(|&category| CategoryCursor {
                category,
                cursor: Some(Cursor::First),
                pages: 0,
            })
            .collect();
        Self { base, entries }
    }

    pub fn base(&self) -> &SearchQuery {
        &self.base
    }

    pub fn entries(&self) -> &[CategoryCursor] {
        &self.entries
    }

    pub fn cursor(&self, category: Category) -> Option<&Cursor> {
        self.entry(category)?.cursor.as_ref()
    }

    /// Whether `category` has no further pages (unknown categories count as exhausted)
    pub fn is_exhausted(&self, category: Category) -> bool {
        self.entry(category).map_or(true, CategoryCursor::is_exhausted)
    }

    pub fn is_done(&self) -> bool {
        self.entries.iter().all(CategoryCursor::is_exhausted)
    }

    pub fn pages_fetched(&self, category: Category) -> u64 {
        self.entry(category).map_or(0, |e| e.pages)
    }

    /// First category, in request order, that still has pages
    pub fn next_pending(&self) -> Option<Category> {
        self.entries
            .iter()
            .find(|e| !e.is_exhausted())
            .map(|e| e.category)
    }

    /// Parameters of the combined first request over every category
    pub fn combined_params(&self) -> Params {
        self.base.to_params(&Cursor::First)
    }

    /// Parameters of the next category-scoped request for `category`
    pub fn scoped_params(&self, category: Category) -> Option<Params> {
        let cursor = self.cursor(category)?;
        Some(self.base.scoped_to(category).to_params(cursor))
    }

    /// Record a fetched page for `category` and move to `next`.
    ///
    /// A page that hands back the cursor it was requested with would repeat
    /// forever, so the category is ended instead.
    pub fn record_page(&mut self, category: Category, next: Option<&str>) {
        let Some(entry) = self.entry_mut(category) else {
            return;
        };
        entry.pages += 1;
        entry.cursor = match (entry.cursor.take(), next) {
            (Some(current), Some(next)) if current.as_param() == next => {
                warn!(category = %category, cursor = %next, "Server repeated a cursor, ending category");
                None
            }
            (_, next) => next.map(Cursor::from_param),
        };
    }

    pub fn exhaust(&mut self, category: Category) {
        if let Some(entry) = self.entry_mut(category) {
            entry.cursor = None;
        }
    }

    pub fn exhaust_all(&mut self) {
        for entry in &mut self.entries {
            entry.cursor = None;
        }
    }

    fn entry(&self, category: Category) -> Option<&CategoryCursor> {
        self.entries.iter().find(|e| e.category == category)
    }

    fn entry_mut(&mut self, category: Category) -> Option<&mut CategoryCursor> {
        self.entries.iter_mut().find(|e| e.category == category)
    }
}
