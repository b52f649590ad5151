//! Search query description and wire-parameter encoding

use crate::error::{Error, Result};
use crate::http::MAX_PAGE_SIZE;
use crate::types::{Category, Params, RecordLevel, SortBy, FILTER_PREFIX};
use serde::{Deserialize, Serialize};

/// Position within one category's result set
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Cursor {
    /// Start of the result set, sent as `*`
    First,
    /// Opaque continuation issued by the server
    Next(String),
}

impl Cursor {
    /// Wire value of [`Cursor::First`]
    pub const SENTINEL: &'static str = "*";

    /// Value of the `s` parameter
    pub fn as_param(&self) -> &str {
        match self {
            Cursor::First => Self::SENTINEL,
            Cursor::Next(token) => token,
        }
    }

    /// Parse a wire value; `*` is the first page
    pub fn from_param(value: impl Into<String>) -> Self {
        let value = value.into();
        if value == Self::SENTINEL {
            Cursor::First
        } else {
            Cursor::Next(value)
        }
    }
}

/// A search over one or more categories.
///
/// Filters are stored without their `l-` prefix and are narrowed per
/// category by [`SearchQuery::scoped_to`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchQuery {
    pub categories: Vec<Category>,
    /// Free-text query (`q`)
    pub text: Option<String>,
    /// Records per page (`n`)
    pub page_size: Option<u32>,
    pub sort: Option<SortBy>,
    pub record_level: Option<RecordLevel>,
    /// `(name, value)` filters, sent as `l-<name>=<value>`
    pub filters: Vec<(String, String)>,
    pub facets: Vec<String>,
    /// Optional record fields to include
    pub include: Vec<String>,
    pub bulk_harvest: bool,
}

impl SearchQuery {
    /// Create a query over `categories`
    pub fn new(categories: impl IntoIterator<Item = Category>) -> Self {
        let mut query = Self::default();
        for category in categories {
            if !query.categories.contains(&category) {
                query.categories.push(category);
            }
        }
        query
    }

    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    #[must_use]
    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size);
        self
    }

    #[must_use]
    pub fn sort(mut self, sort: SortBy) -> Self {
        self.sort = Some(sort);
        self
    }

    #[must_use]
    pub fn record_level(mut self, level: RecordLevel) -> Self {
        self.record_level = Some(level);
        self
    }

    /// Add a filter; a leading `l-` on `name` is accepted and dropped
    #[must_use]
    pub fn filter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let name = name
            .strip_prefix(FILTER_PREFIX)
            .map(str::to_string)
            .unwrap_or(name);
        self.filters.push((name, value.into()));
        self
    }

    #[must_use]
    pub fn facet(mut self, facet: impl Into<String>) -> Self {
        self.facets.push(facet.into());
        self
    }

    #[must_use]
    pub fn include(mut self, field: impl Into<String>) -> Self {
        self.include.push(field.into());
        self
    }

    #[must_use]
    pub fn bulk_harvest(mut self, enabled: bool) -> Self {
        self.bulk_harvest = enabled;
        self
    }

    /// Check the query locally before any request is made
    pub fn validate(&self) -> Result<()> {
        if self.categories.is_empty() {
            return Err(Error::validation("at least one category is required"));
        }
        if let Some(size) = self.page_size {
            if !(1..=MAX_PAGE_SIZE).contains(&size) {
                return Err(Error::validation(format!(
                    "page size must be between 1 and {MAX_PAGE_SIZE}, got {size}"
                )));
            }
        }
        for (name, _) in &self.filters {
            if name.trim().is_empty() {
                return Err(Error::validation("filter names must not be empty"));
            }
        }
        if self.facets.iter().chain(&self.include).any(|v| v.trim().is_empty()) {
            return Err(Error::validation("facet and include names must not be empty"));
        }
        Ok(())
    }

    /// Same query restricted to `category`, keeping only filters it accepts
    pub fn scoped_to(&self, category: Category) -> Self {
        Self {
            categories: vec![category],
            filters: self
                .filters
                .iter()
                .filter(|(name, _)| category.accepts_filter(name))
                .cloned()
                .collect(),
            ..self.clone()
        }
    }

    /// Wire parameters for the page at `cursor`
    pub fn to_params(&self, cursor: &Cursor) -> Params {
        let mut params: Params = self
            .categories
            .iter()
            .map(|c| ("category".to_string(), c.code().to_string()))
            .collect();
        if let Some(text) = &self.text {
            params.push(("q".into(), text.clone()));
        }
        params.push(("s".into(), cursor.as_param().to_string()));
        if let Some(size) = self.page_size {
            params.push(("n".into(), size.to_string()));
        }
        if let Some(sort) = self.sort {
            params.push(("sortby".into(), sort.as_str().into()));
        }
        if let Some(level) = self.record_level {
            params.push(("reclevel".into(), level.as_str().into()));
        }
        for (name, value) in &self.filters {
            params.push((format!("{FILTER_PREFIX}{name}"), value.clone()));
        }
        params.extend(self.facets.iter().map(|f| ("facet".to_string(), f.clone())));
        params.extend(self.include.iter().map(|i| ("include".to_string(), i.clone())));
        if self.bulk_harvest {
            params.push(("bulkHarvest".into(), "true".into()));
        }
        params
    }
}
