//! Result pages decoded from the search envelope

use crate::error::{Error, Result};
use crate::types::{self, Category, JsonValue};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// One raw record tagged with the category it came from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub category: Category,
    pub data: JsonValue,
}

/// One category block of a search response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryResult {
    pub category: Category,
    /// Display name echoed by the server
    pub name: Option<String>,
    pub total: u64,
    /// Continuation cursor; `None` when the category is exhausted
    pub next_cursor: Option<String>,
    /// Records read from the category's container
    pub records: Vec<JsonValue>,
}

impl CategoryResult {
    /// Decode a raw block; `None` for unknown category codes
    pub fn from_block(block: &JsonValue) -> Option<Self> {
        let category = types::block_category(block)?;
        Some(Self {
            category,
            name: block.get("name").and_then(JsonValue::as_str).map(str::to_string),
            total: types::block_total(block).unwrap_or_default(),
            next_cursor: types::block_cursor(block).map(str::to_string),
            records: types::block_records(block).to_vec(),
        })
    }
}

/// A page of search results.
///
/// A category with no entry in `cursors` is exhausted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchPage {
    /// Query echoed by the server
    pub query: Option<String>,
    pub categories: Vec<CategoryResult>,
    /// Sum of the per-category totals
    pub total_results: u64,
    pub cursors: BTreeMap<Category, String>,
}

impl SearchPage {
    /// Decode a search envelope
    pub fn from_json(body: &JsonValue) -> Result<Self> {
        if !body.is_object() {
            return Err(Error::decode("search response is not a JSON object"));
        }
        let categories: Vec<CategoryResult> = types::category_blocks(body)
            .iter()
            .filter_map(|block| {
                let result = CategoryResult::from_block(block);
                if result.is_none() {
                    debug!(code = ?block.get("code"), "Skipping block with unknown category");
                }
                result
            })
            .collect();
        Ok(Self::assemble(
            body.get("query").and_then(JsonValue::as_str).map(str::to_string),
            categories,
        ))
    }

    fn assemble(query: Option<String>, categories: Vec<CategoryResult>) -> Self {
        let cursors = categories
            .iter()
            .filter_map(|c| c.next_cursor.clone().map(|cursor| (c.category, cursor)))
            .collect();
        let total_results = categories
            .iter()
            .fold(0u64, |acc, c| acc.saturating_add(c.total));
        Self {
            query,
            categories,
            total_results,
            cursors,
        }
    }

    /// Block for `category`, if the page has one
    pub fn category(&self, category: Category) -> Option<&CategoryResult> {
        self.categories.iter().find(|c| c.category == category)
    }

    pub fn next_cursor(&self, category: Category) -> Option<&str> {
        self.cursors.get(&category).map(String::as_str)
    }

    /// Whether any category has a continuation
    pub fn has_more(&self) -> bool {
        !self.cursors.is_empty()
    }

    /// Records of every block, in block order
    pub fn records(&self) -> impl Iterator<Item = Record> + '_ {
        self.categories.iter().flat_map(|block| {
            block.records.iter().map(move |data| Record {
                category: block.category,
                data: data.clone(),
            })
        })
    }

    pub fn into_records(self) -> Vec<Record> {
        self.categories
            .into_iter()
            .flat_map(|block| {
                let category = block.category;
                block
                    .records
                    .into_iter()
                    .map(move |data| Record { category, data })
            })
            .collect()
    }

    /// Split a combined page into one single-category page per block
    pub fn split_by_category(self) -> Vec<(Category, SearchPage)> {
        let query = self.query;
        self.categories
            .into_iter()
            .map(|block| (block.category, Self::assemble(query.clone(), vec![block])))
            .collect()
    }
}
