//! Pagination module
//!
//! Walks search results through opaque, server-issued, per-category cursors.
//!
//! # Overview
//!
//! A single-category sequence starts at the `*` cursor and follows each
//! page's continuation until none is returned. A multi-category sequence
//! issues one combined request, yields each category's first page from it,
//! then continues every category that has a cursor with a request scoped to
//! that category (carrying only the filters it accepts).

mod page;
mod pager;
mod query;
mod search;
mod state;

pub use page::{CategoryResult, Record, SearchPage};
pub use pager::{
    CategoryPageStream, CategoryPager, MultiCategoryPager, PageStream, RecordStream,
    SEARCH_ENDPOINT,
};
pub use query::{Cursor, SearchQuery};
pub use search::SearchClient;
pub use state::{CategoryCursor, PaginationState};
