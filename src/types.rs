//! Common types used throughout the catalog client
//!
//! This module contains shared type definitions, type aliases, and the
//! static per-category tables (record container, applicable filters).

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// Ordered query parameters. Keys may repeat (`category`, `facet`, `include`).
pub type Params = Vec<(String, String)>;

// ============================================================================
// Categories
// ============================================================================

/// A partition of the catalog searched independently within one query
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Book,
    Diary,
    Image,
    List,
    Magazine,
    Music,
    Newspaper,
    People,
    Research,
}

impl Category {
    /// Every category the API knows about
    pub const ALL: [Category; 9] = [
        Category::Book,
        Category::Diary,
        Category::Image,
        Category::List,
        Category::Magazine,
        Category::Music,
        Category::Newspaper,
        Category::People,
        Category::Research,
    ];

    /// Wire code of this category
    pub fn code(self) -> &'static str {
        match self {
            Category::Book => "book",
            Category::Diary => "diary",
            Category::Image => "image",
            Category::List => "list",
            Category::Magazine => "magazine",
            Category::Music => "music",
            Category::Newspaper => "newspaper",
            Category::People => "people",
            Category::Research => "research",
        }
    }

    /// Collection under `records` that holds this category's records
    pub fn container(self) -> RecordContainer {
        match self {
            Category::Newspaper | Category::Magazine => RecordContainer::Article,
            Category::People => RecordContainer::People,
            Category::List => RecordContainer::List,
            Category::Book
            | Category::Diary
            | Category::Image
            | Category::Music
            | Category::Research => RecordContainer::Work,
        }
    }

    /// Filter names (without the `l-` prefix) this category accepts
    pub fn applicable_filters(self) -> &'static [&'static str] {
        match self {
            Category::Book => BOOK_FILTERS,
            Category::Diary => DIARY_FILTERS,
            Category::Image => IMAGE_FILTERS,
            Category::List => LIST_FILTERS,
            Category::Magazine => MAGAZINE_FILTERS,
            Category::Music => MUSIC_FILTERS,
            Category::Newspaper => NEWSPAPER_FILTERS,
            Category::People => PEOPLE_FILTERS,
            Category::Research => RESEARCH_FILTERS,
        }
    }

    /// Whether `filter` (with or without `l-` prefix) applies to this category
    pub fn accepts_filter(self, filter: &str) -> bool {
        let name = filter.strip_prefix(FILTER_PREFIX).unwrap_or(filter);
        self.applicable_filters().contains(&name)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Category::ALL
            .into_iter()
            .find(|c| c.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::validation(format!("unknown category '{s}'")))
    }
}

/// Prefix of filter ("limit") parameters on the wire
pub const FILTER_PREFIX: &str = "l-";

const COMMON_FILTERS: &[&str] = &["firstnation", "culturalSensitivity"];

const BOOK_FILTERS: &[&str] = &[
    "decade", "year", "format", "artType", "language", "availability", "australian",
    "occupation", "zoom", "birth", "death", "geocoverage", "contribcollection", "audience",
    "firstnation", "culturalSensitivity",
];
const DIARY_FILTERS: &[&str] = &[
    "decade", "year", "format", "artType", "language", "availability", "australian",
    "geocoverage", "contribcollection", "firstnation", "culturalSensitivity",
];
const IMAGE_FILTERS: &[&str] = &[
    "decade", "year", "format", "artType", "availability", "australian", "zoom",
    "geocoverage", "contribcollection", "firstnation", "culturalSensitivity",
];
const MUSIC_FILTERS: &[&str] = &[
    "decade", "year", "format", "artType", "language", "availability", "australian",
    "geocoverage", "contribcollection", "firstnation", "culturalSensitivity",
];
const RESEARCH_FILTERS: &[&str] = &[
    "decade", "year", "format", "artType", "language", "availability", "australian",
    "geocoverage", "contribcollection", "audience", "firstnation", "culturalSensitivity",
];
const NEWSPAPER_FILTERS: &[&str] = &[
    "decade", "year", "month", "category", "title", "illustrated", "illustrationType",
    "wordCount", "artType", "state", "firstnation", "culturalSensitivity",
];
const MAGAZINE_FILTERS: &[&str] = &[
    "decade", "year", "month", "category", "title", "illustrated", "illustrationType",
    "wordCount", "artType", "firstnation", "culturalSensitivity",
];
const PEOPLE_FILTERS: &[&str] = &["occupation", "birth", "death", "firstnation", "culturalSensitivity"];
const LIST_FILTERS: &[&str] = COMMON_FILTERS;

// ============================================================================
// Record Containers
// ============================================================================

/// Name of the collection a category block stores its records under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordContainer {
    Work,
    Article,
    People,
    List,
}

impl RecordContainer {
    /// Field name on the wire
    pub fn field(self) -> &'static str {
        match self {
            RecordContainer::Work => "work",
            RecordContainer::Article => "article",
            RecordContainer::People => "people",
            RecordContainer::List => "list",
        }
    }
}

// ============================================================================
// Request Options
// ============================================================================

/// Response encoding, negotiated via the `Accept` header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    #[default]
    Json,
    Xml,
}

impl Encoding {
    /// MIME type sent in the `Accept` header
    pub fn mime(self) -> &'static str {
        match self {
            Encoding::Json => "application/json",
            Encoding::Xml => "application/xml",
        }
    }
}

/// Result ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Relevance,
    DateDesc,
    DateAsc,
}

impl SortBy {
    pub fn as_str(self) -> &'static str {
        match self {
            SortBy::Relevance => "relevance",
            SortBy::DateDesc => "datedesc",
            SortBy::DateAsc => "dateasc",
        }
    }
}

impl FromStr for SortBy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "relevance" => Ok(SortBy::Relevance),
            "datedesc" => Ok(SortBy::DateDesc),
            "dateasc" => Ok(SortBy::DateAsc),
            other => Err(Error::validation(format!("unknown sort mode '{other}'"))),
        }
    }
}

/// Amount of detail returned per record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordLevel {
    #[default]
    Brief,
    Full,
}

impl RecordLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordLevel::Brief => "brief",
            RecordLevel::Full => "full",
        }
    }
}

impl FromStr for RecordLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "brief" => Ok(RecordLevel::Brief),
            "full" => Ok(RecordLevel::Full),
            other => Err(Error::validation(format!("unknown record level '{other}'"))),
        }
    }
}

// ============================================================================
// Response Payload
// ============================================================================

/// Decoded response body, as returned by the transport and stored in caches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", content = "body", rename_all = "lowercase")]
pub enum Payload {
    /// JSON document
    Json(JsonValue),
    /// Raw XML text (not parsed)
    Xml(String),
}

impl Payload {
    /// Borrow the JSON document, if this is one
    pub fn as_json(&self) -> Option<&JsonValue> {
        match self {
            Payload::Json(v) => Some(v),
            Payload::Xml(_) => None,
        }
    }

    /// Take the JSON document, failing for XML bodies
    pub fn into_json(self) -> Result<JsonValue> {
        match self {
            Payload::Json(v) => Ok(v),
            Payload::Xml(_) => Err(Error::decode("expected a JSON response, got XML")),
        }
    }
}

// ============================================================================
// Raw Envelope Access
// ============================================================================

/// Category blocks of a search response envelope
pub fn category_blocks(body: &JsonValue) -> &[JsonValue] {
    body.get("category")
        .and_then(JsonValue::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Category of a raw block, if its code is known
pub fn block_category(block: &JsonValue) -> Option<Category> {
    block.get("code")?.as_str()?.parse().ok()
}

/// Records of a raw block, read from its category's container
pub fn block_records(block: &JsonValue) -> &[JsonValue] {
    let Some(category) = block_category(block) else {
        return &[];
    };
    let container = block
        .get("records")
        .and_then(|records| records.get(category.container().field()));
    match container {
        Some(JsonValue::Array(items)) => items.as_slice(),
        Some(single @ JsonValue::Object(_)) => std::slice::from_ref(single),
        _ => &[],
    }
}

/// Reported total of a raw block; the API sends it as a number or a string
pub fn block_total(block: &JsonValue) -> Option<u64> {
    match block.get("records")?.get("total")? {
        JsonValue::Number(n) => n.as_u64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Next-page cursor of a raw block; absent or empty means exhausted
pub fn block_cursor(block: &JsonValue) -> Option<&str> {
    block
        .get("records")?
        .get("nextStart")?
        .as_str()
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_block_accessors() {
        let block = json!({
            "code": "newspaper",
            "records": {
                "total": "42",
                "nextStart": "AoE",
                "article": [{"id": "1"}, {"id": "2"}],
                "work": [{"id": "ignored"}]
            }
        });
        assert_eq!(block_category(&block), Some(Category::Newspaper));
        assert_eq!(block_records(&block).len(), 2);
        assert_eq!(block_total(&block), Some(42));
        assert_eq!(block_cursor(&block), Some("AoE"));

        let last = json!({"code": "book", "records": {"total": 3, "nextStart": "", "work": []}});
        assert_eq!(block_cursor(&last), None);
        assert_eq!(block_total(&last), Some(3));

        let unknown = json!({"code": "photos", "records": {"work": [{}]}});
        assert!(block_records(&unknown).is_empty());
    }

    #[test]
    fn test_category_blocks() {
        let body = json!({"query": "x", "category": [{"code": "book"}, {"code": "image"}]});
        assert_eq!(category_blocks(&body).len(), 2);
        assert!(category_blocks(&json!({"id": "123"})).is_empty());
    }

    #[test]
    fn test_category_round_trip_codes() {
        for category in Category::ALL {
            assert_eq!(category.code().parse::<Category>().unwrap(), category);
        }
        assert_eq!("BOOK".parse::<Category>().unwrap(), Category::Book);
        assert!("photos".parse::<Category>().is_err());
    }

    #[test]
    fn test_container_table() {
        assert_eq!(Category::Book.container(), RecordContainer::Work);
        assert_eq!(Category::Image.container(), RecordContainer::Work);
        assert_eq!(Category::Newspaper.container(), RecordContainer::Article);
        assert_eq!(Category::Magazine.container(), RecordContainer::Article);
        assert_eq!(Category::People.container(), RecordContainer::People);
        assert_eq!(Category::List.container().field(), "list");
    }

    #[test]
    fn test_filter_table() {
        assert!(Category::Book.accepts_filter("decade"));
        assert!(Category::Book.accepts_filter("l-format"));
        assert!(!Category::Book.accepts_filter("l-illustrated"));
        assert!(Category::Newspaper.accepts_filter("illustrated"));
        assert!(!Category::People.accepts_filter("decade"));
        assert!(Category::List.accepts_filter("firstnation"));
    }

    #[test]
    fn test_payload_serde() {
        let payload = Payload::Json(serde_json::json!({"query": "cats"}));
        let text = serde_json::to_string(&payload).unwrap();
        assert_eq!(serde_json::from_str::<Payload>(&text).unwrap(), payload);

        assert!(Payload::Xml("<response/>".into()).into_json().is_err());
    }
}
