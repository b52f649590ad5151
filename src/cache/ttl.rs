//! Cache lifetime policy
//!
//! Lifetime is a pure function of the route, the decoded response and the
//! request parameters:
//!
//! 1. any record in a transitional state pins the fixed short TTL;
//! 2. otherwise the route default applies, stretched for historical date
//!    filters (×8) or bulk harvests (×4);
//! 3. small, non-historical search results are cut to a third.

use crate::config::secs;
use crate::types::{self, JsonValue, Payload};
use chrono::Datelike;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;

/// Record statuses that signal content about to change
pub const TRANSITIONAL_STATUSES: &[&str] = &["coming soon", "pending", "in progress"];

/// `date:[1900 TO 1950]` ranges inside a free-text query
static DATE_RANGE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)date:\[\s*(\d{4}|\*)[^\s\]]*\s+TO\s+(\d{4}|\*)[^\s\]]*\s*\]")
        .expect("Invalid date range regex")
});

/// Kind of endpoint, for default lifetimes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Search results (`result`)
    Search,
    /// A single record or title (`work/{id}`, `newspaper/title/{id}`, ...)
    Record,
    /// Anything else
    Other,
}

impl Route {
    /// Classify an endpoint path
    pub fn classify(endpoint: &str) -> Self {
        let segments: Vec<&str> = endpoint
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        match segments.as_slice() {
            ["result"] => Route::Search,
            ["work" | "newspaper" | "magazine" | "gazette" | "people" | "list", id]
                if *id != "titles" =>
            {
                Route::Record
            }
            ["newspaper" | "magazine" | "gazette", "title", _] => Route::Record,
            _ => Route::Other,
        }
    }
}

/// TTL policy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TtlPolicy {
    /// Default for search results
    #[serde(with = "secs")]
    pub search: Duration,
    /// Default for single-record fetches
    #[serde(with = "secs")]
    pub record: Duration,
    /// Default for everything else
    #[serde(with = "secs")]
    pub other: Duration,
    /// Fixed lifetime when any record is in a transitional state
    #[serde(with = "secs")]
    pub transitional: Duration,
    /// Totals below this are considered volatile
    pub small_result_threshold: u64,
    pub small_result_divisor: u32,
    pub bulk_multiplier: u32,
    pub historical_multiplier: u32,
    /// Date filters ending more than this many years ago are historical
    pub historical_age_years: i32,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            search: Duration::from_secs(15 * 60),
            record: Duration::from_secs(24 * 60 * 60),
            other: Duration::from_secs(60 * 60),
            transitional: Duration::from_secs(60),
            small_result_threshold: 10,
            small_result_divisor: 3,
            bulk_multiplier: 4,
            historical_multiplier: 8,
            historical_age_years: 20,
        }
    }
}

impl TtlPolicy {
    /// Default lifetime for a route
    pub fn default_for(&self, route: Route) -> Duration {
        match route {
            Route::Search => self.search,
            Route::Record => self.record,
            Route::Other => self.other,
        }
    }

    /// Lifetime for a response, judged against the current year
    pub fn ttl_for(&self, endpoint: &str, params: &[(String, String)], payload: &Payload) -> Duration {
        self.ttl_for_year(endpoint, params, payload, chrono::Utc::now().year())
    }

    /// Lifetime for a response, judged against `current_year`
    pub fn ttl_for_year(
        &self,
        endpoint: &str,
        params: &[(String, String)],
        payload: &Payload,
        current_year: i32,
    ) -> Duration {
        let body = payload.as_json();
        if body.is_some_and(has_transitional_record) {
            return self.transitional;
        }

        let route = Route::classify(endpoint);
        let base = self.default_for(route);
        let historical = is_historical(params, current_year - self.historical_age_years);
        let multiplier = if historical {
            self.historical_multiplier
        } else if is_bulk_harvest(params) {
            self.bulk_multiplier
        } else {
            1
        };
        let ttl = base.saturating_mul(multiplier.max(1));

        let small = route == Route::Search
            && body
                .and_then(reported_total)
                .is_some_and(|total| total < self.small_result_threshold);
        if small && !historical {
            ttl / self.small_result_divisor.max(1)
        } else {
            ttl
        }
    }
}

/// Whether the request carries `bulkHarvest=true`
pub fn is_bulk_harvest(params: &[(String, String)]) -> bool {
    params
        .iter()
        .any(|(name, value)| name == "bulkHarvest" && value.eq_ignore_ascii_case("true"))
}

/// Whether every date filter ends before `cutoff_year`. Requests without
/// date filters, or with open-ended or unreadable ones, are not historical.
pub fn is_historical(params: &[(String, String)], cutoff_year: i32) -> bool {
    let mut seen = false;
    for (name, value) in params {
        let end_year = match name.as_str() {
            "l-decade" => decade_end(value),
            "l-year" => value.trim().parse::<i32>().ok(),
            "q" => {
                let mut ranges = DATE_RANGE_REGEX.captures_iter(value).peekable();
                if ranges.peek().is_none() {
                    continue;
                }
                let mut latest = Some(i32::MIN);
                for caps in ranges {
                    latest = match (latest, caps[2].parse::<i32>().ok()) {
                        (Some(a), Some(b)) => Some(a.max(b)),
                        _ => None,
                    };
                }
                latest
            }
            _ => continue,
        };
        seen = true;
        match end_year {
            Some(year) if year < cutoff_year => {}
            _ => return false,
        }
    }
    seen
}

/// Last year of a decade filter: `190` means the 1900s
fn decade_end(value: &str) -> Option<i32> {
    let value = value.trim();
    let decade: i32 = value.parse().ok()?;
    match value.len() {
        3 => Some(decade * 10 + 9),
        4 => Some(decade - decade % 10 + 9),
        _ => None,
    }
}

/// Sum of reported totals across category blocks, saturating; `None` when
/// any block lacks a total
fn reported_total(body: &JsonValue) -> Option<u64> {
    let blocks = types::category_blocks(body);
    if blocks.is_empty() {
        return None;
    }
    blocks.iter().try_fold(0u64, |acc, block| {
        types::block_total(block).map(|total| acc.saturating_add(total))
    })
}

fn has_transitional_record(body: &JsonValue) -> bool {
    let blocks = types::category_blocks(body);
    if blocks.is_empty() {
        return is_transitional(body);
    }
    blocks
        .iter()
        .flat_map(types::block_records)
        .any(is_transitional)
}

fn is_transitional(record: &JsonValue) -> bool {
    record
        .get("status")
        .and_then(JsonValue::as_str)
        .is_some_and(|status| {
            TRANSITIONAL_STATUSES
                .iter()
                .any(|t| t.eq_ignore_ascii_case(status.trim()))
        })
}
