//! Tests for the cache module

use super::*;
use crate::types::{Encoding, Payload};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use test_case::test_case;

fn payload(n: u64) -> Payload {
    Payload::Json(json!({ "n": n }))
}

fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

// ============================================================================
// MemoryCache Tests
// ============================================================================

#[tokio::test]
async fn test_memory_round_trip() {
    let cache = MemoryCache::default();
    cache.set("k", &payload(1), Duration::from_secs(60)).await.unwrap();
    assert_eq!(cache.get("k").await.unwrap(), Some(payload(1)));
    assert_eq!(cache.get("missing").await.unwrap(), None);
}

#[tokio::test]
async fn test_memory_entry_expires() {
    let cache = MemoryCache::default();
    cache.set("k", &payload(1), Duration::from_millis(40)).await.unwrap();
    assert!(cache.get("k").await.unwrap().is_some());

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(cache.get("k").await.unwrap(), None);
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_memory_zero_ttl_stores_nothing() {
    let cache = MemoryCache::default();
    cache.set("k", &payload(1), Duration::from_secs(60)).await.unwrap();
    cache.set("k", &payload(2), Duration::ZERO).await.unwrap();
    assert_eq!(cache.get("k").await.unwrap(), None);
}

#[tokio::test]
async fn test_memory_evicts_at_capacity() {
    let cache = MemoryCache::new(2);
    cache.set("short", &payload(1), Duration::from_secs(10)).await.unwrap();
    cache.set("long", &payload(2), Duration::from_secs(1000)).await.unwrap();
    cache.set("new", &payload(3), Duration::from_secs(100)).await.unwrap();

    assert_eq!(cache.len(), 2);
    assert_eq!(cache.get("short").await.unwrap(), None);
    assert!(cache.get("long").await.unwrap().is_some());
    assert!(cache.get("new").await.unwrap().is_some());
}

#[tokio::test]
async fn test_memory_purge_and_clear() {
    let cache = MemoryCache::default();
    cache.set("a", &payload(1), Duration::from_millis(10)).await.unwrap();
    cache.set("b", &payload(2), Duration::from_secs(60)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;

    assert_eq!(cache.purge_expired().await.unwrap(), 1);
    assert_eq!(cache.len(), 1);

    cache.clear().await.unwrap();
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_memory_concurrent_access() {
    let cache = Arc::new(MemoryCache::default());
    let mut handles = Vec::new();
    for i in 0..16u64 {
        let cache = Arc::clone(&cache);
        handles.push(tokio::spawn(async move {
            let key = format!("key-{}", i % 4);
            cache.set(&key, &payload(i), Duration::from_secs(60)).await.unwrap();
            assert!(cache.get(&key).await.unwrap().is_some());
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(cache.len(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_memory_concurrent_sets_respect_capacity() {
    let cache = Arc::new(MemoryCache::new(8));
    let handles: Vec<_> = (0..200u64)
        .map(|i| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                cache
                    .set(&format!("key-{i}"), &payload(i), Duration::from_secs(60 + i))
                    .await
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }
    assert!(cache.len() <= 8);
    assert!(!cache.is_empty());
}

// ============================================================================
// FileCache Tests
// ============================================================================

#[tokio::test]
async fn test_file_round_trip() {
    let dir = tempdir().unwrap();
    let cache = FileCache::open(dir.path()).await.unwrap();
    cache.set("k", &payload(7), Duration::from_secs(60)).await.unwrap();
    assert_eq!(cache.get("k").await.unwrap(), Some(payload(7)));
    assert_eq!(cache.get("other").await.unwrap(), None);
}

#[tokio::test]
async fn test_file_survives_reopen() {
    let dir = tempdir().unwrap();
    {
        let cache = FileCache::open(dir.path()).await.unwrap();
        cache.set("k", &payload(7), Duration::from_secs(60)).await.unwrap();
    }
    let reopened = FileCache::open(dir.path()).await.unwrap();
    assert_eq!(reopened.get("k").await.unwrap(), Some(payload(7)));
}

#[tokio::test]
async fn test_file_entry_expires() {
    let dir = tempdir().unwrap();
    let cache = FileCache::open(dir.path()).await.unwrap();
    cache.set("k", &payload(1), Duration::from_millis(40)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(cache.get("k").await.unwrap(), None);
}

#[tokio::test]
async fn test_file_corrupt_entry_is_a_miss() {
    let dir = tempdir().unwrap();
    let cache = FileCache::open(dir.path()).await.unwrap();
    cache.set("k", &payload(1), Duration::from_secs(60)).await.unwrap();

    let entry = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .find(|p| p.extension().is_some_and(|ext| ext == "json"))
        .unwrap();
    std::fs::write(&entry, b"{ not json").unwrap();

    assert_eq!(cache.get("k").await.unwrap(), None);
    assert!(!entry.exists());
}

#[tokio::test]
async fn test_file_purge_remove_and_clear() {
    let dir = tempdir().unwrap();
    let cache = FileCache::open(dir.path()).await.unwrap();
    cache.set("old", &payload(1), Duration::from_millis(10)).await.unwrap();
    cache.set("a", &payload(2), Duration::from_secs(60)).await.unwrap();
    cache.set("b", &payload(3), Duration::from_secs(60)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;

    assert_eq!(cache.purge_expired().await.unwrap(), 1);

    cache.remove("a").await.unwrap();
    assert_eq!(cache.get("a").await.unwrap(), None);
    assert!(cache.get("b").await.unwrap().is_some());

    cache.clear().await.unwrap();
    assert_eq!(cache.get("b").await.unwrap(), None);
}

#[tokio::test]
async fn test_file_stores_xml_payloads() {
    let dir = tempdir().unwrap();
    let cache = FileCache::open(dir.path()).await.unwrap();
    let xml = Payload::Xml("<response><query>cats</query></response>".into());
    cache.set("xml", &xml, Duration::from_secs(60)).await.unwrap();
    assert_eq!(cache.get("xml").await.unwrap(), Some(xml));
}

#[tokio::test]
async fn test_from_config_builds_each_backend() {
    let dir = tempdir().unwrap();
    let memory = from_config(&crate::config::CacheConfig::memory(5)).await.unwrap();
    let file = from_config(&crate::config::CacheConfig::file(dir.path())).await.unwrap();
    let none = from_config(&crate::config::CacheConfig::disabled()).await.unwrap();

    for backend in [&memory, &file] {
        backend.set("k", &payload(1), Duration::from_secs(5)).await.unwrap();
        assert!(backend.get("k").await.unwrap().is_some());
    }
    none.set("k", &payload(1), Duration::from_secs(5)).await.unwrap();
    assert!(none.get("k").await.unwrap().is_none());
}

// ============================================================================
// Cache Key Tests
// ============================================================================

#[test]
fn test_cache_key_ignores_parameter_order() {
    let a = params(&[("q", "cats"), ("category", "book"), ("n", "20")]);
    let b = params(&[("n", "20"), ("q", "cats"), ("category", "book")]);
    assert_eq!(
        cache_key("result", &a, Encoding::Json),
        cache_key("result", &b, Encoding::Json)
    );
}

#[test]
fn test_cache_key_ignores_credentials() {
    let plain = params(&[("q", "cats")]);
    let with_key = params(&[("q", "cats"), ("key", "secret"), ("wskey", "other")]);
    assert_eq!(
        cache_key("result", &plain, Encoding::Json),
        cache_key("result", &with_key, Encoding::Json)
    );
}

#[test]
fn test_cache_key_distinguishes_requests() {
    let base = cache_key("result", &params(&[("q", "cats")]), Encoding::Json);
    assert_ne!(base, cache_key("result", &params(&[("q", "dogs")]), Encoding::Json));
    assert_ne!(
        base,
        cache_key("result", &params(&[("q", "cats"), ("n", "5")]), Encoding::Json)
    );
    assert_ne!(base, cache_key("work/1", &params(&[("q", "cats")]), Encoding::Json));
    assert_ne!(base, cache_key("result", &params(&[("q", "cats")]), Encoding::Xml));
    assert_eq!(base, cache_key("/result/", &params(&[("q", "cats")]), Encoding::Json));
}

#[test]
fn test_cache_key_repeated_params() {
    let a = params(&[("category", "book"), ("category", "image")]);
    let b = params(&[("category", "image"), ("category", "book")]);
    let c = params(&[("category", "book")]);
    assert_eq!(cache_key("result", &a, Encoding::Json), cache_key("result", &b, Encoding::Json));
    assert_ne!(cache_key("result", &a, Encoding::Json), cache_key("result", &c, Encoding::Json));
}

// ============================================================================
// TTL Policy Tests
// ============================================================================

const YEAR: i32 = 2026;

fn search_body(total: u64, status: Option<&str>) -> Payload {
    let mut record = json!({"id": "1"});
    if let Some(status) = status {
        record["status"] = json!(status);
    }
    Payload::Json(json!({
        "query": "cats",
        "category": [{
            "code": "book",
            "records": {"total": total, "work": [record]}
        }]
    }))
}

#[test_case("result", Route::Search ; "search")]
#[test_case("/work/12345", Route::Record ; "work")]
#[test_case("newspaper/18341291", Route::Record ; "article")]
#[test_case("newspaper/title/35", Route::Record ; "newspaper title")]
#[test_case("newspaper/titles", Route::Other ; "title listing")]
#[test_case("contributor", Route::Other ; "contributor")]
fn test_route_classify(endpoint: &str, expected: Route) {
    assert_eq!(Route::classify(endpoint), expected);
}

#[test]
fn test_ttl_route_defaults() {
    let policy = TtlPolicy::default();
    let body = search_body(1000, None);
    assert_eq!(policy.ttl_for_year("result", &[], &body, YEAR), policy.search);
    let record = Payload::Json(json!({"id": "1", "title": "Cats"}));
    assert_eq!(policy.ttl_for_year("work/1", &[], &record, YEAR), policy.record);
    assert!(policy.record > policy.search);
}

#[test]
fn test_ttl_small_result_is_shorter() {
    let policy = TtlPolicy::default();
    let ttl = policy.ttl_for_year("result", &[], &search_body(2, None), YEAR);
    assert!(ttl < policy.search);
    assert_eq!(ttl, policy.search / 3);
}

#[test]
fn test_ttl_huge_totals_do_not_overflow() {
    let policy = TtlPolicy::default();
    let body = Payload::Json(json!({
        "category": [
            {"code": "book", "records": {"total": u64::MAX, "work": []}},
            {"code": "image", "records": {"total": 1, "work": []}}
        ]
    }));
    assert_eq!(policy.ttl_for_year("result", &[], &body, YEAR), policy.search);
}

#[test]
fn test_ttl_bulk_harvest_is_longer() {
    let policy = TtlPolicy::default();
    let bulk = params(&[("bulkHarvest", "true")]);
    let ttl = policy.ttl_for_year("result", &bulk, &search_body(1000, None), YEAR);
    assert!(ttl >= policy.search * 4);
}

#[test]
fn test_ttl_historical_is_longest() {
    let policy = TtlPolicy::default();
    let historical = params(&[("l-decade", "190"), ("bulkHarvest", "true")]);
    let ttl = policy.ttl_for_year("result", &historical, &search_body(2, None), YEAR);
    assert_eq!(ttl, policy.search * 8);
}

#[test]
fn test_ttl_transitional_overrides_everything() {
    let policy = TtlPolicy::default();
    let flags = params(&[("l-decade", "190"), ("bulkHarvest", "true")]);
    let body = search_body(1000, Some("Coming Soon"));
    assert_eq!(policy.ttl_for_year("result", &flags, &body, YEAR), policy.transitional);

    let record = Payload::Json(json!({"id": "1", "status": "pending"}));
    assert_eq!(policy.ttl_for_year("work/1", &[], &record, YEAR), policy.transitional);
}

#[test]
fn test_ttl_xml_payload_uses_route_default() {
    let policy = TtlPolicy::default();
    let xml = Payload::Xml("<response/>".into());
    assert_eq!(policy.ttl_for_year("result", &[], &xml, YEAR), policy.search);
}

#[test_case(&[("l-decade", "190")], true ; "old decade")]
#[test_case(&[("l-decade", "202")], false ; "recent decade")]
#[test_case(&[("l-year", "1950"), ("l-decade", "195")], true ; "year and decade")]
#[test_case(&[("l-year", "1950"), ("l-year", "2024")], false ; "one recent year")]
#[test_case(&[("q", "cats date:[1900 TO 1950]")], true ; "query range")]
#[test_case(&[("q", "cats date:[1900 TO *]")], false ; "open range")]
#[test_case(&[("q", "cats date:[1900-01-01T00:00:00Z TO 1950-12-31T00:00:00Z]")], true ; "timestamp range")]
#[test_case(&[("q", "cats")], false ; "no dates")]
#[test_case(&[("l-decade", "abc")], false ; "unreadable")]
fn test_is_historical(pairs: &[(&str, &str)], expected: bool) {
    assert_eq!(is_historical(&params(pairs), YEAR - 20), expected);
}

#[test]
fn test_is_bulk_harvest() {
    assert!(is_bulk_harvest(&params(&[("bulkHarvest", "TRUE")])));
    assert!(!is_bulk_harvest(&params(&[("bulkHarvest", "false")])));
    assert!(!is_bulk_harvest(&[]));
}
