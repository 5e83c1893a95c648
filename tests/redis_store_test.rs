//! Redis counter store tests.
//!
//! These run against a live server and are skipped unless `REDIS_URL` is set,
//! e.g. `REDIS_URL=redis://127.0.0.1:6379 cargo test --test redis_store_test`.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use floodgate::ratelimit::{CounterStore, ExpiryMode, LimitKey, RateLimiter, RedisStore};

fn redis_url() -> Option<String> {
    env::var("REDIS_URL").ok()
}

fn unique_prefix() -> String {
    let n: u64 = rand::random();
    format!("floodgate_test_{n}")
}

async fn store(url: &str, mode: ExpiryMode) -> RedisStore {
    RedisStore::connect(url)
        .await
        .unwrap()
        .with_key_prefix(unique_prefix())
        .with_expiry_mode(mode)
}

async fn ttl_of(url: &str, key: &str) -> i64 {
    let client = redis::Client::open(url).unwrap();
    let mut conn = client.get_multiplexed_async_connection().await.unwrap();
    redis::cmd("TTL").arg(key).query_async(&mut conn).await.unwrap()
}

#[tokio::test]
async fn test_increment_counts_up() {
    let Some(url) = redis_url() else { return };

    for mode in [ExpiryMode::IncrThenExpire, ExpiryMode::Atomic] {
        let store = store(&url, mode).await;
        for expected in 1..=5 {
            assert_eq!(store.increment("key", 60).await.unwrap(), expected);
        }
        assert_eq!(store.increment("other", 60).await.unwrap(), 1);
    }
}

#[tokio::test]
async fn test_ttl_is_set_once() {
    let Some(url) = redis_url() else { return };

    for mode in [ExpiryMode::IncrThenExpire, ExpiryMode::Atomic] {
        let prefix = unique_prefix();
        let store = RedisStore::connect(&url)
            .await
            .unwrap()
            .with_key_prefix(prefix.clone())
            .with_expiry_mode(mode);
        let full_key = format!("{prefix}:key");

        store.increment("key", 100).await.unwrap();
        let ttl = ttl_of(&url, &full_key).await;
        assert!(ttl > 0 && ttl <= 100, "unexpected ttl {ttl}");

        // A later increment with a different window must not extend the TTL.
        store.increment("key", 1000).await.unwrap();
        let ttl = ttl_of(&url, &full_key).await;
        assert!(ttl <= 100, "ttl was reset to {ttl}");
    }
}

#[tokio::test]
async fn test_window_resets_after_ttl() {
    let Some(url) = redis_url() else { return };

    let store = store(&url, ExpiryMode::IncrThenExpire).await;
    for _ in 0..3 {
        store.increment("key", 1).await.unwrap();
    }

    tokio::time::sleep(Duration::from_millis(2100)).await;
    assert_eq!(store.increment("key", 1).await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_check_limit() {
    let Some(url) = redis_url() else { return };

    let store = store(&url, ExpiryMode::Atomic).await;
    let limiter = Arc::new(RateLimiter::new(Arc::new(store), "20/min").unwrap());

    let tasks = (0..22).map(|_| {
        let limiter = limiter.clone();
        tokio::spawn(async move { limiter.check_default(&LimitKey::global("10.0.0.1")).await })
    });
    let results: Vec<_> = join_all(tasks).await.into_iter().map(|r| r.unwrap()).collect();

    let allowed = results.iter().filter(|r| r.is_ok()).count();
    let limited = results
        .iter()
        .filter(|r| matches!(r, Err(e) if e.is_rate_limited()))
        .count();
    assert_eq!(allowed, 20);
    assert_eq!(limited, 2);
}

