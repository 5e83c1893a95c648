//! Shared counter store backed by Redis.
//!
//! Counters are plain Redis integers driven by `INCR`; window expiry is
//! delegated to Redis key TTLs, so every process pointed at the same server
//! shares one set of counters.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Script};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::store::CounterStore;
use crate::error::Result;

/// Default namespace for counter keys.
pub const DEFAULT_KEY_PREFIX: &str = "rate-limit";

/// Increment the key and set its TTL only if the key has none.
const INCREMENT_SCRIPT: &str = r#"
    local count = redis.call("INCR", KEYS[1])
    if redis.call("TTL", KEYS[1]) == -1 then
        redis.call("EXPIRE", KEYS[1], ARGV[1])
    end
    return count
"#;

/// How the window TTL is attached to a counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryMode {
    /// `INCR`, then `TTL`, then `EXPIRE` when no TTL is set, as three round trips.
    ///
    /// If the process dies between `INCR` and `EXPIRE` the key is left without
    /// a TTL; the next increment notices the missing TTL and sets it.
    #[default]
    IncrThenExpire,
    /// One server-side script performing the same steps atomically.
    Atomic,
}

/// A counter store shared between processes through Redis.
#[derive(Clone)]
pub struct RedisStore {
    connection_manager: ConnectionManager,
    key_prefix: String,
    expiry_mode: ExpiryMode,
    script: Script,
}

impl RedisStore {
    /// Wrap an existing connection manager.
    pub fn new(connection_manager: ConnectionManager) -> Self {
        Self {
            connection_manager,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            expiry_mode: ExpiryMode::default(),
            script: Script::new(INCREMENT_SCRIPT),
        }
    }

    /// Open a connection manager for `url`.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if the URL is invalid or the server cannot
    /// be reached.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = Client::open(url)?;
        let connection_manager = client.get_connection_manager().await?;
        debug!(url = %url, "Connected to redis counter store");
        Ok(Self::new(connection_manager))
    }

    /// Namespace every counter key under `prefix`.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn with_expiry_mode(mut self, mode: ExpiryMode) -> Self {
        self.expiry_mode = mode;
        self
    }

    pub fn expiry_mode(&self) -> ExpiryMode {
        self.expiry_mode
    }

    fn redis_key(&self, key: &str) -> String {
        if self.key_prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}:{}", self.key_prefix, key)
        }
    }

    async fn incr_then_expire(&self, key: &str, window_secs: i64) -> Result<u64> {
        let mut conn = self.connection_manager.clone();

        let count: u64 = conn.incr(key, 1u64).await?;

        // -1 means the key exists without an expiry.
        let ttl: i64 = conn.ttl(key).await?;
        if ttl == -1 {
            let _: bool = conn.expire(key, window_secs).await?;
        }

        Ok(count)
    }

    async fn atomic(&self, key: &str, window_secs: i64) -> Result<u64> {
        let mut conn = self.connection_manager.clone();
        let count: u64 = self
            .script
            .key(key)
            .arg(window_secs)
            .invoke_async(&mut conn)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl CounterStore for RedisStore {
    async fn increment(&self, key: &str, window_secs: u64) -> Result<u64> {
        let redis_key = self.redis_key(key);
        let window_secs = i64::try_from(window_secs).unwrap_or(i64::MAX);

        let result = match self.expiry_mode {
            ExpiryMode::IncrThenExpire => self.incr_then_expire(&redis_key, window_secs).await,
            ExpiryMode::Atomic => self.atomic(&redis_key, window_secs).await,
        };

        result.inspect_err(|e| {
            warn!(key = %redis_key, error = %e, "Redis counter increment failed");
        })
    }
}
