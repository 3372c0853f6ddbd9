//! Counter store backends
//!
//! - Redis for distributed deployments, one Lua script per increment
//! - In-memory for development, tests and single-instance deployments

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use error_common::{AuthError, Result};
use redis::aio::ConnectionManager;
use redis::Script;

/// Post-increment state of one window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCount {
    pub count: u64,
    /// Time left until the window resets
    pub ttl: Duration,
}

/// Atomic increment-with-expiry primitive.
///
/// `increment` must bump the counter, start the expiry on the first hit of a
/// window and read back count and remaining TTL as one indivisible step.
#[async_trait]
pub trait CounterStore: Send + Sync {
    async fn increment(&self, key: &str, window: Duration) -> Result<WindowCount>;
}

const INCREMENT_SCRIPT: &str = r#"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
end
local ttl = redis.call('PTTL', KEYS[1])
if ttl < 0 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
    ttl = tonumber(ARGV[1])
end
return {count, ttl}
"#;

/// Redis-backed counters shared by every instance
pub struct RedisCounterStore {
    connection: ConnectionManager,
    namespace: String,
    script: Script,
}

impl RedisCounterStore {
    pub const DEFAULT_NAMESPACE: &'static str = "ratelimit:";

    pub async fn connect(redis_url: &str, namespace: impl Into<String>) -> Result<Self> {
        let client = redis::Client::open(redis_url).map_err(|e| {
            tracing::warn!(error = %e, "Failed to create Redis client for rate limiting");
            AuthError::store(format!("Failed to create Redis client: {e}"))
        })?;

        let connection = ConnectionManager::new(client).await.map_err(|e| {
            tracing::warn!(error = %e, "Failed to connect to Redis for rate limiting");
            AuthError::store(format!("Failed to connect to Redis: {e}"))
        })?;

        tracing::debug!("Connected to Redis for rate limiting");
        Ok(Self::with_connection(connection, namespace))
    }

    pub fn with_connection(connection: ConnectionManager, namespace: impl Into<String>) -> Self {
        Self {
            connection,
            namespace: namespace.into(),
            script: Script::new(INCREMENT_SCRIPT),
        }
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn increment(&self, key: &str, window: Duration) -> Result<WindowCount> {
        let mut conn = self.connection.clone();
        let window_ms = window.as_millis().max(1) as u64;

        let (count, ttl_ms): (i64, i64) = self
            .script
            .key(format!("{}{}", self.namespace, key))
            .arg(window_ms)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| AuthError::store(format!("Redis rate limit script error: {e}")))?;

        Ok(WindowCount {
            count: count.max(0) as u64,
            ttl: Duration::from_millis(ttl_ms.max(0) as u64),
        })
    }
}

#[derive(Debug)]
struct Window {
    count: u64,
    expires_at: Instant,
}

/// Process-local counters; the map entry lock makes each increment atomic
#[derive(Default)]
pub struct InMemoryCounterStore {
    windows: DashMap<String, Window>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop windows that have already expired
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows.retain(|_, window| window.expires_at > now);
        before - self.windows.len()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn increment(&self, key: &str, window: Duration) -> Result<WindowCount> {
        let now = Instant::now();
        let mut entry = self.windows.entry(key.to_string()).or_insert_with(|| Window {
            count: 0,
            expires_at: now + window,
        });

        if entry.expires_at <= now {
            entry.count = 0;
            entry.expires_at = now + window;
        }
        entry.count += 1;

        Ok(WindowCount {
            count: entry.count,
            ttl: entry.expires_at.saturating_duration_since(now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_in_memory_counts_per_key() {
        let store = InMemoryCounterStore::new();
        let window = Duration::from_secs(60);

        assert_eq!(store.increment("auth:a", window).await.unwrap().count, 1);
        assert_eq!(store.increment("auth:a", window).await.unwrap().count, 2);
        assert_eq!(store.increment("auth:b", window).await.unwrap().count, 1);

        let ttl = store.increment("auth:a", window).await.unwrap().ttl;
        assert!(ttl <= window && ttl > Duration::from_secs(59));
    }

    #[tokio::test]
    async fn test_in_memory_window_resets_after_expiry() {
        let store = InMemoryCounterStore::new();
        let window = Duration::from_millis(50);

        store.increment("general:x", window).await.unwrap();
        store.increment("general:x", window).await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert_eq!(store.increment("general:x", window).await.unwrap().count, 1);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = InMemoryCounterStore::new();
        store.increment("a", Duration::from_millis(10)).await.unwrap();
        store.increment("b", Duration::from_secs(60)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_not_lost() {
        let store = Arc::new(InMemoryCounterStore::new());
        let window = Duration::from_secs(60);

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.increment("payment:u", window).await.unwrap().count })
            })
            .collect();

        let mut counts = Vec::new();
        for handle in handles {
            counts.push(handle.await.unwrap());
        }
        counts.sort_unstable();
        assert_eq!(counts, (1..=50).collect::<Vec<u64>>());
    }
}
