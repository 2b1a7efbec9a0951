use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use dashmap::DashMap;
use deadpool_redis::{Config as RedisPoolConfig, Pool as RedisPool, Runtime};
use derive_more::Display;
use parking_lot::Mutex;
use redis::AsyncCommands;

#[derive(Debug, Display)]
pub enum CacheError {
    #[display("Cache unavailable: {_0}")]
    Unavailable(String),

    #[display("Cache command failed: {_0}")]
    Command(String),
}

impl std::error::Error for CacheError {}

impl From<redis::RedisError> for CacheError {
    fn from(e: redis::RedisError) -> Self {
        CacheError::Command(e.to_string())
    }
}

impl From<deadpool_redis::PoolError> for CacheError {
    fn from(e: deadpool_redis::PoolError) -> Self {
        CacheError::Unavailable(e.to_string())
    }
}

/// Keyed integer counters with fixed expiry windows.
///
/// The expiry of a key is set when its first increment lands and is never
/// pushed back by later increments.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Current count, zero for a missing or expired key.
    async fn get(&self, key: &str) -> Result<u64, CacheError>;

    /// Increments and returns the new count.
    async fn incr(&self, key: &str, window: Duration) -> Result<u64, CacheError>;

    /// Seconds until the key expires.
    async fn ttl(&self, key: &str) -> Result<Option<u64>, CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, CacheError>;

    async fn ping(&self) -> Result<(), CacheError>;

    fn backend_name(&self) -> &'static str;
}

#[derive(Debug)]
struct Window {
    count: u64,
    expires_at: Instant,
}

impl Window {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Process-local store used when no Redis URL is configured.
#[derive(Clone, Default)]
pub struct InMemoryCounterStore {
    map: Arc<DashMap<String, Arc<Mutex<Window>>>>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn get_window(&self, key: &str, window: Duration) -> Arc<Mutex<Window>> {
        if let Some(existing) = self.map.get(key) {
            return existing.clone();
        }
        let fresh = Arc::new(Mutex::new(Window {
            count: 0,
            expires_at: Instant::now() + window,
        }));
        match self.map.entry(key.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(entry) => entry.get().clone(),
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(fresh.clone());
                fresh
            }
        }
    }

    /// Drops expired windows. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<String> = self
            .map
            .iter()
            .filter(|entry| entry.value().lock().is_expired(now))
            .map(|entry| entry.key().clone())
            .collect();

        for key in &expired {
            self.map.remove(key);
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn get(&self, key: &str) -> Result<u64, CacheError> {
        let now = Instant::now();
        Ok(self
            .map
            .get(key)
            .map(|w| {
                let w = w.lock();
                if w.is_expired(now) { 0 } else { w.count }
            })
            .unwrap_or(0))
    }

    async fn incr(&self, key: &str, window: Duration) -> Result<u64, CacheError> {
        let entry = self.get_window(key, window);
        let mut w = entry.lock();
        let now = Instant::now();
        if w.is_expired(now) {
            w.count = 0;
            w.expires_at = now + window;
        }
        w.count += 1;
        Ok(w.count)
    }

    async fn ttl(&self, key: &str) -> Result<Option<u64>, CacheError> {
        let now = Instant::now();
        Ok(self.map.get(key).and_then(|w| {
            let w = w.lock();
            (!w.is_expired(now)).then(|| w.expires_at.duration_since(now).as_secs().max(1))
        }))
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.map.remove(key);
        Ok(())
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
        let now = Instant::now();
        let mut keys: Vec<String> = self
            .map
            .iter()
            .filter(|entry| entry.key().starts_with(prefix) && !entry.value().lock().is_expired(now))
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Redis-backed store shared by every worker and the maintenance CLI.
#[derive(Clone)]
pub struct RedisCounterStore {
    pool: RedisPool,
}

impl RedisCounterStore {
    pub fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let pool = RedisPoolConfig::from_url(redis_url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        Ok(RedisCounterStore { pool })
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn get(&self, key: &str) -> Result<u64, CacheError> {
        let mut conn = self.pool.get().await?;
        let count: Option<u64> = conn.get(key).await?;
        Ok(count.unwrap_or(0))
    }

    async fn incr(&self, key: &str, window: Duration) -> Result<u64, CacheError> {
        let mut conn = self.pool.get().await?;
        let (count, ttl): (u64, i64) = redis::pipe()
            .atomic()
            .incr(key, 1u64)
            .ttl(key)
            .query_async(&mut conn)
            .await?;
        // A key left without expiry by an earlier failed EXPIRE gets one on the next hit.
        if missing_expiry(ttl) {
            let _: () = conn.expire(key, window.as_secs() as i64).await?;
        }
        Ok(count)
    }

    async fn ttl(&self, key: &str) -> Result<Option<u64>, CacheError> {
        let mut conn = self.pool.get().await?;
        let ttl: i64 = conn.ttl(key).await?;
        Ok((ttl > 0).then_some(ttl as u64))
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.pool.get().await?;
        let _: () = conn.del(key).await?;
        Ok(())
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
        let mut conn = self.pool.get().await?;
        let mut keys: Vec<String> = conn.keys(format!("{prefix}*")).await?;
        keys.sort();
        Ok(keys)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.pool.get().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        if pong == "PONG" {
            Ok(())
        } else {
            Err(CacheError::Command(format!("unexpected PING reply: {pong}")))
        }
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

/// Redis answers -1 for a key that exists without an expiry.
fn missing_expiry(ttl: i64) -> bool {
    ttl == -1
}

/// Picks Redis when a URL is configured, the in-process store otherwise.
pub fn build_counter_store(redis_url: Option<&str>) -> (Arc<dyn CounterStore>, Option<InMemoryCounterStore>) {
    if let Some(url) = redis_url {
        match RedisCounterStore::connect(url) {
            Ok(store) => return (Arc::new(store), None),
            Err(e) => tracing::error!("Redis setup failed, falling back to in-memory counters: {}", e),
        }
    }
    let memory = InMemoryCounterStore::new();
    (Arc::new(memory.clone()), Some(memory))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_keys_without_expiry_get_a_new_one() {
        assert!(missing_expiry(-1));
        assert!(!missing_expiry(-2));
        assert!(!missing_expiry(0));
        assert!(!missing_expiry(299));
    }

    #[tokio::test]
    async fn increments_within_a_window() {
        let store = InMemoryCounterStore::new();
        let window = Duration::from_secs(60);

        assert_eq!(store.get("k").await.unwrap(), 0);
        assert_eq!(store.incr("k", window).await.unwrap(), 1);
        assert_eq!(store.incr("k", window).await.unwrap(), 2);
        assert_eq!(store.get("k").await.unwrap(), 2);
        assert!(store.ttl("k").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn expired_windows_restart_and_are_swept() {
        let store = InMemoryCounterStore::new();
        store.incr("short", Duration::from_millis(20)).await.unwrap();
        store.incr("long", Duration::from_secs(60)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(40)).await;

        assert_eq!(store.get("short").await.unwrap(), 0);
        assert_eq!(store.sweep(), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.incr("short", Duration::from_secs(60)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn keys_filter_by_prefix_and_delete_clears() {
        let store = InMemoryCounterStore::new();
        let window = Duration::from_secs(60);
        store.incr("rate_limit_general_1.1.1.1", window).await.unwrap();
        store.incr("rate_limit_contact_1.1.1.1", window).await.unwrap();
        store.incr("admin_login_failed_1.1.1.1", window).await.unwrap();

        let keys = store.keys("rate_limit_").await.unwrap();
        assert_eq!(keys.len(), 2);

        store.delete("rate_limit_general_1.1.1.1").await.unwrap();
        assert_eq!(store.keys("rate_limit_").await.unwrap(), vec!["rate_limit_contact_1.1.1.1"]);
    }
}
