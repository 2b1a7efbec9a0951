use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use dashmap::DashMap;
use serde_json::Value;

pub const HOME_PAGE_KEY: &str = "page:home";
pub const RESUME_PAGE_KEY: &str = "page:resume";

/// Rendered public payloads held for a fixed time. Admin writes clear it.
#[derive(Clone)]
pub struct PageCache {
    entries: Arc<DashMap<String, (Instant, Value)>>,
    ttl: Duration,
}

impl PageCache {
    pub fn new(ttl: Duration) -> Self {
        PageCache { entries: Arc::new(DashMap::new()), ttl }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let hit = self.entries.get(key).and_then(|entry| {
            let (stored_at, value) = entry.value();
            (stored_at.elapsed() < self.ttl).then(|| value.clone())
        });
        if hit.is_none() {
            self.entries.remove(key);
        }
        hit
    }

    pub fn insert(&self, key: &str, value: Value) {
        if self.ttl.is_zero() {
            return;
        }
        self.entries.insert(key.to_string(), (Instant::now(), value));
    }

    pub fn clear(&self) {
        self.entries.clear();
        tracing::debug!("Page cache cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn entries_expire_and_clear() {
        let cache = PageCache::new(Duration::from_secs(60));
        cache.insert(HOME_PAGE_KEY, json!({"ok": true}));
        assert_eq!(cache.get(HOME_PAGE_KEY), Some(json!({"ok": true})));

        cache.clear();
        assert_eq!(cache.get(HOME_PAGE_KEY), None);
    }

    #[test]
    fn zero_ttl_disables_caching() {
        let cache = PageCache::new(Duration::ZERO);
        cache.insert(RESUME_PAGE_KEY, json!(1));
        assert_eq!(cache.get(RESUME_PAGE_KEY), None);
    }
}
