use std::{fmt, sync::Arc, time::Duration};

use serde::Serialize;

use crate::cache::CounterStore;
use crate::settings::{RateLimitSettings, RateRule};

pub const RATE_LIMIT_KEY_PREFIX: &str = "rate_limit_";

/// Main pages that development mode never counts for `GET`.
const MAIN_PAGES: [&str; 6] = ["/", "/about", "/resume", "/contact", "/portfolio", "/blog"];
const UNCOUNTED_PREFIXES: [&str; 2] = ["/static/", "/media/"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointClass {
    Contact,
    Admin,
    General,
}

impl EndpointClass {
    pub const ALL: [EndpointClass; 3] = [EndpointClass::Contact, EndpointClass::Admin, EndpointClass::General];

    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointClass::Contact => "contact",
            EndpointClass::Admin => "admin",
            EndpointClass::General => "general",
        }
    }
}

impl fmt::Display for EndpointClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { class: EndpointClass, count: u64, max: u64 },
    Limited { class: EndpointClass, count: u64, max: u64, retry_after: Option<u64> },
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct RateStatus {
    pub key: String,
    pub class: EndpointClass,
    pub count: u64,
    pub max: u64,
    pub ttl_secs: Option<u64>,
}

/// Fixed-window request counter per endpoint class and client IP.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    rules: RateLimitSettings,
    admin_prefix: String,
    development: bool,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, rules: RateLimitSettings, admin_prefix: String, development: bool) -> Self {
        RateLimiter { store, rules, admin_prefix, development }
    }

    pub fn rule(&self, class: EndpointClass) -> RateRule {
        match class {
            EndpointClass::Contact => self.rules.contact,
            EndpointClass::Admin => self.rules.admin,
            EndpointClass::General => self.rules.general,
        }
    }

    pub fn classify(&self, method: &str, path: &str) -> EndpointClass {
        if method.eq_ignore_ascii_case("POST") && path.trim_end_matches('/') == "/contact" {
            EndpointClass::Contact
        } else if is_under_prefix(path, &self.admin_prefix) {
            EndpointClass::Admin
        } else {
            EndpointClass::General
        }
    }

    pub fn key(class: EndpointClass, ip: &str) -> String {
        format!("{RATE_LIMIT_KEY_PREFIX}{class}_{ip}")
    }

    fn is_uncounted(&self, method: &str, path: &str) -> bool {
        if !self.development {
            return false;
        }
        UNCOUNTED_PREFIXES.iter().any(|p| path.starts_with(p))
            || is_under_prefix(path, &self.admin_prefix)
            || (method.eq_ignore_ascii_case("GET") && MAIN_PAGES.contains(&path))
    }

    /// Counts the request unless it is already over the limit. Cache failures allow the request.
    pub async fn check(&self, method: &str, path: &str, ip: &str) -> RateDecision {
        if self.is_uncounted(method, path) {
            return RateDecision::Skipped;
        }

        let class = self.classify(method, path);
        let rule = self.rule(class);
        let key = Self::key(class, ip);

        let current = match self.store.get(&key).await {
            Ok(count) => count,
            Err(e) => {
                tracing::error!("Rate limit lookup failed for {}: {}", key, e);
                return RateDecision::Allowed { class, count: 0, max: rule.max_requests };
            }
        };

        if current >= rule.max_requests {
            let retry_after = self.store.ttl(&key).await.ok().flatten();
            return RateDecision::Limited { class, count: current, max: rule.max_requests, retry_after };
        }

        match self.store.incr(&key, Duration::from_secs(rule.window_secs)).await {
            Ok(count) => RateDecision::Allowed { class, count, max: rule.max_requests },
            Err(e) => {
                tracing::error!("Rate limit increment failed for {}: {}", key, e);
                RateDecision::Allowed { class, count: current, max: rule.max_requests }
            }
        }
    }

    pub async fn status(&self, ip: &str) -> Vec<RateStatus> {
        let mut statuses = Vec::with_capacity(EndpointClass::ALL.len());
        for class in EndpointClass::ALL {
            let key = Self::key(class, ip);
            let count = self.store.get(&key).await.unwrap_or(0);
            let ttl_secs = self.store.ttl(&key).await.ok().flatten();
            statuses.push(RateStatus { key, class, count, max: self.rule(class).max_requests, ttl_secs });
        }
        statuses
    }

    /// Every live rate-limit key, for the maintenance CLI.
    pub async fn active_keys(&self) -> Result<Vec<String>, crate::cache::CacheError> {
        self.store.keys(RATE_LIMIT_KEY_PREFIX).await
    }

    /// Clears the counters of one IP, or every counter when `ip` is `None`.
    pub async fn clear(&self, ip: Option<&str>) -> Result<usize, crate::cache::CacheError> {
        let keys = match ip {
            Some(ip) => EndpointClass::ALL.iter().map(|c| Self::key(*c, ip)).collect(),
            None => self.active_keys().await?,
        };
        for key in &keys {
            self.store.delete(key).await?;
        }
        Ok(keys.len())
    }
}

pub fn is_under_prefix(path: &str, prefix: &str) -> bool {
    path == prefix || path.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCounterStore;

    fn limiter(development: bool) -> RateLimiter {
        let rules = RateLimitSettings {
            contact: RateRule { max_requests: 2, window_secs: 60 },
            admin: RateRule { max_requests: 3, window_secs: 60 },
            general: RateRule { max_requests: 5, window_secs: 60 },
            login_failure_window_secs: 900,
        };
        RateLimiter::new(Arc::new(InMemoryCounterStore::new()), rules, "/admin".into(), development)
    }

    #[test]
    fn classifies_endpoints() {
        let limiter = limiter(false);
        assert_eq!(limiter.classify("POST", "/contact"), EndpointClass::Contact);
        assert_eq!(limiter.classify("GET", "/contact"), EndpointClass::General);
        assert_eq!(limiter.classify("GET", "/admin/blog/posts"), EndpointClass::Admin);
        assert_eq!(limiter.classify("GET", "/administrator"), EndpointClass::General);
        assert_eq!(RateLimiter::key(EndpointClass::Contact, "10.0.0.1"), "rate_limit_contact_10.0.0.1");
    }

    #[tokio::test]
    async fn rejects_once_the_window_is_full() {
        let limiter = limiter(false);
        for expected in 1..=2 {
            assert_eq!(
                limiter.check("POST", "/contact", "1.2.3.4").await,
                RateDecision::Allowed { class: EndpointClass::Contact, count: expected, max: 2 }
            );
        }
        match limiter.check("POST", "/contact", "1.2.3.4").await {
            RateDecision::Limited { count, max, retry_after, .. } => {
                assert_eq!((count, max), (2, 2));
                assert!(retry_after.is_some());
            }
            other => panic!("expected limit, got {other:?}"),
        }
        // Other IPs and classes are counted separately.
        assert!(matches!(limiter.check("POST", "/contact", "5.6.7.8").await, RateDecision::Allowed { .. }));
        assert!(matches!(limiter.check("GET", "/blog", "1.2.3.4").await, RateDecision::Allowed { .. }));
    }

    #[tokio::test]
    async fn development_mode_skips_main_pages_and_assets() {
        let limiter = limiter(true);
        assert_eq!(limiter.check("GET", "/", "1.1.1.1").await, RateDecision::Skipped);
        assert_eq!(limiter.check("GET", "/media/cv.pdf", "1.1.1.1").await, RateDecision::Skipped);
        assert_eq!(limiter.check("POST", "/admin/auth/login", "1.1.1.1").await, RateDecision::Skipped);
        assert!(matches!(limiter.check("POST", "/contact", "1.1.1.1").await, RateDecision::Allowed { .. }));
    }

    #[tokio::test]
    async fn clear_resets_counters_for_an_ip() {
        let limiter = limiter(false);
        limiter.check("GET", "/blog", "9.9.9.9").await;
        limiter.check("POST", "/contact", "9.9.9.9").await;

        assert_eq!(limiter.active_keys().await.unwrap().len(), 2);
        assert_eq!(limiter.clear(Some("9.9.9.9")).await.unwrap(), 3);
        assert!(limiter.active_keys().await.unwrap().is_empty());
    }
}
