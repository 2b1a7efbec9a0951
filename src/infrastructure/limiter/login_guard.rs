use std::{sync::Arc, time::Duration};

use serde::Serialize;

use crate::cache::CounterStore;

pub const IP_ALERT_THRESHOLD: u64 = 5;
pub const USERNAME_ALERT_THRESHOLD: u64 = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoginAttempts {
    pub ip_failures: u64,
    pub user_failures: u64,
}

impl LoginAttempts {
    pub fn should_alert(&self) -> bool {
        self.ip_failures >= IP_ALERT_THRESHOLD || self.user_failures >= USERNAME_ALERT_THRESHOLD
    }
}

/// Counts failed staff logins per IP and per username over a fixed window.
#[derive(Clone)]
pub struct LoginGuard {
    store: Arc<dyn CounterStore>,
    window: Duration,
}

impl LoginGuard {
    pub fn new(store: Arc<dyn CounterStore>, window_secs: u64) -> Self {
        LoginGuard { store, window: Duration::from_secs(window_secs) }
    }

    pub fn ip_key(ip: &str) -> String {
        format!("admin_login_failed_{ip}")
    }

    pub fn username_key(username: &str) -> String {
        format!("admin_login_failed_user_{}", username.trim().to_lowercase())
    }

    pub async fn record_failure(&self, ip: &str, username: &str) -> LoginAttempts {
        let ip_failures = self.bump(&Self::ip_key(ip)).await;
        let user_failures = if username.trim().is_empty() {
            0
        } else {
            self.bump(&Self::username_key(username)).await
        };
        LoginAttempts { ip_failures, user_failures }
    }

    async fn bump(&self, key: &str) -> u64 {
        self.store.incr(key, self.window).await.unwrap_or_else(|e| {
            tracing::error!("Failed to count login failure for {}: {}", key, e);
            0
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCounterStore;

    #[tokio::test]
    async fn alerts_after_three_failures_for_one_username() {
        let guard = LoginGuard::new(Arc::new(InMemoryCounterStore::new()), 900);

        let first = guard.record_failure("1.1.1.1", "Owner").await;
        let second = guard.record_failure("2.2.2.2", "owner").await;
        let third = guard.record_failure("3.3.3.3", "OWNER").await;

        assert!(!first.should_alert());
        assert!(!second.should_alert());
        assert_eq!(third.user_failures, 3);
        assert!(third.should_alert());
    }

    #[tokio::test]
    async fn alerts_after_five_failures_from_one_ip() {
        let guard = LoginGuard::new(Arc::new(InMemoryCounterStore::new()), 900);
        let mut last = LoginAttempts::default();
        for i in 0..5 {
            last = guard.record_failure("6.6.6.6", &format!("user{i}")).await;
        }
        assert_eq!(last.ip_failures, 5);
        assert!(last.should_alert());
    }
}
