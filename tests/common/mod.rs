#![allow(dead_code)]

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use portfolio_site::{
    auth::jwt::JwtService,
    build_rate_limiter,
    cache::InMemoryCounterStore,
    entities::{
        engagement::{PostVote, VoteTotals},
        security_event::{
            IpCount, NewSecurityEvent, SecurityEvent, SecurityEventFilter, SecurityEventType, SeverityCount, TypeCount,
        },
        user::User,
    },
    errors::AppError,
    repositories::{
        engagement::EngagementRepository, security_event::SecurityEventRepository, token::TokenService,
    },
    settings::{test_config, AppConfig},
    use_cases::security::SecurityAuditor,
    RequestSecurity,
};

/// Audit log that keeps events in memory.
#[derive(Default)]
pub struct RecordedEvents {
    events: Mutex<Vec<NewSecurityEvent>>,
}

impl RecordedEvents {
    pub fn all(&self) -> Vec<NewSecurityEvent> {
        self.events.lock().clone()
    }

    pub fn of_type(&self, event_type: SecurityEventType) -> Vec<NewSecurityEvent> {
        self.all().into_iter().filter(|e| e.event_type == event_type).collect()
    }
}

#[async_trait]
impl SecurityEventRepository for RecordedEvents {
    async fn record_event(&self, event: &NewSecurityEvent) -> Result<(), AppError> {
        self.events.lock().push(event.clone());
        Ok(())
    }

    async fn list_events(&self, _filter: &SecurityEventFilter) -> Result<Vec<SecurityEvent>, AppError> {
        Ok(self
            .all()
            .into_iter()
            .rev()
            .map(|e| SecurityEvent {
                id: Uuid::new_v4(),
                event_type: e.event_type,
                severity: e.severity,
                ip_address: e.ip_address,
                user_agent: e.user_agent,
                username: e.username,
                description: e.description,
                path: e.path,
                method: e.method,
                created_at: Utc::now(),
            })
            .collect())
    }

    async fn count_by_type(&self, _since: DateTime<Utc>) -> Result<Vec<TypeCount>, AppError> {
        Ok(Vec::new())
    }

    async fn count_by_severity(&self, _since: DateTime<Utc>) -> Result<Vec<SeverityCount>, AppError> {
        Ok(Vec::new())
    }

    async fn top_ips(&self, _since: DateTime<Utc>, _limit: i64) -> Result<Vec<IpCount>, AppError> {
        Ok(Vec::new())
    }
}

/// Request-security wiring backed by in-memory counters and audit log.
pub struct TestSecurity {
    pub security: RequestSecurity,
    pub events: Arc<RecordedEvents>,
    pub counters: InMemoryCounterStore,
    pub jwt: JwtService,
}

impl TestSecurity {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let events = Arc::new(RecordedEvents::default());
        let counters = InMemoryCounterStore::new();
        let jwt = JwtService::new(&config);

        let auditor = SecurityAuditor::new(events.clone());
        let rate_limiter = build_rate_limiter(&config, Arc::new(counters.clone()));
        let security = RequestSecurity::new(&config, auditor, rate_limiter, Arc::new(jwt.clone()));

        TestSecurity { security, events, counters, jwt }
    }

    pub fn token_for(&self, is_admin: bool) -> String {
        let user = User {
            id: Uuid::new_v4(),
            email: "staff@example.com".to_string(),
            username: if is_admin { "admin".to_string() } else { "visitor".to_string() },
            password_hash: String::new(),
            is_admin,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.jwt.create_jwt(&user).unwrap()
    }
}

/// Vote and view storage keyed the way the database constraints key it.
#[derive(Default)]
pub struct InMemoryEngagement {
    votes: Mutex<HashMap<(Uuid, String), PostVote>>,
    views: Mutex<HashMap<Uuid, Vec<String>>>,
}

#[async_trait]
impl EngagementRepository for InMemoryEngagement {
    async fn find_vote(&self, post_id: &Uuid, ip_address: &str) -> Result<Option<PostVote>, AppError> {
        Ok(self.votes.lock().get(&(*post_id, ip_address.to_string())).cloned())
    }

    async fn create_vote(&self, post_id: &Uuid, ip_address: &str, is_like: bool) -> Result<(), AppError> {
        let vote = PostVote {
            id: Uuid::new_v4(),
            post_id: *post_id,
            ip_address: ip_address.to_string(),
            is_like,
            created_at: Utc::now(),
        };
        self.votes.lock().insert((*post_id, ip_address.to_string()), vote);
        Ok(())
    }

    async fn update_vote(&self, vote_id: &Uuid, is_like: bool) -> Result<(), AppError> {
        let mut votes = self.votes.lock();
        let vote = votes
            .values_mut()
            .find(|v| v.id == *vote_id)
            .ok_or_else(|| AppError::NotFound("Vote not found".into()))?;
        vote.is_like = is_like;
        Ok(())
    }

    async fn delete_vote(&self, vote_id: &Uuid) -> Result<(), AppError> {
        self.votes.lock().retain(|_, v| v.id != *vote_id);
        Ok(())
    }

    async fn vote_totals(&self, post_id: &Uuid) -> Result<VoteTotals, AppError> {
        let votes = self.votes.lock();
        let for_post = votes.values().filter(|v| v.post_id == *post_id);
        let (likes, dislikes) = for_post.fold((0, 0), |(l, d), v| if v.is_like { (l + 1, d) } else { (l, d + 1) });
        Ok(VoteTotals { likes, dislikes })
    }

    async fn record_view(&self, post_id: &Uuid, ip_address: &str) -> Result<bool, AppError> {
        let mut views = self.views.lock();
        let seen = views.entry(*post_id).or_default();
        if seen.iter().any(|ip| ip == ip_address) {
            return Ok(false);
        }
        seen.push(ip_address.to_string());
        Ok(true)
    }

    async fn view_count(&self, post_id: &Uuid) -> Result<i64, AppError> {
        Ok(self.views.lock().get(post_id).map_or(0, |v| v.len() as i64))
    }
}
