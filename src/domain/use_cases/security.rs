use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::{
    entities::{
        contact::ContactSubmission,
        security_event::{
            IpCount, NewSecurityEvent, SecurityEvent, SecurityEventFilter, SecurityEventType, Severity,
            SeverityCount, TypeCount,
        },
    },
    errors::AppError,
    repositories::{contact::ContactRepository, security_event::SecurityEventRepository},
    security::{patterns::suspicious_contact_pattern, threat_level, threat_score},
    settings::AppConfig,
    utils::csv::CsvWriter,
};

pub const DEFAULT_DASHBOARD_HOURS: i64 = 24;
pub const MAX_DASHBOARD_HOURS: i64 = 24 * 30;
pub const DEFAULT_REPORT_DAYS: i64 = 30;
pub const MAX_REPORT_DAYS: i64 = 365;
pub const SUSPICIOUS_CONTACT_DAYS: i64 = 7;
pub const DEFAULT_EVENT_LIMIT: i64 = 100;
pub const MAX_EVENT_LIMIT: i64 = 500;
const RECENT_EVENTS_LIMIT: i64 = 20;
const TOP_IPS_LIMIT: i64 = 10;
const REPORT_EVENT_LIMIT: i64 = 10_000;

pub const REPORT_COLUMNS: [&str; 9] = [
    "Timestamp", "Event Type", "Severity", "IP Address", "Username", "Method", "Path", "User Agent", "Description",
];

/// Writes audit records. A failed write is logged and swallowed.
#[derive(Clone)]
pub struct SecurityAuditor {
    repo: Arc<dyn SecurityEventRepository>,
}

impl SecurityAuditor {
    pub fn new(repo: Arc<dyn SecurityEventRepository>) -> Self {
        SecurityAuditor { repo }
    }

    pub async fn record(&self, event: NewSecurityEvent) {
        match event.severity {
            Severity::Low => tracing::info!(
                event_type = %event.event_type, ip = %event.ip_address, "{}", event.description
            ),
            Severity::Medium => tracing::warn!(
                event_type = %event.event_type, ip = %event.ip_address, "{}", event.description
            ),
            Severity::High | Severity::Critical => tracing::error!(
                event_type = %event.event_type, ip = %event.ip_address, severity = %event.severity,
                "{}", event.description
            ),
        }

        if let Err(e) = self.repo.record_event(&event).await {
            tracing::error!("Failed to store {} security event: {}", event.event_type, e);
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SuspiciousContact {
    pub id: uuid::Uuid,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub ip_address: Option<String>,
    pub pattern: &'static str,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SecurityDashboard {
    pub window_hours: i64,
    pub since: DateTime<Utc>,
    pub total_events: i64,
    pub by_type: Vec<TypeCount>,
    pub by_severity: Vec<SeverityCount>,
    pub top_ips: Vec<IpCount>,
    pub recent_events: Vec<SecurityEvent>,
    pub rate_limit_hits: i64,
    pub failed_logins: i64,
    pub threat_score: u64,
    pub threat_level: &'static str,
    pub suspicious_contacts: Vec<SuspiciousContact>,
}

/// Read side of the audit log plus the contact-form scan.
#[derive(Clone)]
pub struct SecurityService {
    events: Arc<dyn SecurityEventRepository>,
    contacts: Arc<dyn ContactRepository>,
}

impl SecurityService {
    pub fn new(events: Arc<dyn SecurityEventRepository>, contacts: Arc<dyn ContactRepository>) -> Self {
        SecurityService { events, contacts }
    }

    pub async fn dashboard(&self, hours: Option<i64>, now: DateTime<Utc>) -> Result<SecurityDashboard, AppError> {
        let window_hours = hours.unwrap_or(DEFAULT_DASHBOARD_HOURS).clamp(1, MAX_DASHBOARD_HOURS);
        let since = now - Duration::hours(window_hours);

        let by_type = self.events.count_by_type(since).await?;
        let by_severity = self.events.count_by_severity(since).await?;
        let top_ips = self.events.top_ips(since, TOP_IPS_LIMIT).await?;
        let recent_events = self
            .events
            .list_events(&SecurityEventFilter {
                since: Some(since),
                limit: Some(RECENT_EVENTS_LIMIT),
                ..SecurityEventFilter::default()
            })
            .await?;
        let suspicious_contacts = self.suspicious_contacts(SUSPICIOUS_CONTACT_DAYS, now).await?;

        let count_of = |kind: SecurityEventType| {
            by_type.iter().filter(|c| c.event_type == kind).map(|c| c.count).sum::<i64>()
        };
        let score = threat_score(&by_severity);

        Ok(SecurityDashboard {
            window_hours,
            since,
            total_events: by_type.iter().map(|c| c.count).sum(),
            rate_limit_hits: count_of(SecurityEventType::RateLimit),
            failed_logins: count_of(SecurityEventType::LoginFailed),
            threat_score: score,
            threat_level: threat_level(score),
            by_type,
            by_severity,
            top_ips,
            recent_events,
            suspicious_contacts,
        })
    }

    /// Read-only event listing for the admin API.
    pub async fn list_events(&self, mut filter: SecurityEventFilter) -> Result<Vec<SecurityEvent>, AppError> {
        filter.limit = Some(filter.limit.unwrap_or(DEFAULT_EVENT_LIMIT).clamp(1, MAX_EVENT_LIMIT));
        self.events.list_events(&filter).await
    }

    /// CSV of the events in the last `days` days, newest first.
    pub async fn report_csv(&self, days: Option<i64>, now: DateTime<Utc>) -> Result<String, AppError> {
        let days = days.unwrap_or(DEFAULT_REPORT_DAYS).clamp(1, MAX_REPORT_DAYS);
        let events = self
            .events
            .list_events(&SecurityEventFilter {
                since: Some(now - Duration::days(days)),
                limit: Some(REPORT_EVENT_LIMIT),
                ..SecurityEventFilter::default()
            })
            .await?;

        Ok(render_report(&events))
    }

    /// Contact submissions from the last `days` days that carry spam or attack markers.
    pub async fn suspicious_contacts(&self, days: i64, now: DateTime<Utc>) -> Result<Vec<SuspiciousContact>, AppError> {
        let submissions = self.contacts.submissions_since(now - Duration::days(days)).await?;
        Ok(submissions.into_iter().filter_map(flag_submission).collect())
    }
}

fn flag_submission(submission: ContactSubmission) -> Option<SuspiciousContact> {
    let content = format!(
        "{} {} {} {}",
        submission.name, submission.email, submission.subject, submission.message
    );
    let pattern = suspicious_contact_pattern(&content)?;
    Some(SuspiciousContact {
        id: submission.id,
        name: submission.name,
        email: submission.email,
        subject: submission.subject,
        ip_address: submission.ip_address,
        pattern,
        created_at: submission.created_at,
    })
}

pub fn render_report(events: &[SecurityEvent]) -> String {
    let mut csv = CsvWriter::with_header(&REPORT_COLUMNS);
    for event in events {
        let timestamp = event.created_at.format("%Y-%m-%d %H:%M:%S").to_string();
        csv.write_row([
            timestamp.as_str(),
            event.event_type.label(),
            event.severity.as_str(),
            event.ip_address.as_str(),
            event.username.as_deref().unwrap_or(""),
            event.method.as_str(),
            event.path.as_str(),
            event.user_agent.as_str(),
            event.description.as_str(),
        ]);
    }
    csv.finish()
}

// ───── Configuration audit ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SecurityFinding {
    pub check: &'static str,
    pub passed: bool,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SecurityCheckReport {
    pub findings: Vec<SecurityFinding>,
    pub issues: usize,
    pub status: &'static str,
}

const WEAK_SECRET_MARKERS: [&str; 4] = ["insecure", "changeme", "change-me", "secret"];

fn finding(check: &'static str, passed: bool, ok: &str, problem: &str) -> SecurityFinding {
    SecurityFinding { check, passed, detail: if passed { ok } else { problem }.to_string() }
}

/// Static review of the deployment configuration used by the CLI.
pub fn security_check(config: &AppConfig) -> SecurityCheckReport {
    let weak_secret = |s: &str| {
        let lower = s.to_lowercase();
        s.len() < 50 || WEAK_SECRET_MARKERS.iter().any(|m| lower.contains(m))
    };

    let findings = vec![
        finding(
            "environment",
            !config.is_development(),
            "Development mode is disabled",
            "Development mode is enabled (blocking and rate limits are relaxed)",
        ),
        finding(
            "jwt_secrets",
            !weak_secret(&config.jwt_secret) && !weak_secret(&config.refresh_token_secret),
            "JWT secrets appear to be strong",
            "JWT secrets are short or look like placeholders",
        ),
        finding(
            "cors",
            !config.cors_origins().iter().any(|o| o == "*"),
            "CORS origins are restricted",
            "CORS allows any origin",
        ),
        finding(
            "https",
            config.site_url.starts_with("https://"),
            "Site URL uses HTTPS",
            "Site URL is not served over HTTPS",
        ),
        finding(
            "admin_url",
            config.admin_url != "admin",
            "Custom admin URL is configured",
            "Using the default admin URL",
        ),
        finding(
            "shared_counters",
            config.redis_url.is_some(),
            "Rate-limit counters are shared through Redis",
            "Rate-limit counters are per process (no Redis URL)",
        ),
    ];

    let issues = findings.iter().filter(|f| !f.passed).count();
    SecurityCheckReport { findings, issues, status: check_status(issues) }
}

pub fn check_status(issues: usize) -> &'static str {
    match issues {
        0 => "GOOD",
        1..=2 => "NEEDS ATTENTION",
        _ => "CRITICAL",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        repositories::{contact::MockContactRepository, security_event::MockSecurityEventRepository},
        settings::{test_config, AppEnvironment},
    };
    use uuid::Uuid;

    fn event(event_type: SecurityEventType, description: &str) -> SecurityEvent {
        SecurityEvent {
            id: Uuid::new_v4(),
            event_type,
            severity: Severity::Medium,
            ip_address: "203.0.113.9".into(),
            user_agent: "curl/8".into(),
            username: None,
            description: description.into(),
            path: "/contact".into(),
            method: "POST".into(),
            created_at: Utc::now(),
        }
    }

    fn submission(message: &str) -> ContactSubmission {
        ContactSubmission {
            id: Uuid::new_v4(),
            name: "Visitor".into(),
            email: "visitor@example.com".into(),
            subject: "Hello".into(),
            message: message.into(),
            ip_address: Some("198.51.100.4".into()),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn auditor_swallows_storage_failures() {
        let mut repo = MockSecurityEventRepository::new();
        repo.expect_record_event()
            .times(1)
            .returning(|_| Err(AppError::InternalError("db down".into())));

        let auditor = SecurityAuditor::new(Arc::new(repo));
        auditor
            .record(NewSecurityEvent::new(SecurityEventType::RateLimit, Severity::Medium, "1.1.1.1", "x"))
            .await;
    }

    #[tokio::test]
    async fn dashboard_totals_and_threat_score() {
        let mut events = MockSecurityEventRepository::new();
        events.expect_count_by_type().returning(|_| {
            Ok(vec![
                TypeCount { event_type: SecurityEventType::RateLimit, count: 4 },
                TypeCount { event_type: SecurityEventType::LoginFailed, count: 2 },
            ])
        });
        events.expect_count_by_severity().returning(|_| {
            Ok(vec![
                SeverityCount { severity: Severity::Medium, count: 5 },
                SeverityCount { severity: Severity::High, count: 1 },
            ])
        });
        events.expect_top_ips().returning(|_, _| Ok(vec![]));
        events
            .expect_list_events()
            .withf(|f| f.limit == Some(RECENT_EVENTS_LIMIT) && f.since.is_some())
            .returning(|_| Ok(vec![]));

        let mut contacts = MockContactRepository::new();
        contacts
            .expect_submissions_since()
            .returning(|_| Ok(vec![submission("Claim your casino bonus"), submission("Let's talk")]));

        let service = SecurityService::new(Arc::new(events), Arc::new(contacts));
        let dashboard = service.dashboard(Some(10_000), Utc::now()).await.unwrap();

        assert_eq!(dashboard.window_hours, MAX_DASHBOARD_HOURS);
        assert_eq!(dashboard.total_events, 6);
        assert_eq!(dashboard.rate_limit_hits, 4);
        assert_eq!(dashboard.failed_logins, 2);
        assert_eq!(dashboard.threat_score, 5 * 3 + 5);
        assert_eq!(dashboard.threat_level, "elevated");
        assert_eq!(dashboard.suspicious_contacts.len(), 1);
        assert_eq!(dashboard.suspicious_contacts[0].pattern, "casino");
    }

    #[test]
    fn report_has_header_and_escaped_rows() {
        let csv = render_report(&[event(SecurityEventType::RateLimit, "Rate limit exceeded on /contact (10/10 requests)")]);
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("Timestamp,Event Type,Severity,IP Address,Username,Method,Path,User Agent,Description")
        );
        let row = lines.next().unwrap();
        assert!(row.contains(",Rate Limit Exceeded,medium,203.0.113.9,,POST,/contact,curl/8,"));
    }

    #[test]
    fn config_audit_grades_issue_counts() {
        let mut config = test_config();
        config.env = AppEnvironment::Production;
        config.jwt_secret = "k".repeat(64);
        config.refresh_token_secret = "r".repeat(64);
        config.cors_allowed_origins = vec!["https://example.com".into()];
        config.site_url = "https://example.com".into();
        config.admin_url = "staff-7f3a".into();
        config.redis_url = Some("redis://localhost".into());

        let report = security_check(&config);
        assert_eq!(report.issues, 0);
        assert_eq!(report.status, "GOOD");

        config.admin_url = "admin".into();
        assert_eq!(security_check(&config).status, "NEEDS ATTENTION");

        let report = security_check(&test_config());
        assert!(report.issues > 2);
        assert_eq!(report.status, "CRITICAL");
    }
}
