use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "security_event_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SecurityEventType {
    LoginFailed,
    LoginSuccess,
    AdminAccess,
    ContactSubmission,
    RateLimit,
    SuspiciousRequest,
    FileUpload,
    SecurityScan,
}

impl SecurityEventType {
    pub const ALL: [SecurityEventType; 8] = [
        SecurityEventType::LoginFailed,
        SecurityEventType::LoginSuccess,
        SecurityEventType::AdminAccess,
        SecurityEventType::ContactSubmission,
        SecurityEventType::RateLimit,
        SecurityEventType::SuspiciousRequest,
        SecurityEventType::FileUpload,
        SecurityEventType::SecurityScan,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityEventType::LoginFailed => "login_failed",
            SecurityEventType::LoginSuccess => "login_success",
            SecurityEventType::AdminAccess => "admin_access",
            SecurityEventType::ContactSubmission => "contact_submission",
            SecurityEventType::RateLimit => "rate_limit",
            SecurityEventType::SuspiciousRequest => "suspicious_request",
            SecurityEventType::FileUpload => "file_upload",
            SecurityEventType::SecurityScan => "security_scan",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SecurityEventType::LoginFailed => "Failed Login",
            SecurityEventType::LoginSuccess => "Successful Login",
            SecurityEventType::AdminAccess => "Admin Access",
            SecurityEventType::ContactSubmission => "Contact Form Submission",
            SecurityEventType::RateLimit => "Rate Limit Exceeded",
            SecurityEventType::SuspiciousRequest => "Suspicious Request",
            SecurityEventType::FileUpload => "File Upload",
            SecurityEventType::SecurityScan => "Security Scan Detected",
        }
    }
}

impl fmt::Display for SecurityEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "security_severity", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [Severity::Low, Severity::Medium, Severity::High, Severity::Critical];

    /// Fixed weight used when summing a dashboard threat score.
    pub fn weight(&self) -> u64 {
        match self {
            Severity::Low => 1,
            Severity::Medium => 3,
            Severity::High => 5,
            Severity::Critical => 10,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored audit record. Rows are never updated or deleted.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SecurityEvent {
    pub id: Uuid,
    pub event_type: SecurityEventType,
    pub severity: Severity,
    pub ip_address: String,
    pub user_agent: String,
    pub username: Option<String>,
    pub description: String,
    pub path: String,
    pub method: String,
    pub created_at: DateTime<Utc>,
}

/// Request details copied onto audit records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    pub ip: String,
    pub method: String,
    pub path: String,
    pub user_agent: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSecurityEvent {
    pub event_type: SecurityEventType,
    pub severity: Severity,
    pub ip_address: String,
    pub user_agent: String,
    pub username: Option<String>,
    pub description: String,
    pub path: String,
    pub method: String,
}

impl NewSecurityEvent {
    pub fn new(
        event_type: SecurityEventType,
        severity: Severity,
        ip_address: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        NewSecurityEvent {
            event_type,
            severity,
            ip_address: ip_address.into(),
            user_agent: String::new(),
            username: None,
            description: description.into(),
            path: String::new(),
            method: String::new(),
        }
    }

    pub fn with_request(mut self, method: &str, path: &str, user_agent: &str) -> Self {
        self.method = truncate(method, 10);
        self.path = truncate(path, 500);
        self.user_agent = user_agent.to_string();
        self
    }

    pub fn with_context(self, ctx: &RequestContext) -> Self {
        self.with_request(&ctx.method, &ctx.path, &ctx.user_agent)
    }

    /// Shorthand for an event raised while handling the request in `ctx`.
    pub fn for_request(
        event_type: SecurityEventType,
        severity: Severity,
        ctx: &RequestContext,
        description: impl Into<String>,
    ) -> Self {
        Self::new(event_type, severity, ctx.ip.clone(), description).with_context(ctx)
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(truncate(&username.into(), 150));
        self
    }
}

fn truncate(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

/// Query filter for dashboard and report listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecurityEventFilter {
    pub since: Option<DateTime<Utc>>,
    pub event_type: Option<SecurityEventType>,
    pub severity: Option<Severity>,
    pub ip_address: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TypeCount {
    pub event_type: SecurityEventType,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SeverityCount {
    pub severity: Severity,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct IpCount {
    pub ip_address: String,
    pub count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_weights_are_fixed() {
        let weights: Vec<u64> = Severity::ALL.iter().map(Severity::weight).collect();
        assert_eq!(weights, vec![1, 3, 5, 10]);
    }

    #[test]
    fn request_details_are_truncated_to_column_sizes() {
        let long_path = "/".repeat(800);
        let event = NewSecurityEvent::new(SecurityEventType::SuspiciousRequest, Severity::Medium, "1.2.3.4", "x")
            .with_request("PROPFIND-LONG", &long_path, "curl/8");

        assert_eq!(event.path.len(), 500);
        assert_eq!(event.method, "PROPFIND-L");
        assert_eq!(event.user_agent, "curl/8");
    }

    #[test]
    fn event_type_strings_match_storage_names() {
        assert_eq!(SecurityEventType::RateLimit.to_string(), "rate_limit");
        assert_eq!(SecurityEventType::SecurityScan.as_str(), "security_scan");
        assert_eq!(SecurityEventType::ALL.len(), 8);
    }
}
