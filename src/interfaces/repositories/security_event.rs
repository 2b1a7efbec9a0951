use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    entities::security_event::{IpCount, NewSecurityEvent, SecurityEvent, SecurityEventFilter, SeverityCount, TypeCount},
    errors::AppError,
    repositories::sqlx_repo::SqlxSecurityEventRepo,
};

pub const DEFAULT_EVENT_LIMIT: i64 = 100;

/// Append-only audit log: inserts and reads only.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SecurityEventRepository: Send + Sync {
    async fn record_event(&self, event: &NewSecurityEvent) -> Result<(), AppError>;
    async fn list_events(&self, filter: &SecurityEventFilter) -> Result<Vec<SecurityEvent>, AppError>;
    async fn count_by_type(&self, since: DateTime<Utc>) -> Result<Vec<TypeCount>, AppError>;
    async fn count_by_severity(&self, since: DateTime<Utc>) -> Result<Vec<SeverityCount>, AppError>;
    async fn top_ips(&self, since: DateTime<Utc>, limit: i64) -> Result<Vec<IpCount>, AppError>;
}

#[async_trait]
impl SecurityEventRepository for SqlxSecurityEventRepo {
    async fn record_event(&self, event: &NewSecurityEvent) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO security_events (event_type, severity, ip_address, user_agent, username, description, path, method)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(event.event_type)
        .bind(event.severity)
        .bind(&event.ip_address)
        .bind(&event.user_agent)
        .bind(&event.username)
        .bind(&event.description)
        .bind(&event.path)
        .bind(&event.method)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_events(&self, filter: &SecurityEventFilter) -> Result<Vec<SecurityEvent>, AppError> {
        sqlx::query_as::<_, SecurityEvent>(
            r#"
            SELECT * FROM security_events
            WHERE ($1::timestamptz IS NULL OR created_at >= $1)
              AND ($2::security_event_type IS NULL OR event_type = $2)
              AND ($3::security_severity IS NULL OR severity = $3)
              AND ($4::text IS NULL OR ip_address = $4)
            ORDER BY created_at DESC
            LIMIT $5
            "#,
        )
        .bind(filter.since)
        .bind(filter.event_type)
        .bind(filter.severity)
        .bind(&filter.ip_address)
        .bind(filter.limit.unwrap_or(DEFAULT_EVENT_LIMIT))
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn count_by_type(&self, since: DateTime<Utc>) -> Result<Vec<TypeCount>, AppError> {
        sqlx::query_as::<_, TypeCount>(
            r#"
            SELECT event_type, COUNT(*) AS count
            FROM security_events
            WHERE created_at >= $1
            GROUP BY event_type
            ORDER BY count DESC
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn count_by_severity(&self, since: DateTime<Utc>) -> Result<Vec<SeverityCount>, AppError> {
        sqlx::query_as::<_, SeverityCount>(
            r#"
            SELECT severity, COUNT(*) AS count
            FROM security_events
            WHERE created_at >= $1
            GROUP BY severity
            ORDER BY severity
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn top_ips(&self, since: DateTime<Utc>, limit: i64) -> Result<Vec<IpCount>, AppError> {
        sqlx::query_as::<_, IpCount>(
            r#"
            SELECT ip_address, COUNT(*) AS count
            FROM security_events
            WHERE created_at >= $1
            GROUP BY ip_address
            ORDER BY count DESC
            LIMIT $2
            "#,
        )
        .bind(since)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }
}
