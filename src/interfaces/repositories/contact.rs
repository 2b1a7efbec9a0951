use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    entities::contact::{ContactInsert, ContactSubmission},
    errors::AppError,
    repositories::sqlx_repo::{ensure_affected, SqlxContactRepo},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContactRepository: Send + Sync {
    async fn create_submission(&self, submission: &ContactInsert) -> Result<ContactSubmission, AppError>;
    async fn list_submissions(&self, limit: i64, offset: i64) -> Result<Vec<ContactSubmission>, AppError>;
    async fn count_submissions(&self) -> Result<i64, AppError>;
    async fn submissions_since(&self, since: DateTime<Utc>) -> Result<Vec<ContactSubmission>, AppError>;
    async fn delete_submission(&self, id: &Uuid) -> Result<(), AppError>;
}

#[async_trait]
impl ContactRepository for SqlxContactRepo {
    async fn create_submission(&self, submission: &ContactInsert) -> Result<ContactSubmission, AppError> {
        sqlx::query_as::<_, ContactSubmission>(
            r#"
            INSERT INTO contact_submissions (name, email, subject, message, ip_address)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&submission.name)
        .bind(&submission.email)
        .bind(&submission.subject)
        .bind(&submission.message)
        .bind(&submission.ip_address)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn list_submissions(&self, limit: i64, offset: i64) -> Result<Vec<ContactSubmission>, AppError> {
        sqlx::query_as::<_, ContactSubmission>(
            "SELECT * FROM contact_submissions ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn count_submissions(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contact_submissions")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn submissions_since(&self, since: DateTime<Utc>) -> Result<Vec<ContactSubmission>, AppError> {
        sqlx::query_as::<_, ContactSubmission>(
            "SELECT * FROM contact_submissions WHERE created_at >= $1 ORDER BY created_at DESC",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn delete_submission(&self, id: &Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM contact_submissions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        ensure_affected(result, "Contact submission")
    }
}
