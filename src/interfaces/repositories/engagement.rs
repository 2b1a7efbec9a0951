use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    entities::engagement::{PostVote, VoteTotals},
    errors::AppError,
    repositories::sqlx_repo::{ensure_affected, SqlxEngagementRepo},
};

/// Likes, dislikes and unique views, keyed by (post, client IP).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EngagementRepository: Send + Sync {
    async fn find_vote(&self, post_id: &Uuid, ip_address: &str) -> Result<Option<PostVote>, AppError>;
    async fn create_vote(&self, post_id: &Uuid, ip_address: &str, is_like: bool) -> Result<(), AppError>;
    async fn update_vote(&self, vote_id: &Uuid, is_like: bool) -> Result<(), AppError>;
    async fn delete_vote(&self, vote_id: &Uuid) -> Result<(), AppError>;
    async fn vote_totals(&self, post_id: &Uuid) -> Result<VoteTotals, AppError>;
    /// Returns `true` when this IP had not viewed the post before.
    async fn record_view(&self, post_id: &Uuid, ip_address: &str) -> Result<bool, AppError>;
    async fn view_count(&self, post_id: &Uuid) -> Result<i64, AppError>;
}

#[async_trait]
impl EngagementRepository for SqlxEngagementRepo {
    async fn find_vote(&self, post_id: &Uuid, ip_address: &str) -> Result<Option<PostVote>, AppError> {
        sqlx::query_as::<_, PostVote>("SELECT * FROM post_votes WHERE post_id = $1 AND ip_address = $2")
            .bind(post_id)
            .bind(ip_address)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)
    }

    async fn create_vote(&self, post_id: &Uuid, ip_address: &str, is_like: bool) -> Result<(), AppError> {
        // A concurrent insert from the same IP resolves to the latest choice.
        sqlx::query(
            r#"
            INSERT INTO post_votes (post_id, ip_address, is_like)
            VALUES ($1, $2, $3)
            ON CONFLICT (post_id, ip_address) DO UPDATE SET is_like = EXCLUDED.is_like
            "#,
        )
        .bind(post_id)
        .bind(ip_address)
        .bind(is_like)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_vote(&self, vote_id: &Uuid, is_like: bool) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE post_votes SET is_like = $2 WHERE id = $1")
            .bind(vote_id)
            .bind(is_like)
            .execute(&self.pool)
            .await?;
        ensure_affected(result, "Vote")
    }

    async fn delete_vote(&self, vote_id: &Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM post_votes WHERE id = $1")
            .bind(vote_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn vote_totals(&self, post_id: &Uuid) -> Result<VoteTotals, AppError> {
        sqlx::query_as::<_, VoteTotals>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE is_like) AS likes,
                COUNT(*) FILTER (WHERE NOT is_like) AS dislikes
            FROM post_votes
            WHERE post_id = $1
            "#,
        )
        .bind(post_id)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn record_view(&self, post_id: &Uuid, ip_address: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            "INSERT INTO post_views (post_id, ip_address) VALUES ($1, $2) ON CONFLICT (post_id, ip_address) DO NOTHING",
        )
        .bind(post_id)
        .bind(ip_address)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn view_count(&self, post_id: &Uuid) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM post_views WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
