use async_trait::async_trait;

use crate::{errors::AppError, repositories::sqlx_repo::SqlxMediaRepo};

/// Rows that point at stored media by key or by URL.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaReferenceRepository: Send + Sync {
    /// Repoints keys and URLs at a new location. Returns the number of rows changed.
    async fn rewrite_references(&self, old_key: &str, new_key: &str, old_url: &str, new_url: &str) -> Result<u64, AppError>;
}

#[async_trait]
impl MediaReferenceRepository for SqlxMediaRepo {
    async fn rewrite_references(&self, old_key: &str, new_key: &str, old_url: &str, new_url: &str) -> Result<u64, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut changed = 0;

        let by_key = [
            "UPDATE projects SET writeup_document_key = $2 WHERE writeup_document_key = $1",
            "UPDATE resume_documents SET storage_key = $2 WHERE storage_key = $1",
        ];
        for sql in by_key {
            changed += sqlx::query(sql)
                .bind(old_key)
                .bind(new_key)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }

        let by_url = [
            "UPDATE projects SET featured_image_url = $2 WHERE featured_image_url = $1",
            "UPDATE project_images SET image_url = $2 WHERE image_url = $1",
            "UPDATE blog_posts SET featured_image_url = $2 WHERE featured_image_url = $1",
        ];
        for sql in by_url {
            changed += sqlx::query(sql)
                .bind(old_url)
                .bind(new_url)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }

        tx.commit().await?;
        Ok(changed)
    }
}
