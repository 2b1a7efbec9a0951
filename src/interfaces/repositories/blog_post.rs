use async_trait::async_trait;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    entities::blog_post::{
        BlogCategory, BlogPost, BlogPostChanges, BlogPostInsert, CategoryWithCount, Comment, CommentInsert,
        PostFilter, PostTag, Tag, TagWithCount,
    },
    errors::AppError,
    repositories::sqlx_repo::{conflict_on, ensure_affected, like_pattern, SqlxBlogRepo},
};

const POST_SLUG_CONSTRAINT: &str = "blog_posts_slug_key";

/// Published-post filter shared by the list and count queries.
const PUBLISHED_FILTER: &str = r#"
    p.status = 'published'
    AND ($1::text IS NULL OR c.slug = $1)
    AND ($2::text IS NULL OR EXISTS (
        SELECT 1 FROM blog_post_tags bt JOIN tags t ON t.id = bt.tag_id
        WHERE bt.post_id = p.id AND t.slug = $2))
    AND ($3::text IS NULL
        OR p.title ILIKE $3 OR p.excerpt ILIKE $3 OR p.content ILIKE $3
        OR EXISTS (
            SELECT 1 FROM blog_post_tags bt JOIN tags t ON t.id = bt.tag_id
            WHERE bt.post_id = p.id AND t.name ILIKE $3))
"#;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlogRepository: Send + Sync {
    async fn list_published(&self, filter: &PostFilter, limit: i64, offset: i64) -> Result<Vec<BlogPost>, AppError>;
    async fn count_published(&self, filter: &PostFilter) -> Result<i64, AppError>;
    async fn featured_published(&self, limit: i64) -> Result<Vec<BlogPost>, AppError>;
    async fn search_published(&self, query: &str, limit: i64) -> Result<Vec<BlogPost>, AppError>;
    /// Published posts sharing the category or a tag, newest first.
    async fn related_published(&self, post: &BlogPost, limit: i64) -> Result<Vec<BlogPost>, AppError>;
    async fn find_by_slug(&self, slug: &str) -> Result<Option<BlogPost>, AppError>;
    async fn get_by_id(&self, id: &Uuid) -> Result<BlogPost, AppError>;
    async fn list_all(&self, limit: i64, offset: i64) -> Result<Vec<BlogPost>, AppError>;
    async fn count_all(&self) -> Result<i64, AppError>;
    async fn slug_exists(&self, slug: &str, exclude_id: Option<Uuid>) -> Result<bool, AppError>;
    async fn create_post(&self, post: &BlogPostInsert) -> Result<Uuid, AppError>;
    async fn update_post(&self, id: &Uuid, changes: &BlogPostChanges) -> Result<BlogPost, AppError>;
    async fn delete_post(&self, id: &Uuid) -> Result<(), AppError>;

    async fn list_categories(&self) -> Result<Vec<BlogCategory>, AppError>;
    async fn categories_with_posts(&self) -> Result<Vec<CategoryWithCount>, AppError>;
    async fn create_category(&self, name: &str, slug: &str, description: &str, color: &str) -> Result<BlogCategory, AppError>;
    async fn delete_category(&self, id: &Uuid) -> Result<(), AppError>;
    async fn list_tags(&self) -> Result<Vec<Tag>, AppError>;
    async fn tags_with_posts(&self) -> Result<Vec<TagWithCount>, AppError>;
    async fn create_tag(&self, name: &str, slug: &str) -> Result<Tag, AppError>;
    async fn delete_tag(&self, id: &Uuid) -> Result<(), AppError>;
    async fn tags_for_posts(&self, post_ids: &[Uuid]) -> Result<Vec<PostTag>, AppError>;

    async fn approved_comments(&self, post_id: &Uuid) -> Result<Vec<Comment>, AppError>;
    async fn create_comment(&self, comment: &CommentInsert) -> Result<Comment, AppError>;
    async fn list_comments(&self, pending_only: bool) -> Result<Vec<Comment>, AppError>;
    async fn set_comment_approval(&self, id: &Uuid, approved: bool) -> Result<(), AppError>;
    async fn delete_comment(&self, id: &Uuid) -> Result<(), AppError>;
}

async fn replace_tags(conn: &mut PgConnection, post_id: Uuid, tag_ids: &[Uuid]) -> Result<(), AppError> {
    sqlx::query("DELETE FROM blog_post_tags WHERE post_id = $1")
        .bind(post_id)
        .execute(&mut *conn)
        .await?;

    if !tag_ids.is_empty() {
        sqlx::query(
            "INSERT INTO blog_post_tags (post_id, tag_id) SELECT $1, UNNEST($2::uuid[]) ON CONFLICT DO NOTHING",
        )
        .bind(post_id)
        .bind(tag_ids)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

fn search_pattern(filter: &PostFilter) -> Option<String> {
    filter.search().map(like_pattern)
}

#[async_trait]
impl BlogRepository for SqlxBlogRepo {
    async fn list_published(&self, filter: &PostFilter, limit: i64, offset: i64) -> Result<Vec<BlogPost>, AppError> {
        let sql = format!(
            r#"
            SELECT p.* FROM blog_posts p
            JOIN blog_categories c ON c.id = p.category_id
            WHERE {PUBLISHED_FILTER}
            ORDER BY p.published_at DESC NULLS LAST, p.created_at DESC
            LIMIT $4 OFFSET $5
            "#
        );
        let posts = sqlx::query_as::<_, BlogPost>(&sql)
            .bind(filter.category())
            .bind(filter.tag())
            .bind(search_pattern(filter))
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(posts)
    }

    async fn count_published(&self, filter: &PostFilter) -> Result<i64, AppError> {
        let sql = format!(
            r#"
            SELECT COUNT(*) FROM blog_posts p
            JOIN blog_categories c ON c.id = p.category_id
            WHERE {PUBLISHED_FILTER}
            "#
        );
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(filter.category())
            .bind(filter.tag())
            .bind(search_pattern(filter))
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn featured_published(&self, limit: i64) -> Result<Vec<BlogPost>, AppError> {
        sqlx::query_as::<_, BlogPost>(
            r#"
            SELECT * FROM blog_posts
            WHERE status = 'published' AND is_featured
            ORDER BY published_at DESC NULLS LAST
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn search_published(&self, query: &str, limit: i64) -> Result<Vec<BlogPost>, AppError> {
        sqlx::query_as::<_, BlogPost>(
            r#"
            SELECT * FROM blog_posts
            WHERE status = 'published'
              AND (title ILIKE $1 OR excerpt ILIKE $1 OR content ILIKE $1)
            ORDER BY published_at DESC NULLS LAST
            LIMIT $2
            "#,
        )
        .bind(like_pattern(query))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn related_published(&self, post: &BlogPost, limit: i64) -> Result<Vec<BlogPost>, AppError> {
        sqlx::query_as::<_, BlogPost>(
            r#"
            SELECT p.* FROM blog_posts p
            WHERE p.status = 'published'
              AND p.id <> $1
              AND (p.category_id = $2 OR EXISTS (
                    SELECT 1 FROM blog_post_tags mine
                    JOIN blog_post_tags theirs ON theirs.tag_id = mine.tag_id
                    WHERE mine.post_id = $1 AND theirs.post_id = p.id))
            ORDER BY p.published_at DESC NULLS LAST
            LIMIT $3
            "#,
        )
        .bind(post.id)
        .bind(post.category_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<BlogPost>, AppError> {
        sqlx::query_as::<_, BlogPost>("SELECT * FROM blog_posts WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)
    }

    async fn get_by_id(&self, id: &Uuid) -> Result<BlogPost, AppError> {
        sqlx::query_as::<_, BlogPost>("SELECT * FROM blog_posts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Blog post not found".into()))
    }

    async fn list_all(&self, limit: i64, offset: i64) -> Result<Vec<BlogPost>, AppError> {
        sqlx::query_as::<_, BlogPost>("SELECT * FROM blog_posts ORDER BY created_at DESC LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::from)
    }

    async fn count_all(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM blog_posts")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn slug_exists(&self, slug: &str, exclude_id: Option<Uuid>) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM blog_posts WHERE slug = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(slug)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn create_post(&self, post: &BlogPostInsert) -> Result<Uuid, AppError> {
        let mut tx = self.pool.begin().await?;

        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO blog_posts (
                title, slug, author_id, category_id, excerpt, content, featured_image_url,
                status, is_featured, meta_description, meta_keywords, reading_time, published_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING id
            "#,
        )
        .bind(&post.title)
        .bind(&post.slug)
        .bind(post.author_id)
        .bind(post.category_id)
        .bind(&post.excerpt)
        .bind(&post.content)
        .bind(&post.featured_image_url)
        .bind(post.status)
        .bind(post.is_featured)
        .bind(&post.meta_description)
        .bind(&post.meta_keywords)
        .bind(post.reading_time)
        .bind(post.published_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(conflict_on(POST_SLUG_CONSTRAINT, "Slug already exists"))?;

        replace_tags(&mut tx, id, &post.tag_ids).await?;
        tx.commit().await?;

        Ok(id)
    }

    async fn update_post(&self, id: &Uuid, changes: &BlogPostChanges) -> Result<BlogPost, AppError> {
        let mut tx = self.pool.begin().await?;

        let post = sqlx::query_as::<_, BlogPost>(
            r#"
            UPDATE blog_posts SET
                title = $2,
                slug = $3,
                category_id = $4,
                excerpt = $5,
                content = $6,
                featured_image_url = $7,
                status = $8,
                is_featured = $9,
                meta_description = $10,
                meta_keywords = $11,
                reading_time = $12,
                published_at = $13,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.slug)
        .bind(changes.category_id)
        .bind(&changes.excerpt)
        .bind(&changes.content)
        .bind(&changes.featured_image_url)
        .bind(changes.status)
        .bind(changes.is_featured)
        .bind(&changes.meta_description)
        .bind(&changes.meta_keywords)
        .bind(changes.reading_time)
        .bind(changes.published_at)
        .fetch_optional(&mut *tx)
        .await
        .map_err(conflict_on(POST_SLUG_CONSTRAINT, "Slug already exists"))?
        .ok_or_else(|| AppError::NotFound("Blog post not found".into()))?;

        if let Some(tag_ids) = &changes.tag_ids {
            replace_tags(&mut tx, post.id, tag_ids).await?;
        }
        tx.commit().await?;

        Ok(post)
    }

    async fn delete_post(&self, id: &Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM blog_posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        ensure_affected(result, "Blog post")
    }

    async fn list_categories(&self) -> Result<Vec<BlogCategory>, AppError> {
        sqlx::query_as::<_, BlogCategory>(
            "SELECT id, name, slug, description, color FROM blog_categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn categories_with_posts(&self) -> Result<Vec<CategoryWithCount>, AppError> {
        sqlx::query_as::<_, CategoryWithCount>(
            r#"
            SELECT c.id, c.name, c.slug, c.color, COUNT(p.id) AS post_count
            FROM blog_categories c
            JOIN blog_posts p ON p.category_id = c.id AND p.status = 'published'
            GROUP BY c.id
            ORDER BY c.name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn create_category(&self, name: &str, slug: &str, description: &str, color: &str) -> Result<BlogCategory, AppError> {
        sqlx::query_as::<_, BlogCategory>(
            r#"
            INSERT INTO blog_categories (name, slug, description, color)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, slug, description, color
            "#,
        )
        .bind(name)
        .bind(slug)
        .bind(description)
        .bind(color)
        .fetch_one(&self.pool)
        .await
        .map_err(conflict_on("blog_categories_slug_key", "Category slug already exists"))
    }

    async fn delete_category(&self, id: &Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM blog_categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        ensure_affected(result, "Category")
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, AppError> {
        sqlx::query_as::<_, Tag>("SELECT id, name, slug FROM tags ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::from)
    }

    async fn tags_with_posts(&self) -> Result<Vec<TagWithCount>, AppError> {
        sqlx::query_as::<_, TagWithCount>(
            r#"
            SELECT t.id, t.name, t.slug, COUNT(p.id) AS post_count
            FROM tags t
            JOIN blog_post_tags bt ON bt.tag_id = t.id
            JOIN blog_posts p ON p.id = bt.post_id AND p.status = 'published'
            GROUP BY t.id
            ORDER BY t.name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn create_tag(&self, name: &str, slug: &str) -> Result<Tag, AppError> {
        sqlx::query_as::<_, Tag>("INSERT INTO tags (name, slug) VALUES ($1, $2) RETURNING id, name, slug")
            .bind(name)
            .bind(slug)
            .fetch_one(&self.pool)
            .await
            .map_err(conflict_on("tags_slug_key", "Tag slug already exists"))
    }

    async fn delete_tag(&self, id: &Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM tags WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        ensure_affected(result, "Tag")
    }

    async fn tags_for_posts(&self, post_ids: &[Uuid]) -> Result<Vec<PostTag>, AppError> {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, PostTag>(
            r#"
            SELECT bt.post_id, t.id, t.name, t.slug
            FROM blog_post_tags bt JOIN tags t ON t.id = bt.tag_id
            WHERE bt.post_id = ANY($1)
            ORDER BY t.name
            "#,
        )
        .bind(post_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn approved_comments(&self, post_id: &Uuid) -> Result<Vec<Comment>, AppError> {
        sqlx::query_as::<_, Comment>(
            "SELECT * FROM blog_comments WHERE post_id = $1 AND is_approved ORDER BY created_at",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn create_comment(&self, comment: &CommentInsert) -> Result<Comment, AppError> {
        sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO blog_comments (post_id, name, email, website, content)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(comment.post_id)
        .bind(&comment.name)
        .bind(&comment.email)
        .bind(&comment.website)
        .bind(&comment.content)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn list_comments(&self, pending_only: bool) -> Result<Vec<Comment>, AppError> {
        sqlx::query_as::<_, Comment>(
            "SELECT * FROM blog_comments WHERE NOT ($1 AND is_approved) ORDER BY created_at DESC",
        )
        .bind(pending_only)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn set_comment_approval(&self, id: &Uuid, approved: bool) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE blog_comments SET is_approved = $2 WHERE id = $1")
            .bind(id)
            .bind(approved)
            .execute(&self.pool)
            .await?;
        ensure_affected(result, "Comment")
    }

    async fn delete_comment(&self, id: &Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM blog_comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        ensure_affected(result, "Comment")
    }
}
