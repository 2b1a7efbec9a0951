use async_trait::async_trait;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    entities::project::{
        Project, ProjectCategory, ProjectFeature, ProjectFilter, ProjectImage, ProjectRecord, ProjectTechnology,
        Technology,
    },
    errors::AppError,
    repositories::sqlx_repo::{conflict_on, ensure_affected, like_pattern, SqlxPortfolioRepo},
};

const PROJECT_SLUG_CONSTRAINT: &str = "projects_slug_key";

/// Featured-project filter shared by list, count and the compact filter query.
const FEATURED_FILTER: &str = r#"
    p.is_featured
    AND ($1::text IS NULL OR c.slug = $1)
    AND ($2::text IS NULL OR EXISTS (
        SELECT 1 FROM project_technologies pt JOIN technologies t ON t.id = pt.technology_id
        WHERE pt.project_id = p.id AND t.name ILIKE $2))
    AND ($3::text IS NULL
        OR p.title ILIKE $3 OR p.description ILIKE $3 OR p.short_description ILIKE $3)
"#;

const FEATURED_ORDER: &str = "ORDER BY p.is_featured DESC, p.display_order, p.created_at DESC";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PortfolioRepository: Send + Sync {
    async fn list_featured(&self, filter: &ProjectFilter, limit: i64, offset: i64) -> Result<Vec<Project>, AppError>;
    async fn count_featured(&self, filter: &ProjectFilter) -> Result<i64, AppError>;
    /// Every match of `filter`, unpaginated.
    async fn filter_featured(&self, filter: &ProjectFilter) -> Result<Vec<Project>, AppError>;
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Project>, AppError>;
    async fn get_by_id(&self, id: &Uuid) -> Result<Project, AppError>;
    async fn related(&self, project: &Project, limit: i64) -> Result<Vec<Project>, AppError>;
    async fn list_all(&self) -> Result<Vec<Project>, AppError>;
    async fn slug_exists(&self, slug: &str, exclude_id: Option<Uuid>) -> Result<bool, AppError>;
    async fn create_project(&self, record: &ProjectRecord) -> Result<Project, AppError>;
    async fn update_project(&self, id: &Uuid, record: &ProjectRecord) -> Result<Project, AppError>;
    async fn delete_project(&self, id: &Uuid) -> Result<(), AppError>;
    async fn set_writeup(&self, id: &Uuid, storage_key: &str, file_name: &str) -> Result<Project, AppError>;

    async fn list_categories(&self) -> Result<Vec<ProjectCategory>, AppError>;
    async fn create_category(&self, name: &str, slug: &str, description: &str, icon: &str) -> Result<ProjectCategory, AppError>;
    async fn delete_category(&self, id: &Uuid) -> Result<(), AppError>;
    async fn list_technologies(&self) -> Result<Vec<Technology>, AppError>;
    async fn create_technology(&self, name: &str, icon: &str, color: &str) -> Result<Technology, AppError>;
    async fn delete_technology(&self, id: &Uuid) -> Result<(), AppError>;
    async fn technologies_for_projects(&self, project_ids: &[Uuid]) -> Result<Vec<ProjectTechnology>, AppError>;

    async fn list_features(&self, project_id: &Uuid) -> Result<Vec<ProjectFeature>, AppError>;
    async fn add_feature(&self, project_id: &Uuid, title: &str, description: &str, icon: &str, display_order: i32) -> Result<ProjectFeature, AppError>;
    async fn delete_feature(&self, id: &Uuid) -> Result<(), AppError>;
    async fn list_images(&self, project_id: &Uuid) -> Result<Vec<ProjectImage>, AppError>;
    async fn add_image(&self, project_id: &Uuid, image_url: &str, caption: &str, display_order: i32) -> Result<ProjectImage, AppError>;
    async fn delete_image(&self, id: &Uuid) -> Result<(), AppError>;
}

async fn replace_technologies(conn: &mut PgConnection, project_id: Uuid, technology_ids: &[Uuid]) -> Result<(), AppError> {
    sqlx::query("DELETE FROM project_technologies WHERE project_id = $1")
        .bind(project_id)
        .execute(&mut *conn)
        .await?;

    if !technology_ids.is_empty() {
        sqlx::query(
            r#"
            INSERT INTO project_technologies (project_id, technology_id)
            SELECT $1, UNNEST($2::uuid[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(project_id)
        .bind(technology_ids)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

fn filter_binds(filter: &ProjectFilter) -> (Option<String>, Option<String>, Option<String>) {
    (
        filter.category().map(str::to_string),
        filter.technology().map(like_pattern),
        filter.search().map(like_pattern),
    )
}

#[async_trait]
impl PortfolioRepository for SqlxPortfolioRepo {
    async fn list_featured(&self, filter: &ProjectFilter, limit: i64, offset: i64) -> Result<Vec<Project>, AppError> {
        let sql = format!(
            "SELECT p.* FROM projects p JOIN project_categories c ON c.id = p.category_id WHERE {FEATURED_FILTER} {FEATURED_ORDER} LIMIT $4 OFFSET $5"
        );
        let (category, technology, search) = filter_binds(filter);
        sqlx::query_as::<_, Project>(&sql)
            .bind(category)
            .bind(technology)
            .bind(search)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::from)
    }

    async fn count_featured(&self, filter: &ProjectFilter) -> Result<i64, AppError> {
        let sql = format!(
            "SELECT COUNT(*) FROM projects p JOIN project_categories c ON c.id = p.category_id WHERE {FEATURED_FILTER}"
        );
        let (category, technology, search) = filter_binds(filter);
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(category)
            .bind(technology)
            .bind(search)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn filter_featured(&self, filter: &ProjectFilter) -> Result<Vec<Project>, AppError> {
        let sql = format!(
            "SELECT p.* FROM projects p JOIN project_categories c ON c.id = p.category_id WHERE {FEATURED_FILTER} {FEATURED_ORDER}"
        );
        let (category, technology, search) = filter_binds(filter);
        sqlx::query_as::<_, Project>(&sql)
            .bind(category)
            .bind(technology)
            .bind(search)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::from)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Project>, AppError> {
        sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)
    }

    async fn get_by_id(&self, id: &Uuid) -> Result<Project, AppError> {
        sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Project not found".into()))
    }

    async fn related(&self, project: &Project, limit: i64) -> Result<Vec<Project>, AppError> {
        sqlx::query_as::<_, Project>(
            r#"
            SELECT * FROM projects
            WHERE category_id = $1 AND id <> $2
            ORDER BY is_featured DESC, display_order, created_at DESC
            LIMIT $3
            "#,
        )
        .bind(project.category_id)
        .bind(project.id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn list_all(&self) -> Result<Vec<Project>, AppError> {
        sqlx::query_as::<_, Project>("SELECT * FROM projects ORDER BY display_order, created_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::from)
    }

    async fn slug_exists(&self, slug: &str, exclude_id: Option<Uuid>) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM projects WHERE slug = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(slug)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn create_project(&self, record: &ProjectRecord) -> Result<Project, AppError> {
        let mut tx = self.pool.begin().await?;

        let project = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (
                title, slug, description, short_description, category_id, status, start_date, end_date,
                live_url, github_url, demo_url, featured_image_url, is_featured, display_order
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(&record.title)
        .bind(&record.slug)
        .bind(&record.description)
        .bind(&record.short_description)
        .bind(record.category_id)
        .bind(record.status)
        .bind(record.start_date)
        .bind(record.end_date)
        .bind(&record.live_url)
        .bind(&record.github_url)
        .bind(&record.demo_url)
        .bind(&record.featured_image_url)
        .bind(record.is_featured)
        .bind(record.display_order)
        .fetch_one(&mut *tx)
        .await
        .map_err(conflict_on(PROJECT_SLUG_CONSTRAINT, "Slug already exists"))?;

        if let Some(ids) = &record.technology_ids {
            replace_technologies(&mut tx, project.id, ids).await?;
        }
        tx.commit().await?;

        Ok(project)
    }

    async fn update_project(&self, id: &Uuid, record: &ProjectRecord) -> Result<Project, AppError> {
        let mut tx = self.pool.begin().await?;

        let project = sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects SET
                title = $2,
                slug = $3,
                description = $4,
                short_description = $5,
                category_id = $6,
                status = $7,
                start_date = $8,
                end_date = $9,
                live_url = $10,
                github_url = $11,
                demo_url = $12,
                featured_image_url = $13,
                is_featured = $14,
                display_order = $15,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&record.title)
        .bind(&record.slug)
        .bind(&record.description)
        .bind(&record.short_description)
        .bind(record.category_id)
        .bind(record.status)
        .bind(record.start_date)
        .bind(record.end_date)
        .bind(&record.live_url)
        .bind(&record.github_url)
        .bind(&record.demo_url)
        .bind(&record.featured_image_url)
        .bind(record.is_featured)
        .bind(record.display_order)
        .fetch_optional(&mut *tx)
        .await
        .map_err(conflict_on(PROJECT_SLUG_CONSTRAINT, "Slug already exists"))?
        .ok_or_else(|| AppError::NotFound("Project not found".into()))?;

        if let Some(ids) = &record.technology_ids {
            replace_technologies(&mut tx, project.id, ids).await?;
        }
        tx.commit().await?;

        Ok(project)
    }

    async fn delete_project(&self, id: &Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        ensure_affected(result, "Project")
    }

    async fn set_writeup(&self, id: &Uuid, storage_key: &str, file_name: &str) -> Result<Project, AppError> {
        sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects
            SET writeup_document_key = $2, writeup_file_name = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(storage_key)
        .bind(file_name)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".into()))
    }

    async fn list_categories(&self) -> Result<Vec<ProjectCategory>, AppError> {
        sqlx::query_as::<_, ProjectCategory>(
            "SELECT id, name, slug, description, icon FROM project_categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn create_category(&self, name: &str, slug: &str, description: &str, icon: &str) -> Result<ProjectCategory, AppError> {
        sqlx::query_as::<_, ProjectCategory>(
            r#"
            INSERT INTO project_categories (name, slug, description, icon)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, slug, description, icon
            "#,
        )
        .bind(name)
        .bind(slug)
        .bind(description)
        .bind(icon)
        .fetch_one(&self.pool)
        .await
        .map_err(conflict_on("project_categories_slug_key", "Category slug already exists"))
    }

    async fn delete_category(&self, id: &Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM project_categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        ensure_affected(result, "Category")
    }

    async fn list_technologies(&self) -> Result<Vec<Technology>, AppError> {
        sqlx::query_as::<_, Technology>("SELECT id, name, icon, color FROM technologies ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::from)
    }

    async fn create_technology(&self, name: &str, icon: &str, color: &str) -> Result<Technology, AppError> {
        sqlx::query_as::<_, Technology>(
            "INSERT INTO technologies (name, icon, color) VALUES ($1, $2, $3) RETURNING id, name, icon, color",
        )
        .bind(name)
        .bind(icon)
        .bind(color)
        .fetch_one(&self.pool)
        .await
        .map_err(conflict_on("technologies_name_key", "Technology already exists"))
    }

    async fn delete_technology(&self, id: &Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM technologies WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        ensure_affected(result, "Technology")
    }

    async fn technologies_for_projects(&self, project_ids: &[Uuid]) -> Result<Vec<ProjectTechnology>, AppError> {
        if project_ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, ProjectTechnology>(
            r#"
            SELECT pt.project_id, t.id, t.name, t.icon, t.color
            FROM project_technologies pt JOIN technologies t ON t.id = pt.technology_id
            WHERE pt.project_id = ANY($1)
            ORDER BY t.name
            "#,
        )
        .bind(project_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn list_features(&self, project_id: &Uuid) -> Result<Vec<ProjectFeature>, AppError> {
        sqlx::query_as::<_, ProjectFeature>(
            "SELECT * FROM project_features WHERE project_id = $1 ORDER BY display_order, title",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn add_feature(&self, project_id: &Uuid, title: &str, description: &str, icon: &str, display_order: i32) -> Result<ProjectFeature, AppError> {
        sqlx::query_as::<_, ProjectFeature>(
            r#"
            INSERT INTO project_features (project_id, title, description, icon, display_order)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(project_id)
        .bind(title)
        .bind(description)
        .bind(icon)
        .bind(display_order)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn delete_feature(&self, id: &Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM project_features WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        ensure_affected(result, "Feature")
    }

    async fn list_images(&self, project_id: &Uuid) -> Result<Vec<ProjectImage>, AppError> {
        sqlx::query_as::<_, ProjectImage>(
            "SELECT * FROM project_images WHERE project_id = $1 ORDER BY display_order",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn add_image(&self, project_id: &Uuid, image_url: &str, caption: &str, display_order: i32) -> Result<ProjectImage, AppError> {
        sqlx::query_as::<_, ProjectImage>(
            r#"
            INSERT INTO project_images (project_id, image_url, caption, display_order)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(project_id)
        .bind(image_url)
        .bind(caption)
        .bind(display_order)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn delete_image(&self, id: &Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM project_images WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        ensure_affected(result, "Image")
    }
}
