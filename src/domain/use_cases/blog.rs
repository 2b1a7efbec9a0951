use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::{
        blog_post::{
            BlogCategory, BlogListResponse, BlogPost, BlogPostChanges, BlogPostCreatedResponse,
            BlogPostDetailResponse, BlogPostInsert, BlogPostListResponse, Comment, CommentInsert, NewBlogPostRequest,
            NewCategoryRequest, NewCommentRequest, NewTagRequest, PostFilter, PublicComment, SearchResult, SlugChoice,
            Tag, UpdateBlogPostRequest, resolve_slug_for_update, FEATURED_POSTS_LIMIT, MIN_SEARCH_LENGTH,
            POSTS_PER_PAGE, RELATED_POSTS_LIMIT, SEARCH_RESULTS_LIMIT,
        },
        engagement::VoteResponse,
        pagination::{page_offset, resolve_page, Page},
    },
    errors::AppError,
    repositories::blog_post::BlogRepository,
    use_cases::{
        engagement::EngagementHandler,
        slugs::{claim_explicit_slug, slug_or, unique_slug},
    },
};

pub const COMMENT_PENDING_MESSAGE: &str = "Thank you! Your comment is awaiting moderation.";
const DEFAULT_CATEGORY_COLOR: &str = "#007bff";
pub const ADMIN_POSTS_PER_PAGE: u32 = 20;

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub success: bool,
    pub message: String,
}

/// Public blog reads plus the staff-side writes.
#[derive(Clone)]
pub struct BlogHandler {
    repo: Arc<dyn BlogRepository>,
    engagement: EngagementHandler,
}

impl BlogHandler {
    pub fn new(repo: Arc<dyn BlogRepository>, engagement: EngagementHandler) -> Self {
        BlogHandler { repo, engagement }
    }

    pub async fn list(&self, filter: PostFilter) -> Result<BlogListResponse, AppError> {
        let total = self.repo.count_published(&filter).await?;
        let page = resolve_page(filter.page.as_deref(), total, POSTS_PER_PAGE);
        let posts = self
            .repo
            .list_published(&filter, POSTS_PER_PAGE as i64, page_offset(page, POSTS_PER_PAGE))
            .await?;
        let featured = self.repo.featured_published(FEATURED_POSTS_LIMIT).await?;

        let categories = self.category_map().await?;
        let posts = self.to_list_items(posts, &categories).await?;
        let featured_posts = self.to_list_items(featured, &categories).await?;

        Ok(BlogListResponse {
            posts: Page::new(posts, page, POSTS_PER_PAGE, total),
            categories: self.repo.categories_with_posts().await?,
            tags: self.repo.tags_with_posts().await?,
            featured_posts,
            current_category: filter.category().map(str::to_string),
            current_tag: filter.tag().map(str::to_string),
            search_query: filter.search().map(str::to_string),
        })
    }

    /// Quick search; queries under three characters return nothing.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>, AppError> {
        let query = query.trim();
        if query.chars().count() < MIN_SEARCH_LENGTH {
            return Ok(Vec::new());
        }
        let posts = self.repo.search_published(query, SEARCH_RESULTS_LIMIT).await?;
        let categories = self.category_map().await?;
        Ok(posts
            .iter()
            .map(|p| p.to_search_result(categories.get(&p.category_id)))
            .collect())
    }

    /// A published post. The visit is counted once per client IP.
    pub async fn detail(&self, slug: &str, client_ip: &str) -> Result<BlogPostDetailResponse, AppError> {
        let post = self.published_post(slug).await?;

        if let Err(e) = self.engagement.record_view(&post.id, client_ip).await {
            tracing::warn!("Failed to record view for {}: {}", post.slug, e);
        }

        let (totals, views) = self.engagement.stats(&post.id).await?;
        let comments = self.repo.approved_comments(&post.id).await?;
        let related = self.repo.related_published(&post, RELATED_POSTS_LIMIT).await?;

        let categories = self.category_map().await?;
        let mut tags = self.tags_by_post(&[post.id]).await?;
        let related_posts = self.to_list_items(related, &categories).await?;

        Ok(BlogPostDetailResponse {
            id: post.id,
            title: post.title.clone(),
            slug: post.slug.clone(),
            excerpt: post.excerpt.clone(),
            content_html: post.content_html(),
            featured_image_url: post.featured_image_url.clone(),
            category: categories.get(&post.category_id).map(Into::into),
            tags: tags.remove(&post.id).unwrap_or_default(),
            meta_description: post.meta_description.clone(),
            meta_keywords: post.meta_keywords.clone(),
            reading_time: post.reading_time,
            published_at: post.published_at,
            updated_at: post.updated_at,
            total_likes: totals.likes,
            total_dislikes: totals.dislikes,
            total_views: views,
            comments: comments.into_iter().map(PublicComment::from).collect(),
            related_posts,
        })
    }

    /// Stores a visitor comment for moderation.
    pub async fn add_comment(&self, slug: &str, request: NewCommentRequest) -> Result<CommentResponse, AppError> {
        request.validate()?;
        let post = self.published_post(slug).await?;

        let comment = self
            .repo
            .create_comment(&CommentInsert {
                post_id: post.id,
                name: request.name.trim().to_string(),
                email: request.email.trim().to_string(),
                website: request.website.filter(|w| !w.trim().is_empty()),
                content: request.content.trim().to_string(),
            })
            .await?;

        tracing::info!(post = %post.slug, comment_id = %comment.id, "Comment awaiting moderation");
        Ok(CommentResponse { success: true, message: COMMENT_PENDING_MESSAGE.to_string() })
    }

    pub async fn vote(&self, slug: &str, client_ip: &str, is_like: bool) -> Result<VoteResponse, AppError> {
        let post = self.published_post(slug).await?;
        self.engagement.toggle_vote(&post.id, client_ip, is_like).await
    }

    async fn published_post(&self, slug: &str) -> Result<BlogPost, AppError> {
        self.repo
            .find_by_slug(slug)
            .await?
            .filter(BlogPost::is_published)
            .ok_or_else(|| AppError::NotFound("Blog post not found".to_string()))
    }

    async fn category_map(&self) -> Result<HashMap<Uuid, BlogCategory>, AppError> {
        Ok(self.repo.list_categories().await?.into_iter().map(|c| (c.id, c)).collect())
    }

    async fn tags_by_post(&self, post_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<Tag>>, AppError> {
        let mut grouped: HashMap<Uuid, Vec<Tag>> = HashMap::new();
        if post_ids.is_empty() {
            return Ok(grouped);
        }
        for row in self.repo.tags_for_posts(post_ids).await? {
            grouped.entry(row.post_id).or_default().push(row.into());
        }
        Ok(grouped)
    }

    async fn to_list_items(
        &self,
        posts: Vec<BlogPost>,
        categories: &HashMap<Uuid, BlogCategory>,
    ) -> Result<Vec<BlogPostListResponse>, AppError> {
        let ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
        let mut tags = self.tags_by_post(&ids).await?;
        Ok(posts
            .iter()
            .map(|p| p.to_list_response(categories.get(&p.category_id), tags.remove(&p.id).unwrap_or_default()))
            .collect())
    }

    // ───── Staff operations ─────────────────────────────────────────

    pub async fn list_all(&self, raw_page: Option<&str>) -> Result<Page<BlogPost>, AppError> {
        let total = self.repo.count_all().await?;
        let page = resolve_page(raw_page, total, ADMIN_POSTS_PER_PAGE);
        let posts = self
            .repo
            .list_all(ADMIN_POSTS_PER_PAGE as i64, page_offset(page, ADMIN_POSTS_PER_PAGE))
            .await?;
        Ok(Page::new(posts, page, ADMIN_POSTS_PER_PAGE, total))
    }

    pub async fn get_post(&self, id: &Uuid) -> Result<BlogPost, AppError> {
        self.repo.get_by_id(id).await
    }

    pub async fn create_post(&self, request: NewBlogPostRequest, author_id: Uuid) -> Result<BlogPostCreatedResponse, AppError> {
        request.validate()?;

        let slug = match request.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(explicit) => claim_explicit_slug(explicit, |s| self.slug_taken(s, None), "post").await?,
            None => unique_slug(&slug_or(&request.title, "post"), |s| self.slug_taken(s, None)).await?,
        };

        let insert = BlogPostInsert::from_request(request, author_id, slug, Utc::now());
        let id = self.repo.create_post(&insert).await?;

        tracing::info!(%id, slug = %insert.slug, "Blog post created");
        Ok(BlogPostCreatedResponse {
            id,
            preview_url: format!("/blog/{}", insert.slug),
            slug: insert.slug,
        })
    }

    pub async fn update_post(&self, id: &Uuid, patch: UpdateBlogPostRequest) -> Result<BlogPost, AppError> {
        patch.validate()?;
        let current = self.repo.get_by_id(id).await?;

        let title = patch.title.flatten_str().unwrap_or(&current.title).to_string();
        let slug = match resolve_slug_for_update(&patch.slug, &title, &current.slug) {
            SlugChoice::Keep(slug) => slug,
            SlugChoice::Explicit(slug) if slug == current.slug => slug,
            SlugChoice::Explicit(slug) => {
                claim_explicit_slug(&slug, |s| self.slug_taken(s, Some(*id)), "post").await?
            }
            SlugChoice::Derived(base) => {
                let base = if base.is_empty() { "post".to_string() } else { base };
                unique_slug(&base, |s| self.slug_taken(s, Some(*id))).await?
            }
        };

        let changes = BlogPostChanges::merge(&current, &patch, slug, Utc::now());
        self.repo.update_post(id, &changes).await
    }

    pub async fn delete_post(&self, id: &Uuid) -> Result<(), AppError> {
        self.repo.delete_post(id).await.map_err(|e| match e {
            AppError::NotFound(_) => AppError::NotFound("Blog post not found".to_string()),
            other => other,
        })
    }

    async fn slug_taken(&self, slug: String, exclude: Option<Uuid>) -> Result<bool, AppError> {
        self.repo.slug_exists(&slug, exclude).await
    }

    pub async fn list_categories(&self) -> Result<Vec<BlogCategory>, AppError> {
        self.repo.list_categories().await
    }

    pub async fn create_category(&self, request: NewCategoryRequest) -> Result<BlogCategory, AppError> {
        request.validate()?;
        let name = request.name.trim();
        let slug = explicit_or_derived(request.slug.as_deref(), name, "category");
        let color = request.color.as_deref().unwrap_or(DEFAULT_CATEGORY_COLOR);
        self.repo.create_category(name, &slug, &request.description, color).await
    }

    pub async fn delete_category(&self, id: &Uuid) -> Result<(), AppError> {
        self.repo.delete_category(id).await
    }

    pub async fn list_tags(&self) -> Result<Vec<Tag>, AppError> {
        self.repo.list_tags().await
    }

    pub async fn create_tag(&self, request: NewTagRequest) -> Result<Tag, AppError> {
        request.validate()?;
        let name = request.name.trim();
        let slug = explicit_or_derived(request.slug.as_deref(), name, "tag");
        self.repo.create_tag(name, &slug).await
    }

    pub async fn delete_tag(&self, id: &Uuid) -> Result<(), AppError> {
        self.repo.delete_tag(id).await
    }

    pub async fn list_comments(&self, pending_only: bool) -> Result<Vec<Comment>, AppError> {
        self.repo.list_comments(pending_only).await
    }

    pub async fn moderate_comment(&self, id: &Uuid, approved: bool) -> Result<(), AppError> {
        self.repo.set_comment_approval(id, approved).await
    }

    pub async fn delete_comment(&self, id: &Uuid) -> Result<(), AppError> {
        self.repo.delete_comment(id).await
    }
}

pub(crate) fn explicit_or_derived(explicit: Option<&str>, name: &str, fallback: &str) -> String {
    match explicit.map(str::trim).filter(|s| !s.is_empty()) {
        Some(slug) => slug.to_string(),
        None => slug_or(name, fallback),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::blog_post::BlogStatus;
    use crate::entities::option_fields::OptionField;
    use crate::repositories::{blog_post::MockBlogRepository, engagement::MockEngagementRepository};

    fn post(status: BlogStatus) -> BlogPost {
        BlogPost {
            id: Uuid::new_v4(),
            title: "Hardening SSH".into(),
            slug: "hardening-ssh".into(),
            author_id: Uuid::new_v4(),
            category_id: Uuid::new_v4(),
            excerpt: "Keys only".into(),
            content: "Disable **password** auth.".into(),
            featured_image_url: None,
            status,
            is_featured: false,
            meta_description: String::new(),
            meta_keywords: String::new(),
            reading_time: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            published_at: Some(Utc::now()),
        }
    }

    fn new_post(slug: Option<&str>) -> NewBlogPostRequest {
        NewBlogPostRequest {
            title: "Hardening SSH".into(),
            slug: slug.map(str::to_string),
            category_id: Uuid::new_v4(),
            tag_ids: vec![],
            excerpt: String::new(),
            content: "Use keys.".into(),
            featured_image_url: None,
            status: BlogStatus::Draft,
            is_featured: false,
            meta_description: String::new(),
            meta_keywords: String::new(),
        }
    }

    fn handler(repo: MockBlogRepository, engagement: MockEngagementRepository) -> BlogHandler {
        BlogHandler::new(Arc::new(repo), EngagementHandler::new(Arc::new(engagement)))
    }

    #[tokio::test]
    async fn derived_slugs_are_made_unique() {
        let mut repo = MockBlogRepository::new();
        repo.expect_slug_exists()
            .returning(|slug, _| Ok(slug == "hardening-ssh" || slug == "hardening-ssh-2"));
        repo.expect_create_post()
            .withf(|insert| insert.slug == "hardening-ssh-3" && insert.published_at.is_none())
            .returning(|_| Ok(Uuid::new_v4()));

        let created = handler(repo, MockEngagementRepository::new())
            .create_post(new_post(None), Uuid::new_v4())
            .await
            .unwrap();

        assert_eq!(created.slug, "hardening-ssh-3");
        assert_eq!(created.preview_url, "/blog/hardening-ssh-3");
    }

    #[tokio::test]
    async fn explicit_slugs_are_kept_or_rejected() {
        let mut repo = MockBlogRepository::new();
        repo.expect_slug_exists().returning(|slug, _| Ok(slug == "taken"));
        repo.expect_create_post()
            .withf(|insert| insert.slug == "my-custom-slug")
            .returning(|_| Ok(Uuid::new_v4()));
        let handler = handler(repo, MockEngagementRepository::new());

        let created = handler.create_post(new_post(Some("my-custom-slug")), Uuid::new_v4()).await.unwrap();
        assert_eq!(created.slug, "my-custom-slug");

        let err = handler.create_post(new_post(Some("taken")), Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn retitling_keeps_the_stored_slug() {
        let current = post(BlogStatus::Published);
        let id = current.id;
        let mut repo = MockBlogRepository::new();
        let stored = current.clone();
        repo.expect_get_by_id().returning(move |_| Ok(stored.clone()));
        repo.expect_slug_exists().never();
        repo.expect_update_post()
            .withf(|_, changes| changes.slug == "hardening-ssh" && changes.title == "SSH, Hardened")
            .returning(move |_, _| Ok(current.clone()));

        let patch = UpdateBlogPostRequest {
            title: OptionField::SetToValue("SSH, Hardened".into()),
            ..UpdateBlogPostRequest::default()
        };
        handler(repo, MockEngagementRepository::new()).update_post(&id, patch).await.unwrap();
    }

    #[tokio::test]
    async fn drafts_are_not_public() {
        let mut repo = MockBlogRepository::new();
        repo.expect_find_by_slug().returning(|_| Ok(Some(post(BlogStatus::Draft))));

        let err = handler(repo, MockEngagementRepository::new())
            .detail("hardening-ssh", "10.0.0.1")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn detail_records_a_view_and_renders_markdown() {
        let published = post(BlogStatus::Published);
        let mut repo = MockBlogRepository::new();
        repo.expect_find_by_slug().returning(move |_| Ok(Some(published.clone())));
        repo.expect_approved_comments().returning(|_| Ok(vec![]));
        repo.expect_related_published().returning(|_, _| Ok(vec![]));
        repo.expect_list_categories().returning(|| Ok(vec![]));
        repo.expect_tags_for_posts().returning(|_| Ok(vec![]));

        let mut engagement = MockEngagementRepository::new();
        engagement
            .expect_record_view()
            .withf(|_, ip| ip == "10.0.0.1")
            .times(1)
            .returning(|_, _| Ok(true));
        engagement.expect_vote_totals().returning(|_| Ok(Default::default()));
        engagement.expect_view_count().returning(|_| Ok(1));

        let detail = handler(repo, engagement).detail("hardening-ssh", "10.0.0.1").await.unwrap();
        assert_eq!(detail.total_views, 1);
        assert!(detail.content_html.contains("<strong>password</strong>"));
    }

    #[tokio::test]
    async fn short_searches_skip_the_database() {
        let mut repo = MockBlogRepository::new();
        repo.expect_search_published().never();
        let results = handler(repo, MockEngagementRepository::new()).search(" ss ").await.unwrap();
        assert!(results.is_empty());
    }
}
