use std::borrow::Cow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    entities::option_fields::OptionField,
    utils::markdown::safe_markdown_to_html,
};

// ───── Constants ──────────────────────────────────────────────────────
const MAX_TITLE_LENGTH: u64 = 200;
const MAX_SLUG_LENGTH: u64 = 200;
const MAX_EXCERPT_LENGTH: u64 = 300;
const MAX_META_DESCRIPTION_LENGTH: u64 = 160;
const MAX_META_KEYWORDS_LENGTH: u64 = 200;
const WORDS_PER_MINUTE: f64 = 200.0;

pub const POSTS_PER_PAGE: u32 = 6;
pub const FEATURED_POSTS_LIMIT: i64 = 3;
pub const RELATED_POSTS_LIMIT: i64 = 3;
pub const SEARCH_RESULTS_LIMIT: i64 = 5;
pub const MIN_SEARCH_LENGTH: usize = 3;

// ───── Database Models ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "blog_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BlogStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BlogPost {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub author_id: Uuid,
    pub category_id: Uuid,
    pub excerpt: String,
    pub content: String,
    pub featured_image_url: Option<String>,
    pub status: BlogStatus,
    pub is_featured: bool,
    pub meta_description: String,
    pub meta_keywords: String,
    pub reading_time: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

impl BlogPost {
    pub fn is_published(&self) -> bool {
        self.status == BlogStatus::Published
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct BlogCategory {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

/// A tag joined to one of the posts it labels.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostTag {
    pub post_id: Uuid,
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

impl From<PostTag> for Tag {
    fn from(row: PostTag) -> Self {
        Tag { id: row.id, name: row.name, slug: row.slug }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CategoryWithCount {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub color: String,
    pub post_count: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TagWithCount {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub post_count: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub name: String,
    pub email: String,
    pub website: Option<String>,
    pub content: String,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct BlogPostInsert {
    pub title: String,
    pub slug: String,
    pub author_id: Uuid,
    pub category_id: Uuid,
    pub tag_ids: Vec<Uuid>,
    pub excerpt: String,
    pub content: String,
    pub featured_image_url: Option<String>,
    pub status: BlogStatus,
    pub is_featured: bool,
    pub meta_description: String,
    pub meta_keywords: String,
    pub reading_time: i32,
    pub published_at: Option<DateTime<Utc>>,
}

/// Fully resolved column values for an update; computed by the use case.
#[derive(Debug, Clone)]
pub struct BlogPostChanges {
    pub title: String,
    pub slug: String,
    pub category_id: Uuid,
    pub tag_ids: Option<Vec<Uuid>>,
    pub excerpt: String,
    pub content: String,
    pub featured_image_url: Option<String>,
    pub status: BlogStatus,
    pub is_featured: bool,
    pub meta_description: String,
    pub meta_keywords: String,
    pub reading_time: i32,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct CommentInsert {
    pub post_id: Uuid,
    pub name: String,
    pub email: String,
    pub website: Option<String>,
    pub content: String,
}

// ───── Query Models ─────────────────────────────────────────────────

/// Public listing filters, taken straight from the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostFilter {
    pub category: Option<String>,
    pub tag: Option<String>,
    pub search: Option<String>,
    pub page: Option<String>,
}

impl PostFilter {
    pub fn category(&self) -> Option<&str> {
        non_blank(&self.category)
    }

    pub fn tag(&self) -> Option<&str> {
        non_blank(&self.tag)
    }

    pub fn search(&self) -> Option<&str> {
        non_blank(&self.search)
    }
}

pub(crate) fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

// ───── API Response Models ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct CategoryRef {
    pub name: String,
    pub slug: String,
    pub color: String,
}

impl From<&BlogCategory> for CategoryRef {
    fn from(c: &BlogCategory) -> Self {
        CategoryRef { name: c.name.clone(), slug: c.slug.clone(), color: c.color.clone() }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BlogPostListResponse {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub featured_image_url: Option<String>,
    pub category: Option<CategoryRef>,
    pub tags: Vec<Tag>,
    pub is_featured: bool,
    pub reading_time: i32,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct BlogPostDetailResponse {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub content_html: String,
    pub featured_image_url: Option<String>,
    pub category: Option<CategoryRef>,
    pub tags: Vec<Tag>,
    pub meta_description: String,
    pub meta_keywords: String,
    pub reading_time: i32,
    pub published_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub total_likes: i64,
    pub total_dislikes: i64,
    pub total_views: i64,
    pub comments: Vec<PublicComment>,
    pub related_posts: Vec<BlogPostListResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicComment {
    pub name: String,
    pub website: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<Comment> for PublicComment {
    fn from(c: Comment) -> Self {
        PublicComment { name: c.name, website: c.website, content: c.content, created_at: c.created_at }
    }
}

#[derive(Debug, Serialize)]
pub struct BlogListResponse {
    pub posts: crate::entities::pagination::Page<BlogPostListResponse>,
    pub categories: Vec<CategoryWithCount>,
    pub tags: Vec<TagWithCount>,
    pub featured_posts: Vec<BlogPostListResponse>,
    pub current_category: Option<String>,
    pub current_tag: Option<String>,
    pub search_query: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct SearchResult {
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub category: String,
    pub published_at: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct BlogPostCreatedResponse {
    pub id: Uuid,
    pub slug: String,
    pub preview_url: String,
}

// ───── Input & Validation Requests ──────────────────────────────────

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct NewBlogPostRequest {
    #[validate(
        length(min = 1, max = MAX_TITLE_LENGTH),
        custom(function = "validate_title")
    )]
    pub title: String,

    #[validate(
        length(max = MAX_SLUG_LENGTH),
        custom(function = "validate_slug")
    )]
    pub slug: Option<String>,

    pub category_id: Uuid,

    #[serde(default)]
    pub tag_ids: Vec<Uuid>,

    #[serde(default)]
    #[validate(length(max = MAX_EXCERPT_LENGTH))]
    pub excerpt: String,

    #[validate(length(min = 1, message = "Content cannot be empty"))]
    pub content: String,

    #[validate(custom(function = "validate_url"))]
    pub featured_image_url: Option<String>,

    #[serde(default)]
    pub status: BlogStatus,

    #[serde(default)]
    pub is_featured: bool,

    #[serde(default)]
    #[validate(length(max = MAX_META_DESCRIPTION_LENGTH))]
    pub meta_description: String,

    #[serde(default)]
    #[validate(length(max = MAX_META_KEYWORDS_LENGTH))]
    pub meta_keywords: String,
}

#[derive(Debug, Deserialize, Validate, Default)]
#[serde(default)]
pub struct UpdateBlogPostRequest {
    #[validate(
        length(min = 1, max = MAX_TITLE_LENGTH),
        custom(function = "validate_optional_title")
    )]
    pub title: OptionField<String>,

    #[validate(length(max = MAX_SLUG_LENGTH))]
    pub slug: OptionField<String>,

    pub category_id: OptionField<Uuid>,

    pub tag_ids: OptionField<Vec<Uuid>>,

    #[validate(length(max = MAX_EXCERPT_LENGTH))]
    pub excerpt: OptionField<String>,

    #[validate(length(min = 1))]
    pub content: OptionField<String>,

    #[validate(custom(function = "validate_optional_url_field"))]
    pub featured_image_url: OptionField<String>,

    pub status: OptionField<BlogStatus>,

    pub is_featured: OptionField<bool>,

    #[validate(length(max = MAX_META_DESCRIPTION_LENGTH))]
    pub meta_description: OptionField<String>,

    #[validate(length(max = MAX_META_KEYWORDS_LENGTH))]
    pub meta_keywords: OptionField<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewCategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(custom(function = "validate_slug"))]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    #[validate(custom(function = "validate_hex_color"))]
    pub color: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewTagRequest {
    #[validate(length(min = 1, max = 50))]
    pub name: String,
    #[validate(custom(function = "validate_slug"))]
    pub slug: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewCommentRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(custom(function = "validate_url"))]
    pub website: Option<String>,

    #[validate(length(min = 1, max = 5000, message = "Comment cannot be empty"))]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    #[serde(default = "default_true")]
    pub is_like: bool,
}

/// Staff decision on a pending comment.
#[derive(Debug, Deserialize)]
pub struct ModerationRequest {
    #[serde(default = "default_true")]
    pub approved: bool,
}

impl Default for VoteRequest {
    fn default() -> Self {
        VoteRequest { is_like: true }
    }
}

fn default_true() -> bool {
    true
}

// ───── Validation Helpers ───────────────────────────────────────────

pub fn validate_url(url: &str) -> Result<(), ValidationError> {
    match url::Url::parse(url) {
        Ok(parsed) => {
            if parsed.scheme() == "http" || parsed.scheme() == "https" {
                Ok(())
            } else {
                Err(new_validation_error("invalid_url_scheme", "URL must start with http:// or https://"))
            }
        }
        Err(_) => Err(new_validation_error("invalid_url", "Invalid URL format")),
    }
}

pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    if slug.is_empty() {
        return Ok(());
    }
    if !slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_') {
        return Err(new_validation_error("slug_invalid_chars", "Slug must contain only lowercase letters, digits, hyphens or underscores"));
    }
    if slug.starts_with('-') || slug.ends_with('-') {
        return Err(new_validation_error("slug_edge_hyphen", "Slug must not start or end with a hyphen"));
    }
    Ok(())
}

pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(new_validation_error("title_blank", "Title cannot be blank"));
    }
    if title.trim().len() != title.len() {
        return Err(new_validation_error("title_whitespace", "Title must not have leading or trailing whitespace"));
    }
    Ok(())
}

pub fn validate_hex_color(color: &str) -> Result<(), ValidationError> {
    let valid = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());
    if valid {
        Ok(())
    } else {
        Err(new_validation_error("invalid_color", "Color must be a hex code like #1a2b3c"))
    }
}

pub fn validate_optional_title(value: &OptionField<String>) -> Result<(), ValidationError> {
    if let OptionField::SetToValue(title) = value {
        validate_title(title)?;
    }
    Ok(())
}

pub fn validate_optional_url_field(value: &OptionField<String>) -> Result<(), ValidationError> {
    if let OptionField::SetToValue(url) = value {
        validate_url(url)?;
    }
    Ok(())
}

pub(crate) fn new_validation_error(code: &'static str, msg: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(msg));
    err
}

// ───── Derived Fields ───────────────────────────────────────────────

/// Minutes to read at 200 words per minute, never below one for non-empty content.
/// Empty content keeps `previous`.
pub fn reading_time(content: &str, previous: i32) -> i32 {
    if content.is_empty() {
        return previous;
    }
    let words = content.split_whitespace().count() as f64;
    let minutes = (words / WORDS_PER_MINUTE).round_ties_even() as i32;
    minutes.max(1)
}

/// `published_at` is stamped on the first transition to published and then kept.
pub fn resolve_published_at(
    current: Option<DateTime<Utc>>,
    status: BlogStatus,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match (current, status) {
        (Some(existing), _) => Some(existing),
        (None, BlogStatus::Published) => Some(now),
        (None, _) => None,
    }
}

/// An explicit non-empty slug wins; an explicit empty slug re-derives from the
/// title; otherwise the stored slug is kept.
pub fn resolve_slug_for_update(
    slug_field: &OptionField<String>,
    title: &str,
    current_slug: &str,
) -> SlugChoice {
    match slug_field {
        OptionField::SetToValue(s) if !s.trim().is_empty() => SlugChoice::Explicit(s.trim().to_string()),
        OptionField::SetToValue(_) | OptionField::SetToNull => SlugChoice::Derived(slug::slugify(title)),
        OptionField::Unchanged => SlugChoice::Keep(current_slug.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SlugChoice {
    Explicit(String),
    Derived(String),
    Keep(String),
}

// ───── Conversions ──────────────────────────────────────────────────

impl BlogPostInsert {
    pub fn from_request(request: NewBlogPostRequest, author_id: Uuid, slug: String, now: DateTime<Utc>) -> Self {
        let content = request.content;
        BlogPostInsert {
            reading_time: reading_time(&content, 0),
            published_at: resolve_published_at(None, request.status, now),
            title: request.title,
            slug,
            author_id,
            category_id: request.category_id,
            tag_ids: request.tag_ids,
            excerpt: request.excerpt,
            content,
            featured_image_url: request.featured_image_url,
            status: request.status,
            is_featured: request.is_featured,
            meta_description: request.meta_description,
            meta_keywords: request.meta_keywords,
        }
    }
}

impl BlogPostChanges {
    /// Applies a PATCH onto the stored post. The slug is resolved separately.
    pub fn merge(current: &BlogPost, patch: &UpdateBlogPostRequest, slug: String, now: DateTime<Utc>) -> Self {
        let content = patch.content.apply(current.content.clone());
        let status = patch.status.flatten_ref().copied().unwrap_or(current.status);

        BlogPostChanges {
            title: patch.title.flatten_ref().cloned().unwrap_or_else(|| current.title.clone()),
            slug,
            category_id: patch.category_id.flatten_ref().copied().unwrap_or(current.category_id),
            tag_ids: patch.tag_ids.flatten_ref().cloned().or_else(|| {
                patch.tag_ids.is_set_to_null().then(Vec::new)
            }),
            excerpt: merge_text(&patch.excerpt, &current.excerpt),
            reading_time: reading_time(&content, current.reading_time),
            content,
            featured_image_url: match &patch.featured_image_url {
                OptionField::SetToValue(url) => Some(url.clone()),
                OptionField::SetToNull => None,
                OptionField::Unchanged => current.featured_image_url.clone(),
            },
            published_at: resolve_published_at(current.published_at, status, now),
            status,
            is_featured: patch.is_featured.flatten_bool().unwrap_or(current.is_featured),
            meta_description: merge_text(&patch.meta_description, &current.meta_description),
            meta_keywords: merge_text(&patch.meta_keywords, &current.meta_keywords),
        }
    }
}

fn merge_text(field: &OptionField<String>, current: &str) -> String {
    match field {
        OptionField::SetToValue(v) => v.clone(),
        OptionField::SetToNull => String::new(),
        OptionField::Unchanged => current.to_string(),
    }
}

impl BlogPost {
    pub fn to_list_response(&self, category: Option<&BlogCategory>, tags: Vec<Tag>) -> BlogPostListResponse {
        BlogPostListResponse {
            id: self.id,
            title: self.title.clone(),
            slug: self.slug.clone(),
            excerpt: self.excerpt.clone(),
            featured_image_url: self.featured_image_url.clone(),
            category: category.map(CategoryRef::from),
            tags,
            is_featured: self.is_featured,
            reading_time: self.reading_time,
            published_at: self.published_at,
        }
    }

    pub fn to_search_result(&self, category: Option<&BlogCategory>) -> SearchResult {
        SearchResult {
            title: self.title.clone(),
            slug: self.slug.clone(),
            excerpt: self.excerpt.clone(),
            category: category.map(|c| c.name.clone()).unwrap_or_default(),
            published_at: self
                .published_at
                .map(|d| d.format("%B %d, %Y").to_string())
                .unwrap_or_default(),
            url: format!("/blog/{}", self.slug),
        }
    }

    pub fn content_html(&self) -> String {
        safe_markdown_to_html(&self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn words(n: usize) -> String {
        vec!["word"; n].join(" ")
    }

    #[test]
    fn reading_time_rounds_half_to_even_with_floor_of_one() {
        assert_eq!(reading_time(&words(10), 0), 1);
        assert_eq!(reading_time(&words(300), 0), 2); // 1.5 -> 2
        assert_eq!(reading_time(&words(500), 0), 2); // 2.5 -> 2
        assert_eq!(reading_time(&words(700), 0), 4); // 3.5 -> 4
        assert_eq!(reading_time(&words(1000), 0), 5);
    }

    #[test]
    fn empty_content_keeps_previous_reading_time() {
        assert_eq!(reading_time("", 0), 0);
        assert_eq!(reading_time("", 7), 7);
    }

    #[test]
    fn published_at_is_set_once() {
        let first = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

        assert_eq!(resolve_published_at(None, BlogStatus::Draft, first), None);
        assert_eq!(resolve_published_at(None, BlogStatus::Published, first), Some(first));
        assert_eq!(resolve_published_at(Some(first), BlogStatus::Published, later), Some(first));
        assert_eq!(resolve_published_at(Some(first), BlogStatus::Archived, later), Some(first));
    }

    #[test]
    fn slug_is_kept_unless_explicitly_changed() {
        assert_eq!(
            resolve_slug_for_update(&OptionField::Unchanged, "New Title", "old-slug"),
            SlugChoice::Keep("old-slug".into())
        );
        assert_eq!(
            resolve_slug_for_update(&OptionField::SetToValue("custom".into()), "New Title", "old-slug"),
            SlugChoice::Explicit("custom".into())
        );
        assert_eq!(
            resolve_slug_for_update(&OptionField::SetToValue("  ".into()), "New Title", "old-slug"),
            SlugChoice::Derived("new-title".into())
        );
    }

    #[test]
    fn search_result_formats_date_like_a_long_month() {
        let post = BlogPost {
            id: Uuid::new_v4(),
            title: "Intro to Nmap".into(),
            slug: "intro-to-nmap".into(),
            author_id: Uuid::new_v4(),
            category_id: Uuid::new_v4(),
            excerpt: "Scanning".into(),
            content: "body".into(),
            featured_image_url: None,
            status: BlogStatus::Published,
            is_featured: false,
            meta_description: String::new(),
            meta_keywords: String::new(),
            reading_time: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            published_at: Some(Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap()),
        };

        let result = post.to_search_result(None);
        assert_eq!(result.published_at, "March 05, 2024");
        assert_eq!(result.url, "/blog/intro-to-nmap");
        assert_eq!(result.category, "");
    }

    #[test]
    fn hex_colors_are_validated() {
        assert!(validate_hex_color("#00ff7F").is_ok());
        assert!(validate_hex_color("00ff7f").is_err());
        assert!(validate_hex_color("#00ff7").is_err());
    }
}
