use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::entities::{
    blog_post::{new_validation_error, non_blank, validate_hex_color, validate_slug, validate_url},
    option_fields::OptionField,
};

pub const PROJECTS_PER_PAGE: u32 = 9;
pub const RELATED_PROJECTS_LIMIT: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "project_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Planning,
    Development,
    #[default]
    Completed,
    Maintenance,
}

impl ProjectStatus {
    pub fn display(&self) -> &'static str {
        match self {
            ProjectStatus::Planning => "Planning",
            ProjectStatus::Development => "In Development",
            ProjectStatus::Completed => "Completed",
            ProjectStatus::Maintenance => "Maintenance",
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, ProjectStatus::Planning)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct ProjectCategory {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct Technology {
    pub id: Uuid,
    pub name: String,
    pub icon: String,
    pub color: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProjectTechnology {
    pub project_id: Uuid,
    pub id: Uuid,
    pub name: String,
    pub icon: String,
    pub color: String,
}

impl From<ProjectTechnology> for Technology {
    fn from(row: ProjectTechnology) -> Self {
        Technology { id: row.id, name: row.name, icon: row.icon, color: row.color }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub short_description: String,
    pub category_id: Uuid,
    pub status: ProjectStatus,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub live_url: Option<String>,
    pub github_url: Option<String>,
    pub demo_url: Option<String>,
    pub featured_image_url: Option<String>,
    pub writeup_document_key: Option<String>,
    pub writeup_file_name: Option<String>,
    pub is_featured: bool,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProjectFeature {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub display_order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProjectImage {
    pub id: Uuid,
    pub project_id: Uuid,
    pub image_url: String,
    pub caption: String,
    pub display_order: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectFilter {
    pub category: Option<String>,
    pub technology: Option<String>,
    pub search: Option<String>,
    pub page: Option<String>,
}

impl ProjectFilter {
    pub fn category(&self) -> Option<&str> {
        non_blank(&self.category)
    }

    pub fn technology(&self) -> Option<&str> {
        non_blank(&self.technology)
    }

    pub fn search(&self) -> Option<&str> {
        non_blank(&self.search)
    }
}

// ───── Requests ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewProjectRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(custom(function = "validate_slug"))]
    pub slug: Option<String>,

    #[validate(length(min = 1))]
    pub description: String,

    #[validate(length(min = 1, max = 300))]
    pub short_description: String,

    pub category_id: Uuid,

    #[serde(default)]
    pub technology_ids: Vec<Uuid>,

    #[serde(default)]
    pub status: ProjectStatus,

    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,

    #[validate(custom(function = "validate_url"))]
    pub live_url: Option<String>,
    #[validate(custom(function = "validate_url"))]
    pub github_url: Option<String>,
    #[validate(custom(function = "validate_url"))]
    pub demo_url: Option<String>,
    #[validate(custom(function = "validate_url"))]
    pub featured_image_url: Option<String>,

    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub display_order: i32,
}

impl NewProjectRequest {
    pub fn check_dates(&self) -> Result<(), ValidationError> {
        validate_date_range(self.start_date, self.end_date)
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: OptionField<String>,
    pub slug: OptionField<String>,
    #[validate(length(min = 1))]
    pub description: OptionField<String>,
    #[validate(length(min = 1, max = 300))]
    pub short_description: OptionField<String>,
    pub category_id: OptionField<Uuid>,
    pub technology_ids: OptionField<Vec<Uuid>>,
    pub status: OptionField<ProjectStatus>,
    pub start_date: OptionField<NaiveDate>,
    pub end_date: OptionField<NaiveDate>,
    pub live_url: OptionField<String>,
    pub github_url: OptionField<String>,
    pub demo_url: OptionField<String>,
    pub featured_image_url: OptionField<String>,
    pub is_featured: OptionField<bool>,
    pub display_order: OptionField<i32>,
}

/// Column values for an insert or a full-row update.
#[derive(Debug, Clone)]
pub struct ProjectRecord {
    pub title: String,
    pub slug: String,
    pub description: String,
    pub short_description: String,
    pub category_id: Uuid,
    pub technology_ids: Option<Vec<Uuid>>,
    pub status: ProjectStatus,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub live_url: Option<String>,
    pub github_url: Option<String>,
    pub demo_url: Option<String>,
    pub featured_image_url: Option<String>,
    pub is_featured: bool,
    pub display_order: i32,
}

impl ProjectRecord {
    pub fn from_request(request: NewProjectRequest, slug: String) -> Self {
        ProjectRecord {
            title: request.title,
            slug,
            description: request.description,
            short_description: request.short_description,
            category_id: request.category_id,
            technology_ids: Some(request.technology_ids),
            status: request.status,
            start_date: request.start_date,
            end_date: request.end_date,
            live_url: request.live_url,
            github_url: request.github_url,
            demo_url: request.demo_url,
            featured_image_url: request.featured_image_url,
            is_featured: request.is_featured,
            display_order: request.display_order,
        }
    }

    pub fn merge(current: &Project, patch: &UpdateProjectRequest, slug: String) -> Self {
        ProjectRecord {
            title: patch.title.apply(current.title.clone()),
            slug,
            description: patch.description.apply(current.description.clone()),
            short_description: patch.short_description.apply(current.short_description.clone()),
            category_id: patch.category_id.apply(current.category_id),
            technology_ids: match &patch.technology_ids {
                OptionField::Unchanged => None,
                OptionField::SetToNull => Some(Vec::new()),
                OptionField::SetToValue(ids) => Some(ids.clone()),
            },
            status: patch.status.apply(current.status),
            start_date: patch.start_date.apply(current.start_date),
            end_date: patch.end_date.apply_nullable(current.end_date),
            live_url: patch.live_url.apply_nullable(current.live_url.clone()),
            github_url: patch.github_url.apply_nullable(current.github_url.clone()),
            demo_url: patch.demo_url.apply_nullable(current.demo_url.clone()),
            featured_image_url: patch.featured_image_url.apply_nullable(current.featured_image_url.clone()),
            is_featured: patch.is_featured.apply(current.is_featured),
            display_order: patch.display_order.apply(current.display_order),
        }
    }

    pub fn validate_links(&self) -> Result<(), ValidationError> {
        validate_date_range(self.start_date, self.end_date)?;
        for url in [&self.live_url, &self.github_url, &self.demo_url, &self.featured_image_url]
            .into_iter()
            .flatten()
        {
            validate_url(url)?;
        }
        Ok(())
    }
}

pub fn validate_date_range(start: NaiveDate, end: Option<NaiveDate>) -> Result<(), ValidationError> {
    match end {
        Some(end) if end < start => Err(new_validation_error("end_before_start", "End date cannot be before start date")),
        _ => Ok(()),
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewProjectCategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(custom(function = "validate_slug"))]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub icon: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewTechnologyRequest {
    #[validate(length(min = 1, max = 50))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub icon: String,
    #[validate(custom(function = "validate_hex_color"))]
    pub color: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewProjectFeatureRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1))]
    pub description: String,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub icon: String,
    #[serde(default)]
    pub display_order: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewProjectImageRequest {
    #[validate(custom(function = "validate_url"))]
    pub image_url: String,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub caption: String,
    #[serde(default)]
    pub display_order: i32,
}

// ───── Responses ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ProjectCard {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub short_description: String,
    pub category: Option<ProjectCategory>,
    pub technologies: Vec<Technology>,
    pub status: ProjectStatus,
    pub status_display: &'static str,
    pub featured_image_url: Option<String>,
    pub live_url: Option<String>,
    pub github_url: Option<String>,
    pub is_featured: bool,
}

/// Compact row returned by the client-side filter endpoint.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProjectFilterItem {
    pub title: String,
    pub slug: String,
    pub short_description: String,
    pub category: String,
    pub technologies: Vec<String>,
    pub featured_image: String,
    pub live_url: String,
    pub github_url: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ProjectListResponse {
    pub projects: crate::entities::pagination::Page<ProjectCard>,
    pub categories: Vec<ProjectCategory>,
    pub technologies: Vec<Technology>,
    pub current_category: Option<String>,
    pub current_technology: Option<String>,
    pub search_query: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProjectDetailResponse {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub short_description: String,
    pub category: Option<ProjectCategory>,
    pub technologies: Vec<Technology>,
    pub status: ProjectStatus,
    pub status_display: &'static str,
    pub is_active: bool,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub live_url: Option<String>,
    pub github_url: Option<String>,
    pub demo_url: Option<String>,
    pub featured_image_url: Option<String>,
    pub writeup_url: Option<String>,
    pub writeup_file_name: Option<String>,
    pub features: Vec<ProjectFeature>,
    pub gallery: Vec<ProjectImage>,
    pub related_projects: Vec<ProjectCard>,
}

impl Project {
    pub fn to_card(&self, category: Option<&ProjectCategory>, technologies: Vec<Technology>) -> ProjectCard {
        ProjectCard {
            id: self.id,
            title: self.title.clone(),
            slug: self.slug.clone(),
            short_description: self.short_description.clone(),
            category: category.cloned(),
            technologies,
            status: self.status,
            status_display: self.status.display(),
            featured_image_url: self.featured_image_url.clone(),
            live_url: self.live_url.clone(),
            github_url: self.github_url.clone(),
            is_featured: self.is_featured,
        }
    }

    pub fn to_filter_item(&self, category: Option<&ProjectCategory>, technologies: &[Technology]) -> ProjectFilterItem {
        ProjectFilterItem {
            title: self.title.clone(),
            slug: self.slug.clone(),
            short_description: self.short_description.clone(),
            category: category.map(|c| c.name.clone()).unwrap_or_default(),
            technologies: technologies.iter().map(|t| t.name.clone()).collect(),
            featured_image: self.featured_image_url.clone().unwrap_or_default(),
            live_url: self.live_url.clone().unwrap_or_default(),
            github_url: self.github_url.clone().unwrap_or_default(),
            status: self.status.display().to_string(),
        }
    }

    pub fn writeup_url(&self) -> Option<String> {
        self.writeup_document_key
            .as_ref()
            .map(|_| format!("/portfolio/{}/writeup", self.slug))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planning_projects_are_not_active() {
        assert!(!ProjectStatus::Planning.is_active());
        assert!(ProjectStatus::Development.is_active());
        assert!(ProjectStatus::Completed.is_active());
        assert!(ProjectStatus::Maintenance.is_active());
        assert_eq!(ProjectStatus::Development.display(), "In Development");
    }

    #[test]
    fn end_date_must_not_precede_start() {
        let start = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert!(validate_date_range(start, None).is_ok());
        assert!(validate_date_range(start, NaiveDate::from_ymd_opt(2024, 4, 30)).is_err());
        assert!(validate_date_range(start, Some(start)).is_ok());
    }
}
