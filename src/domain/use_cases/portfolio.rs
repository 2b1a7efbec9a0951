use std::{collections::HashMap, sync::Arc};

use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::{
        option_fields::OptionField,
        pagination::{page_offset, resolve_page, Page},
        project::{
            NewProjectCategoryRequest, NewProjectFeatureRequest, NewProjectImageRequest, NewProjectRequest,
            NewTechnologyRequest, Project, ProjectCard, ProjectCategory, ProjectDetailResponse, ProjectFeature,
            ProjectFilter, ProjectFilterItem, ProjectImage, ProjectListResponse, ProjectRecord, Technology,
            UpdateProjectRequest, PROJECTS_PER_PAGE, RELATED_PROJECTS_LIMIT,
        },
    },
    errors::AppError,
    media::{MediaLocation, StoredMedia},
    repositories::project::PortfolioRepository,
    use_cases::{
        blog::explicit_or_derived,
        slugs::{claim_explicit_slug, slug_or, unique_slug},
        uploads::UploadHandler,
    },
};

const DEFAULT_TECHNOLOGY_COLOR: &str = "#007bff";
pub const WRITEUP_FOLDER: &str = "project_documents";

/// Where a writeup download comes from, plus the name to offer the client.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteupDownload {
    pub location: MediaLocation,
    pub file_name: String,
}

#[derive(Clone)]
pub struct PortfolioHandler {
    repo: Arc<dyn PortfolioRepository>,
    uploads: UploadHandler,
}

impl PortfolioHandler {
    pub fn new(repo: Arc<dyn PortfolioRepository>, uploads: UploadHandler) -> Self {
        PortfolioHandler { repo, uploads }
    }

    /// Featured projects, nine per page.
    pub async fn list(&self, filter: ProjectFilter) -> Result<ProjectListResponse, AppError> {
        let total = self.repo.count_featured(&filter).await?;
        let page = resolve_page(filter.page.as_deref(), total, PROJECTS_PER_PAGE);
        let projects = self
            .repo
            .list_featured(&filter, PROJECTS_PER_PAGE as i64, page_offset(page, PROJECTS_PER_PAGE))
            .await?;

        let categories = self.repo.list_categories().await?;
        let cards = self.to_cards(projects, &categories).await?;

        Ok(ProjectListResponse {
            projects: Page::new(cards, page, PROJECTS_PER_PAGE, total),
            technologies: self.repo.list_technologies().await?,
            categories,
            current_category: filter.category().map(str::to_string),
            current_technology: filter.technology().map(str::to_string),
            search_query: filter.search().map(str::to_string),
        })
    }

    /// Same filters as [`list`](Self::list), unpaginated and compact.
    pub async fn filter(&self, filter: ProjectFilter) -> Result<Vec<ProjectFilterItem>, AppError> {
        let projects = self.repo.filter_featured(&filter).await?;
        let categories = category_map(self.repo.list_categories().await?);
        let mut technologies = self.technologies_by_project(&projects).await?;

        Ok(projects
            .iter()
            .map(|p| {
                let techs = technologies.remove(&p.id).unwrap_or_default();
                p.to_filter_item(categories.get(&p.category_id), &techs)
            })
            .collect())
    }

    pub async fn detail(&self, slug: &str) -> Result<ProjectDetailResponse, AppError> {
        let project = self.find(slug).await?;

        let categories = self.repo.list_categories().await?;
        let features = self.repo.list_features(&project.id).await?;
        let gallery = self.repo.list_images(&project.id).await?;
        let related = self.repo.related(&project, RELATED_PROJECTS_LIMIT).await?;

        let mut technologies = self.technologies_by_project(std::slice::from_ref(&project)).await?;
        let related_projects = self.to_cards(related, &categories).await?;
        let category = categories.iter().find(|c| c.id == project.category_id).cloned();

        Ok(ProjectDetailResponse {
            id: project.id,
            writeup_url: project.writeup_url(),
            technologies: technologies.remove(&project.id).unwrap_or_default(),
            category,
            status_display: project.status.display(),
            is_active: project.status.is_active(),
            title: project.title,
            slug: project.slug,
            description: project.description,
            short_description: project.short_description,
            status: project.status,
            start_date: project.start_date,
            end_date: project.end_date,
            live_url: project.live_url,
            github_url: project.github_url,
            demo_url: project.demo_url,
            featured_image_url: project.featured_image_url,
            writeup_file_name: project.writeup_file_name,
            features,
            gallery,
            related_projects,
        })
    }

    pub async fn writeup(&self, slug: &str) -> Result<WriteupDownload, AppError> {
        let project = self.find(slug).await?;
        let key = project
            .writeup_document_key
            .ok_or_else(|| AppError::NotFound("This project has no writeup".to_string()))?;

        Ok(WriteupDownload {
            location: self.uploads.storage().locate(&key)?,
            file_name: project.writeup_file_name.unwrap_or_else(|| format!("{}-writeup", project.slug)),
        })
    }

    async fn find(&self, slug: &str) -> Result<Project, AppError> {
        self.repo
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::NotFound("Project not found".to_string()))
    }

    async fn technologies_by_project(&self, projects: &[Project]) -> Result<HashMap<Uuid, Vec<Technology>>, AppError> {
        let mut grouped: HashMap<Uuid, Vec<Technology>> = HashMap::new();
        if projects.is_empty() {
            return Ok(grouped);
        }
        let ids: Vec<Uuid> = projects.iter().map(|p| p.id).collect();
        for row in self.repo.technologies_for_projects(&ids).await? {
            grouped.entry(row.project_id).or_default().push(row.into());
        }
        Ok(grouped)
    }

    async fn to_cards(&self, projects: Vec<Project>, categories: &[ProjectCategory]) -> Result<Vec<ProjectCard>, AppError> {
        let mut technologies = self.technologies_by_project(&projects).await?;
        let categories = category_map(categories.to_vec());
        Ok(projects
            .iter()
            .map(|p| p.to_card(categories.get(&p.category_id), technologies.remove(&p.id).unwrap_or_default()))
            .collect())
    }

    // ───── Staff operations ─────────────────────────────────────────

    pub async fn list_all(&self) -> Result<Vec<Project>, AppError> {
        self.repo.list_all().await
    }

    pub async fn get_project(&self, id: &Uuid) -> Result<Project, AppError> {
        self.repo.get_by_id(id).await
    }

    pub async fn create_project(&self, request: NewProjectRequest) -> Result<Project, AppError> {
        request.validate()?;
        request.check_dates().map_err(|e| field_error("end_date", e))?;

        let slug = match request.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(explicit) => claim_explicit_slug(explicit, |s| self.slug_taken(s, None), "project").await?,
            None => unique_slug(&slug_or(&request.title, "project"), |s| self.slug_taken(s, None)).await?,
        };

        let project = self.repo.create_project(&ProjectRecord::from_request(request, slug)).await?;
        tracing::info!(id = %project.id, slug = %project.slug, "Project created");
        Ok(project)
    }

    pub async fn update_project(&self, id: &Uuid, patch: UpdateProjectRequest) -> Result<Project, AppError> {
        patch.validate()?;
        let current = self.repo.get_by_id(id).await?;

        let title = patch.title.flatten_str().unwrap_or(&current.title).to_string();
        let slug = match &patch.slug {
            OptionField::Unchanged => current.slug.clone(),
            OptionField::SetToValue(s) if s.trim() == current.slug => current.slug.clone(),
            OptionField::SetToValue(s) if !s.trim().is_empty() => {
                claim_explicit_slug(s.trim(), |c| self.slug_taken(c, Some(*id)), "project").await?
            }
            _ => unique_slug(&slug_or(&title, "project"), |c| self.slug_taken(c, Some(*id))).await?,
        };

        let record = ProjectRecord::merge(&current, &patch, slug);
        record.validate_links().map_err(|e| field_error("project", e))?;
        self.repo.update_project(id, &record).await
    }

    pub async fn delete_project(&self, id: &Uuid) -> Result<(), AppError> {
        let project = self.repo.get_by_id(id).await?;
        self.repo.delete_project(id).await?;
        if let Some(key) = project.writeup_document_key {
            self.uploads.discard(&key).await;
        }
        Ok(())
    }

    /// Points the project at a freshly stored writeup and drops the old file.
    pub async fn attach_writeup(&self, id: &Uuid, stored: &StoredMedia, file_name: &str) -> Result<Project, AppError> {
        let previous = self.repo.get_by_id(id).await?.writeup_document_key;
        let project = self.repo.set_writeup(id, &stored.key, file_name).await?;
        if let Some(old) = previous.filter(|old| *old != stored.key) {
            self.uploads.discard(&old).await;
        }
        Ok(project)
    }

    pub fn uploads(&self) -> &UploadHandler {
        &self.uploads
    }

    async fn slug_taken(&self, slug: String, exclude: Option<Uuid>) -> Result<bool, AppError> {
        self.repo.slug_exists(&slug, exclude).await
    }

    pub async fn list_categories(&self) -> Result<Vec<ProjectCategory>, AppError> {
        self.repo.list_categories().await
    }

    pub async fn create_category(&self, request: NewProjectCategoryRequest) -> Result<ProjectCategory, AppError> {
        request.validate()?;
        let name = request.name.trim();
        let slug = explicit_or_derived(request.slug.as_deref(), name, "category");
        self.repo.create_category(name, &slug, &request.description, &request.icon).await
    }

    pub async fn delete_category(&self, id: &Uuid) -> Result<(), AppError> {
        self.repo.delete_category(id).await
    }

    pub async fn list_technologies(&self) -> Result<Vec<Technology>, AppError> {
        self.repo.list_technologies().await
    }

    pub async fn create_technology(&self, request: NewTechnologyRequest) -> Result<Technology, AppError> {
        request.validate()?;
        let color = request.color.as_deref().unwrap_or(DEFAULT_TECHNOLOGY_COLOR);
        self.repo.create_technology(request.name.trim(), &request.icon, color).await
    }

    pub async fn delete_technology(&self, id: &Uuid) -> Result<(), AppError> {
        self.repo.delete_technology(id).await
    }

    pub async fn list_features(&self, project_id: &Uuid) -> Result<Vec<ProjectFeature>, AppError> {
        self.repo.list_features(project_id).await
    }

    pub async fn add_feature(&self, project_id: &Uuid, request: NewProjectFeatureRequest) -> Result<ProjectFeature, AppError> {
        request.validate()?;
        self.repo
            .add_feature(project_id, request.title.trim(), &request.description, &request.icon, request.display_order)
            .await
    }

    pub async fn delete_feature(&self, id: &Uuid) -> Result<(), AppError> {
        self.repo.delete_feature(id).await
    }

    pub async fn list_images(&self, project_id: &Uuid) -> Result<Vec<ProjectImage>, AppError> {
        self.repo.list_images(project_id).await
    }

    pub async fn add_image(&self, project_id: &Uuid, request: NewProjectImageRequest) -> Result<ProjectImage, AppError> {
        request.validate()?;
        self.repo
            .add_image(project_id, &request.image_url, &request.caption, request.display_order)
            .await
    }

    pub async fn delete_image(&self, id: &Uuid) -> Result<(), AppError> {
        self.repo.delete_image(id).await
    }
}

fn category_map(categories: Vec<ProjectCategory>) -> HashMap<Uuid, ProjectCategory> {
    categories.into_iter().map(|c| (c.id, c)).collect()
}

fn field_error(field: &str, error: validator::ValidationError) -> AppError {
    let message = error.message.map(|m| m.to_string()).unwrap_or_else(|| "Invalid value".to_string());
    AppError::field(field, &message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::project::{ProjectStatus, ProjectTechnology};
    use crate::media::LocalMediaStorage;
    use crate::repositories::{project::MockPortfolioRepository, security_event::MockSecurityEventRepository};
    use crate::use_cases::security::SecurityAuditor;
    use chrono::{NaiveDate, Utc};

    fn project(slug: &str, writeup: Option<&str>) -> Project {
        Project {
            id: Uuid::new_v4(),
            title: "Home Lab SIEM".into(),
            slug: slug.into(),
            description: "Wazuh on Proxmox".into(),
            short_description: "SIEM lab".into(),
            category_id: Uuid::new_v4(),
            status: ProjectStatus::Completed,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: None,
            live_url: None,
            github_url: None,
            demo_url: None,
            featured_image_url: None,
            writeup_document_key: writeup.map(str::to_string),
            writeup_file_name: writeup.map(|_| "siem.pdf".to_string()),
            is_featured: true,
            display_order: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn handler(repo: MockPortfolioRepository) -> PortfolioHandler {
        let storage = LocalMediaStorage::new("media".into(), "/media/".into());
        let uploads = UploadHandler::new(
            Arc::new(storage),
            SecurityAuditor::new(Arc::new(MockSecurityEventRepository::new())),
        );
        PortfolioHandler::new(Arc::new(repo), uploads)
    }

    #[tokio::test]
    async fn filter_returns_compact_rows_with_technology_names() {
        let p = project("home-lab-siem", None);
        let id = p.id;
        let mut repo = MockPortfolioRepository::new();
        repo.expect_filter_featured().returning(move |_| Ok(vec![p.clone()]));
        repo.expect_list_categories().returning(|| Ok(vec![]));
        repo.expect_technologies_for_projects().returning(move |_| {
            Ok(vec![ProjectTechnology {
                project_id: id,
                id: Uuid::new_v4(),
                name: "Wazuh".into(),
                icon: String::new(),
                color: "#00ff00".into(),
            }])
        });

        let items = handler(repo).filter(ProjectFilter::default()).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].technologies, vec!["Wazuh"]);
        assert_eq!(items[0].status, "Completed");
        assert_eq!(items[0].featured_image, "");
    }

    #[tokio::test]
    async fn writeup_download_resolves_through_storage() {
        let mut repo = MockPortfolioRepository::new();
        repo.expect_find_by_slug()
            .returning(|_| Ok(Some(project("home-lab-siem", Some("project_documents/abc_siem.pdf")))));

        let download = handler(repo).writeup("home-lab-siem").await.unwrap();
        assert_eq!(download.file_name, "siem.pdf");
        assert!(matches!(download.location, MediaLocation::File(_)));
    }

    #[tokio::test]
    async fn missing_writeup_is_not_found() {
        let mut repo = MockPortfolioRepository::new();
        repo.expect_find_by_slug().returning(|_| Ok(Some(project("home-lab-siem", None))));

        assert!(matches!(handler(repo).writeup("home-lab-siem").await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn end_date_before_start_is_rejected() {
        let repo = MockPortfolioRepository::new();
        let request = NewProjectRequest {
            title: "Lab".into(),
            slug: None,
            description: "d".into(),
            short_description: "s".into(),
            category_id: Uuid::new_v4(),
            technology_ids: vec![],
            status: ProjectStatus::Completed,
            start_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 4, 1),
            live_url: None,
            github_url: None,
            demo_url: None,
            featured_image_url: None,
            is_featured: false,
            display_order: 0,
        };

        let err = handler(repo).create_project(request).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn cleared_slug_is_rederived_from_title() {
        let current = project("old-slug", None);
        let id = current.id;
        let stored = current.clone();
        let mut repo = MockPortfolioRepository::new();
        repo.expect_get_by_id().returning(move |_| Ok(stored.clone()));
        repo.expect_slug_exists().returning(|_, _| Ok(false));
        repo.expect_update_project()
            .withf(|_, record| record.slug == "home-lab-siem" && record.technology_ids.is_none())
            .returning(move |_, _| Ok(current.clone()));

        let patch = UpdateProjectRequest { slug: OptionField::SetToNull, ..UpdateProjectRequest::default() };
        handler(repo).update_project(&id, patch).await.unwrap();
    }
}
