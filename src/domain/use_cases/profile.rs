use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    cache::{
        page_cache::{HOME_PAGE_KEY, RESUME_PAGE_KEY},
        PageCache,
    },
    entities::{
        profile::{AboutResponse, HomeResponse, ProfileView},
        resume::{
            group_skills, Achievement, AchievementRequest, AchievementView, Certification, CertificationRequest,
            CertificationView, Education, EducationRequest, Experience, ExperienceRequest, ExperienceView,
            ResumeDocument, ResumeResponse, ResumeSection, Skill, SkillRequest, Testimonial, TestimonialRequest,
            TestimonialView,
        },
    },
    errors::AppError,
    media::{MediaLocation, StoredMedia},
    repositories::resume::ResumeRepository,
    settings::PersonalProfile,
    use_cases::uploads::UploadHandler,
};

pub const CV_FOLDER: &str = "documents";

#[derive(Debug, Clone, PartialEq)]
pub struct CvDownload {
    pub location: MediaLocation,
    pub file_name: String,
}

/// Home, about and resume pages plus the staff edits behind them.
/// Rendered home and resume payloads are cached until the next edit.
#[derive(Clone)]
pub struct ProfileHandler {
    repo: Arc<dyn ResumeRepository>,
    profile: PersonalProfile,
    cache: PageCache,
    uploads: UploadHandler,
}

impl ProfileHandler {
    pub fn new(repo: Arc<dyn ResumeRepository>, profile: PersonalProfile, cache: PageCache, uploads: UploadHandler) -> Self {
        ProfileHandler { repo, profile, cache, uploads }
    }

    pub async fn home(&self) -> Result<serde_json::Value, AppError> {
        if let Some(cached) = self.cache.get(HOME_PAGE_KEY) {
            return Ok(cached);
        }
        let testimonials = self.repo.list_testimonials(true).await?;
        let response = HomeResponse {
            profile: ProfileView::from(&self.profile),
            testimonials: testimonials.into_iter().map(TestimonialView::from).collect(),
        };
        self.cache_json(HOME_PAGE_KEY, &response)
    }

    pub fn about(&self) -> AboutResponse {
        AboutResponse { profile: ProfileView::from(&self.profile) }
    }

    pub async fn resume(&self) -> Result<serde_json::Value, AppError> {
        if let Some(cached) = self.cache.get(RESUME_PAGE_KEY) {
            return Ok(cached);
        }
        let today = Utc::now().date_naive();

        let response = ResumeResponse {
            education_items: self.repo.list_education().await?,
            certifications: self
                .repo
                .list_certifications()
                .await?
                .into_iter()
                .map(|c| CertificationView { is_expired: c.is_expired_on(today), certification: c })
                .collect(),
            achievements: self
                .repo
                .list_achievements(true)
                .await?
                .into_iter()
                .map(|a| AchievementView { tech_list: a.tech_list(), achievement: a })
                .collect(),
            experiences: self
                .repo
                .list_experiences()
                .await?
                .into_iter()
                .map(|e| ExperienceView { is_current: e.is_current(), technology_list: e.technology_list(), experience: e })
                .collect(),
            skills_by_category: group_skills(self.repo.list_skills().await?),
            has_cv: self.repo.latest_document().await?.is_some(),
        };
        self.cache_json(RESUME_PAGE_KEY, &response)
    }

    fn cache_json<T: serde::Serialize>(&self, key: &str, response: &T) -> Result<serde_json::Value, AppError> {
        let value = serde_json::to_value(response)
            .map_err(|e| AppError::InternalError(format!("Failed to serialize page: {e}")))?;
        self.cache.insert(key, value.clone());
        Ok(value)
    }

    pub async fn cv(&self) -> Result<CvDownload, AppError> {
        let document = self
            .repo
            .latest_document()
            .await?
            .ok_or_else(|| AppError::NotFound("CV not available".to_string()))?;

        Ok(CvDownload {
            location: self.uploads.storage().locate(&document.storage_key)?,
            file_name: document.file_name,
        })
    }

    pub async fn attach_cv(&self, stored: &StoredMedia, file_name: &str) -> Result<ResumeDocument, AppError> {
        let document = self.repo.add_document(&stored.key, file_name).await?;
        self.cache.clear();
        Ok(document)
    }

    pub fn uploads(&self) -> &UploadHandler {
        &self.uploads
    }

    // ───── Staff edits ─────────────────────────────────────────────

    fn edited<T>(&self, result: Result<T, AppError>) -> Result<T, AppError> {
        if result.is_ok() {
            self.cache.clear();
        }
        result
    }

    pub async fn list_skills(&self) -> Result<Vec<Skill>, AppError> {
        self.repo.list_skills().await
    }

    pub async fn save_skill(&self, id: Option<Uuid>, request: SkillRequest) -> Result<Skill, AppError> {
        request.validate()?;
        let result = match id {
            Some(id) => self.repo.update_skill(&id, &request).await,
            None => self.repo.create_skill(&request).await,
        };
        self.edited(result)
    }

    pub async fn list_experiences(&self) -> Result<Vec<Experience>, AppError> {
        self.repo.list_experiences().await
    }

    pub async fn save_experience(&self, id: Option<Uuid>, request: ExperienceRequest) -> Result<Experience, AppError> {
        request.validate()?;
        check_range(request.start_date, request.end_date)?;
        let result = match id {
            Some(id) => self.repo.update_experience(&id, &request).await,
            None => self.repo.create_experience(&request).await,
        };
        self.edited(result)
    }

    pub async fn list_education(&self) -> Result<Vec<Education>, AppError> {
        self.repo.list_education().await
    }

    pub async fn save_education(&self, id: Option<Uuid>, request: EducationRequest) -> Result<Education, AppError> {
        request.validate()?;
        check_range(request.start_date, request.end_date)?;
        let result = match id {
            Some(id) => self.repo.update_education(&id, &request).await,
            None => self.repo.create_education(&request).await,
        };
        self.edited(result)
    }

    pub async fn list_certifications(&self) -> Result<Vec<Certification>, AppError> {
        self.repo.list_certifications().await
    }

    pub async fn save_certification(&self, id: Option<Uuid>, request: CertificationRequest) -> Result<Certification, AppError> {
        request.validate()?;
        check_range(request.issue_date, request.expiry_date)?;
        let result = match id {
            Some(id) => self.repo.update_certification(&id, &request).await,
            None => self.repo.create_certification(&request).await,
        };
        self.edited(result)
    }

    pub async fn list_achievements(&self) -> Result<Vec<Achievement>, AppError> {
        self.repo.list_achievements(false).await
    }

    pub async fn save_achievement(&self, id: Option<Uuid>, request: AchievementRequest) -> Result<Achievement, AppError> {
        request.validate()?;
        let result = match id {
            Some(id) => self.repo.update_achievement(&id, &request).await,
            None => self.repo.create_achievement(&request).await,
        };
        self.edited(result)
    }

    pub async fn list_testimonials(&self) -> Result<Vec<Testimonial>, AppError> {
        self.repo.list_testimonials(false).await
    }

    pub async fn save_testimonial(&self, id: Option<Uuid>, request: TestimonialRequest) -> Result<Testimonial, AppError> {
        request.validate()?;
        let result = match id {
            Some(id) => self.repo.update_testimonial(&id, &request).await,
            None => self.repo.create_testimonial(&request).await,
        };
        self.edited(result)
    }

    pub async fn delete_entry(&self, section: ResumeSection, id: &Uuid) -> Result<(), AppError> {
        let result = self.repo.delete_entry(section, id).await;
        self.edited(result)
    }
}

fn check_range(start: chrono::NaiveDate, end: Option<chrono::NaiveDate>) -> Result<(), AppError> {
    match end {
        Some(end) if end < start => Err(AppError::field("end_date", "End date cannot be before start date")),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::LocalMediaStorage;
    use crate::repositories::{resume::MockResumeRepository, security_event::MockSecurityEventRepository};
    use crate::use_cases::security::SecurityAuditor;
    use std::time::Duration;

    fn handler(repo: MockResumeRepository, cache: PageCache) -> ProfileHandler {
        let uploads = UploadHandler::new(
            Arc::new(LocalMediaStorage::new("media".into(), "/media/".into())),
            SecurityAuditor::new(Arc::new(MockSecurityEventRepository::new())),
        );
        ProfileHandler::new(Arc::new(repo), PersonalProfile::default(), cache, uploads)
    }

    fn testimonial() -> Testimonial {
        Testimonial {
            id: Uuid::new_v4(),
            name: "Grace Hopper".into(),
            position: "Admiral".into(),
            company: "US Navy".into(),
            content: "Sharp and thorough.".into(),
            is_active: true,
            display_order: 1,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn home_is_served_from_cache_until_an_edit() {
        let mut repo = MockResumeRepository::new();
        repo.expect_list_testimonials().with(mockall::predicate::eq(true)).times(2).returning(|_| Ok(vec![testimonial()]));
        repo.expect_create_skill().returning(|req| {
            Ok(Skill { id: Uuid::new_v4(), name: req.name.clone(), category: req.category, proficiency: req.proficiency, icon: String::new() })
        });
        let handler = handler(repo, PageCache::new(Duration::from_secs(60)));

        let first = handler.home().await.unwrap();
        assert_eq!(first["testimonials"][0]["initials"], "GH");
        assert_eq!(first["profile"]["social"]["github"], "#");
        handler.home().await.unwrap();

        let skill = SkillRequest { name: "Rust".into(), category: Default::default(), proficiency: 80, icon: String::new() };
        handler.save_skill(None, skill).await.unwrap();
        handler.home().await.unwrap();
    }

    #[tokio::test]
    async fn missing_cv_is_not_found() {
        let mut repo = MockResumeRepository::new();
        repo.expect_latest_document().returning(|| Ok(None));
        let err = handler(repo, PageCache::new(Duration::ZERO)).cv().await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn proficiency_outside_range_is_rejected() {
        let mut repo = MockResumeRepository::new();
        repo.expect_create_skill().never();
        let skill = SkillRequest { name: "Rust".into(), category: Default::default(), proficiency: 101, icon: String::new() };
        let err = handler(repo, PageCache::new(Duration::ZERO)).save_skill(None, skill).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }
}
