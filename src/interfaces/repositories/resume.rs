use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    entities::resume::{
        Achievement, AchievementRequest, Certification, CertificationRequest, Education, EducationRequest,
        Experience, ExperienceRequest, ResumeDocument, ResumeSection, Skill, SkillRequest, Testimonial,
        TestimonialRequest,
    },
    errors::AppError,
    repositories::sqlx_repo::{ensure_affected, SqlxResumeRepo},
};

/// Resume sections, testimonials and the uploaded CV.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResumeRepository: Send + Sync {
    async fn list_skills(&self) -> Result<Vec<Skill>, AppError>;
    async fn list_experiences(&self) -> Result<Vec<Experience>, AppError>;
    async fn list_education(&self) -> Result<Vec<Education>, AppError>;
    async fn list_certifications(&self) -> Result<Vec<Certification>, AppError>;
    async fn list_achievements(&self, active_only: bool) -> Result<Vec<Achievement>, AppError>;
    async fn list_testimonials(&self, active_only: bool) -> Result<Vec<Testimonial>, AppError>;

    async fn create_skill(&self, skill: &SkillRequest) -> Result<Skill, AppError>;
    async fn update_skill(&self, id: &Uuid, skill: &SkillRequest) -> Result<Skill, AppError>;
    async fn create_experience(&self, experience: &ExperienceRequest) -> Result<Experience, AppError>;
    async fn update_experience(&self, id: &Uuid, experience: &ExperienceRequest) -> Result<Experience, AppError>;
    async fn create_education(&self, education: &EducationRequest) -> Result<Education, AppError>;
    async fn update_education(&self, id: &Uuid, education: &EducationRequest) -> Result<Education, AppError>;
    async fn create_certification(&self, certification: &CertificationRequest) -> Result<Certification, AppError>;
    async fn update_certification(&self, id: &Uuid, certification: &CertificationRequest) -> Result<Certification, AppError>;
    async fn create_achievement(&self, achievement: &AchievementRequest) -> Result<Achievement, AppError>;
    async fn update_achievement(&self, id: &Uuid, achievement: &AchievementRequest) -> Result<Achievement, AppError>;
    async fn create_testimonial(&self, testimonial: &TestimonialRequest) -> Result<Testimonial, AppError>;
    async fn update_testimonial(&self, id: &Uuid, testimonial: &TestimonialRequest) -> Result<Testimonial, AppError>;
    async fn delete_entry(&self, section: ResumeSection, id: &Uuid) -> Result<(), AppError>;

    async fn latest_document(&self) -> Result<Option<ResumeDocument>, AppError>;
    async fn add_document(&self, storage_key: &str, file_name: &str) -> Result<ResumeDocument, AppError>;
}

fn not_found(what: &str) -> impl FnOnce() -> AppError + '_ {
    move || AppError::NotFound(format!("{what} not found"))
}

#[async_trait]
impl ResumeRepository for SqlxResumeRepo {
    async fn list_skills(&self) -> Result<Vec<Skill>, AppError> {
        sqlx::query_as::<_, Skill>("SELECT * FROM skills ORDER BY category, proficiency DESC, name")
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::from)
    }

    async fn list_experiences(&self) -> Result<Vec<Experience>, AppError> {
        sqlx::query_as::<_, Experience>("SELECT * FROM experiences ORDER BY start_date DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::from)
    }

    async fn list_education(&self) -> Result<Vec<Education>, AppError> {
        sqlx::query_as::<_, Education>("SELECT * FROM education ORDER BY start_date DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::from)
    }

    async fn list_certifications(&self) -> Result<Vec<Certification>, AppError> {
        sqlx::query_as::<_, Certification>("SELECT * FROM certifications ORDER BY issue_date DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::from)
    }

    async fn list_achievements(&self, active_only: bool) -> Result<Vec<Achievement>, AppError> {
        sqlx::query_as::<_, Achievement>(
            "SELECT * FROM achievements WHERE (NOT $1 OR is_active) ORDER BY display_order, created_at DESC",
        )
        .bind(active_only)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn list_testimonials(&self, active_only: bool) -> Result<Vec<Testimonial>, AppError> {
        sqlx::query_as::<_, Testimonial>(
            "SELECT * FROM testimonials WHERE (NOT $1 OR is_active) ORDER BY display_order, name",
        )
        .bind(active_only)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn create_skill(&self, skill: &SkillRequest) -> Result<Skill, AppError> {
        sqlx::query_as::<_, Skill>(
            "INSERT INTO skills (name, category, proficiency, icon) VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(&skill.name)
        .bind(skill.category)
        .bind(skill.proficiency)
        .bind(&skill.icon)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn update_skill(&self, id: &Uuid, skill: &SkillRequest) -> Result<Skill, AppError> {
        sqlx::query_as::<_, Skill>(
            "UPDATE skills SET name = $2, category = $3, proficiency = $4, icon = $5 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(&skill.name)
        .bind(skill.category)
        .bind(skill.proficiency)
        .bind(&skill.icon)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(not_found("Skill"))
    }

    async fn create_experience(&self, experience: &ExperienceRequest) -> Result<Experience, AppError> {
        sqlx::query_as::<_, Experience>(
            r#"
            INSERT INTO experiences (company, position, start_date, end_date, description, technologies)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&experience.company)
        .bind(&experience.position)
        .bind(experience.start_date)
        .bind(experience.end_date)
        .bind(&experience.description)
        .bind(&experience.technologies)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn update_experience(&self, id: &Uuid, experience: &ExperienceRequest) -> Result<Experience, AppError> {
        sqlx::query_as::<_, Experience>(
            r#"
            UPDATE experiences
            SET company = $2, position = $3, start_date = $4, end_date = $5, description = $6, technologies = $7
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&experience.company)
        .bind(&experience.position)
        .bind(experience.start_date)
        .bind(experience.end_date)
        .bind(&experience.description)
        .bind(&experience.technologies)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(not_found("Experience"))
    }

    async fn create_education(&self, education: &EducationRequest) -> Result<Education, AppError> {
        sqlx::query_as::<_, Education>(
            r#"
            INSERT INTO education (institution, degree, field_of_study, start_date, end_date, gpa, description, icon)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&education.institution)
        .bind(&education.degree)
        .bind(&education.field_of_study)
        .bind(education.start_date)
        .bind(education.end_date)
        .bind(&education.gpa)
        .bind(&education.description)
        .bind(&education.icon)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn update_education(&self, id: &Uuid, education: &EducationRequest) -> Result<Education, AppError> {
        sqlx::query_as::<_, Education>(
            r#"
            UPDATE education
            SET institution = $2, degree = $3, field_of_study = $4, start_date = $5, end_date = $6,
                gpa = $7, description = $8, icon = $9
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&education.institution)
        .bind(&education.degree)
        .bind(&education.field_of_study)
        .bind(education.start_date)
        .bind(education.end_date)
        .bind(&education.gpa)
        .bind(&education.description)
        .bind(&education.icon)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(not_found("Education"))
    }

    async fn create_certification(&self, certification: &CertificationRequest) -> Result<Certification, AppError> {
        sqlx::query_as::<_, Certification>(
            r#"
            INSERT INTO certifications (
                name, issuing_organization, issue_date, expiry_date, credential_id, credential_url, description, icon
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&certification.name)
        .bind(&certification.issuing_organization)
        .bind(certification.issue_date)
        .bind(certification.expiry_date)
        .bind(&certification.credential_id)
        .bind(&certification.credential_url)
        .bind(&certification.description)
        .bind(&certification.icon)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn update_certification(&self, id: &Uuid, certification: &CertificationRequest) -> Result<Certification, AppError> {
        sqlx::query_as::<_, Certification>(
            r#"
            UPDATE certifications
            SET name = $2, issuing_organization = $3, issue_date = $4, expiry_date = $5,
                credential_id = $6, credential_url = $7, description = $8, icon = $9
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&certification.name)
        .bind(&certification.issuing_organization)
        .bind(certification.issue_date)
        .bind(certification.expiry_date)
        .bind(&certification.credential_id)
        .bind(&certification.credential_url)
        .bind(&certification.description)
        .bind(&certification.icon)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(not_found("Certification"))
    }

    async fn create_achievement(&self, achievement: &AchievementRequest) -> Result<Achievement, AppError> {
        sqlx::query_as::<_, Achievement>(
            r#"
            INSERT INTO achievements (title, description, icon, technologies, display_order, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&achievement.title)
        .bind(&achievement.description)
        .bind(&achievement.icon)
        .bind(&achievement.technologies)
        .bind(achievement.display_order)
        .bind(achievement.is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn update_achievement(&self, id: &Uuid, achievement: &AchievementRequest) -> Result<Achievement, AppError> {
        sqlx::query_as::<_, Achievement>(
            r#"
            UPDATE achievements
            SET title = $2, description = $3, icon = $4, technologies = $5, display_order = $6, is_active = $7
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&achievement.title)
        .bind(&achievement.description)
        .bind(&achievement.icon)
        .bind(&achievement.technologies)
        .bind(achievement.display_order)
        .bind(achievement.is_active)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(not_found("Achievement"))
    }

    async fn create_testimonial(&self, testimonial: &TestimonialRequest) -> Result<Testimonial, AppError> {
        sqlx::query_as::<_, Testimonial>(
            r#"
            INSERT INTO testimonials (name, position, company, content, is_active, display_order)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&testimonial.name)
        .bind(&testimonial.position)
        .bind(&testimonial.company)
        .bind(&testimonial.content)
        .bind(testimonial.is_active)
        .bind(testimonial.display_order)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn update_testimonial(&self, id: &Uuid, testimonial: &TestimonialRequest) -> Result<Testimonial, AppError> {
        sqlx::query_as::<_, Testimonial>(
            r#"
            UPDATE testimonials
            SET name = $2, position = $3, company = $4, content = $5, is_active = $6, display_order = $7
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&testimonial.name)
        .bind(&testimonial.position)
        .bind(&testimonial.company)
        .bind(&testimonial.content)
        .bind(testimonial.is_active)
        .bind(testimonial.display_order)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(not_found("Testimonial"))
    }

    async fn delete_entry(&self, section: ResumeSection, id: &Uuid) -> Result<(), AppError> {
        // Table names come from a closed enum, never from input.
        let sql = format!("DELETE FROM {} WHERE id = $1", section.table());
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        ensure_affected(result, "Entry")
    }

    async fn latest_document(&self) -> Result<Option<ResumeDocument>, AppError> {
        sqlx::query_as::<_, ResumeDocument>("SELECT * FROM resume_documents ORDER BY uploaded_at DESC LIMIT 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)
    }

    async fn add_document(&self, storage_key: &str, file_name: &str) -> Result<ResumeDocument, AppError> {
        sqlx::query_as::<_, ResumeDocument>(
            "INSERT INTO resume_documents (storage_key, file_name) VALUES ($1, $2) RETURNING *",
        )
        .bind(storage_key)
        .bind(file_name)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)
    }
}
