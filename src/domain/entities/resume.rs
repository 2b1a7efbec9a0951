use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::entities::blog_post::validate_url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "skill_category", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SkillCategory {
    #[default]
    Skill,
    Tools,
    Soft,
}

impl SkillCategory {
    /// Heading used when the resume groups skills.
    pub fn heading(&self) -> &'static str {
        match self {
            SkillCategory::Skill => "Skills",
            SkillCategory::Tools => "Tools",
            SkillCategory::Soft => "Special Skills",
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Skill {
    pub id: Uuid,
    pub name: String,
    pub category: SkillCategory,
    pub proficiency: i16,
    pub icon: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Experience {
    pub id: Uuid,
    pub company: String,
    pub position: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub description: String,
    pub technologies: String,
}

impl Experience {
    pub fn is_current(&self) -> bool {
        self.end_date.is_none()
    }

    pub fn technology_list(&self) -> Vec<String> {
        split_comma_list(&self.technologies)
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Education {
    pub id: Uuid,
    pub institution: String,
    pub degree: String,
    pub field_of_study: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub gpa: Option<String>,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Certification {
    pub id: Uuid,
    pub name: String,
    pub issuing_organization: String,
    pub issue_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
    pub credential_id: Option<String>,
    pub credential_url: Option<String>,
    pub description: String,
    pub icon: String,
}

impl Certification {
    pub fn is_expired_on(&self, today: NaiveDate) -> bool {
        self.expiry_date.is_some_and(|expiry| expiry < today)
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Achievement {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub technologies: String,
    pub display_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Achievement {
    pub fn tech_list(&self) -> Vec<String> {
        split_comma_list(&self.technologies)
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Testimonial {
    pub id: Uuid,
    pub name: String,
    pub position: String,
    pub company: String,
    pub content: String,
    pub is_active: bool,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
}

impl Testimonial {
    pub fn initials(&self) -> String {
        let parts: Vec<&str> = self.name.split_whitespace().collect();
        match parts.as_slice() {
            [] => "UN".to_string(),
            [only] => only.chars().take(2).collect::<String>().to_uppercase(),
            [first, .., last] => {
                let mut initials = String::new();
                initials.extend(first.chars().next().map(|c| c.to_ascii_uppercase()));
                initials.extend(last.chars().next().map(|c| c.to_ascii_uppercase()));
                initials
            }
        }
    }

    pub fn short_content(&self) -> String {
        if self.content.chars().count() > 100 {
            let head: String = self.content.chars().take(100).collect();
            format!("{head}...")
        } else {
            self.content.clone()
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ResumeDocument {
    pub id: Uuid,
    pub storage_key: String,
    pub file_name: String,
    pub uploaded_at: DateTime<Utc>,
}

pub fn split_comma_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ───── Requests (full replacement on update) ─────────────────────────

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SkillRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(default)]
    pub category: SkillCategory,
    #[validate(range(min = 1, max = 100, message = "Proficiency must be between 1 and 100"))]
    pub proficiency: i16,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub icon: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ExperienceRequest {
    #[validate(length(min = 1, max = 200))]
    pub company: String,
    #[validate(length(min = 1, max = 200))]
    pub position: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    #[validate(length(max = 300))]
    pub technologies: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EducationRequest {
    #[validate(length(min = 1, max = 200))]
    pub institution: String,
    #[validate(length(min = 1, max = 200))]
    pub degree: String,
    #[validate(length(min = 1, max = 200))]
    pub field_of_study: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    #[validate(length(max = 10))]
    pub gpa: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_education_icon")]
    pub icon: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CertificationRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 200))]
    pub issuing_organization: String,
    pub issue_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
    #[validate(length(max = 100))]
    pub credential_id: Option<String>,
    #[validate(custom(function = "validate_url"))]
    pub credential_url: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_certification_icon")]
    pub icon: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AchievementRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1))]
    pub description: String,
    #[serde(default = "default_achievement_icon")]
    pub icon: String,
    #[serde(default)]
    #[validate(length(max = 300))]
    pub technologies: String,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TestimonialRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub position: String,
    #[validate(length(min = 1, max = 100))]
    pub company: String,
    #[validate(length(min = 1))]
    pub content: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub display_order: i32,
}

fn default_education_icon() -> String {
    "fas fa-graduation-cap".to_string()
}
fn default_certification_icon() -> String {
    "fas fa-certificate".to_string()
}
fn default_achievement_icon() -> String {
    "fas fa-trophy".to_string()
}
fn default_active() -> bool {
    true
}

/// Table selector for generic admin deletes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumeSection {
    Skills,
    Experiences,
    Education,
    Certifications,
    Achievements,
    Testimonials,
}

impl ResumeSection {
    pub fn table(&self) -> &'static str {
        match self {
            ResumeSection::Skills => "skills",
            ResumeSection::Experiences => "experiences",
            ResumeSection::Education => "education",
            ResumeSection::Certifications => "certifications",
            ResumeSection::Achievements => "achievements",
            ResumeSection::Testimonials => "testimonials",
        }
    }
}

// ───── Responses ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ExperienceView {
    #[serde(flatten)]
    pub experience: Experience,
    pub is_current: bool,
    pub technology_list: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CertificationView {
    #[serde(flatten)]
    pub certification: Certification,
    pub is_expired: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AchievementView {
    #[serde(flatten)]
    pub achievement: Achievement,
    pub tech_list: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TestimonialView {
    #[serde(flatten)]
    pub testimonial: Testimonial,
    pub initials: String,
    pub short_content: String,
}

impl From<Testimonial> for TestimonialView {
    fn from(testimonial: Testimonial) -> Self {
        TestimonialView {
            initials: testimonial.initials(),
            short_content: testimonial.short_content(),
            testimonial,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResumeResponse {
    pub education_items: Vec<Education>,
    pub certifications: Vec<CertificationView>,
    pub achievements: Vec<AchievementView>,
    pub experiences: Vec<ExperienceView>,
    pub skills_by_category: BTreeMap<String, Vec<Skill>>,
    pub has_cv: bool,
}

/// Groups skills under their display heading, keeping input order inside a group.
pub fn group_skills(skills: Vec<Skill>) -> BTreeMap<String, Vec<Skill>> {
    let mut grouped: BTreeMap<String, Vec<Skill>> = BTreeMap::new();
    for skill in skills {
        grouped.entry(skill.category.heading().to_string()).or_default().push(skill);
    }
    grouped
}
