pub mod blog_post;
pub mod contact;
pub mod engagement;
pub mod media;
pub mod project;
pub mod resume;
pub mod security_event;
pub mod sqlx_repo;
pub mod token;
pub mod user;

use std::sync::Arc;

use sqlx::PgPool;

use sqlx_repo::{
    SqlxBlogRepo, SqlxContactRepo, SqlxEngagementRepo, SqlxMediaRepo, SqlxPortfolioRepo, SqlxResumeRepo,
    SqlxSecurityEventRepo, SqlxUserRepo,
};

/// Every repository behind its trait, so tests can swap in fakes.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn user::UserRepository>,
    pub blog: Arc<dyn blog_post::BlogRepository>,
    pub engagement: Arc<dyn engagement::EngagementRepository>,
    pub portfolio: Arc<dyn project::PortfolioRepository>,
    pub resume: Arc<dyn resume::ResumeRepository>,
    pub contact: Arc<dyn contact::ContactRepository>,
    pub security_events: Arc<dyn security_event::SecurityEventRepository>,
    pub media: Arc<dyn media::MediaReferenceRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Repositories {
            users: Arc::new(SqlxUserRepo::new(pool.clone())),
            blog: Arc::new(SqlxBlogRepo::new(pool.clone())),
            engagement: Arc::new(SqlxEngagementRepo::new(pool.clone())),
            portfolio: Arc::new(SqlxPortfolioRepo::new(pool.clone())),
            resume: Arc::new(SqlxResumeRepo::new(pool.clone())),
            contact: Arc::new(SqlxContactRepo::new(pool.clone())),
            security_events: Arc::new(SqlxSecurityEventRepo::new(pool.clone())),
            media: Arc::new(SqlxMediaRepo::new(pool)),
        }
    }
}
