use std::{sync::Arc, time::Duration};

use actix_web::dev::ServiceRequest;

mod domain;
mod interfaces;
mod infrastructure;
pub mod errors;
pub mod settings;
pub mod constants;
pub mod graceful_shutdown;
pub mod background_task;

pub use domain::{entities, password, use_cases};
pub use interfaces::{handlers, middlewares, repositories, routes};
pub use infrastructure::{auth, cache, db, limiter, media, security, utils};

use auth::jwt::JwtService;
use cache::{CounterStore, PageCache};
use entities::security_event::RequestContext;
use limiter::{LoginGuard, RateLimiter};
use media::MediaStorage;
use repositories::{token::TokenService, user::UserRepository, Repositories};
use settings::AppConfig;
use use_cases::{
    auth::AuthHandler,
    blog::BlogHandler,
    contact::ContactHandler,
    engagement::EngagementHandler,
    portfolio::PortfolioHandler,
    profile::ProfileHandler,
    security::{SecurityAuditor, SecurityService},
    uploads::UploadHandler,
};
use utils::get_client_ip::{decoded_path, service_client_ip, user_agent};

pub type AppAuthHandler = AuthHandler<dyn UserRepository, dyn TokenService>;

/// Shared handlers and services for every route.
pub struct AppState {
    pub config: AppConfig,
    pub repos: Repositories,
    pub auth_handler: AppAuthHandler,
    pub blog_handler: BlogHandler,
    pub portfolio_handler: PortfolioHandler,
    pub profile_handler: ProfileHandler,
    pub contact_handler: ContactHandler,
    pub security_service: SecurityService,
    pub auditor: SecurityAuditor,
    pub rate_limiter: RateLimiter,
    pub counters: Arc<dyn CounterStore>,
    pub media: Arc<dyn MediaStorage>,
    pub page_cache: PageCache,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        repos: Repositories,
        counters: Arc<dyn CounterStore>,
        media: Arc<dyn MediaStorage>,
    ) -> Self {
        let auditor = SecurityAuditor::new(repos.security_events.clone());
        let token_service: Arc<dyn TokenService> = Arc::new(JwtService::new(&config));
        let login_guard = LoginGuard::new(counters.clone(), config.rate_limits.login_failure_window_secs);
        let auth_handler = AuthHandler::new(repos.users.clone(), token_service, login_guard, auditor.clone());

        let page_cache = PageCache::new(Duration::from_secs(config.page_cache_ttl_secs));
        let uploads = UploadHandler::new(media.clone(), auditor.clone());

        let blog_handler = BlogHandler::new(repos.blog.clone(), EngagementHandler::new(repos.engagement.clone()));
        let portfolio_handler = PortfolioHandler::new(repos.portfolio.clone(), uploads.clone());
        let profile_handler = ProfileHandler::new(repos.resume.clone(), config.profile.clone(), page_cache.clone(), uploads);
        let contact_handler = ContactHandler::new(repos.contact.clone(), auditor.clone(), config.profile.clone());
        let security_service = SecurityService::new(repos.security_events.clone(), repos.contact.clone());
        let rate_limiter = build_rate_limiter(&config, counters.clone());

        AppState {
            config,
            repos,
            auth_handler,
            blog_handler,
            portfolio_handler,
            profile_handler,
            contact_handler,
            security_service,
            auditor,
            rate_limiter,
            counters,
            media,
            page_cache,
        }
    }

    /// The slice of state the request-security middlewares read.
    pub fn request_security(&self) -> RequestSecurity {
        RequestSecurity::new(
            &self.config,
            self.auditor.clone(),
            self.rate_limiter.clone(),
            self.auth_handler.token_service.clone(),
        )
    }
}

pub fn build_rate_limiter(config: &AppConfig, counters: Arc<dyn CounterStore>) -> RateLimiter {
    RateLimiter::new(counters, config.rate_limits.clone(), config.admin_prefix(), config.is_development())
}

/// Audit log, rate limiter and token checks shared by the middleware stack.
#[derive(Clone)]
pub struct RequestSecurity {
    pub auditor: SecurityAuditor,
    pub rate_limiter: RateLimiter,
    pub token_service: Arc<dyn TokenService>,
    pub admin_prefix: String,
    pub trust_x_forwarded_for: bool,
    pub development: bool,
}

impl RequestSecurity {
    pub fn new(
        config: &AppConfig,
        auditor: SecurityAuditor,
        rate_limiter: RateLimiter,
        token_service: Arc<dyn TokenService>,
    ) -> Self {
        RequestSecurity {
            auditor,
            rate_limiter,
            token_service,
            admin_prefix: config.admin_prefix(),
            trust_x_forwarded_for: config.trust_x_forwarded_for,
            development: config.is_development(),
        }
    }

    pub fn context(&self, req: &ServiceRequest) -> RequestContext {
        RequestContext {
            ip: service_client_ip(req, self.trust_x_forwarded_for),
            method: req.method().to_string(),
            path: decoded_path(req.path()),
            user_agent: user_agent(req.headers()),
        }
    }
}
