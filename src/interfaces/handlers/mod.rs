pub mod admin_blog;
pub mod admin_portfolio;
pub mod admin_resume;
pub mod admin_site;
pub mod auth;
pub mod blog;
pub mod downloads;
pub mod json_error;
pub mod main_site;
pub mod portfolio;
pub mod security_dashboard;
pub mod system;
