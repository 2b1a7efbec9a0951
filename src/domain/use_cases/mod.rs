pub mod auth;
pub mod blog;
pub mod contact;
pub mod engagement;
pub mod extractors;
pub mod portfolio;
pub mod profile;
pub mod security;
pub mod slugs;
pub mod uploads;
