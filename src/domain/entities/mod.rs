pub mod blog_post;
pub mod contact;
pub mod engagement;
pub mod option_fields;
pub mod pagination;
pub mod profile;
pub mod project;
pub mod resume;
pub mod security_event;
pub mod token;
pub mod upload;
pub mod user;
