pub mod auth;
pub mod cache;
pub mod db;
pub mod limiter;
pub mod media;
pub mod security;
pub mod utils;
