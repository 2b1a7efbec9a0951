pub mod cloudinary;
pub mod local;
pub mod migrate;
pub mod validation;

use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use derive_more::Display;

use crate::errors::AppError;
use crate::settings::{MediaBackend, MediaSettings};

pub use cloudinary::CloudinaryStorage;
pub use local::LocalMediaStorage;
pub use validation::{validate_upload, UploadKind};

pub const CLOUDINARY_KEY_PREFIX: &str = "cloudinary:";

#[derive(Debug, Display)]
pub enum MediaError {
    #[display("Media I/O error: {_0}")]
    Io(String),

    #[display("Media upload failed: {_0}")]
    Upload(String),

    #[display("Invalid media key: {_0}")]
    InvalidKey(String),
}

impl std::error::Error for MediaError {}

impl From<std::io::Error> for MediaError {
    fn from(e: std::io::Error) -> Self {
        MediaError::Io(e.to_string())
    }
}

impl From<reqwest::Error> for MediaError {
    fn from(e: reqwest::Error) -> Self {
        MediaError::Upload(e.to_string())
    }
}

impl From<MediaError> for AppError {
    fn from(e: MediaError) -> Self {
        match e {
            MediaError::InvalidKey(key) => AppError::NotFound(format!("Media not found: {key}")),
            other => AppError::InternalError(other.to_string()),
        }
    }
}

/// A stored file: `key` goes in the database, `url` is what clients fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMedia {
    pub key: String,
    pub url: String,
}

/// Where a download is served from.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaLocation {
    File(PathBuf),
    Redirect(String),
}

#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Stores `bytes` under `folder`, keeping the original file name recognisable.
    async fn save(&self, folder: &str, file_name: &str, bytes: Vec<u8>, kind: UploadKind) -> Result<StoredMedia, MediaError>;

    fn url(&self, key: &str) -> String;

    fn locate(&self, key: &str) -> Result<MediaLocation, MediaError>;

    async fn delete(&self, key: &str) -> Result<(), MediaError>;

    async fn exists(&self, key: &str) -> Result<bool, MediaError>;

    fn backend_name(&self) -> &'static str;
}

/// Builds the configured backend.
pub fn build_media_storage(settings: &MediaSettings) -> Arc<dyn MediaStorage> {
    let local = LocalMediaStorage::new(settings.media_root.clone(), settings.media_url.clone());
    match settings.backend {
        MediaBackend::Local => Arc::new(local),
        MediaBackend::Cloudinary => Arc::new(CloudinaryStorage::new(
            settings.cloudinary_cloud_name.clone(),
            settings.cloudinary_api_key.clone(),
            settings.cloudinary_api_secret.clone(),
            local,
        )),
    }
}

/// `{uuid}_{name}` with everything outside `[A-Za-z0-9._-]` replaced.
pub fn storage_file_name(original: &str) -> String {
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original)
        .trim();
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    let cleaned = if cleaned.is_empty() { "upload" } else { cleaned };
    format!("{}_{}", uuid::Uuid::new_v4().simple(), cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_names_drop_directories_and_odd_characters() {
        let name = storage_file_name("../../etc/my writeup (final).pdf");
        let (prefix, rest) = name.split_once('_').unwrap();
        assert_eq!(prefix.len(), 32);
        assert_eq!(rest, "my_writeup__final_.pdf");

        let hidden = storage_file_name(".htaccess");
        assert!(hidden.ends_with("_htaccess"));
    }
}
