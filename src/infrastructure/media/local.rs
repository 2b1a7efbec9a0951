use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use super::{storage_file_name, MediaError, MediaLocation, MediaStorage, StoredMedia, UploadKind};

/// Files under `media_root`, served at `media_url`.
#[derive(Debug, Clone)]
pub struct LocalMediaStorage {
    root: PathBuf,
    base_url: String,
}

impl LocalMediaStorage {
    pub fn new(root: PathBuf, base_url: String) -> Self {
        let base_url = format!("/{}/", base_url.trim_matches('/'));
        LocalMediaStorage { root, base_url }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a key to a path inside the media root.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, MediaError> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(MediaError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }

    /// Every stored key, relative to the root, in sorted order.
    pub async fn list_keys(&self) -> Result<Vec<String>, MediaError> {
        let mut keys = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                } else if let Ok(relative) = path.strip_prefix(&self.root) {
                    let key = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/");
                    keys.push(key);
                }
            }
        }

        keys.sort();
        Ok(keys)
    }

    pub async fn read(&self, key: &str) -> Result<Vec<u8>, MediaError> {
        Ok(fs::read(self.path_for(key)?).await?)
    }
}

#[async_trait]
impl MediaStorage for LocalMediaStorage {
    async fn save(&self, folder: &str, file_name: &str, bytes: Vec<u8>, _kind: UploadKind) -> Result<StoredMedia, MediaError> {
        let folder = folder.trim_matches('/');
        let key = format!("{folder}/{}", storage_file_name(file_name));
        let path = self.path_for(&key)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, bytes).await?;

        tracing::info!("Stored media file {}", key);
        Ok(StoredMedia { url: self.url(&key), key })
    }

    fn url(&self, key: &str) -> String {
        format!("{}{}", self.base_url, key.trim_start_matches('/'))
    }

    fn locate(&self, key: &str) -> Result<MediaLocation, MediaError> {
        Ok(MediaLocation::File(self.path_for(key)?))
    }

    async fn delete(&self, key: &str) -> Result<(), MediaError> {
        match fs::remove_file(self.path_for(key)?).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, MediaError> {
        Ok(fs::try_exists(self.path_for(key)?).await?)
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn saves_lists_and_deletes_files() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalMediaStorage::new(dir.path().to_path_buf(), "media".into());

        let stored = storage
            .save("projects/writeups", "report.pdf", b"%PDF-1.4".to_vec(), UploadKind::Document)
            .await
            .unwrap();

        assert!(stored.key.starts_with("projects/writeups/"));
        assert!(stored.key.ends_with("_report.pdf"));
        assert_eq!(stored.url, format!("/media/{}", stored.key));
        assert!(storage.exists(&stored.key).await.unwrap());
        assert_eq!(storage.list_keys().await.unwrap(), vec![stored.key.clone()]);
        assert_eq!(storage.read(&stored.key).await.unwrap(), b"%PDF-1.4");

        storage.delete(&stored.key).await.unwrap();
        assert!(!storage.exists(&stored.key).await.unwrap());
    }

    #[test]
    fn keys_cannot_escape_the_root() {
        let storage = LocalMediaStorage::new(PathBuf::from("/srv/media"), "/media/".into());
        assert!(storage.path_for("../etc/passwd").is_err());
        assert!(storage.path_for("/etc/passwd").is_err());
        assert!(storage.path_for("").is_err());
        assert_eq!(storage.path_for("cv/a.pdf").unwrap(), PathBuf::from("/srv/media/cv/a.pdf"));
    }
}
