use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha1::{Digest, Sha1};

use super::{
    storage_file_name, LocalMediaStorage, MediaError, MediaLocation, MediaStorage, StoredMedia, UploadKind,
    CLOUDINARY_KEY_PREFIX,
};

const API_BASE: &str = "https://api.cloudinary.com/v1_1";
const DELIVERY_BASE: &str = "https://res.cloudinary.com";

/// Signed uploads to Cloudinary. Keys look like `cloudinary:{resource_type}/{public_id}`;
/// keys without the prefix predate the CDN and resolve through the local store.
#[derive(Clone)]
pub struct CloudinaryStorage {
    cloud_name: String,
    api_key: String,
    api_secret: String,
    client: reqwest::Client,
    legacy: LocalMediaStorage,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
    resource_type: String,
    secure_url: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

impl CloudinaryStorage {
    pub fn new(cloud_name: String, api_key: String, api_secret: String, legacy: LocalMediaStorage) -> Self {
        CloudinaryStorage {
            cloud_name,
            api_key,
            api_secret,
            client: reqwest::Client::new(),
            legacy,
        }
    }

    /// Uploads under an explicit public id, overwriting any existing asset.
    pub async fn upload(&self, public_id: &str, file_name: &str, bytes: Vec<u8>, kind: UploadKind) -> Result<StoredMedia, MediaError> {
        let resource_type = resource_type(kind);
        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign(
            &[("overwrite", "true"), ("public_id", public_id), ("timestamp", &timestamp)],
            &self.api_secret,
        );

        let form = Form::new()
            .part("file", Part::bytes(bytes).file_name(file_name.to_string()))
            .text("api_key", self.api_key.clone())
            .text("public_id", public_id.to_string())
            .text("overwrite", "true")
            .text("timestamp", timestamp)
            .text("signature", signature);

        let url = format!("{API_BASE}/{}/{resource_type}/upload", self.cloud_name);
        let resp = self.client.post(&url).multipart(form).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(MediaError::Upload(format!("HTTP {status}: {body}")));
        }

        let uploaded: UploadResponse = resp.json().await?;
        tracing::info!("Uploaded {} to Cloudinary as {}", file_name, uploaded.public_id);

        Ok(StoredMedia {
            key: format!("{CLOUDINARY_KEY_PREFIX}{}/{}", uploaded.resource_type, uploaded.public_id),
            url: uploaded.secure_url,
        })
    }
}

/// Raw for documents so PDFs and Word files download unchanged.
fn resource_type(kind: UploadKind) -> &'static str {
    match kind {
        UploadKind::Document => "raw",
        UploadKind::Image => "image",
    }
}

/// Public id for a stored file: raw assets keep their extension, images drop it.
pub fn public_id_for(folder: &str, stored_name: &str, kind: UploadKind) -> String {
    let folder = folder.trim_matches('/');
    let name = match kind {
        UploadKind::Document => stored_name,
        UploadKind::Image => stored_name.rsplit_once('.').map_or(stored_name, |(stem, _)| stem),
    };
    if folder.is_empty() {
        name.to_string()
    } else {
        format!("{folder}/{name}")
    }
}

/// Splits `cloudinary:{resource_type}/{public_id}`.
pub fn parse_key(key: &str) -> Option<(&str, &str)> {
    key.strip_prefix(CLOUDINARY_KEY_PREFIX)?
        .split_once('/')
        .filter(|(resource_type, public_id)| !resource_type.is_empty() && !public_id.is_empty())
}

/// API request signature: sorted `k=v` pairs joined by `&`, then the secret, SHA-1 hex.
pub fn sign(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha1::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl MediaStorage for CloudinaryStorage {
    async fn save(&self, folder: &str, file_name: &str, bytes: Vec<u8>, kind: UploadKind) -> Result<StoredMedia, MediaError> {
        let public_id = public_id_for(folder, &storage_file_name(file_name), kind);
        self.upload(&public_id, file_name, bytes, kind).await
    }

    fn url(&self, key: &str) -> String {
        match parse_key(key) {
            Some((resource_type, public_id)) => {
                format!("{DELIVERY_BASE}/{}/{resource_type}/upload/{public_id}", self.cloud_name)
            }
            None => self.legacy.url(key),
        }
    }

    fn locate(&self, key: &str) -> Result<MediaLocation, MediaError> {
        if parse_key(key).is_some() {
            Ok(MediaLocation::Redirect(self.url(key)))
        } else {
            self.legacy.locate(key)
        }
    }

    async fn delete(&self, key: &str) -> Result<(), MediaError> {
        let Some((resource_type, public_id)) = parse_key(key) else {
            return self.legacy.delete(key).await;
        };

        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign(&[("public_id", public_id), ("timestamp", &timestamp)], &self.api_secret);
        let url = format!("{API_BASE}/{}/{resource_type}/destroy", self.cloud_name);

        let resp = self
            .client
            .post(&url)
            .form(&[
                ("public_id", public_id),
                ("timestamp", timestamp.as_str()),
                ("api_key", self.api_key.as_str()),
                ("signature", signature.as_str()),
            ])
            .send()
            .await?;

        let outcome: DestroyResponse = resp.json().await?;
        match outcome.result.as_str() {
            "ok" | "not found" => Ok(()),
            other => Err(MediaError::Upload(format!("destroy {public_id}: {other}"))),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, MediaError> {
        let Some((resource_type, public_id)) = parse_key(key) else {
            return self.legacy.exists(key).await;
        };

        let url = format!("{API_BASE}/{}/resources/{resource_type}/upload/{public_id}", self.cloud_name);
        let resp = self
            .client
            .get(&url)
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .send()
            .await?;

        match resp.status() {
            s if s.is_success() => Ok(true),
            reqwest::StatusCode::NOT_FOUND => Ok(false),
            s => Err(MediaError::Upload(format!("resource lookup for {public_id}: HTTP {s}"))),
        }
    }

    fn backend_name(&self) -> &'static str {
        "cloudinary"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn storage() -> CloudinaryStorage {
        CloudinaryStorage::new(
            "demo".into(),
            "key".into(),
            "secret".into(),
            LocalMediaStorage::new(PathBuf::from("media"), "/media/".into()),
        )
    }

    #[test]
    fn signature_sorts_parameters() {
        let a = sign(&[("timestamp", "1315060510"), ("public_id", "sample")], "abcd");
        let b = sign(&[("public_id", "sample"), ("timestamp", "1315060510")], "abcd");
        assert_eq!(a, b);
        assert_eq!(a.len(), 40);
    }

    #[test]
    fn documents_keep_their_extension() {
        assert_eq!(public_id_for("writeups", "x_report.pdf", UploadKind::Document), "writeups/x_report.pdf");
        assert_eq!(public_id_for("/gallery/", "x_shot.png", UploadKind::Image), "gallery/x_shot");
    }

    #[test]
    fn urls_resolve_by_key_shape() {
        let storage = storage();
        assert_eq!(
            storage.url("cloudinary:raw/writeups/report.pdf"),
            "https://res.cloudinary.com/demo/raw/upload/writeups/report.pdf"
        );
        assert_eq!(storage.url("cv/old.pdf"), "/media/cv/old.pdf");
        assert_eq!(
            storage.locate("cloudinary:image/gallery/shot").unwrap(),
            MediaLocation::Redirect("https://res.cloudinary.com/demo/image/upload/gallery/shot".into())
        );
        assert_eq!(parse_key("cloudinary:raw"), None);
    }
}
