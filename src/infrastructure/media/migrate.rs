use serde::Serialize;

use super::{
    cloudinary::public_id_for, validation::extension_of, CloudinaryStorage, LocalMediaStorage, MediaError,
    MediaStorage, UploadKind,
};
use crate::repositories::media::MediaReferenceRepository;

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedUpload {
    pub key: String,
    pub public_id: String,
    pub kind: UploadKind,
}

#[derive(Debug, Default, Serialize)]
pub struct MigrationReport {
    pub uploaded: usize,
    pub skipped: Vec<String>,
    pub failed: Vec<(String, String)>,
    pub references_updated: u64,
}

/// Maps local keys to Cloudinary public ids. Files of unsupported types are left out.
pub fn plan_migration(keys: &[String]) -> (Vec<PlannedUpload>, Vec<String>) {
    let mut planned = Vec::new();
    let mut skipped = Vec::new();

    for key in keys {
        let kind = extension_of(key).and_then(|ext| UploadKind::for_extension(&ext));
        match kind {
            Some(kind) => {
                let (folder, name) = key.rsplit_once('/').unwrap_or(("", key.as_str()));
                planned.push(PlannedUpload {
                    key: key.clone(),
                    public_id: public_id_for(folder, name, kind),
                    kind,
                });
            }
            None => skipped.push(key.clone()),
        }
    }
    (planned, skipped)
}

/// Uploads every local media file to Cloudinary and repoints database references.
/// Local files are left in place.
pub async fn migrate_local_media(
    local: &LocalMediaStorage,
    remote: &CloudinaryStorage,
    references: &dyn MediaReferenceRepository,
    dry_run: bool,
) -> Result<MigrationReport, MediaError> {
    let keys = local.list_keys().await?;
    let (planned, skipped) = plan_migration(&keys);
    let mut report = MigrationReport { skipped, ..MigrationReport::default() };

    tracing::info!("Media migration: {} files to upload, {} skipped", planned.len(), report.skipped.len());

    for upload in planned {
        if dry_run {
            tracing::info!("[dry run] {} -> {}", upload.key, upload.public_id);
            continue;
        }

        let bytes = match local.read(&upload.key).await {
            Ok(bytes) => bytes,
            Err(e) => {
                report.failed.push((upload.key, e.to_string()));
                continue;
            }
        };

        let file_name = upload.key.rsplit('/').next().unwrap_or(&upload.key).to_string();
        let stored = match remote.upload(&upload.public_id, &file_name, bytes, upload.kind).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::error!("Failed to upload {}: {}", upload.key, e);
                report.failed.push((upload.key, e.to_string()));
                continue;
            }
        };
        report.uploaded += 1;

        match references
            .rewrite_references(&upload.key, &stored.key, &local.url(&upload.key), &stored.url)
            .await
        {
            Ok(count) => report.references_updated += count,
            Err(e) => {
                tracing::error!("Uploaded {} but could not update references: {}", upload.key, e);
                report.failed.push((upload.key, e.to_string()));
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plans_uploads_by_extension() {
        let keys = vec![
            "projects/writeups/abc_report.pdf".to_string(),
            "gallery/abc_shot.png".to_string(),
            "misc/notes.md".to_string(),
        ];
        let (planned, skipped) = plan_migration(&keys);

        assert_eq!(
            planned,
            vec![
                PlannedUpload {
                    key: "projects/writeups/abc_report.pdf".into(),
                    public_id: "projects/writeups/abc_report.pdf".into(),
                    kind: UploadKind::Document,
                },
                PlannedUpload {
                    key: "gallery/abc_shot.png".into(),
                    public_id: "gallery/abc_shot".into(),
                    kind: UploadKind::Image,
                },
            ]
        );
        assert_eq!(skipped, vec!["misc/notes.md".to_string()]);
    }
}
