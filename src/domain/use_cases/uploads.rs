use std::sync::Arc;

use crate::{
    entities::security_event::{NewSecurityEvent, RequestContext, SecurityEventType, Severity},
    errors::AppError,
    media::{validate_upload, MediaStorage, StoredMedia, UploadKind},
    use_cases::security::SecurityAuditor,
};

/// A file received from a multipart form.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Validates staff uploads, stores them and writes the audit trail.
#[derive(Clone)]
pub struct UploadHandler {
    storage: Arc<dyn MediaStorage>,
    auditor: SecurityAuditor,
}

impl UploadHandler {
    pub fn new(storage: Arc<dyn MediaStorage>, auditor: SecurityAuditor) -> Self {
        UploadHandler { storage, auditor }
    }

    pub fn storage(&self) -> &Arc<dyn MediaStorage> {
        &self.storage
    }

    pub async fn store(
        &self,
        folder: &str,
        file: IncomingFile,
        accept: &[UploadKind],
        ctx: &RequestContext,
        username: &str,
    ) -> Result<StoredMedia, AppError> {
        let size = file.bytes.len();
        let kind = match validate_upload(&file.file_name, &file.bytes, accept) {
            Ok(kind) => kind,
            Err(e) => {
                self.auditor
                    .record(
                        NewSecurityEvent::for_request(
                            SecurityEventType::FileUpload,
                            Severity::Medium,
                            ctx,
                            format!("Rejected upload {}: {}", file.file_name, e),
                        )
                        .with_username(username),
                    )
                    .await;
                return Err(e);
            }
        };

        let stored = self
            .storage
            .save(folder, &file.file_name, file.bytes, kind)
            .await?;

        self.auditor
            .record(
                NewSecurityEvent::for_request(
                    SecurityEventType::FileUpload,
                    Severity::Low,
                    ctx,
                    format!("File uploaded: {} ({} bytes) to {}", file.file_name, size, folder),
                )
                .with_username(username),
            )
            .await;

        Ok(stored)
    }

    /// Best-effort removal of a replaced file.
    pub async fn discard(&self, key: &str) {
        if let Err(e) = self.storage.delete(key).await {
            tracing::warn!("Failed to delete replaced media {}: {}", key, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::LocalMediaStorage;
    use crate::repositories::security_event::MockSecurityEventRepository;

    fn ctx() -> RequestContext {
        RequestContext { ip: "127.0.0.1".into(), method: "POST".into(), path: "/admin/resume/cv".into(), ..Default::default() }
    }

    #[tokio::test]
    async fn accepted_files_are_stored_and_logged() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalMediaStorage::new(dir.path().to_path_buf(), "/media/".into());
        let mut events = MockSecurityEventRepository::new();
        events
            .expect_record_event()
            .withf(|e| e.event_type == SecurityEventType::FileUpload && e.severity == Severity::Low)
            .times(1)
            .returning(|_| Ok(()));
        let uploads = UploadHandler::new(Arc::new(storage), SecurityAuditor::new(Arc::new(events)));

        let file = IncomingFile { file_name: "notes.txt".into(), bytes: b"plain notes".to_vec() };
        let stored = uploads.store("documents", file, &[UploadKind::Document], &ctx(), "owner").await.unwrap();

        assert!(stored.key.starts_with("documents/"));
        assert!(stored.url.starts_with("/media/documents/"));
    }

    #[tokio::test]
    async fn rejected_files_are_logged_as_medium() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalMediaStorage::new(dir.path().to_path_buf(), "/media/".into());
        let mut events = MockSecurityEventRepository::new();
        events
            .expect_record_event()
            .withf(|e| e.severity == Severity::Medium && e.description.starts_with("Rejected upload shell.php"))
            .times(1)
            .returning(|_| Ok(()));
        let uploads = UploadHandler::new(Arc::new(storage), SecurityAuditor::new(Arc::new(events)));

        let file = IncomingFile { file_name: "shell.php".into(), bytes: b"<?php".to_vec() };
        let err = uploads.store("documents", file, &[UploadKind::Document], &ctx(), "owner").await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }
}
