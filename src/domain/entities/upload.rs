use actix_multipart::form::{tempfile::TempFile, MultipartForm};

use crate::{errors::AppError, use_cases::uploads::IncomingFile};

/// Single-file staff upload. Per-kind size caps are applied after reading.
#[derive(Debug, MultipartForm)]
pub struct FileUpload {
    #[multipart(rename = "file", limit = "10MB")]
    pub file: TempFile,
}

impl FileUpload {
    pub async fn into_incoming(self) -> Result<IncomingFile, AppError> {
        let file_name = self
            .file
            .file_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| AppError::field("file", "A file name is required"))?;
        let bytes = tokio::fs::read(self.file.file.path()).await?;
        Ok(IncomingFile { file_name, bytes })
    }
}
