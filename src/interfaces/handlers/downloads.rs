use std::path::Path;

use actix_web::{
    http::header::{ContentDisposition, DispositionParam, DispositionType, LOCATION},
    web, HttpResponse,
};
use tracing::instrument;

use crate::{errors::AppError, media::MediaLocation, AppState};

/// Streams a local file or redirects to the CDN copy. `attachment` names the download.
pub async fn media_response(location: MediaLocation, attachment: Option<&str>) -> Result<HttpResponse, AppError> {
    let path = match location {
        MediaLocation::Redirect(url) => {
            return Ok(HttpResponse::Found().insert_header((LOCATION, url)).finish());
        }
        MediaLocation::File(path) => path,
    };

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!("Media file missing on disk: {}", path.display());
            return Err(AppError::NotFound("File not found".to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    let mut builder = HttpResponse::Ok();
    builder.content_type(content_type_for(&path, &bytes));
    if let Some(name) = attachment {
        builder.insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(name.to_string())],
        });
    }
    Ok(builder.body(bytes))
}

fn content_type_for(path: &Path, bytes: &[u8]) -> String {
    if let Some(kind) = infer::get(bytes) {
        return kind.mime_type().to_string();
    }
    match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
        Some("txt") => "text/plain; charset=utf-8".to_string(),
        Some("pdf") => "application/pdf".to_string(),
        _ => "application/octet-stream".to_string(),
    }
}

/// `GET /media/{key}` for the local backend.
#[instrument(skip(state))]
pub async fn serve_media(state: web::Data<AppState>, key: web::Path<String>) -> Result<HttpResponse, AppError> {
    let location = state.media.locate(&key)?;
    media_response(location, None).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_prefers_sniffed_bytes() {
        assert_eq!(content_type_for(Path::new("cv.bin"), b"%PDF-1.7\n"), "application/pdf");
        assert_eq!(content_type_for(Path::new("notes.txt"), b"plain words"), "text/plain; charset=utf-8");
        assert_eq!(content_type_for(Path::new("blob"), b"\x00\x01"), "application/octet-stream");
    }

    #[actix_rt::test]
    async fn redirects_pass_through() {
        let res = media_response(MediaLocation::Redirect("https://cdn.example/cv.pdf".into()), Some("cv.pdf"))
            .await
            .unwrap();
        assert_eq!(res.status(), actix_web::http::StatusCode::FOUND);
        assert_eq!(res.headers().get(LOCATION).unwrap(), "https://cdn.example/cv.pdf");
    }

    #[actix_rt::test]
    async fn missing_files_are_not_found() {
        let err = media_response(MediaLocation::File("/nonexistent/cv.pdf".into()), None).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
