use actix_multipart::form::MultipartForm;
use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse, Responder};
use serde::{de::DeserializeOwned, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    entities::{resume::ResumeSection, upload::FileUpload},
    errors::AppError,
    media::UploadKind,
    use_cases::{
        extractors::AdminClaims,
        profile::{ProfileHandler, CV_FOLDER},
    },
    utils::{get_client_ip::request_context, valid_uuid::valid_uuid},
    AppState,
};

fn parse<T: DeserializeOwned>(body: serde_json::Value) -> Result<T, AppError> {
    serde_json::from_value(body).map_err(|e| AppError::InvalidInput(format!("Invalid request body: {}", e)))
}

fn json<T: Serialize>(status: StatusCode, value: T) -> HttpResponse {
    HttpResponse::build(status).json(value)
}

async fn save_entry(
    profile: &ProfileHandler,
    section: ResumeSection,
    id: Option<Uuid>,
    body: serde_json::Value,
) -> Result<HttpResponse, AppError> {
    let status = if id.is_some() { StatusCode::OK } else { StatusCode::CREATED };
    let response = match section {
        ResumeSection::Skills => json(status, profile.save_skill(id, parse(body)?).await?),
        ResumeSection::Experiences => json(status, profile.save_experience(id, parse(body)?).await?),
        ResumeSection::Education => json(status, profile.save_education(id, parse(body)?).await?),
        ResumeSection::Certifications => json(status, profile.save_certification(id, parse(body)?).await?),
        ResumeSection::Achievements => json(status, profile.save_achievement(id, parse(body)?).await?),
        ResumeSection::Testimonials => json(status, profile.save_testimonial(id, parse(body)?).await?),
    };
    Ok(response)
}

#[instrument(skip(_claims, state))]
pub async fn list_section(
    _claims: AdminClaims,
    state: web::Data<AppState>,
    section: web::Path<ResumeSection>,
) -> Result<impl Responder, AppError> {
    let profile = &state.profile_handler;
    let response = match section.into_inner() {
        ResumeSection::Skills => json(StatusCode::OK, profile.list_skills().await?),
        ResumeSection::Experiences => json(StatusCode::OK, profile.list_experiences().await?),
        ResumeSection::Education => json(StatusCode::OK, profile.list_education().await?),
        ResumeSection::Certifications => json(StatusCode::OK, profile.list_certifications().await?),
        ResumeSection::Achievements => json(StatusCode::OK, profile.list_achievements().await?),
        ResumeSection::Testimonials => json(StatusCode::OK, profile.list_testimonials().await?),
    };
    Ok(response)
}

#[instrument(skip(_claims, state, body))]
pub async fn create_entry(
    _claims: AdminClaims,
    state: web::Data<AppState>,
    section: web::Path<ResumeSection>,
    body: web::Json<serde_json::Value>,
) -> Result<impl Responder, AppError> {
    save_entry(&state.profile_handler, section.into_inner(), None, body.into_inner()).await
}

#[instrument(skip(_claims, state, body))]
pub async fn update_entry(
    _claims: AdminClaims,
    state: web::Data<AppState>,
    path: web::Path<(ResumeSection, String)>,
    body: web::Json<serde_json::Value>,
) -> Result<impl Responder, AppError> {
    let (section, id) = path.into_inner();
    let id = valid_uuid(&id)?;
    save_entry(&state.profile_handler, section, Some(id), body.into_inner()).await
}

#[instrument(skip(_claims, state))]
pub async fn delete_entry(
    _claims: AdminClaims,
    state: web::Data<AppState>,
    path: web::Path<(ResumeSection, String)>,
) -> Result<impl Responder, AppError> {
    let (section, id) = path.into_inner();
    state.profile_handler.delete_entry(section, &valid_uuid(&id)?).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Uploads a new CV; the most recent upload is the one served.
#[instrument(skip(req, claims, state, form))]
pub async fn upload_cv(
    req: HttpRequest,
    claims: AdminClaims,
    state: web::Data<AppState>,
    form: MultipartForm<FileUpload>,
) -> Result<impl Responder, AppError> {
    let ctx = request_context(&req, state.config.trust_x_forwarded_for);
    let file = form.into_inner().into_incoming().await?;
    let file_name = file.file_name.clone();

    let profile = &state.profile_handler;
    let stored = profile
        .uploads()
        .store(CV_FOLDER, file, &[UploadKind::Document], &ctx, claims.username())
        .await?;

    match profile.attach_cv(&stored, &file_name).await {
        Ok(document) => Ok(HttpResponse::Created().json(document)),
        Err(e) => {
            profile.uploads().discard(&stored.key).await;
            Err(e)
        }
    }
}
