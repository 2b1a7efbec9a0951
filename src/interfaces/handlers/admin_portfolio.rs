use actix_multipart::form::MultipartForm;
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use tracing::instrument;

use crate::{
    entities::{
        project::{
            NewProjectCategoryRequest, NewProjectFeatureRequest, NewProjectImageRequest, NewProjectRequest,
            NewTechnologyRequest, UpdateProjectRequest,
        },
        upload::FileUpload,
    },
    errors::AppError,
    media::UploadKind,
    use_cases::{extractors::AdminClaims, portfolio::WRITEUP_FOLDER},
    utils::{get_client_ip::request_context, valid_uuid::valid_uuid},
    AppState,
};

const IMAGE_FOLDER: &str = "project_images";

#[instrument(skip(_claims, state))]
pub async fn list_projects(_claims: AdminClaims, state: web::Data<AppState>) -> Result<impl Responder, AppError> {
    Ok(HttpResponse::Ok().json(state.portfolio_handler.list_all().await?))
}

#[instrument(skip(_claims, state, data))]
pub async fn create_project(
    _claims: AdminClaims,
    state: web::Data<AppState>,
    data: web::Json<NewProjectRequest>,
) -> Result<impl Responder, AppError> {
    let project = state.portfolio_handler.create_project(data.into_inner()).await?;
    Ok(HttpResponse::Created().json(project))
}

#[instrument(skip(_claims, state))]
pub async fn get_project(
    _claims: AdminClaims,
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<impl Responder, AppError> {
    Ok(HttpResponse::Ok().json(state.portfolio_handler.get_project(&valid_uuid(&id)?).await?))
}

#[instrument(skip(_claims, state, data))]
pub async fn update_project(
    _claims: AdminClaims,
    state: web::Data<AppState>,
    id: web::Path<String>,
    data: web::Json<UpdateProjectRequest>,
) -> Result<impl Responder, AppError> {
    let project = state.portfolio_handler.update_project(&valid_uuid(&id)?, data.into_inner()).await?;
    Ok(HttpResponse::Ok().json(project))
}

#[instrument(skip(_claims, state))]
pub async fn delete_project(
    _claims: AdminClaims,
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<impl Responder, AppError> {
    state.portfolio_handler.delete_project(&valid_uuid(&id)?).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Replaces the project writeup with an uploaded document.
#[instrument(skip(req, claims, state, form))]
pub async fn upload_writeup(
    req: HttpRequest,
    claims: AdminClaims,
    state: web::Data<AppState>,
    id: web::Path<String>,
    form: MultipartForm<FileUpload>,
) -> Result<impl Responder, AppError> {
    let project_id = valid_uuid(&id)?;
    let ctx = request_context(&req, state.config.trust_x_forwarded_for);
    let file = form.into_inner().into_incoming().await?;
    let file_name = file.file_name.clone();

    let portfolio = &state.portfolio_handler;
    let stored = portfolio
        .uploads()
        .store(WRITEUP_FOLDER, file, &[UploadKind::Document], &ctx, claims.username())
        .await?;

    match portfolio.attach_writeup(&project_id, &stored, &file_name).await {
        Ok(project) => Ok(HttpResponse::Ok().json(project)),
        Err(e) => {
            portfolio.uploads().discard(&stored.key).await;
            Err(e)
        }
    }
}

#[instrument(skip(_claims, state))]
pub async fn list_features(
    _claims: AdminClaims,
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<impl Responder, AppError> {
    Ok(HttpResponse::Ok().json(state.portfolio_handler.list_features(&valid_uuid(&id)?).await?))
}

#[instrument(skip(_claims, state, data))]
pub async fn add_feature(
    _claims: AdminClaims,
    state: web::Data<AppState>,
    id: web::Path<String>,
    data: web::Json<NewProjectFeatureRequest>,
) -> Result<impl Responder, AppError> {
    let feature = state.portfolio_handler.add_feature(&valid_uuid(&id)?, data.into_inner()).await?;
    Ok(HttpResponse::Created().json(feature))
}

#[instrument(skip(_claims, state))]
pub async fn delete_feature(
    _claims: AdminClaims,
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<impl Responder, AppError> {
    state.portfolio_handler.delete_feature(&valid_uuid(&id)?).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[instrument(skip(_claims, state))]
pub async fn list_images(
    _claims: AdminClaims,
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<impl Responder, AppError> {
    Ok(HttpResponse::Ok().json(state.portfolio_handler.list_images(&valid_uuid(&id)?).await?))
}

/// Adds a gallery image by URL.
#[instrument(skip(_claims, state, data))]
pub async fn add_image(
    _claims: AdminClaims,
    state: web::Data<AppState>,
    id: web::Path<String>,
    data: web::Json<NewProjectImageRequest>,
) -> Result<impl Responder, AppError> {
    let image = state.portfolio_handler.add_image(&valid_uuid(&id)?, data.into_inner()).await?;
    Ok(HttpResponse::Created().json(image))
}

/// Adds a gallery image from an uploaded file.
#[instrument(skip(req, claims, state, form))]
pub async fn upload_image(
    req: HttpRequest,
    claims: AdminClaims,
    state: web::Data<AppState>,
    id: web::Path<String>,
    form: MultipartForm<FileUpload>,
) -> Result<impl Responder, AppError> {
    let project_id = valid_uuid(&id)?;
    let ctx = request_context(&req, state.config.trust_x_forwarded_for);
    let file = form.into_inner().into_incoming().await?;

    let portfolio = &state.portfolio_handler;
    let stored = portfolio
        .uploads()
        .store(IMAGE_FOLDER, file, &[UploadKind::Image], &ctx, claims.username())
        .await?;

    let request = NewProjectImageRequest {
        image_url: stored.url.clone(),
        caption: String::new(),
        display_order: 0,
    };
    match portfolio.add_image(&project_id, request).await {
        Ok(image) => Ok(HttpResponse::Created().json(image)),
        Err(e) => {
            portfolio.uploads().discard(&stored.key).await;
            Err(e)
        }
    }
}

#[instrument(skip(_claims, state))]
pub async fn delete_image(
    _claims: AdminClaims,
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<impl Responder, AppError> {
    state.portfolio_handler.delete_image(&valid_uuid(&id)?).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[instrument(skip(_claims, state))]
pub async fn list_categories(_claims: AdminClaims, state: web::Data<AppState>) -> Result<impl Responder, AppError> {
    Ok(HttpResponse::Ok().json(state.portfolio_handler.list_categories().await?))
}

#[instrument(skip(_claims, state, data))]
pub async fn create_category(
    _claims: AdminClaims,
    state: web::Data<AppState>,
    data: web::Json<NewProjectCategoryRequest>,
) -> Result<impl Responder, AppError> {
    let category = state.portfolio_handler.create_category(data.into_inner()).await?;
    Ok(HttpResponse::Created().json(category))
}

#[instrument(skip(_claims, state))]
pub async fn delete_category(
    _claims: AdminClaims,
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<impl Responder, AppError> {
    state.portfolio_handler.delete_category(&valid_uuid(&id)?).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[instrument(skip(_claims, state))]
pub async fn list_technologies(_claims: AdminClaims, state: web::Data<AppState>) -> Result<impl Responder, AppError> {
    Ok(HttpResponse::Ok().json(state.portfolio_handler.list_technologies().await?))
}

#[instrument(skip(_claims, state, data))]
pub async fn create_technology(
    _claims: AdminClaims,
    state: web::Data<AppState>,
    data: web::Json<NewTechnologyRequest>,
) -> Result<impl Responder, AppError> {
    let technology = state.portfolio_handler.create_technology(data.into_inner()).await?;
    Ok(HttpResponse::Created().json(technology))
}

#[instrument(skip(_claims, state))]
pub async fn delete_technology(
    _claims: AdminClaims,
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<impl Responder, AppError> {
    state.portfolio_handler.delete_technology(&valid_uuid(&id)?).await?;
    Ok(HttpResponse::NoContent().finish())
}
