use actix_web::{web, HttpResponse, Responder};
use tracing::instrument;

use super::downloads::media_response;
use crate::{entities::project::ProjectFilter, errors::AppError, AppState};

#[instrument(skip(state))]
pub async fn list_projects(state: web::Data<AppState>, filter: web::Query<ProjectFilter>) -> Result<impl Responder, AppError> {
    let response = state.portfolio_handler.list(filter.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[instrument(skip(state))]
pub async fn filter_projects(state: web::Data<AppState>, filter: web::Query<ProjectFilter>) -> Result<impl Responder, AppError> {
    let projects = state.portfolio_handler.filter(filter.into_inner()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "projects": projects })))
}

#[instrument(skip(state))]
pub async fn project_detail(state: web::Data<AppState>, slug: web::Path<String>) -> Result<impl Responder, AppError> {
    let response = state.portfolio_handler.detail(&slug).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[instrument(skip(state))]
pub async fn download_writeup(state: web::Data<AppState>, slug: web::Path<String>) -> Result<HttpResponse, AppError> {
    let writeup = state.portfolio_handler.writeup(&slug).await?;
    media_response(writeup.location, Some(&writeup.file_name)).await
}
