use std::collections::HashMap;

use actix_web::{web, HttpResponse, Responder};
use tracing::instrument;

use crate::{
    entities::blog_post::{ModerationRequest, NewBlogPostRequest, NewCategoryRequest, NewTagRequest, UpdateBlogPostRequest},
    errors::AppError,
    use_cases::extractors::AdminClaims,
    utils::valid_uuid::valid_uuid,
    AppState,
};

#[instrument(skip(_claims, state, query))]
pub async fn list_posts(
    _claims: AdminClaims,
    state: web::Data<AppState>,
    query: web::Query<HashMap<String, String>>,
) -> Result<impl Responder, AppError> {
    let page = state.blog_handler.list_all(query.get("page").map(String::as_str)).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[instrument(skip(claims, state, data))]
pub async fn create_post(
    claims: AdminClaims,
    state: web::Data<AppState>,
    data: web::Json<NewBlogPostRequest>,
) -> Result<impl Responder, AppError> {
    let author_id = valid_uuid(&claims.0.sub)?;
    let response = state.blog_handler.create_post(data.into_inner(), author_id).await?;
    Ok(HttpResponse::Created().json(response))
}

#[instrument(skip(_claims, state))]
pub async fn get_post(
    _claims: AdminClaims,
    state: web::Data<AppState>,
    post_id: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let post = state.blog_handler.get_post(&valid_uuid(&post_id)?).await?;
    Ok(HttpResponse::Ok().json(post))
}

#[instrument(skip(_claims, state, data))]
pub async fn update_post(
    _claims: AdminClaims,
    state: web::Data<AppState>,
    post_id: web::Path<String>,
    data: web::Json<UpdateBlogPostRequest>,
) -> Result<impl Responder, AppError> {
    let post = state.blog_handler.update_post(&valid_uuid(&post_id)?, data.into_inner()).await?;
    Ok(HttpResponse::Ok().json(post))
}

#[instrument(skip(_claims, state))]
pub async fn delete_post(
    _claims: AdminClaims,
    state: web::Data<AppState>,
    post_id: web::Path<String>,
) -> Result<impl Responder, AppError> {
    state.blog_handler.delete_post(&valid_uuid(&post_id)?).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[instrument(skip(_claims, state))]
pub async fn list_categories(_claims: AdminClaims, state: web::Data<AppState>) -> Result<impl Responder, AppError> {
    Ok(HttpResponse::Ok().json(state.blog_handler.list_categories().await?))
}

#[instrument(skip(_claims, state, data))]
pub async fn create_category(
    _claims: AdminClaims,
    state: web::Data<AppState>,
    data: web::Json<NewCategoryRequest>,
) -> Result<impl Responder, AppError> {
    let category = state.blog_handler.create_category(data.into_inner()).await?;
    Ok(HttpResponse::Created().json(category))
}

#[instrument(skip(_claims, state))]
pub async fn delete_category(
    _claims: AdminClaims,
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<impl Responder, AppError> {
    state.blog_handler.delete_category(&valid_uuid(&id)?).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[instrument(skip(_claims, state))]
pub async fn list_tags(_claims: AdminClaims, state: web::Data<AppState>) -> Result<impl Responder, AppError> {
    Ok(HttpResponse::Ok().json(state.blog_handler.list_tags().await?))
}

#[instrument(skip(_claims, state, data))]
pub async fn create_tag(
    _claims: AdminClaims,
    state: web::Data<AppState>,
    data: web::Json<NewTagRequest>,
) -> Result<impl Responder, AppError> {
    let tag = state.blog_handler.create_tag(data.into_inner()).await?;
    Ok(HttpResponse::Created().json(tag))
}

#[instrument(skip(_claims, state))]
pub async fn delete_tag(
    _claims: AdminClaims,
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<impl Responder, AppError> {
    state.blog_handler.delete_tag(&valid_uuid(&id)?).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// `?pending=true` limits the list to comments awaiting moderation.
#[instrument(skip(_claims, state, query))]
pub async fn list_comments(
    _claims: AdminClaims,
    state: web::Data<AppState>,
    query: web::Query<HashMap<String, String>>,
) -> Result<impl Responder, AppError> {
    let pending_only = query.get("pending").is_some_and(|v| v == "true");
    Ok(HttpResponse::Ok().json(state.blog_handler.list_comments(pending_only).await?))
}

#[instrument(skip(_claims, state, data))]
pub async fn moderate_comment(
    _claims: AdminClaims,
    state: web::Data<AppState>,
    id: web::Path<String>,
    data: web::Json<ModerationRequest>,
) -> Result<impl Responder, AppError> {
    state.blog_handler.moderate_comment(&valid_uuid(&id)?, data.approved).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "approved": data.approved })))
}

#[instrument(skip(_claims, state))]
pub async fn delete_comment(
    _claims: AdminClaims,
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<impl Responder, AppError> {
    state.blog_handler.delete_comment(&valid_uuid(&id)?).await?;
    Ok(HttpResponse::NoContent().finish())
}
