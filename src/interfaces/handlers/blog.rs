use std::collections::HashMap;

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use tracing::instrument;

use crate::{
    entities::blog_post::{NewCommentRequest, PostFilter, VoteRequest},
    errors::AppError,
    utils::get_client_ip::get_client_ip,
    AppState,
};

#[instrument(skip(state))]
pub async fn list_posts(state: web::Data<AppState>, filter: web::Query<PostFilter>) -> Result<impl Responder, AppError> {
    let response = state.blog_handler.list(filter.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[instrument(skip(state, query))]
pub async fn search_posts(
    state: web::Data<AppState>,
    query: web::Query<HashMap<String, String>>,
) -> Result<impl Responder, AppError> {
    let term = query.get("q").map(String::as_str).unwrap_or_default();
    let results = state.blog_handler.search(term).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "results": results })))
}

#[instrument(skip(req, state))]
pub async fn post_detail(
    req: HttpRequest,
    state: web::Data<AppState>,
    slug: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let ip = get_client_ip(&req, state.config.trust_x_forwarded_for);
    let response = state.blog_handler.detail(&slug, &ip).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[instrument(skip(state, data))]
pub async fn add_comment(
    state: web::Data<AppState>,
    slug: web::Path<String>,
    data: web::Json<NewCommentRequest>,
) -> Result<impl Responder, AppError> {
    let response = state.blog_handler.add_comment(&slug, data.into_inner()).await?;
    Ok(HttpResponse::Created().json(response))
}

/// Body is optional; an empty request counts as a like.
#[instrument(skip(req, state, data))]
pub async fn vote(
    req: HttpRequest,
    state: web::Data<AppState>,
    slug: web::Path<String>,
    data: Option<web::Json<VoteRequest>>,
) -> Result<impl Responder, AppError> {
    let ip = get_client_ip(&req, state.config.trust_x_forwarded_for);
    let is_like = data.map(|d| d.into_inner()).unwrap_or_default().is_like;
    let response = state.blog_handler.vote(&slug, &ip, is_like).await?;
    Ok(HttpResponse::Ok().json(response))
}
