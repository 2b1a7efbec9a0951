use std::collections::HashMap;

use actix_web::{web, HttpResponse, Responder};
use serde_json::json;
use tracing::instrument;

use crate::{
    entities::security_event::SecurityEventFilter,
    errors::AppError,
    use_cases::{extractors::AdminClaims, security::security_check},
    utils::valid_uuid::valid_uuid,
    AppState,
};

#[instrument(skip(_claims, state, query))]
pub async fn list_contacts(
    _claims: AdminClaims,
    state: web::Data<AppState>,
    query: web::Query<HashMap<String, String>>,
) -> Result<impl Responder, AppError> {
    let page = state.contact_handler.list_submissions(query.get("page").map(String::as_str)).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[instrument(skip(_claims, state))]
pub async fn delete_contact(
    _claims: AdminClaims,
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<impl Responder, AppError> {
    state.contact_handler.delete_submission(&valid_uuid(&id)?).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[instrument(skip(_claims, state))]
pub async fn list_events(
    _claims: AdminClaims,
    state: web::Data<AppState>,
    filter: web::Query<SecurityEventFilter>,
) -> Result<impl Responder, AppError> {
    let events = state.security_service.list_events(filter.into_inner()).await?;
    Ok(HttpResponse::Ok().json(events))
}

#[instrument(skip(_claims, state))]
pub async fn rate_limit_status(
    _claims: AdminClaims,
    state: web::Data<AppState>,
    ip: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let ip = ip.into_inner();
    let counters = state.rate_limiter.status(&ip).await;
    Ok(HttpResponse::Ok().json(json!({ "ip": ip, "counters": counters })))
}

#[instrument(skip(claims, state))]
pub async fn clear_rate_limits(
    claims: AdminClaims,
    state: web::Data<AppState>,
    ip: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let ip = ip.into_inner();
    let cleared = state.rate_limiter.clear(Some(&ip)).await?;
    tracing::info!("{} cleared {} rate limit counters for {}", claims.username(), cleared, ip);
    Ok(HttpResponse::Ok().json(json!({ "ip": ip, "cleared": cleared })))
}

#[instrument(skip(_claims, state))]
pub async fn configuration_check(_claims: AdminClaims, state: web::Data<AppState>) -> Result<impl Responder, AppError> {
    Ok(HttpResponse::Ok().json(security_check(&state.config)))
}
