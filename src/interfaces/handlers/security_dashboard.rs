use std::collections::HashMap;

use actix_web::{
    http::header::{ContentDisposition, DispositionParam, DispositionType},
    web, HttpResponse, Responder,
};
use chrono::Utc;
use tracing::instrument;

use crate::{errors::AppError, use_cases::extractors::AdminClaims, AppState};

fn int_param(query: &HashMap<String, String>, name: &str) -> Option<i64> {
    query.get(name).and_then(|v| v.trim().parse().ok())
}

#[instrument(skip(claims, state, query))]
pub async fn dashboard(
    claims: AdminClaims,
    state: web::Data<AppState>,
    query: web::Query<HashMap<String, String>>,
) -> Result<impl Responder, AppError> {
    tracing::info!("Security dashboard viewed by {}", claims.username());
    let dashboard = state.security_service.dashboard(int_param(&query, "hours"), Utc::now()).await?;
    Ok(HttpResponse::Ok().json(dashboard))
}

#[instrument(skip(claims, state, query))]
pub async fn report_csv(
    claims: AdminClaims,
    state: web::Data<AppState>,
    query: web::Query<HashMap<String, String>>,
) -> Result<impl Responder, AppError> {
    let now = Utc::now();
    let csv = state.security_service.report_csv(int_param(&query, "days"), now).await?;
    tracing::info!("Security report exported by {}", claims.username());

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(format!(
                "security_report_{}.csv",
                now.format("%Y%m%d")
            ))],
        })
        .body(csv))
}
