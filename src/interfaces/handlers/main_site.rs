use actix_web::{web, Either, HttpRequest, HttpResponse, Responder};
use tracing::instrument;

use super::downloads::media_response;
use crate::{
    entities::contact::{ContactForm, CONTACT_INVALID_MESSAGE},
    errors::AppError,
    utils::get_client_ip::request_context,
    AppState,
};

#[instrument(skip(state))]
pub async fn home(state: web::Data<AppState>) -> Result<impl Responder, AppError> {
    let page = state.profile_handler.home().await?;
    Ok(HttpResponse::Ok().json(page))
}

#[instrument(skip(state))]
pub async fn about(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.profile_handler.about())
}

#[instrument(skip(state))]
pub async fn resume(state: web::Data<AppState>) -> Result<impl Responder, AppError> {
    let page = state.profile_handler.resume().await?;
    Ok(HttpResponse::Ok().json(page))
}

#[instrument(skip(state))]
pub async fn download_cv(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let cv = state.profile_handler.cv().await?;
    media_response(cv.location, Some(&cv.file_name)).await
}

#[instrument(skip(state))]
pub async fn contact_details(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.contact_handler.details())
}

/// Accepts the contact form as JSON or url-encoded.
#[instrument(skip(req, state, body))]
pub async fn submit_contact(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: Result<Either<web::Json<ContactForm>, web::Form<ContactForm>>, actix_web::Error>,
) -> Result<HttpResponse, AppError> {
    let form = match body {
        Ok(Either::Left(json)) => json.into_inner(),
        Ok(Either::Right(form)) => form.into_inner(),
        Err(e) => {
            tracing::debug!("Unreadable contact submission: {}", e);
            return Ok(invalid_contact(serde_json::Value::Null));
        }
    };

    let ctx = request_context(&req, state.config.trust_x_forwarded_for);
    match state.contact_handler.submit(form, &ctx).await {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(AppError::ValidationError(errors)) => Ok(invalid_contact(serde_json::json!(errors))),
        Err(e) => Err(e),
    }
}

fn invalid_contact(errors: serde_json::Value) -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({
        "success": false,
        "message": CONTACT_INVALID_MESSAGE,
        "errors": errors,
    }))
}
