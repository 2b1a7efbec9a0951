use actix_web::{
    error::{InternalError, JsonPayloadError},
    http::StatusCode,
    web,
};

use crate::handlers::json_error::json_error;

const JSON_LIMIT: usize = 256 * 1024;

/// Extractor failures answer with the same `{"error", "details"}` body as handlers.
pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().limit(JSON_LIMIT).error_handler(|err, _req| {
        let status = match &err {
            JsonPayloadError::OverflowKnownLength { .. } | JsonPayloadError::Overflow { .. } => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            JsonPayloadError::ContentType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            _ => StatusCode::BAD_REQUEST,
        };
        let response = json_error(status, "Invalid JSON payload", &err.to_string());
        InternalError::from_response(err, response).into()
    }))
    .app_data(web::FormConfig::default().error_handler(|err, _req| {
        let response = json_error(StatusCode::BAD_REQUEST, "Invalid form data", &err.to_string());
        InternalError::from_response(err, response).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| {
        let response = json_error(StatusCode::BAD_REQUEST, "Invalid query string", &err.to_string());
        InternalError::from_response(err, response).into()
    }))
    .app_data(web::PathConfig::default().error_handler(|err, _req| {
        let response = json_error(StatusCode::NOT_FOUND, "Not found", &err.to_string());
        InternalError::from_response(err, response).into()
    }));
}
