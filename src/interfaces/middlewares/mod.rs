pub mod auth;
pub mod block_suspicious;
pub mod rate_limit;
pub mod security_headers;
pub mod security_logging;

use actix_web::{dev::ServiceRequest, web};

use crate::RequestSecurity;

/// Middleware state, or `None` when the app was built without it.
pub(crate) fn request_security(req: &ServiceRequest) -> Option<web::Data<RequestSecurity>> {
    let security = req.app_data::<web::Data<RequestSecurity>>().cloned();
    if security.is_none() {
        tracing::error!("RequestSecurity missing from app data");
    }
    security
}

/// Path plus query string, as the client sent it.
pub(crate) fn full_path(req: &ServiceRequest) -> String {
    req.uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.path().to_string())
}
