use actix_web::{
    body::BoxBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::Method,
    Error, HttpMessage, ResponseError,
};
use futures_util::future::{ok, LocalBoxFuture, Ready};
use std::{rc::Rc, task::{Context, Poll}};

use super::request_security;
use crate::{
    entities::token::Claims, errors::AuthError, limiter::rate_limiter::is_under_prefix,
    utils::get_client_ip::decoded_path, RequestSecurity,
};

pub const SECURITY_DASHBOARD_PATH: &str = "/security-dashboard";

/// Admin routes reachable without a token, relative to the admin mount.
const OPEN_ADMIN_ROUTES: [&str; 2] = ["/auth/login", "/auth/refresh"];

/// Requires a staff access token on the admin mount and the security dashboard.
pub struct AuthMiddleware;

impl<S> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error> + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddlewareService { service: Rc::new(service) })
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
}

impl<S> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error> + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, ctx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            let Some(security) = request_security(&req) else {
                return Ok(req.into_response(AuthError::MissingJwtService.error_response()));
            };

            let path = decoded_path(req.path());
            if !requires_staff(req.method(), &path, &security.admin_prefix) {
                return service.call(req).await;
            }

            match staff_claims(&req, &security) {
                Ok(claims) => {
                    req.extensions_mut().insert(claims);
                    service.call(req).await
                }
                Err(e) => {
                    tracing::warn!("Rejected staff request to {}: {}", path, e);
                    Ok(req.into_response(e.error_response()))
                }
            }
        })
    }
}

pub fn requires_staff(method: &Method, path: &str, admin_prefix: &str) -> bool {
    if method == Method::OPTIONS {
        return false;
    }
    if is_under_prefix(path, SECURITY_DASHBOARD_PATH) {
        return true;
    }
    match path.strip_prefix(admin_prefix) {
        Some(rest) if is_under_prefix(path, admin_prefix) => !OPEN_ADMIN_ROUTES.contains(&rest),
        _ => false,
    }
}

fn extract_token(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|header| header.to_str().ok())
        .and_then(|header| {
            let parts: Vec<&str> = header.split_whitespace().collect();
            if parts.len() == 2 && parts[0].eq_ignore_ascii_case("bearer") {
                Some(parts[1].to_string())
            } else {
                None
            }
        })
}

fn staff_claims(req: &ServiceRequest, security: &RequestSecurity) -> Result<Claims, AuthError> {
    let token = extract_token(req).ok_or(AuthError::MissingCredentials)?;
    let claims = security.token_service.decode_jwt(&token)?.claims;
    if !claims.admin {
        return Err(AuthError::Forbidden("Staff access required".into()));
    }
    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staff_routes() {
        assert!(requires_staff(&Method::GET, "/admin/blog/posts", "/admin"));
        assert!(requires_staff(&Method::GET, "/admin", "/admin"));
        assert!(requires_staff(&Method::GET, "/security-dashboard/report.csv", "/admin"));
        assert!(!requires_staff(&Method::POST, "/admin/auth/login", "/admin"));
        assert!(!requires_staff(&Method::POST, "/admin/auth/refresh", "/admin"));
        assert!(!requires_staff(&Method::OPTIONS, "/admin/blog/posts", "/admin"));
        assert!(!requires_staff(&Method::GET, "/administrator", "/admin"));
        assert!(!requires_staff(&Method::GET, "/blog", "/admin"));
    }
}
