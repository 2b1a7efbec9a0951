use actix_web::{
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{
        HeaderMap, HeaderName, HeaderValue, CONTENT_SECURITY_POLICY, REFERRER_POLICY, SERVER,
        X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS, X_XSS_PROTECTION,
    },
    Error,
};
use futures_util::future::{ok, LocalBoxFuture, Ready};
use std::task::{Context, Poll};

const CSP: &str = "default-src 'self'; \
    script-src 'self' 'unsafe-inline' https://cdnjs.cloudflare.com https://kit.fontawesome.com; \
    style-src 'self' 'unsafe-inline' https://fonts.googleapis.com https://cdnjs.cloudflare.com; \
    font-src 'self' https://fonts.gstatic.com https://cdnjs.cloudflare.com; \
    img-src 'self' data: https:; \
    connect-src 'self'; \
    frame-ancestors 'none'; \
    base-uri 'self'; \
    form-action 'self'";

/// Hardening headers on every response. The CSP is left off in development.
pub struct SecurityHeaders {
    content_security_policy: bool,
}

impl SecurityHeaders {
    pub fn new(development: bool) -> Self {
        SecurityHeaders { content_security_policy: !development }
    }
}

pub fn apply_security_headers(headers: &mut HeaderMap, content_security_policy: bool) {
    if content_security_policy {
        headers.insert(CONTENT_SECURITY_POLICY, HeaderValue::from_static(CSP));
    }
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block"));
    headers.insert(REFERRER_POLICY, HeaderValue::from_static("strict-origin-when-cross-origin"));
    headers.insert(HeaderName::from_static("permissions-policy"), HeaderValue::from_static("geolocation=(), microphone=(), camera=()"));
    headers.remove(SERVER);
}

impl<S, B> Transform<S, ServiceRequest> for SecurityHeaders
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = SecurityHeadersService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(SecurityHeadersService {
            service,
            content_security_policy: self.content_security_policy,
        })
    }
}

pub struct SecurityHeadersService<S> {
    service: S,
    content_security_policy: bool,
}

impl<S, B> Service<ServiceRequest> for SecurityHeadersService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, ctx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let fut = self.service.call(req);
        let content_security_policy = self.content_security_policy;

        Box::pin(async move {
            let mut res = fut.await?;
            apply_security_headers(res.headers_mut(), content_security_policy);
            Ok(res)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App, HttpResponse};

    #[actix_rt::test]
    async fn headers_are_set_and_server_is_removed() {
        let app = test::init_service(
            App::new()
                .wrap(SecurityHeaders::new(false))
                .route("/", web::get().to(|| async { HttpResponse::Ok().insert_header((SERVER, "nginx")).finish() })),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        let headers = res.headers();
        assert_eq!(headers.get(X_FRAME_OPTIONS).unwrap(), "DENY");
        assert_eq!(headers.get(X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");
        assert_eq!(headers.get("permissions-policy").unwrap(), "geolocation=(), microphone=(), camera=()");
        assert!(headers.get(CONTENT_SECURITY_POLICY).unwrap().to_str().unwrap().contains("frame-ancestors 'none'"));
        assert!(headers.get(SERVER).is_none());
    }

    #[actix_rt::test]
    async fn development_skips_the_csp() {
        let app = test::init_service(
            App::new()
                .wrap(SecurityHeaders::new(true))
                .route("/", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert!(res.headers().get(CONTENT_SECURITY_POLICY).is_none());
        assert_eq!(res.headers().get(X_XSS_PROTECTION).unwrap(), "1; mode=block");
    }
}
