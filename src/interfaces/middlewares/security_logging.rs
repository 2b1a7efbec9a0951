use actix_web::{
    body::BoxBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures_util::future::{ok, LocalBoxFuture, Ready};
use std::{rc::Rc, task::{Context, Poll}};

use super::{full_path, request_security};
use crate::{
    entities::security_event::{NewSecurityEvent, SecurityEventType, Severity},
    limiter::rate_limiter::is_under_prefix,
    security::patterns::suspicious_pattern,
};

/// Audits suspicious-looking URLs and admin traffic without blocking anything.
pub struct SecurityLogging;

impl<S> Transform<S, ServiceRequest> for SecurityLogging
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error> + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type InitError = ();
    type Transform = SecurityLoggingService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(SecurityLoggingService { service: Rc::new(service) })
    }
}

pub struct SecurityLoggingService<S> {
    service: Rc<S>,
}

impl<S> Service<ServiceRequest> for SecurityLoggingService<S>
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
                return service.call(req).await;
            };
            let ctx = security.context(&req);
            let full_path = full_path(&req);

            if let Some(pattern) = suspicious_pattern(&full_path) {
                tracing::warn!("Suspicious request detected from IP {}: {}", ctx.ip, full_path);
                security
                    .auditor
                    .record(NewSecurityEvent::for_request(
                        SecurityEventType::SuspiciousRequest,
                        Severity::Medium,
                        &ctx,
                        format!("Suspicious pattern detected: {pattern}"),
                    ))
                    .await;
            }

            if is_under_prefix(&ctx.path, &security.admin_prefix) {
                tracing::info!("Admin access attempt from IP {}: {}", ctx.ip, ctx.path);
                security
                    .auditor
                    .record(NewSecurityEvent::for_request(
                        SecurityEventType::AdminAccess,
                        Severity::Low,
                        &ctx,
                        format!("Admin panel access: {}", ctx.path),
                    ))
                    .await;
            }

            service.call(req).await
        })
    }
}
