use actix_web::{
    body::BoxBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    Error, ResponseError,
};
use futures_util::future::{ok, LocalBoxFuture, Ready};
use std::{rc::Rc, task::{Context, Poll}};

use super::request_security;
use crate::{
    entities::security_event::{NewSecurityEvent, SecurityEventType, Severity},
    errors::AppError,
    limiter::RateDecision,
};

/// Per-IP fixed-window limits by endpoint class; over the limit answers 429 and is audited.
pub struct RateLimit;

impl<S> Transform<S, ServiceRequest> for RateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error> + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimitService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(RateLimitService { service: Rc::new(service) })
    }
}

pub struct RateLimitService<S> {
    service: Rc<S>,
}

impl<S> Service<ServiceRequest> for RateLimitService<S>
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

            let decision = security.rate_limiter.check(&ctx.method, &ctx.path, &ctx.ip).await;
            if let RateDecision::Limited { class, count, max, retry_after } = decision {
                tracing::warn!("Rate limit exceeded for IP {} on {} ({} class)", ctx.ip, ctx.path, class);
                security
                    .auditor
                    .record(NewSecurityEvent::for_request(
                        SecurityEventType::RateLimit,
                        Severity::Medium,
                        &ctx,
                        format!("Rate limit exceeded on {} ({}/{} requests)", ctx.path, count, max),
                    ))
                    .await;

                return Ok(req.into_response(AppError::TooManyRequests { retry_after }.error_response()));
            }

            service.call(req).await
        })
    }
}
