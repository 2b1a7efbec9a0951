use actix_web::{
    body::BoxBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::Method,
    Error, HttpResponse,
};
use futures_util::future::{ok, LocalBoxFuture, Ready};
use std::{rc::Rc, task::{Context, Poll}};

use super::{full_path, request_security};
use crate::{entities::security_event::NewSecurityEvent, security::{inspect_request, RequestVerdict}};

/// Rejects scanner user agents, script-extension probes and SQL injection in the URL with 403.
/// Development mode lets every `GET` through.
pub struct BlockSuspicious;

impl<S> Transform<S, ServiceRequest> for BlockSuspicious
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error> + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type InitError = ();
    type Transform = BlockSuspiciousService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(BlockSuspiciousService { service: Rc::new(service) })
    }
}

pub struct BlockSuspiciousService<S> {
    service: Rc<S>,
}

impl<S> Service<ServiceRequest> for BlockSuspiciousService<S>
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
            if security.development && req.method() == Method::GET {
                return service.call(req).await;
            }

            let ctx = security.context(&req);
            let verdict = inspect_request(&ctx.user_agent, &ctx.path, &full_path(&req));

            if let RequestVerdict::Block { event_type, severity, reason, message } = verdict {
                tracing::warn!("{} from IP {}: {}", reason, ctx.ip, ctx.path);
                security
                    .auditor
                    .record(NewSecurityEvent::for_request(event_type, severity, &ctx, reason))
                    .await;

                return Ok(req.into_response(HttpResponse::Forbidden().json(serde_json::json!({
                    "error": message
                }))));
            }

            service.call(req).await
        })
    }
}
