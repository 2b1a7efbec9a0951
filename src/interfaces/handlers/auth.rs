use actix_web::{web, HttpRequest, HttpResponse, Responder};
use tracing::instrument;

use crate::{
    entities::{token::RefreshTokenRequest, user::LoginUser},
    errors::AuthError,
    use_cases::extractors::AdminClaims,
    utils::get_client_ip::request_context,
    AppState,
};

#[instrument(skip(req, state, user))]
pub async fn login(
    req: HttpRequest,
    state: web::Data<AppState>,
    user: web::Json<LoginUser>,
) -> Result<impl Responder, AuthError> {
    let ctx = request_context(&req, state.config.trust_x_forwarded_for);
    let response = state.auth_handler.login(user.into_inner(), &ctx).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[instrument(skip(state, request))]
pub async fn refresh_token(
    state: web::Data<AppState>,
    request: web::Json<RefreshTokenRequest>,
) -> Result<impl Responder, AuthError> {
    let response = state.auth_handler.refresh_token(&request.refresh_token).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[instrument(skip(claims))]
pub async fn me(claims: AdminClaims) -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "id": claims.0.sub,
        "username": claims.0.username,
        "email": claims.0.email,
        "admin": claims.0.admin,
    }))
}
