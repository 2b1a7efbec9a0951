use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::auth::password::{hash_password, verify_password};
use crate::entities::security_event::{NewSecurityEvent, RequestContext, SecurityEventType, Severity};
use crate::entities::token::AuthResponse;
use crate::entities::user::{LoginUser, NewAdminUser, User};
use crate::errors::{AppError, AuthError};
use crate::limiter::LoginGuard;
use crate::repositories::{token::TokenService, user::UserRepository};
use crate::use_cases::security::SecurityAuditor;
use crate::domain::password::validate_staff_password;

/// Staff login, token refresh and account maintenance.
pub struct AuthHandler<R, T>
where
    R: UserRepository + ?Sized,
    T: TokenService + ?Sized,
{
    pub user_repo: Arc<R>,
    pub token_service: Arc<T>,
    login_guard: LoginGuard,
    auditor: SecurityAuditor,
}

impl<R, T> AuthHandler<R, T>
where
    R: UserRepository + ?Sized,
    T: TokenService + ?Sized,
{
    pub fn new(user_repo: Arc<R>, token_service: Arc<T>, login_guard: LoginGuard, auditor: SecurityAuditor) -> Self {
        AuthHandler {
            user_repo,
            token_service,
            login_guard,
            auditor,
        }
    }

    /// Checks credentials and issues tokens. Every outcome lands in the audit log.
    pub async fn login(&self, request: LoginUser, ctx: &RequestContext) -> Result<AuthResponse, AuthError> {
        let username = request.identifier();
        if request.validate().is_err() {
            self.record_failure(&username, ctx).await;
            return Err(AuthError::MissingCredentials);
        }

        let user = match self.authenticate(&username, &request.password).await {
            Ok(user) => user,
            Err(e) => {
                self.record_failure(&username, ctx).await;
                return Err(e);
            }
        };

        let response = self.create_auth_response(&user)?;

        self.auditor
            .record(
                NewSecurityEvent::for_request(
                    SecurityEventType::LoginSuccess,
                    Severity::Low,
                    ctx,
                    format!("Successful login for user: {}", user.username),
                )
                .with_username(user.username.clone()),
            )
            .await;

        Ok(response)
    }

    async fn authenticate(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let user = self
            .user_repo
            .find_by_login(username)
            .await
            .map_err(|e| {
                tracing::error!("User lookup failed during login: {}", e);
                AuthError::AuthenticationFailed
            })?
            .ok_or(AuthError::WrongCredentials)?;

        let is_password_valid = verify_password(password, &user.password_hash).map_err(|e| {
            tracing::warn!("Stored password hash for {} is unusable: {}", user.username, e);
            AuthError::WrongCredentials
        })?;

        // Non-staff accounts get the same answer as a bad password.
        if !is_password_valid || !user.is_admin {
            return Err(AuthError::WrongCredentials);
        }
        Ok(user)
    }

    async fn record_failure(&self, username: &str, ctx: &RequestContext) {
        self.auditor
            .record(
                NewSecurityEvent::for_request(
                    SecurityEventType::LoginFailed,
                    Severity::Medium,
                    ctx,
                    format!("Failed login attempt for username: {username}"),
                )
                .with_username(username),
            )
            .await;

        let attempts = self.login_guard.record_failure(&ctx.ip, username).await;
        if attempts.should_alert() {
            self.auditor
                .record(
                    NewSecurityEvent::for_request(
                        SecurityEventType::LoginFailed,
                        Severity::High,
                        ctx,
                        format!(
                            "Multiple failed login attempts: {} from IP, {} for username {}",
                            attempts.ip_failures, attempts.user_failures, username
                        ),
                    )
                    .with_username(username),
                )
                .await;
        }
    }

    pub fn create_auth_response(&self, user: &User) -> Result<AuthResponse, AuthError> {
        let access_token = self.token_service.create_jwt(user).map_err(|e| {
            tracing::warn!("Failed to create JWT: {}", e);
            AuthError::TokenCreation
        })?;

        let refresh_token = self.token_service.create_refresh_jwt(&user.id).map_err(|e| {
            tracing::warn!("Failed to create refresh JWT: {}", e);
            AuthError::TokenCreation
        })?;
        Ok(AuthResponse::new(access_token, refresh_token))
    }

    /// Issues a fresh token pair for a still-existing staff account.
    pub async fn refresh_token(&self, token: &str) -> Result<AuthResponse, AuthError> {
        let decoded = self.token_service.decode_refresh_jwt(token)?;
        let user_id = Uuid::parse_str(&decoded.claims.sub).map_err(|_| AuthError::InvalidUserId)?;

        let user = self
            .user_repo
            .get_user_by_id(&user_id)
            .await
            .map_err(|_| AuthError::WrongCredentials)?
            .filter(|u| u.is_admin)
            .ok_or(AuthError::WrongCredentials)?;

        self.create_auth_response(&user)
    }

    pub async fn create_admin(&self, request: NewAdminUser) -> Result<Uuid, AppError> {
        request.validate()?;

        let hashed_password = hash_password(&request.password)?;
        let insert = request.prepare_for_insert(hashed_password);
        let id = self.user_repo.create_user(&insert).await?;

        tracing::info!("Created staff account {}", insert.username);
        Ok(id)
    }

    pub async fn change_password(&self, username: &str, new_password: &str) -> Result<(), AppError> {
        validate_staff_password(new_password, &[username]).map_err(|e| {
            let message = e.message.map(|m| m.to_string()).unwrap_or_else(|| "Password is too weak".into());
            AppError::field("password", &message)
        })?;

        let user = self
            .user_repo
            .find_by_login(username)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {username} not found")))?;

        let hashed_password = hash_password(new_password)?;
        self.user_repo.update_password(&user.id, &hashed_password).await?;

        tracing::info!("Password changed for {}", user.username);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCounterStore;
    use crate::entities::token::RefreshClaims;
    use crate::repositories::{
        security_event::MockSecurityEventRepository, token::MockTokenService, user::MockUserRepository,
    };
    use chrono::Utc;
    use jsonwebtoken::{Header, TokenData};
    use std::sync::Mutex;

    const PASSWORD: &str = "C0rrect-Horse!Battery";

    fn staff(is_admin: bool) -> User {
        User {
            id: Uuid::new_v4(),
            email: "owner@example.com".into(),
            username: "owner".into(),
            password_hash: hash_password(PASSWORD).unwrap(),
            is_admin,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn ctx() -> RequestContext {
        RequestContext {
            ip: "198.51.100.7".into(),
            method: "POST".into(),
            path: "/admin/auth/login".into(),
            user_agent: "Mozilla/5.0".into(),
        }
    }

    fn tokens() -> MockTokenService {
        let mut tokens = MockTokenService::new();
        tokens.expect_create_jwt().returning(|_| Ok("access".into()));
        tokens.expect_create_refresh_jwt().returning(|_| Ok("refresh".into()));
        tokens
    }

    fn recording_auditor() -> (SecurityAuditor, Arc<Mutex<Vec<NewSecurityEvent>>>) {
        let recorded = Arc::new(Mutex::new(Vec::new()));
        let sink = recorded.clone();
        let mut repo = MockSecurityEventRepository::new();
        repo.expect_record_event().returning(move |e| {
            sink.lock().unwrap().push(e.clone());
            Ok(())
        });
        (SecurityAuditor::new(Arc::new(repo)), recorded)
    }

    fn handler(users: MockUserRepository, auditor: SecurityAuditor) -> AuthHandler<MockUserRepository, MockTokenService> {
        let guard = LoginGuard::new(Arc::new(InMemoryCounterStore::new()), 900);
        AuthHandler::new(Arc::new(users), Arc::new(tokens()), guard, auditor)
    }

    fn login(password: &str) -> LoginUser {
        LoginUser { username: "owner".into(), password: password.into() }
    }

    #[tokio::test]
    async fn successful_login_issues_tokens_and_logs_success() {
        let user = staff(true);
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_login()
            .withf(|identifier| identifier == "owner")
            .returning(move |_| Ok(Some(user.clone())));
        let (auditor, recorded) = recording_auditor();

        let response = handler(users, auditor).login(login(PASSWORD), &ctx()).await.unwrap();

        assert_eq!(response.access_token, "access");
        assert_eq!(response.token_type, "Bearer");
        let events = recorded.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, SecurityEventType::LoginSuccess);
        assert_eq!(events[0].description, "Successful login for user: owner");
        assert_eq!(events[0].ip_address, "198.51.100.7");
    }

    #[tokio::test]
    async fn repeated_failures_for_one_username_raise_an_alert() {
        let user = staff(true);
        let mut users = MockUserRepository::new();
        users.expect_find_by_login().returning(move |_| Ok(Some(user.clone())));
        let (auditor, recorded) = recording_auditor();
        let handler = handler(users, auditor);

        for _ in 0..3 {
            let err = handler.login(login("wrong"), &ctx()).await.unwrap_err();
            assert!(matches!(err, AuthError::WrongCredentials));
        }

        let events = recorded.lock().unwrap();
        let failures = events.iter().filter(|e| e.severity == Severity::Medium).count();
        let alerts: Vec<_> = events.iter().filter(|e| e.severity == Severity::High).collect();
        assert_eq!(failures, 3);
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].description.starts_with("Multiple failed login attempts"));
        assert_eq!(alerts[0].username.as_deref(), Some("owner"));
    }

    #[tokio::test]
    async fn non_staff_accounts_cannot_log_in() {
        let user = staff(false);
        let mut users = MockUserRepository::new();
        users.expect_find_by_login().returning(move |_| Ok(Some(user.clone())));
        let (auditor, recorded) = recording_auditor();

        let err = handler(users, auditor).login(login(PASSWORD), &ctx()).await.unwrap_err();

        assert!(matches!(err, AuthError::WrongCredentials));
        assert_eq!(recorded.lock().unwrap()[0].event_type, SecurityEventType::LoginFailed);
    }

    #[tokio::test]
    async fn refresh_rejects_deleted_users() {
        let mut users = MockUserRepository::new();
        users.expect_get_user_by_id().returning(|_| Ok(None));
        let mut tokens = MockTokenService::new();
        let sub = Uuid::new_v4().to_string();
        tokens.expect_decode_refresh_jwt().returning(move |_| {
            Ok(TokenData { header: Header::default(), claims: RefreshClaims { sub: sub.clone(), iat: 0, exp: 0 } })
        });
        let (auditor, _) = recording_auditor();
        let guard = LoginGuard::new(Arc::new(InMemoryCounterStore::new()), 900);
        let handler = AuthHandler::new(Arc::new(users), Arc::new(tokens), guard, auditor);

        assert!(matches!(handler.refresh_token("t").await, Err(AuthError::WrongCredentials)));
    }

    #[tokio::test]
    async fn change_password_rejects_weak_passwords_before_lookup() {
        let users = MockUserRepository::new();
        let (auditor, _) = recording_auditor();

        let err = handler(users, auditor).change_password("owner", "short").await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }
}
