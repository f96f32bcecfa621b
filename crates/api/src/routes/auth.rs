//! Authentication routes: login, registration, token refresh, email
//! verification and password reset.

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::post};
use mbank_core::auth::{Role, generate_temporary_password, hash_password, verify_password};
use mbank_core::lifecycle::LifecycleStatus;
use mbank_core::user::check_new_password;
use mbank_db::repositories::{UserError, UserWithRoles};
use mbank_db::{EmailVerificationRepository, UserRepository};
use mbank_shared::{AppError, EmailError, TokenPair, TokenType};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};
use validator::Validate;

use super::users::{NewUserFields, UserResponse};
use crate::{
    AppState,
    error::{ApiError, ApiResult},
    extractors::ValidatedJson,
};

/// Creates the auth router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/refresh", post(refresh))
        .route("/auth/verify", post(verify))
        .route("/auth/resend-verification", post(resend_verification))
        .route("/auth/reset-password", post(reset_password))
}

/// Login request.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address.
    #[validate(email)]
    pub email: String,
    /// Password.
    #[validate(length(min = 1))]
    pub password: String,
}

/// Registration request.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Identity fields.
    #[serde(flatten)]
    #[validate(nested)]
    pub user: NewUserFields,
    /// Password.
    pub password: String,
    /// Password again.
    pub confirm_password: String,
}

/// Refresh request.
#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    /// A refresh token from login.
    #[validate(length(min = 1))]
    pub refresh_token: String,
}

/// Email verification request.
#[derive(Debug, Deserialize, Validate)]
pub struct VerifyRequest {
    /// Email address.
    #[validate(email)]
    pub email: String,
    /// Six digit code.
    #[validate(length(equal = 6))]
    pub code: String,
}

/// Request naming an account by email.
#[derive(Debug, Deserialize, Validate)]
pub struct EmailRequest {
    /// Email address.
    #[validate(email)]
    pub email: String,
}

fn invalid_credentials() -> ApiError {
    ApiError::unauthorized("Invalid email or password")
}

fn role_names(user: &UserWithRoles) -> Vec<String> {
    user.roles.iter().map(Role::to_string).collect()
}

async fn find_by_email(state: &AppState, email: &str) -> ApiResult<Option<UserWithRoles>> {
    Ok(UserRepository::new((*state.db).clone())
        .find_by_email(&email.trim().to_lowercase())
        .await?)
}

/// POST /auth/login - Exchange credentials for a token pair.
///
/// Only active users with a verified email may sign in.
async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> ApiResult<Json<TokenPair>> {
    let Some(user) = find_by_email(&state, &payload.email).await? else {
        info!("login attempt for unknown email");
        return Err(invalid_credentials());
    };

    if !verify_password(&payload.password, &user.user.password_hash)? {
        info!(user_id = %user.user.id, "failed login attempt - invalid password");
        return Err(invalid_credentials());
    }

    if LifecycleStatus::from(user.user.status) != LifecycleStatus::Active {
        return Err(ApiError::forbidden("This account has been blocked"));
    }
    if !user.user.is_verified {
        return Err(ApiError::forbidden("Email address has not been verified"));
    }

    let tokens = state
        .jwt_service
        .generate_pair(user.user.id, &role_names(&user))?;

    info!(user_id = %user.user.id, "user logged in");
    Ok(Json(tokens))
}

/// POST /auth/register - Self-service registration.
///
/// New users hold `USER` and `CUSTOMER` and must verify their email with
/// the code sent to them before they can sign in.
async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    check_new_password(&payload.password, &payload.confirm_password).map_err(UserError::from)?;
    let hash = hash_password(&payload.password)?;

    let input = payload
        .user
        .into_input(hash, Role::registration_defaults().to_vec(), false);
    let user = UserRepository::new((*state.db).clone())
        .create(input)
        .await?;

    send_verification_code(&state, &user).await;

    info!(user_id = %user.user.id, "user registered");
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// POST /auth/refresh - Trade a refresh token for a new pair.
///
/// Roles are reloaded so that grants and blocks take effect.
async fn refresh(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RefreshRequest>,
) -> ApiResult<Json<TokenPair>> {
    let claims = state
        .jwt_service
        .validate_typed(&payload.refresh_token, TokenType::Refresh)?;

    let user = UserRepository::new((*state.db).clone())
        .find_by_id(claims.user_id())
        .await?
        .filter(|u| LifecycleStatus::from(u.user.status) == LifecycleStatus::Active)
        .ok_or_else(|| ApiError::unauthorized("User is no longer active"))?;

    let tokens = state
        .jwt_service
        .generate_pair(user.user.id, &role_names(&user))?;
    Ok(Json(tokens))
}

/// POST /auth/verify - Confirm an email address with the emailed code.
async fn verify(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<VerifyRequest>,
) -> ApiResult<impl IntoResponse> {
    let invalid = || ApiError::validation("Invalid or expired verification code");

    let user = find_by_email(&state, &payload.email)
        .await?
        .ok_or_else(invalid)?;
    if user.user.is_verified {
        return Ok(Json(json!({ "message": "Email already verified" })));
    }

    let verified = EmailVerificationRepository::new((*state.db).clone())
        .verify_code(user.user.id, &payload.code)
        .await?;
    if !verified {
        return Err(invalid());
    }

    info!(user_id = %user.user.id, "email verified");
    Ok(Json(json!({ "message": "Email verified" })))
}

/// POST /auth/resend-verification - Issue a fresh code, voiding older ones.
async fn resend_verification(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<EmailRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = find_by_email(&state, &payload.email)
        .await?
        .ok_or_else(|| UserError::NotFound(payload.email.clone()))?;
    if user.user.is_verified {
        return Err(AppError::Conflict("Email already verified".to_string()).into());
    }

    send_verification_code(&state, &user).await;
    Ok(Json(json!({ "message": "Verification code sent" })))
}

/// POST /auth/reset-password - Email a temporary password, then make it the
/// account's password.
async fn reset_password(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<EmailRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = find_by_email(&state, &payload.email)
        .await?
        .ok_or_else(|| UserError::NotFound(payload.email.clone()))?;
    let user_id = user.user.id;

    let temporary = generate_temporary_password();
    let hash = hash_password(&temporary)?;
    let repo = UserRepository::new((*state.db).clone());

    send_then_store(
        state
            .email_service
            .send_password_reset(&user.user.email, &user.user.name, &temporary),
        || repo.update_password(user_id, hash),
    )
    .await
    .inspect_err(|e| error!(user_id = %user_id, error = %e.0, "password reset failed"))?;

    info!(user_id = %user_id, "password reset");
    Ok(Json(json!({ "message": "A temporary password has been sent to your email" })))
}

/// Stores the new password only once the email carrying it went out. A failed
/// send leaves the current password usable.
async fn send_then_store<S, P, F>(send: S, store: P) -> ApiResult<()>
where
    S: Future<Output = Result<(), EmailError>>,
    P: FnOnce() -> F,
    F: Future<Output = Result<(), UserError>>,
{
    send.await?;
    store().await?;
    Ok(())
}

/// Issues a code and emails it. Failures are logged; the user can ask for
/// another code.
async fn send_verification_code(state: &AppState, user: &UserWithRoles) {
    let code = match EmailVerificationRepository::new((*state.db).clone())
        .issue_code(user.user.id)
        .await
    {
        Ok(code) => code,
        Err(e) => {
            error!(user_id = %user.user.id, error = %e, "failed to issue verification code");
            return;
        }
    };

    if let Err(e) = state
        .email_service
        .send_verification_code(&user.user.email, &user.user.name, &code)
        .await
    {
        warn!(user_id = %user.user.id, error = %e, "failed to send verification code");
    }
}
