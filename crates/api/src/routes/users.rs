//! User management and profile routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, patch, post, put},
};
use chrono::{DateTime, FixedOffset, NaiveDate};
use mbank_core::auth::{
    Role, generate_temporary_password, hash_password, verify_password,
};
use mbank_core::lifecycle::LifecycleStatus;
use mbank_core::user::{
    DEFAULT_PROFILE_IMAGE, Gender, UserPatch, UserRuleError, check_new_password,
};
use mbank_db::UserRepository;
use mbank_db::repositories::{CreateUserInput, UserError, UserWithRoles};
use mbank_shared::types::PageResponse;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    extractors::{ListPage, ValidatedJson, double_option},
    middleware::AuthUser,
};

/// Creates the user routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users/me", get(me))
        .route(
            "/users/me",
            patch(update_me).route_layer(require!(UpdateProfile)),
        )
        .route(
            "/users/me/password",
            put(change_password).route_layer(require!(UpdateProfile)),
        )
        .route(
            "/users/me/profile-image",
            put(update_profile_image).route_layer(require!(UpdateProfile)),
        )
        .route("/users", post(create_user).route_layer(require!(ManageUsers)))
        .route("/users", get(list_users).route_layer(require!(ManageUsers)))
        .route("/users/{id}", get(get_user).route_layer(require!(ManageUsers)))
        .route(
            "/users/{id}",
            patch(update_user).route_layer(require!(ManageUsers)),
        )
        .route(
            "/users/{id}",
            delete(delete_user).route_layer(require!(BlockUsers)),
        )
        .route(
            "/users/{id}/block",
            put(block_user).route_layer(require!(BlockUsers)),
        )
        .route(
            "/users/{id}/unblock",
            put(unblock_user).route_layer(require!(BlockUsers)),
        )
        .route(
            "/users/{id}/roles",
            post(grant_role).route_layer(require!(BlockUsers)),
        )
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// User response. Never carries the password hash.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    /// User ID.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Gender.
    pub gender: Gender,
    /// Phone number.
    pub phone_number: String,
    /// Email address.
    pub email: String,
    /// National identity card number.
    pub national_card_id: String,
    /// Student card number.
    pub student_card_id: Option<String>,
    /// Date of birth.
    pub dob: Option<NaiveDate>,
    /// Profile image URL.
    pub profile_image: Option<String>,
    /// Held roles.
    pub roles: Vec<Role>,
    /// Lifecycle state; `DISABLED` means blocked.
    pub status: LifecycleStatus,
    /// Email verified.
    pub is_verified: bool,
    /// Registration instant.
    pub created_at: DateTime<FixedOffset>,
}

impl From<UserWithRoles> for UserResponse {
    fn from(value: UserWithRoles) -> Self {
        let UserWithRoles { user, roles } = value;
        Self {
            id: user.id,
            name: user.name,
            gender: user.gender.into(),
            phone_number: user.phone_number,
            email: user.email,
            national_card_id: user.national_card_id,
            student_card_id: user.student_card_id,
            dob: user.dob,
            profile_image: user.profile_image,
            roles,
            status: user.status.into(),
            is_verified: user.is_verified,
            created_at: user.created_at,
        }
    }
}

/// Identity fields shared by registration and staff-created users.
#[derive(Debug, Deserialize, Validate)]
pub struct NewUserFields {
    /// Display name.
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Gender.
    pub gender: Gender,
    /// Unique phone number.
    #[validate(length(min = 6, max = 20))]
    pub phone_number: String,
    /// Unique email.
    #[validate(email)]
    pub email: String,
    /// Unique national identity card number.
    #[validate(length(min = 1, max = 32))]
    pub national_card_id: String,
    /// Student card number.
    pub student_card_id: Option<String>,
    /// Date of birth.
    pub dob: Option<NaiveDate>,
}

impl NewUserFields {
    pub(crate) fn into_input(
        self,
        password_hash: String,
        roles: Vec<Role>,
        is_verified: bool,
    ) -> CreateUserInput {
        CreateUserInput {
            name: self.name.trim().to_string(),
            gender: self.gender,
            phone_number: self.phone_number.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            national_card_id: self.national_card_id.trim().to_string(),
            student_card_id: self
                .student_card_id
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            dob: self.dob,
            profile_image: DEFAULT_PROFILE_IMAGE.to_string(),
            password_hash,
            roles,
            is_verified,
        }
    }
}

/// Request body for a profile patch.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    /// Display name.
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    /// Gender.
    pub gender: Option<Gender>,
    /// Date of birth; `null` clears it.
    #[serde(default, deserialize_with = "double_option")]
    pub dob: Option<Option<NaiveDate>>,
    /// Student card; `null` clears it.
    #[serde(default, deserialize_with = "double_option")]
    pub student_card_id: Option<Option<String>>,
}

impl From<UpdateUserRequest> for UserPatch {
    fn from(request: UpdateUserRequest) -> Self {
        Self {
            name: request.name,
            gender: request.gender,
            dob: request.dob,
            student_card_id: request.student_card_id,
        }
    }
}

/// Request body for changing one's password.
#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    /// Current password.
    #[validate(length(min = 1))]
    pub old_password: String,
    /// New password.
    pub new_password: String,
    /// New password again.
    pub confirm_password: String,
}

/// Request body for setting the profile image.
#[derive(Debug, Deserialize, Validate)]
pub struct ProfileImageRequest {
    /// Public URL of the uploaded image.
    #[validate(url)]
    pub url: String,
}

/// Request body for granting a role.
#[derive(Debug, Deserialize, Validate)]
pub struct GrantRoleRequest {
    /// Role name, with or without the `ROLE_` prefix.
    #[validate(length(min = 1))]
    pub role: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /users/me - The caller's profile.
async fn me(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<UserResponse>> {
    let user = require_user(&state, auth.user_id()).await?;
    Ok(Json(user.into()))
}

/// PATCH /users/me - Update the caller's profile.
async fn update_me(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(payload): ValidatedJson<UpdateUserRequest>,
) -> ApiResult<Json<UserResponse>> {
    let user = UserRepository::new((*state.db).clone())
        .update(auth.user_id(), payload.into())
        .await?;
    Ok(Json(user.into()))
}

/// PUT /users/me/password - Change password after verifying the old one.
async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(payload): ValidatedJson<ChangePasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = require_user(&state, auth.user_id()).await?;

    if !verify_password(&payload.old_password, &user.user.password_hash)? {
        return Err(UserError::from(UserRuleError::IncorrectOldPassword).into());
    }
    check_new_password(&payload.new_password, &payload.confirm_password)
        .map_err(UserError::from)?;

    let hash = hash_password(&payload.new_password)?;
    UserRepository::new((*state.db).clone())
        .update_password(user.user.id, hash)
        .await?;

    info!(user_id = %user.user.id, "password changed");
    Ok(Json(serde_json::json!({ "message": "Password changed" })))
}

/// PUT /users/me/profile-image - Point the profile image at a new URL.
async fn update_profile_image(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(payload): ValidatedJson<ProfileImageRequest>,
) -> ApiResult<Json<UserResponse>> {
    let user = UserRepository::new((*state.db).clone())
        .update_profile_image(auth.user_id(), payload.url)
        .await?;
    Ok(Json(user.into()))
}

/// POST /users - Create a verified user with a temporary password sent by email.
async fn create_user(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(payload): ValidatedJson<NewUserFields>,
) -> ApiResult<impl IntoResponse> {
    let temporary = generate_temporary_password();
    let hash = hash_password(&temporary)?;
    let input = payload.into_input(hash, Role::registration_defaults().to_vec(), true);

    let user = UserRepository::new((*state.db).clone())
        .create(input)
        .await?;

    if let Err(e) = state
        .email_service
        .send_password_reset(&user.user.email, &user.user.name, &temporary)
        .await
    {
        warn!(user_id = %user.user.id, error = %e, "failed to send temporary password");
    }

    info!(created_by = %auth.user_id(), user_id = %user.user.id, "user created by staff");
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// GET /users - Paginated user listing.
async fn list_users(
    State(state): State<AppState>,
    ListPage(page): ListPage,
) -> ApiResult<Json<PageResponse<UserResponse>>> {
    let users = UserRepository::new((*state.db).clone()).list(page).await?;
    Ok(Json(users.map(UserResponse::from)))
}

/// GET /users/{id}
async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserResponse>> {
    let user = require_user(&state, id).await?;
    Ok(Json(user.into()))
}

/// PATCH /users/{id}
async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateUserRequest>,
) -> ApiResult<Json<UserResponse>> {
    let user = UserRepository::new((*state.db).clone())
        .update(id, payload.into())
        .await?;
    Ok(Json(user.into()))
}

/// PUT /users/{id}/block
async fn block_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserResponse>> {
    set_blocked(&state, &auth, id, true).await
}

/// PUT /users/{id}/unblock
async fn unblock_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserResponse>> {
    set_blocked(&state, &auth, id, false).await
}

/// DELETE /users/{id} - Soft delete.
async fn delete_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if id == auth.user_id() {
        return Err(ApiError::validation("You cannot delete yourself"));
    }
    UserRepository::new((*state.db).clone()).delete(id).await?;
    info!(deleted_by = %auth.user_id(), user_id = %id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /users/{id}/roles - Grant a role no higher than the caller's own.
async fn grant_role(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<GrantRoleRequest>,
) -> ApiResult<Json<UserResponse>> {
    let role: Role = payload
        .role
        .parse()
        .map_err(|e: mbank_core::auth::UnknownRole| ApiError::validation(e.to_string()))?;

    let highest = auth.caller().roles.iter().copied().max();
    if highest.is_none_or(|h| role > h) {
        return Err(ApiError::forbidden(format!(
            "Cannot grant a role above your own: {role}"
        )));
    }

    let user = UserRepository::new((*state.db).clone())
        .grant_role(id, role)
        .await?;
    Ok(Json(user.into()))
}

async fn set_blocked(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
    blocked: bool,
) -> ApiResult<Json<UserResponse>> {
    if blocked && id == auth.user_id() {
        return Err(ApiError::validation("You cannot block yourself"));
    }
    let user = UserRepository::new((*state.db).clone())
        .set_blocked(id, blocked)
        .await?;
    Ok(Json(user.into()))
}

pub(crate) async fn require_user(state: &AppState, id: Uuid) -> ApiResult<UserWithRoles> {
    Ok(UserRepository::new((*state.db).clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| UserError::NotFound(id.to_string()))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use mbank_shared::TokenType;
    use serde_json::json;

    use crate::routes::test_support::{app, body_json, send, token};

    #[test]
    fn test_new_user_fields_are_normalized() {
        let fields: NewUserFields = serde_json::from_value(json!({
            "name": "  Jane Doe ",
            "gender": "FEMALE",
            "phone_number": " 0912345678 ",
            "email": "Jane@Example.com",
            "national_card_id": "079123456789",
            "student_card_id": "   "
        }))
        .unwrap();
        assert!(fields.validate().is_ok());

        let input = fields.into_input("hash".into(), vec![Role::User], false);
        assert_eq!(input.name, "Jane Doe");
        assert_eq!(input.email, "jane@example.com");
        assert_eq!(input.phone_number, "0912345678");
        assert!(input.student_card_id.is_none());
        assert_eq!(input.profile_image, DEFAULT_PROFILE_IMAGE);
    }

    #[test]
    fn test_invalid_email_fails_validation() {
        let fields: NewUserFields = serde_json::from_value(json!({
            "name": "Jane",
            "gender": "OTHER",
            "phone_number": "0912345678",
            "email": "not-an-email",
            "national_card_id": "079123456789"
        }))
        .unwrap();
        assert!(fields.validate().is_err());
    }

    #[tokio::test]
    async fn test_manager_cannot_grant_admin() {
        let (app, state) = app();
        let access = token(&state, &["STAFF", "MANAGER"], TokenType::Access);
        let response = send(
            app,
            "POST",
            &format!("/api/v1/users/{}/roles", Uuid::new_v4()),
            Some(&access),
            Some(json!({ "role": "ROLE_ADMIN" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["error"], "forbidden");
    }

    #[tokio::test]
    async fn test_unknown_role_is_rejected() {
        let (app, state) = app();
        let access = token(&state, &["MANAGER"], TokenType::Access);
        let response = send(
            app,
            "POST",
            &format!("/api/v1/users/{}/roles", Uuid::new_v4()),
            Some(&access),
            Some(json!({ "role": "AUDITOR" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
