//! Account type reference routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, patch, post},
};
use mbank_core::lifecycle::LifecycleStatus;
use mbank_db::AccountTypeRepository;
use mbank_db::entities::account_types;
use mbank_db::repositories::reference::ACCOUNT_TYPE;
use mbank_db::repositories::{CreateAccountTypeInput, ReferenceError, UpdateAccountTypeInput};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    error::ApiResult,
    extractors::{ValidatedJson, double_option},
};

/// Creates the account type routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/account-types",
            get(list_account_types).route_layer(require!(ReadReference)),
        )
        .route(
            "/account-types",
            post(create_account_type).route_layer(require!(ManageReference)),
        )
        .route(
            "/account-types/{alias}",
            get(get_account_type).route_layer(require!(ReadReference)),
        )
        .route(
            "/account-types/{alias}",
            patch(update_account_type).route_layer(require!(ManageReference)),
        )
        .route(
            "/account-types/{alias}",
            delete(delete_account_type).route_layer(require!(DeleteReference)),
        )
}

/// Request body for creating an account type.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAccountTypeRequest {
    /// Display name.
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Unique alias, e.g. `saving-account`.
    #[validate(length(min = 1, max = 100))]
    pub alias: String,
    /// Description.
    pub description: Option<String>,
}

/// Request body for patching an account type.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateAccountTypeRequest {
    /// Display name.
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    /// Description; `null` clears it.
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}

/// Account type response.
#[derive(Debug, Serialize)]
pub struct AccountTypeResponse {
    /// Row ID.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Unique alias.
    pub alias: String,
    /// Description.
    pub description: Option<String>,
    /// Lifecycle state.
    pub status: LifecycleStatus,
}

impl From<account_types::Model> for AccountTypeResponse {
    fn from(model: account_types::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            alias: model.alias,
            description: model.description,
            status: model.status.into(),
        }
    }
}

/// GET /account-types
async fn list_account_types(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<AccountTypeResponse>>> {
    let types = AccountTypeRepository::new((*state.db).clone()).list().await?;
    Ok(Json(types.into_iter().map(Into::into).collect()))
}

/// GET /account-types/{alias}
async fn get_account_type(
    State(state): State<AppState>,
    Path(alias): Path<String>,
) -> ApiResult<Json<AccountTypeResponse>> {
    let found = AccountTypeRepository::new((*state.db).clone())
        .find_by_alias(&alias)
        .await?
        .ok_or(ReferenceError::NotFound {
            kind: ACCOUNT_TYPE,
            alias,
        })?;
    Ok(Json(found.into()))
}

/// POST /account-types - 409 when the alias is taken.
async fn create_account_type(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateAccountTypeRequest>,
) -> ApiResult<impl IntoResponse> {
    let created = AccountTypeRepository::new((*state.db).clone())
        .create(CreateAccountTypeInput {
            name: payload.name,
            alias: payload.alias,
            description: payload.description,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(AccountTypeResponse::from(created))))
}

/// PATCH /account-types/{alias}
async fn update_account_type(
    State(state): State<AppState>,
    Path(alias): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateAccountTypeRequest>,
) -> ApiResult<Json<AccountTypeResponse>> {
    let updated = AccountTypeRepository::new((*state.db).clone())
        .update(
            &alias,
            UpdateAccountTypeInput {
                name: payload.name,
                description: payload.description,
            },
        )
        .await?;
    Ok(Json(updated.into()))
}

/// DELETE /account-types/{alias} - Soft delete.
async fn delete_account_type(
    State(state): State<AppState>,
    Path(alias): Path<String>,
) -> ApiResult<StatusCode> {
    AccountTypeRepository::new((*state.db).clone())
        .delete(&alias)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
