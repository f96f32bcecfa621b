//! Bank account routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, patch, post, put},
};
use chrono::{DateTime, FixedOffset};
use mbank_core::account::{AccountPatch, NewAccount};
use mbank_core::auth::{Capability, Caller};
use mbank_core::lifecycle::{LifecycleAction, LifecycleStatus};
use mbank_db::repositories::{AccountDetails, AccountError, OpenAccountInput, UserError};
use mbank_db::{AccountRepository, AccountTypeRepository, UserRepository};
use mbank_shared::types::{AccountTypeId, PageResponse};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    extractors::{ListPage, ValidatedJson, double_option},
    middleware::AuthUser,
};

/// Creates the account routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/accounts",
            post(open_account).route_layer(require!(OperateAccounts)),
        )
        .route(
            "/accounts",
            get(list_accounts).route_layer(require!(ManageAccounts)),
        )
        .route(
            "/accounts/me",
            get(my_accounts).route_layer(require!(OperateAccounts)),
        )
        .route(
            "/accounts/{act_no}",
            get(get_account).route_layer(require!(OperateAccounts)),
        )
        .route(
            "/accounts/{act_no}",
            patch(update_account).route_layer(require!(OperateAccounts)),
        )
        .route(
            "/accounts/{act_no}",
            delete(delete_account).route_layer(require!(ManageAccounts)),
        )
        .route(
            "/accounts/{act_no}/alias",
            put(rename_account).route_layer(require!(OperateAccounts)),
        )
        .route(
            "/accounts/{act_no}/limit",
            put(set_transfer_limit).route_layer(require!(ManageAccounts)),
        )
        .route(
            "/accounts/{act_no}/enable",
            put(enable_account).route_layer(require!(ManageAccounts)),
        )
        .route(
            "/accounts/{act_no}/disable",
            put(disable_account).route_layer(require!(ManageAccounts)),
        )
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for opening an account.
#[derive(Debug, Deserialize, Validate)]
pub struct OpenAccountRequest {
    /// Account number, digits only.
    #[validate(length(min = 1, max = 32))]
    pub act_no: String,
    /// Optional display name.
    pub alias_name: Option<String>,
    /// Opening balance, zero when absent.
    pub balance: Option<Decimal>,
    /// Alias of the account type.
    #[validate(length(min = 1, message = "account_type is required"))]
    pub account_type: String,
    /// Phone number of the holder. Only staff may open for someone else.
    pub phone_number: Option<String>,
}

/// Request body for patching an account.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateAccountRequest {
    /// New display name; `null` clears it.
    #[serde(default, deserialize_with = "double_option")]
    pub alias_name: Option<Option<String>>,
    /// New account type alias.
    pub account_type: Option<String>,
    /// New transfer limit. Requires account management rights.
    pub transfer_limit: Option<Decimal>,
    /// Hide from the holder's own listing.
    pub is_hidden: Option<bool>,
}

/// Request body for renaming an account.
#[derive(Debug, Deserialize, Validate)]
pub struct RenameAccountRequest {
    /// New display name.
    #[validate(length(min = 1, max = 100))]
    pub alias_name: String,
}

/// Request body for changing the transfer limit.
#[derive(Debug, Deserialize, Validate)]
pub struct TransferLimitRequest {
    /// New limit, must be positive.
    pub transfer_limit: Decimal,
}

/// Account type summary embedded in account responses.
#[derive(Debug, Serialize)]
pub struct AccountTypeSummary {
    /// Display name.
    pub name: String,
    /// Stable alias.
    pub alias: String,
}

/// Account response.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    /// Row ID.
    pub id: Uuid,
    /// Account number.
    pub act_no: String,
    /// Display name.
    pub alias_name: Option<String>,
    /// Current balance.
    pub balance: Decimal,
    /// Per-operation ceiling.
    pub transfer_limit: Decimal,
    /// Account type.
    pub account_type: Option<AccountTypeSummary>,
    /// Holding user.
    pub owner_id: Option<Uuid>,
    /// Hidden from the holder's listing.
    pub is_hidden: bool,
    /// Lifecycle state.
    pub status: LifecycleStatus,
    /// Opening instant.
    pub created_at: DateTime<FixedOffset>,
}

impl From<AccountDetails> for AccountResponse {
    fn from(details: AccountDetails) -> Self {
        let AccountDetails {
            account,
            account_type,
            owner_id,
        } = details;

        Self {
            id: account.id,
            act_no: account.act_no,
            alias_name: account.alias_name,
            balance: account.balance,
            transfer_limit: account.transfer_limit,
            account_type: account_type.map(|t| AccountTypeSummary {
                name: t.name,
                alias: t.alias,
            }),
            owner_id,
            is_hidden: account.is_hidden,
            status: account.status.into(),
            created_at: account.created_at,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /accounts - Open an account.
///
/// The holder is found by phone number. Callers who cannot manage users
/// always open for themselves.
async fn open_account(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(payload): ValidatedJson<OpenAccountRequest>,
) -> ApiResult<impl IntoResponse> {
    let caller = auth.caller();

    let holder_phone = match payload.phone_number {
        Some(phone) if caller.has(Capability::ManageUsers) => phone,
        _ => {
            UserRepository::new((*state.db).clone())
                .find_by_id(auth.user_id())
                .await?
                .ok_or_else(|| UserError::NotFound(auth.user_id().to_string()))?
                .user
                .phone_number
        }
    };

    let account = NewAccount::open(
        &payload.act_no,
        payload.alias_name.as_deref(),
        payload.balance,
        state.ledger.default_transfer_limit,
    )
    .map_err(AccountError::from)?;

    let opened = AccountRepository::new((*state.db).clone())
        .open(OpenAccountInput {
            account,
            account_type_alias: payload.account_type,
            holder_phone,
        })
        .await?;

    info!(user_id = %auth.user_id(), act_no = %opened.account.act_no, "account opened");
    Ok((StatusCode::CREATED, Json(AccountResponse::from(opened))))
}

/// GET /accounts - Every account, paginated.
async fn list_accounts(
    State(state): State<AppState>,
    ListPage(page): ListPage,
) -> ApiResult<Json<PageResponse<AccountResponse>>> {
    let accounts = AccountRepository::new((*state.db).clone())
        .list_all(page)
        .await?;
    Ok(Json(accounts.map(AccountResponse::from)))
}

/// GET /accounts/me - The caller's visible accounts.
async fn my_accounts(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<AccountResponse>>> {
    let accounts = AccountRepository::new((*state.db).clone())
        .list_for_user(auth.user_id())
        .await?;
    Ok(Json(accounts.into_iter().map(AccountResponse::from).collect()))
}

/// GET /accounts/{act_no} - One account. Holders see their own; staff see any.
async fn get_account(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(act_no): Path<String>,
) -> ApiResult<Json<AccountResponse>> {
    let repo = AccountRepository::new((*state.db).clone());
    let account = visible_account(&repo, &auth.caller(), &act_no, Capability::ViewAllHistory)
        .await?;
    Ok(Json(account.into()))
}

/// PATCH /accounts/{act_no} - Apply the present fields.
async fn update_account(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(act_no): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateAccountRequest>,
) -> ApiResult<Json<AccountResponse>> {
    let caller = auth.caller();
    if payload.transfer_limit.is_some() && !caller.has(Capability::ManageAccounts) {
        return Err(ApiError::forbidden("Changing the transfer limit is not permitted"));
    }

    let repo = AccountRepository::new((*state.db).clone());
    visible_account(&repo, &caller, &act_no, Capability::ManageAccounts).await?;

    let account_type_id = match payload.account_type.as_deref() {
        Some(alias) => {
            let account_type = AccountTypeRepository::new((*state.db).clone())
                .find_by_alias(alias)
                .await?
                .ok_or_else(|| AccountError::AccountTypeNotFound(alias.to_string()))?;
            Some(AccountTypeId::from_uuid(account_type.id))
        }
        None => None,
    };

    let updated = repo
        .update(
            &act_no,
            AccountPatch {
                alias_name: payload.alias_name,
                account_type_id,
                transfer_limit: payload.transfer_limit,
                is_hidden: payload.is_hidden,
            },
        )
        .await?;
    Ok(Json(updated.into()))
}

/// PUT /accounts/{act_no}/alias - Rename an account.
async fn rename_account(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(act_no): Path<String>,
    ValidatedJson(payload): ValidatedJson<RenameAccountRequest>,
) -> ApiResult<Json<AccountResponse>> {
    let repo = AccountRepository::new((*state.db).clone());
    visible_account(&repo, &auth.caller(), &act_no, Capability::ManageAccounts).await?;

    let updated = repo
        .update(
            &act_no,
            AccountPatch {
                alias_name: Some(Some(payload.alias_name)),
                ..AccountPatch::default()
            },
        )
        .await?;
    Ok(Json(updated.into()))
}

/// PUT /accounts/{act_no}/limit - Change the transfer limit.
async fn set_transfer_limit(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(act_no): Path<String>,
    ValidatedJson(payload): ValidatedJson<TransferLimitRequest>,
) -> ApiResult<Json<AccountResponse>> {
    let updated = AccountRepository::new((*state.db).clone())
        .update(
            &act_no,
            AccountPatch {
                transfer_limit: Some(payload.transfer_limit),
                ..AccountPatch::default()
            },
        )
        .await?;

    info!(
        user_id = %auth.user_id(),
        act_no = %act_no,
        limit = %payload.transfer_limit,
        "transfer limit changed"
    );
    Ok(Json(updated.into()))
}

/// PUT /accounts/{act_no}/enable
async fn enable_account(
    State(state): State<AppState>,
    Path(act_no): Path<String>,
) -> ApiResult<Json<AccountResponse>> {
    lifecycle(&state, &act_no, LifecycleAction::Enable).await
}

/// PUT /accounts/{act_no}/disable
async fn disable_account(
    State(state): State<AppState>,
    Path(act_no): Path<String>,
) -> ApiResult<Json<AccountResponse>> {
    lifecycle(&state, &act_no, LifecycleAction::Disable).await
}

/// DELETE /accounts/{act_no} - Soft delete.
async fn delete_account(
    State(state): State<AppState>,
    Path(act_no): Path<String>,
) -> ApiResult<StatusCode> {
    lifecycle(&state, &act_no, LifecycleAction::Delete).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn lifecycle(
    state: &AppState,
    act_no: &str,
    action: LifecycleAction,
) -> ApiResult<Json<AccountResponse>> {
    let account = AccountRepository::new((*state.db).clone())
        .apply_lifecycle(act_no, action)
        .await?;
    Ok(Json(account.into()))
}

/// Loads a non-deleted account the caller holds, or any account when the
/// caller has `override_with`.
async fn visible_account(
    repo: &AccountRepository,
    caller: &Caller,
    act_no: &str,
    override_with: Capability,
) -> ApiResult<AccountDetails> {
    let account = repo
        .find_by_act_no(act_no)
        .await?
        .ok_or_else(|| AccountError::AccountNotFound(act_no.to_string()))?;

    if account.owner_id != Some(caller.user_id.into_inner()) && !caller.has(override_with) {
        return Err(ApiError::forbidden(format!(
            "Caller does not own account {act_no}"
        )));
    }
    Ok(account)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use mbank_shared::TokenType;
    use serde_json::json;

    use crate::routes::test_support::{app, body_json, send, token};

    #[test]
    fn test_update_request_distinguishes_clear_from_keep() {
        let keep: UpdateAccountRequest = serde_json::from_value(json!({})).unwrap();
        assert!(keep.alias_name.is_none());

        let clear: UpdateAccountRequest =
            serde_json::from_value(json!({ "alias_name": null })).unwrap();
        assert_eq!(clear.alias_name, Some(None));
    }

    #[tokio::test]
    async fn test_open_account_validates_body_before_database() {
        let (app, state) = app();
        let access = token(&state, &["CUSTOMER"], TokenType::Access);
        let response = send(
            app,
            "POST",
            "/api/v1/accounts",
            Some(&access),
            Some(json!({ "act_no": "", "account_type": "saving-account" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "validation_error");
    }

    #[tokio::test]
    async fn test_open_account_rejects_sub_cent_balance_before_database() {
        let (app, state) = app();
        let staff = token(&state, &["STAFF"], TokenType::Access);
        let response = send(
            app,
            "POST",
            "/api/v1/accounts",
            Some(&staff),
            Some(json!({
                "act_no": "002900100",
                "account_type": "saving-account",
                "phone_number": "0900000001",
                "balance": "10.005"
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "validation_error");
    }

    #[tokio::test]
    async fn test_customer_cannot_patch_transfer_limit() {
        let (app, state) = app();
        let access = token(&state, &["USER", "CUSTOMER"], TokenType::Access);
        let response = send(
            app,
            "PATCH",
            "/api/v1/accounts/0001",
            Some(&access),
            Some(json!({ "transfer_limit": "999999" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
