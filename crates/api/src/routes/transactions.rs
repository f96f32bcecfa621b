//! Ledger routes: cash operations, transfers, payments and history.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use mbank_core::auth::Capability;
use mbank_core::ledger::{
    CashRequest, HistoryQuery, HistoryScope, LedgerError, LedgerReceipt, LedgerStore,
    PaymentRequest, TransactionRecord, TransactionType, TransferRequest,
};
use mbank_shared::types::{PageRequest, PageResponse};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    extractors::{QueryParams, ValidatedJson},
    middleware::AuthUser,
};

/// Creates the transaction routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/transactions/deposit",
            post(deposit).route_layer(require!(Deposit)),
        )
        .route(
            "/transactions/withdraw",
            post(withdraw).route_layer(require!(Withdraw)),
        )
        .route(
            "/transactions/transfer",
            post(transfer).route_layer(require!(Transfer)),
        )
        .route(
            "/transactions/payment",
            post(payment).route_layer(require!(Payment)),
        )
        .route(
            "/transactions/history",
            get(all_history).route_layer(require!(ViewAllHistory)),
        )
        .route(
            "/transactions/history/me",
            get(my_history).route_layer(require!(ViewOwnHistory)),
        )
        .route(
            "/transactions/history/accounts/{act_no}",
            get(account_history).route_layer(require!(ViewAccountHistory)),
        )
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for deposits and withdrawals.
#[derive(Debug, Deserialize, Validate)]
pub struct CashBody {
    /// Target account number.
    #[validate(length(min = 1, message = "act_no is required"))]
    pub act_no: String,
    /// Amount, must be positive.
    pub amount: Decimal,
    /// Optional note.
    pub remark: Option<String>,
}

/// Request body for transfers.
#[derive(Debug, Deserialize, Validate)]
pub struct TransferBody {
    /// Debited account number.
    #[validate(length(min = 1, message = "owner_act_no is required"))]
    pub owner_act_no: String,
    /// Credited account number.
    #[validate(length(min = 1, message = "receiver_act_no is required"))]
    pub receiver_act_no: String,
    /// Amount, must be positive.
    pub amount: Decimal,
    /// Optional note.
    pub remark: Option<String>,
}

/// Request body for payments.
#[derive(Debug, Deserialize, Validate)]
pub struct PaymentBody {
    /// Debited account number.
    #[validate(length(min = 1, message = "owner_act_no is required"))]
    pub owner_act_no: String,
    /// Biller identifier or internal account number.
    pub payment_receiver: String,
    /// Amount, must be positive.
    pub amount: Decimal,
    /// Optional note.
    pub remark: Option<String>,
}

/// Query parameters for history listings.
///
/// Values are signed so that `page=0` or `page=-3` read as the first page
/// instead of failing to parse.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    /// 1-based page.
    pub page: Option<i64>,
    /// Page size.
    pub size: Option<i64>,
    /// Optional operation filter.
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
}

const DEFAULT_HISTORY_PAGE_SIZE: u32 = 20;

impl HistoryParams {
    fn page_request(&self) -> PageRequest {
        let page = self
            .page
            .map_or(1, |p| u32::try_from(p.max(1)).unwrap_or(u32::MAX));
        let size = self.size.map_or(DEFAULT_HISTORY_PAGE_SIZE, |s| {
            u32::try_from(s.max(0)).unwrap_or(u32::MAX)
        });
        PageRequest::new(page, size)
    }

    fn query(&self, scope: HistoryScope) -> ApiResult<HistoryQuery> {
        let transaction_type = self
            .transaction_type
            .as_deref()
            .map(str::parse::<TransactionType>)
            .transpose()
            .map_err(ApiError::validation)?;

        Ok(HistoryQuery {
            scope,
            transaction_type,
            page: self.page_request(),
        })
    }
}

/// One ledger record as returned by the API.
#[derive(Debug, Serialize)]
pub struct TransactionView {
    /// Debited (or, for deposits, credited) account.
    pub owner_account: String,
    /// Credited internal account.
    pub receiver_account: Option<String>,
    /// Biller identifier, omitted when it repeats the receiver account.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_receiver: Option<String>,
    /// Amount.
    pub amount: Decimal,
    /// Note.
    pub remark: Option<String>,
    /// Operation kind.
    pub transaction_type: TransactionType,
    /// Creation instant.
    pub transaction_at: DateTime<Utc>,
    /// Settled flag.
    pub status: bool,
}

impl From<TransactionRecord> for TransactionView {
    fn from(record: TransactionRecord) -> Self {
        let payment_receiver = record
            .payment_receiver
            .filter(|p| record.receiver_act_no.as_deref() != Some(p.as_str()));

        Self {
            owner_account: record.owner_act_no,
            receiver_account: record.receiver_act_no,
            payment_receiver,
            amount: record.amount,
            remark: record.remark,
            transaction_type: record.transaction_type,
            transaction_at: record.transaction_at,
            status: record.status,
        }
    }
}

/// Result of a committed ledger operation.
#[derive(Debug, Serialize)]
pub struct ReceiptResponse {
    /// The appended record.
    pub transaction: TransactionView,
    /// Balance of the owner account afterwards.
    pub balance: Decimal,
}

impl From<LedgerReceipt> for ReceiptResponse {
    fn from(receipt: LedgerReceipt) -> Self {
        Self {
            balance: receipt.owner.balance,
            transaction: receipt.record.into(),
        }
    }
}

/// One page of history.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    /// Account the page was scoped to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_no: Option<String>,
    /// Records, newest first.
    pub transactions: Vec<TransactionView>,
    /// 1-based page.
    pub page: u32,
    /// Page size actually applied.
    pub size: u32,
    /// Total matching records.
    pub total: u64,
    /// Total pages.
    pub total_pages: u64,
}

impl HistoryResponse {
    fn new(account_no: Option<String>, page: PageResponse<TransactionRecord>) -> Self {
        Self {
            account_no,
            page: page.meta.page,
            size: page.meta.per_page,
            total: page.meta.total,
            total_pages: page.meta.total_pages,
            transactions: page.data.into_iter().map(TransactionView::from).collect(),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /transactions/deposit - Cash into an owned account.
async fn deposit(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(body): ValidatedJson<CashBody>,
) -> ApiResult<impl IntoResponse> {
    let receipt = state
        .ledger_engine()
        .deposit(
            &auth.caller(),
            CashRequest {
                act_no: body.act_no,
                amount: body.amount,
                remark: body.remark,
            },
        )
        .await?;

    info!(user_id = %auth.user_id(), act_no = %receipt.owner.act_no, "deposit completed");
    Ok((StatusCode::CREATED, Json(ReceiptResponse::from(receipt))))
}

/// POST /transactions/withdraw - Cash out of an owned account.
async fn withdraw(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(body): ValidatedJson<CashBody>,
) -> ApiResult<impl IntoResponse> {
    let receipt = state
        .ledger_engine()
        .withdraw(
            &auth.caller(),
            CashRequest {
                act_no: body.act_no,
                amount: body.amount,
                remark: body.remark,
            },
        )
        .await?;

    info!(user_id = %auth.user_id(), act_no = %receipt.owner.act_no, "withdrawal completed");
    Ok((StatusCode::CREATED, Json(ReceiptResponse::from(receipt))))
}

/// POST /transactions/transfer - Move money to another internal account.
async fn transfer(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(body): ValidatedJson<TransferBody>,
) -> ApiResult<impl IntoResponse> {
    let receipt = state
        .ledger_engine()
        .transfer(
            &auth.caller(),
            TransferRequest {
                owner_act_no: body.owner_act_no,
                receiver_act_no: body.receiver_act_no,
                amount: body.amount,
                remark: body.remark,
            },
        )
        .await?;

    info!(
        user_id = %auth.user_id(),
        transaction_id = %receipt.record.id,
        "transfer completed"
    );
    Ok((StatusCode::CREATED, Json(ReceiptResponse::from(receipt))))
}

/// POST /transactions/payment - Pay an internal or external receiver.
async fn payment(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(body): ValidatedJson<PaymentBody>,
) -> ApiResult<impl IntoResponse> {
    let receipt = state
        .ledger_engine()
        .payment(
            &auth.caller(),
            PaymentRequest {
                owner_act_no: body.owner_act_no,
                payment_receiver: body.payment_receiver,
                amount: body.amount,
                remark: body.remark,
            },
        )
        .await?;

    info!(
        user_id = %auth.user_id(),
        transaction_id = %receipt.record.id,
        external = receipt.receiver.is_none(),
        "payment completed"
    );
    Ok((StatusCode::CREATED, Json(ReceiptResponse::from(receipt))))
}

/// GET /transactions/history - Every record.
async fn all_history(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<HistoryParams>,
) -> ApiResult<Json<HistoryResponse>> {
    let page = state
        .ledger_engine()
        .history(params.query(HistoryScope::All)?)
        .await?;
    Ok(Json(HistoryResponse::new(None, page)))
}

/// GET /transactions/history/me - Records touching any of the caller's accounts.
async fn my_history(
    State(state): State<AppState>,
    auth: AuthUser,
    QueryParams(params): QueryParams<HistoryParams>,
) -> ApiResult<Json<HistoryResponse>> {
    let scope = HistoryScope::User(auth.caller().user_id);
    let page = state.ledger_engine().history(params.query(scope)?).await?;
    Ok(Json(HistoryResponse::new(None, page)))
}

/// GET /transactions/history/accounts/{act_no} - Records of one account.
///
/// Callers without `ViewAllHistory` may only read accounts they hold.
async fn account_history(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(act_no): Path<String>,
    QueryParams(params): QueryParams<HistoryParams>,
) -> ApiResult<Json<HistoryResponse>> {
    let caller = auth.caller();
    let engine = state.ledger_engine();

    if !caller.has(Capability::ViewAllHistory) {
        let account = engine
            .store()
            .find_account(&act_no)
            .await?
            .filter(|a| !a.status.is_deleted())
            .ok_or_else(|| LedgerError::AccountNotFound(act_no.clone()))?;
        if account.owner_id != Some(caller.user_id) {
            return Err(LedgerError::NotAccountOwner(act_no).into());
        }
    }

    let page = engine
        .history(params.query(HistoryScope::Account(act_no.clone()))?)
        .await?;
    Ok(Json(HistoryResponse::new(Some(act_no), page)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mbank_shared::types::TransactionId;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn record(receiver: Option<&str>, payment_receiver: Option<&str>) -> TransactionRecord {
        TransactionRecord {
            id: TransactionId::new(),
            owner_act_no: "0001".into(),
            receiver_act_no: receiver.map(Into::into),
            payment_receiver: payment_receiver.map(Into::into),
            amount: dec!(12.50),
            transaction_type: TransactionType::Payment,
            remark: None,
            transaction_at: Utc::now(),
            status: true,
        }
    }

    #[test]
    fn test_payment_receiver_omitted_when_it_repeats_receiver() {
        let view = TransactionView::from(record(Some("0002"), Some("0002")));
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("payment_receiver").is_none());
        assert_eq!(json["receiver_account"], "0002");
        assert_eq!(json["transaction_type"], "PAYMENT");
    }

    #[test]
    fn test_external_payment_keeps_receiver_identifier() {
        let view = TransactionView::from(record(None, Some("EDC-778812")));
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["payment_receiver"], "EDC-778812");
        assert!(json["receiver_account"].is_null());
    }

    #[rstest]
    #[case(None, None, 1, 20)]
    #[case(Some(0), Some(5), 1, 5)]
    #[case(Some(-3), Some(0), 1, 0)]
    #[case(Some(4), Some(-1), 4, 0)]
    #[case(Some(2), Some(1000), 2, 1000)]
    fn test_history_params_page_request(
        #[case] page: Option<i64>,
        #[case] size: Option<i64>,
        #[case] expected_page: u32,
        #[case] expected_size: u32,
    ) {
        let params = HistoryParams {
            page,
            size,
            transaction_type: None,
        };
        let request = params.page_request();
        assert_eq!(request.page, expected_page);
        assert_eq!(request.per_page, expected_size);
    }

    #[test]
    fn test_unknown_type_filter_is_rejected() {
        let params = HistoryParams {
            transaction_type: Some("REFUND".into()),
            ..HistoryParams::default()
        };
        let err = params.query(HistoryScope::All).unwrap_err();
        assert_eq!(err.0.status_code(), 400);

        let params = HistoryParams {
            transaction_type: Some("deposit".into()),
            ..HistoryParams::default()
        };
        let query = params.query(HistoryScope::All).unwrap();
        assert_eq!(query.transaction_type, Some(TransactionType::Deposit));
    }
}
