//! Error responses.
//!
//! Every failure leaves a handler as `{"error": "<code>", "message": "<text>"}`
//! with the status code of the underlying `AppError`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use mbank_core::auth::PasswordError;
use mbank_core::ledger::LedgerError;
use mbank_db::repositories::{AccountError, BranchError, CardError, ReferenceError, UserError};
use mbank_shared::{AppError, EmailError, JwtError};
use sea_orm::DbErr;
use serde_json::json;
use tracing::error;

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// An error on its way out of a handler.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl ApiError {
    /// 400 with a validation message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self(AppError::Validation(message.into()))
    }

    /// 401 with a message.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self(AppError::Unauthorized(message.into()))
    }

    /// 403 with a message.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self(AppError::Forbidden(message.into()))
    }

    /// 404 with a message.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self(AppError::NotFound(message.into()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        }

        (
            status,
            Json(json!({
                "error": self.0.error_code(),
                "message": self.0.public_message(),
            })),
        )
            .into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

macro_rules! via_app_error {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for ApiError {
                fn from(err: $source) -> Self {
                    Self(AppError::from(err))
                }
            }
        )*
    };
}

via_app_error!(LedgerError, AccountError, UserError, CardError, ReferenceError, BranchError);

impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        Self(AppError::Database(err.to_string()))
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::TooWeak => Self::validation(err.to_string()),
            _ => Self(AppError::Internal(err.to_string())),
        }
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::EncodingError(_) => Self(AppError::Internal(err.to_string())),
            JwtError::Expired => Self::unauthorized("Token has expired"),
            JwtError::DecodingError(_) | JwtError::WrongType { .. } => {
                Self::unauthorized("Invalid or malformed token")
            }
        }
    }
}

impl From<EmailError> for ApiError {
    fn from(err: EmailError) -> Self {
        Self(AppError::ExternalService(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use rust_decimal_macros::dec;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_ledger_errors_map_to_status_and_code() {
        let response = ApiError::from(LedgerError::LimitExceeded {
            act_no: "0001".into(),
            limit: dec!(50),
            requested: dec!(60),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "limit_exceeded");

        let response = ApiError::from(LedgerError::NotAccountOwner("0001".into())).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_server_errors_hide_details() {
        let response = ApiError::from(DbErr::Custom("password=hunter2".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"], "database_error");
        assert_eq!(body["message"], "An internal error occurred");
    }

    #[test]
    fn test_expired_token_is_unauthorized() {
        let err = ApiError::from(JwtError::Expired);
        assert_eq!(err.0.status_code(), 401);
    }
}
