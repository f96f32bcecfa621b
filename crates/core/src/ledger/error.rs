//! Ledger error types.
//!
//! Every variant belongs to one `ErrorKind`, which is what the transport
//! layer maps to a status code. Precondition errors are raised before any
//! balance is touched.

use mbank_shared::AppError;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::money::MoneyError;

/// Coarse classification of ledger failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Account or resource absent (or soft-deleted).
    NotFound,
    /// Caller may not act on the resource.
    Forbidden,
    /// Malformed input: non-positive amount, same account, bad page size.
    InvalidArgument,
    /// Balance too low.
    InsufficientFunds,
    /// Amount above the account's transfer limit.
    LimitExceeded,
    /// Duplicate unique key.
    Conflict,
    /// The store failed; nothing was committed.
    Storage,
}

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Account not found or soft-deleted.
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Caller does not hold the account.
    #[error("Caller does not own account {0}")]
    NotAccountOwner(String),

    /// Account is disabled and rejects mutating operations.
    #[error("Account {0} is disabled")]
    AccountDisabled(String),

    /// Source and destination are the same account.
    #[error("Cannot transfer to the same account")]
    SameAccount,

    /// Amount is zero or negative.
    #[error("Amount must be greater than zero, got {0}")]
    NonPositiveAmount(Decimal),

    /// Amount has sub-cent digits or exceeds the money column.
    #[error(transparent)]
    InvalidMoney(#[from] MoneyError),

    /// Payment receiver identifier is blank.
    #[error("Payment receiver is required")]
    MissingPaymentReceiver,

    /// Page size must be at least one.
    #[error("Page size must be greater than zero")]
    InvalidPageSize,

    /// Resulting balance does not fit the money column.
    #[error("Amount overflows the account balance")]
    AmountOverflow,

    /// Balance is lower than the requested amount.
    #[error("Insufficient balance in account {act_no}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        /// The debited account.
        act_no: String,
        /// Balance before the operation.
        balance: Decimal,
        /// Requested amount.
        requested: Decimal,
    },

    /// Amount is above the account's per-operation limit.
    #[error("Amount {requested} exceeds the transfer limit {limit} of account {act_no}")]
    LimitExceeded {
        /// The debited account.
        act_no: String,
        /// The account's transfer limit.
        limit: Decimal,
        /// Requested amount.
        requested: Decimal,
    },

    /// Account number already taken.
    #[error("Account number {0} already exists")]
    DuplicateAccount(String),

    /// The store failed to read, write or commit.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Returns the kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::AccountNotFound(_) => ErrorKind::NotFound,
            Self::NotAccountOwner(_) | Self::AccountDisabled(_) => ErrorKind::Forbidden,
            Self::SameAccount
            | Self::NonPositiveAmount(_)
            | Self::InvalidMoney(_)
            | Self::MissingPaymentReceiver
            | Self::InvalidPageSize
            | Self::AmountOverflow => ErrorKind::InvalidArgument,
            Self::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Self::LimitExceeded { .. } => ErrorKind::LimitExceeded,
            Self::DuplicateAccount(_) => ErrorKind::Conflict,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::AccountNotFound(_) => "account_not_found",
            Self::NotAccountOwner(_) => "not_account_owner",
            Self::AccountDisabled(_) => "account_disabled",
            Self::SameAccount => "same_account",
            Self::NonPositiveAmount(_) | Self::InvalidMoney(_) => "invalid_amount",
            Self::MissingPaymentReceiver => "missing_payment_receiver",
            Self::InvalidPageSize => "invalid_page_size",
            Self::AmountOverflow => "amount_overflow",
            Self::InsufficientFunds { .. } => "insufficient_funds",
            Self::LimitExceeded { .. } => "limit_exceeded",
            Self::DuplicateAccount(_) => "duplicate_account",
            Self::Storage(_) => "internal_error",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::NotFound => 404,
            ErrorKind::Forbidden => 403,
            ErrorKind::InvalidArgument
            | ErrorKind::InsufficientFunds
            | ErrorKind::LimitExceeded => 400,
            ErrorKind::Conflict => 409,
            ErrorKind::Storage => 500,
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err.kind() {
            ErrorKind::NotFound => Self::NotFound(message),
            ErrorKind::Forbidden => Self::Forbidden(message),
            ErrorKind::InvalidArgument => Self::Validation(message),
            ErrorKind::InsufficientFunds => Self::InsufficientFunds(message),
            ErrorKind::LimitExceeded => Self::LimitExceeded(message),
            ErrorKind::Conflict => Self::Conflict(message),
            ErrorKind::Storage => Self::Database(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_kinds_and_status_codes() {
        let cases = [
            (LedgerError::AccountNotFound("1".into()), ErrorKind::NotFound, 404),
            (LedgerError::NotAccountOwner("1".into()), ErrorKind::Forbidden, 403),
            (LedgerError::AccountDisabled("1".into()), ErrorKind::Forbidden, 403),
            (LedgerError::SameAccount, ErrorKind::InvalidArgument, 400),
            (
                LedgerError::NonPositiveAmount(dec!(0)),
                ErrorKind::InvalidArgument,
                400,
            ),
            (
                LedgerError::InvalidMoney(MoneyError::TooPrecise(dec!(0.005))),
                ErrorKind::InvalidArgument,
                400,
            ),
            (LedgerError::AmountOverflow, ErrorKind::InvalidArgument, 400),
            (
                LedgerError::InsufficientFunds {
                    act_no: "1".into(),
                    balance: dec!(1),
                    requested: dec!(2),
                },
                ErrorKind::InsufficientFunds,
                400,
            ),
            (
                LedgerError::LimitExceeded {
                    act_no: "1".into(),
                    limit: dec!(1),
                    requested: dec!(2),
                },
                ErrorKind::LimitExceeded,
                400,
            ),
            (LedgerError::DuplicateAccount("1".into()), ErrorKind::Conflict, 409),
            (LedgerError::Storage("down".into()), ErrorKind::Storage, 500),
        ];

        for (err, kind, status) in cases {
            assert_eq!(err.kind(), kind, "{err}");
            assert_eq!(err.http_status_code(), status, "{err}");
        }
    }

    #[test]
    fn test_error_display() {
        let err = LedgerError::LimitExceeded {
            act_no: "002900100".into(),
            limit: dec!(50.00),
            requested: dec!(60.00),
        };
        assert_eq!(
            err.to_string(),
            "Amount 60.00 exceeds the transfer limit 50.00 of account 002900100"
        );
    }

    #[test]
    fn test_into_app_error() {
        let app: AppError = LedgerError::InsufficientFunds {
            act_no: "1".into(),
            balance: dec!(10),
            requested: dec!(20),
        }
        .into();
        assert_eq!(app.status_code(), 400);
        assert_eq!(app.error_code(), "insufficient_funds");

        let app: AppError = LedgerError::Storage("deadlock".into()).into();
        assert_eq!(app.status_code(), 500);
    }
}
