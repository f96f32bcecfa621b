//! Account opening and maintenance rules.
//!
//! Balance changes never happen here; they belong to the ledger engine.
//! This module validates what an account may look like and which
//! maintenance changes are allowed.

use mbank_shared::types::AccountTypeId;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::lifecycle::{LifecycleAction, LifecycleError, LifecycleStatus};
use crate::money::{MoneyError, check_money};

/// Longest account number accepted.
pub const MAX_ACT_NO_LEN: usize = 32;

/// Longest alias name accepted.
pub const MAX_ALIAS_LEN: usize = 100;

/// Errors raised by account maintenance rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountRuleError {
    /// Account numbers are non-empty strings of ASCII digits.
    #[error("Invalid account number: {0:?}")]
    InvalidAccountNumber(String),

    /// Transfer limits must be strictly positive.
    #[error("Transfer limit must be greater than zero, got {0}")]
    NonPositiveLimit(Decimal),

    /// Opening balances cannot be negative.
    #[error("Opening balance cannot be negative, got {0}")]
    NegativeOpeningBalance(Decimal),

    /// Balances and limits must be whole cents within the money column.
    #[error(transparent)]
    InvalidMoney(#[from] MoneyError),

    /// Alias names cannot be blank or overly long.
    #[error("Alias name must be between 1 and 100 characters")]
    InvalidAlias,

    /// The account has been deleted.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

impl AccountRuleError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Lifecycle(_) => 404,
            _ => 400,
        }
    }

    /// Snake-case error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAccountNumber(_) => "invalid_account_number",
            Self::NonPositiveLimit(_) => "invalid_transfer_limit",
            Self::NegativeOpeningBalance(_) => "invalid_opening_balance",
            Self::InvalidMoney(_) => "invalid_amount",
            Self::InvalidAlias => "invalid_alias",
            Self::Lifecycle(_) => "not_found",
        }
    }
}

/// Validated fields of a new account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    /// Unique account number.
    pub act_no: String,
    /// Optional display name.
    pub alias_name: Option<String>,
    /// Starting balance.
    pub balance: Decimal,
    /// Per-operation ceiling.
    pub transfer_limit: Decimal,
}

impl NewAccount {
    /// Validates an opening request. A missing balance opens at zero.
    ///
    /// # Errors
    ///
    /// Returns the first rule the request breaks.
    pub fn open(
        act_no: &str,
        alias_name: Option<&str>,
        balance: Option<Decimal>,
        transfer_limit: Decimal,
    ) -> Result<Self, AccountRuleError> {
        let act_no = validate_act_no(act_no)?;
        let alias_name = alias_name.map(normalize_alias).transpose()?;

        let balance = balance.unwrap_or(Decimal::ZERO);
        if balance < Decimal::ZERO {
            return Err(AccountRuleError::NegativeOpeningBalance(balance));
        }
        check_money(balance)?;

        Ok(Self {
            act_no,
            alias_name,
            balance,
            transfer_limit: validate_transfer_limit(transfer_limit)?,
        })
    }
}

/// Trims and checks an account number.
///
/// # Errors
///
/// Returns `InvalidAccountNumber` unless the trimmed input is 1 to 32 ASCII digits.
pub fn validate_act_no(act_no: &str) -> Result<String, AccountRuleError> {
    let trimmed = act_no.trim();
    if trimmed.is_empty()
        || trimmed.len() > MAX_ACT_NO_LEN
        || !trimmed.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(AccountRuleError::InvalidAccountNumber(act_no.to_string()));
    }
    Ok(trimmed.to_string())
}

/// # Errors
///
/// Returns `NonPositiveLimit` for zero or negative limits and
/// `InvalidMoney` for sub-cent or oversized ones.
pub fn validate_transfer_limit(limit: Decimal) -> Result<Decimal, AccountRuleError> {
    if limit <= Decimal::ZERO {
        return Err(AccountRuleError::NonPositiveLimit(limit));
    }
    Ok(check_money(limit)?)
}

/// Trims an alias name.
///
/// # Errors
///
/// Returns `InvalidAlias` for blank or overly long names.
pub fn normalize_alias(alias: &str) -> Result<String, AccountRuleError> {
    let trimmed = alias.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_ALIAS_LEN {
        return Err(AccountRuleError::InvalidAlias);
    }
    Ok(trimmed.to_string())
}

/// Partial update of an account. Only present fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountPatch {
    /// `Some(None)` clears the alias.
    pub alias_name: Option<Option<String>>,
    /// New account type, resolved from its alias by the caller.
    pub account_type_id: Option<AccountTypeId>,
    /// New transfer limit.
    pub transfer_limit: Option<Decimal>,
    /// Hide the account from the holder's own listing.
    pub is_hidden: Option<bool>,
}

impl AccountPatch {
    /// Returns true when no field would change.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.alias_name.is_none()
            && self.account_type_id.is_none()
            && self.transfer_limit.is_none()
            && self.is_hidden.is_none()
    }

    /// Normalizes present fields.
    ///
    /// # Errors
    ///
    /// Returns the first rule a present field breaks.
    pub fn validated(self) -> Result<Self, AccountRuleError> {
        let alias_name = match self.alias_name {
            Some(Some(alias)) => Some(Some(normalize_alias(&alias)?)),
            other => other,
        };
        let transfer_limit = self
            .transfer_limit
            .map(validate_transfer_limit)
            .transpose()?;

        Ok(Self {
            alias_name,
            transfer_limit,
            ..self
        })
    }
}

/// Computes the status after a maintenance action.
///
/// # Errors
///
/// Deleted accounts cannot be enabled, disabled or deleted again.
pub fn transition(
    current: LifecycleStatus,
    action: LifecycleAction,
) -> Result<LifecycleStatus, AccountRuleError> {
    Ok(current.apply(action)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case("002900100", true)]
    #[case("  0001 ", true)]
    #[case("", false)]
    #[case("12a4", false)]
    #[case("-100", false)]
    #[case("123456789012345678901234567890123", false)]
    fn test_validate_act_no(#[case] input: &str, #[case] ok: bool) {
        assert_eq!(validate_act_no(input).is_ok(), ok);
    }

    #[test]
    fn test_open_defaults() {
        let account = NewAccount::open("002900100", Some(" Savings "), None, dec!(5000)).unwrap();
        assert_eq!(account.act_no, "002900100");
        assert_eq!(account.alias_name.as_deref(), Some("Savings"));
        assert_eq!(account.balance, Decimal::ZERO);
        assert_eq!(account.transfer_limit, dec!(5000));
    }

    #[test]
    fn test_open_rejections() {
        assert_eq!(
            NewAccount::open("1", None, Some(dec!(-1)), dec!(10)),
            Err(AccountRuleError::NegativeOpeningBalance(dec!(-1)))
        );
        assert_eq!(
            NewAccount::open("1", None, None, dec!(0)),
            Err(AccountRuleError::NonPositiveLimit(dec!(0)))
        );
        assert_eq!(
            NewAccount::open("1", Some("   "), None, dec!(10)),
            Err(AccountRuleError::InvalidAlias)
        );
    }

    #[test]
    fn test_open_rejects_unstorable_money() {
        assert_eq!(
            NewAccount::open("1", None, Some(dec!(10.005)), dec!(10)),
            Err(AccountRuleError::InvalidMoney(MoneyError::TooPrecise(dec!(10.005))))
        );
        let err = NewAccount::open("1", None, None, dec!(1000000000000000000)).unwrap_err();
        assert_eq!(err.error_code(), "invalid_amount");
        assert_eq!(err.status_code(), 400);
        assert!(NewAccount::open("1", None, Some(dec!(10.50)), dec!(0.10)).is_ok());
    }

    #[test]
    fn test_patch_validation() {
        let patch = AccountPatch {
            alias_name: Some(Some(" Bills ".to_string())),
            ..AccountPatch::default()
        }
        .validated()
        .unwrap();
        assert_eq!(patch.alias_name, Some(Some("Bills".to_string())));

        let cleared = AccountPatch {
            alias_name: Some(None),
            ..AccountPatch::default()
        }
        .validated()
        .unwrap();
        assert_eq!(cleared.alias_name, Some(None));

        let bad = AccountPatch {
            transfer_limit: Some(dec!(-5)),
            ..AccountPatch::default()
        };
        assert_eq!(bad.validated(), Err(AccountRuleError::NonPositiveLimit(dec!(-5))));

        let sub_cent = AccountPatch {
            transfer_limit: Some(dec!(0.001)),
            ..AccountPatch::default()
        };
        assert_eq!(
            sub_cent.validated(),
            Err(AccountRuleError::InvalidMoney(MoneyError::TooPrecise(dec!(0.001))))
        );

        assert!(AccountPatch::default().is_empty());
    }

    #[test]
    fn test_deleted_account_stays_deleted() {
        let err = transition(LifecycleStatus::Deleted, LifecycleAction::Enable).unwrap_err();
        assert_eq!(err.status_code(), 404);
        assert_eq!(
            transition(LifecycleStatus::Active, LifecycleAction::Disable),
            Ok(LifecycleStatus::Disabled)
        );
    }
}
