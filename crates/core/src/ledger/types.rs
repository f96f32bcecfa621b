//! Domain types for ledger operations.

use chrono::{DateTime, Utc};
use mbank_shared::types::{AccountId, PageRequest, TransactionId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::lifecycle::LifecycleStatus;

/// Kind of balance-affecting operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Cash in: owner = receiver.
    Deposit,
    /// Cash out: owner = receiver.
    Withdraw,
    /// Between two internal accounts.
    Transfer,
    /// To a biller, internal or external.
    Payment,
}

impl TransactionType {
    /// Upper-case name used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "DEPOSIT",
            Self::Withdraw => "WITHDRAW",
            Self::Transfer => "TRANSFER",
            Self::Payment => "PAYMENT",
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEPOSIT" => Ok(Self::Deposit),
            "WITHDRAW" => Ok(Self::Withdraw),
            "TRANSFER" => Ok(Self::Transfer),
            "PAYMENT" => Ok(Self::Payment),
            other => Err(format!("unknown transaction type: {other}")),
        }
    }
}

/// The ledger's view of an account row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountState {
    /// Row ID.
    pub id: AccountId,
    /// Account number, unique and immutable.
    pub act_no: String,
    /// Current balance, never negative after a commit.
    pub balance: Decimal,
    /// Per-operation ceiling for transfers and payments.
    pub transfer_limit: Decimal,
    /// Holding user, if linked.
    pub owner_id: Option<UserId>,
    /// Soft lifecycle state.
    pub status: LifecycleStatus,
}

/// An appended, immutable ledger record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Record ID.
    pub id: TransactionId,
    /// Debited (or, for deposits, credited) account.
    pub owner_act_no: String,
    /// Credited account, `None` for external payments.
    pub receiver_act_no: Option<String>,
    /// Free-form payment receiver identifier.
    pub payment_receiver: Option<String>,
    /// Always positive.
    pub amount: Decimal,
    /// Operation kind.
    pub transaction_type: TransactionType,
    /// Optional note.
    pub remark: Option<String>,
    /// Creation instant.
    pub transaction_at: DateTime<Utc>,
    /// Settled flag. Failures abort before a record exists, so always true.
    pub status: bool,
}

impl TransactionRecord {
    pub(crate) fn settled(
        owner_act_no: &str,
        receiver_act_no: Option<&str>,
        payment_receiver: Option<String>,
        amount: Decimal,
        transaction_type: TransactionType,
        remark: Option<String>,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            owner_act_no: owner_act_no.to_string(),
            receiver_act_no: receiver_act_no.map(ToString::to_string),
            payment_receiver,
            amount,
            transaction_type,
            remark,
            transaction_at: Utc::now(),
            status: true,
        }
    }

    /// Returns true if `act_no` is the owner or the receiver of this record.
    #[must_use]
    pub fn involves(&self, act_no: &str) -> bool {
        self.owner_act_no == act_no || self.receiver_act_no.as_deref() == Some(act_no)
    }
}

/// Deposit into or withdraw from one account.
#[derive(Debug, Clone)]
pub struct CashRequest {
    /// Target account.
    pub act_no: String,
    /// Amount, must be positive.
    pub amount: Decimal,
    /// Optional note, defaulted per operation.
    pub remark: Option<String>,
}

/// Move money between two internal accounts.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    /// Debited account.
    pub owner_act_no: String,
    /// Credited account.
    pub receiver_act_no: String,
    /// Amount, must be positive.
    pub amount: Decimal,
    /// Optional note.
    pub remark: Option<String>,
}

/// Pay a receiver that may or may not be an internal account.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    /// Debited account.
    pub owner_act_no: String,
    /// Biller identifier; credited when it names an internal account.
    pub payment_receiver: String,
    /// Amount, must be positive.
    pub amount: Decimal,
    /// Optional note.
    pub remark: Option<String>,
}

/// Result of a committed operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerReceipt {
    /// The appended record.
    pub record: TransactionRecord,
    /// Owner account after the operation.
    pub owner: AccountState,
    /// Credited internal account after the operation, when distinct from the owner.
    pub receiver: Option<AccountState>,
}

/// Which records a history query covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryScope {
    /// Records where the account is owner or receiver.
    Account(String),
    /// Every record. Privileged.
    All,
    /// Records touching any account held by the user.
    User(UserId),
}

/// A paginated history query.
#[derive(Debug, Clone)]
pub struct HistoryQuery {
    /// Record selection.
    pub scope: HistoryScope,
    /// Optional narrowing to one operation kind.
    pub transaction_type: Option<TransactionType>,
    /// 1-based page.
    pub page: PageRequest,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_transaction_type_parse() {
        assert_eq!("deposit".parse::<TransactionType>(), Ok(TransactionType::Deposit));
        assert_eq!("PAYMENT".parse::<TransactionType>(), Ok(TransactionType::Payment));
        assert!("refund".parse::<TransactionType>().is_err());
    }

    #[test]
    fn test_record_involves() {
        let record = TransactionRecord::settled(
            "001",
            Some("002"),
            None,
            dec!(5),
            TransactionType::Transfer,
            None,
        );
        assert!(record.involves("001"));
        assert!(record.involves("002"));
        assert!(!record.involves("003"));
        assert!(record.status);
    }

    #[test]
    fn test_transaction_type_serde() {
        let json = serde_json::to_string(&TransactionType::Withdraw).unwrap();
        assert_eq!(json, "\"WITHDRAW\"");
    }
}
