//! Ledger operation engine.
//!
//! Applies deposits, withdrawals, transfers and payments to account balances
//! and appends exactly one record per operation, all inside one unit of
//! work. Every check runs before the first write; a failed check or a failed
//! commit leaves balances and the log untouched.
//!
//! Check order for transfers and payments is fixed so that error reporting is
//! deterministic:
//! 1. accounts exist (and differ)
//! 2. caller owns the debited account, accounts are active
//! 3. amount is positive and a whole number of cents
//! 4. amount fits the balance
//! 5. amount fits the transfer limit

use mbank_shared::types::{PageRequest, PageResponse};
use rust_decimal::Decimal;

use super::error::LedgerError;
use super::store::{AccessGate, HolderGate, LedgerStore, LedgerUnit};
use super::types::{
    AccountState, CashRequest, HistoryQuery, HistoryScope, LedgerReceipt, PaymentRequest,
    TransactionRecord, TransactionType, TransferRequest,
};
use crate::auth::Caller;
use crate::money::{MAX_MONEY, check_money};

/// Largest page a history query may return.
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 100;

const DEPOSIT_REMARK: &str = "Deposit to account";
const WITHDRAW_REMARK: &str = "Withdrawal from account";

/// The ledger operation engine.
///
/// Collaborators are injected: `store` provides atomic units of work and
/// `gate` decides account ownership.
#[derive(Debug, Clone)]
pub struct LedgerEngine<S, G = HolderGate> {
    store: S,
    gate: G,
    max_page_size: u32,
}

impl<S: LedgerStore> LedgerEngine<S, HolderGate> {
    /// Creates an engine that only lets account holders operate their accounts.
    #[must_use]
    pub const fn with_holder_gate(store: S) -> Self {
        Self::new(store, HolderGate)
    }
}

impl<S: LedgerStore, G: AccessGate> LedgerEngine<S, G> {
    /// Creates an engine over the given store and ownership policy.
    #[must_use]
    pub const fn new(store: S, gate: G) -> Self {
        Self {
            store,
            gate,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }

    /// Overrides the history page size cap.
    #[must_use]
    pub fn with_max_page_size(mut self, max_page_size: u32) -> Self {
        self.max_page_size = max_page_size;
        self
    }

    /// Returns the underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Credits `amount` to an account held by the caller.
    ///
    /// # Errors
    ///
    /// `AccountNotFound`, `NotAccountOwner`, `AccountDisabled`,
    /// `NonPositiveAmount`, `InvalidMoney` for sub-cent or oversized amounts,
    /// `AmountOverflow` when the balance would leave the money column, or
    /// `Storage` if the unit cannot commit.
    pub async fn deposit(
        &self,
        caller: &Caller,
        request: CashRequest,
    ) -> Result<LedgerReceipt, LedgerError> {
        let mut unit = self.store.begin().await?;

        let mut account = existing(unit.lock_account(&request.act_no).await?, &request.act_no)?;
        self.authorize(caller, &account)?;
        ensure_amount(request.amount)?;

        account.balance = credit(account.balance, request.amount)?;

        let record = TransactionRecord::settled(
            &account.act_no,
            Some(&account.act_no),
            None,
            request.amount,
            TransactionType::Deposit,
            Some(remark_or(request.remark, DEPOSIT_REMARK)),
        );

        unit.save_balance(&account).await?;
        unit.append(&record).await?;
        unit.commit().await?;

        Ok(LedgerReceipt {
            record,
            owner: account,
            receiver: None,
        })
    }

    /// Debits `amount` from an account held by the caller. No partial
    /// withdrawal: the full amount must be covered by the balance.
    ///
    /// # Errors
    ///
    /// As `deposit`, plus `InsufficientFunds`.
    pub async fn withdraw(
        &self,
        caller: &Caller,
        request: CashRequest,
    ) -> Result<LedgerReceipt, LedgerError> {
        let mut unit = self.store.begin().await?;

        let mut account = existing(unit.lock_account(&request.act_no).await?, &request.act_no)?;
        self.authorize(caller, &account)?;
        ensure_amount(request.amount)?;
        ensure_covered(&account, request.amount)?;

        account.balance -= request.amount;

        let record = TransactionRecord::settled(
            &account.act_no,
            Some(&account.act_no),
            None,
            request.amount,
            TransactionType::Withdraw,
            Some(remark_or(request.remark, WITHDRAW_REMARK)),
        );

        unit.save_balance(&account).await?;
        unit.append(&record).await?;
        unit.commit().await?;

        Ok(LedgerReceipt {
            record,
            owner: account,
            receiver: None,
        })
    }

    /// Moves `amount` from the caller's account to another internal account.
    ///
    /// # Errors
    ///
    /// `SameAccount` whenever both account numbers are equal, then the
    /// checks listed in the module docs.
    pub async fn transfer(
        &self,
        caller: &Caller,
        request: TransferRequest,
    ) -> Result<LedgerReceipt, LedgerError> {
        if request.owner_act_no == request.receiver_act_no {
            return Err(LedgerError::SameAccount);
        }

        let mut unit = self.store.begin().await?;

        let (owner, receiver) =
            lock_pair(&mut unit, &request.owner_act_no, &request.receiver_act_no).await?;
        let mut owner = existing(owner, &request.owner_act_no)?;
        let mut receiver = existing(receiver, &request.receiver_act_no)?;

        self.authorize(caller, &owner)?;
        ensure_active(&receiver)?;
        ensure_debitable(&owner, request.amount)?;

        owner.balance -= request.amount;
        receiver.balance = credit(receiver.balance, request.amount)?;

        let record = TransactionRecord::settled(
            &owner.act_no,
            Some(&receiver.act_no),
            None,
            request.amount,
            TransactionType::Transfer,
            clean_remark(request.remark),
        );

        unit.save_balance(&owner).await?;
        unit.save_balance(&receiver).await?;
        unit.append(&record).await?;
        unit.commit().await?;

        Ok(LedgerReceipt {
            record,
            owner,
            receiver: Some(receiver),
        })
    }

    /// Pays `amount` from the caller's account to a receiver identifier.
    ///
    /// When the identifier names an existing internal account that account is
    /// credited and recorded as receiver. Otherwise the money leaves the
    /// ledger and only the identifier is recorded.
    ///
    /// # Errors
    ///
    /// `MissingPaymentReceiver` for a blank identifier, `SameAccount` when
    /// paying the debited account itself, then the transfer checks.
    pub async fn payment(
        &self,
        caller: &Caller,
        request: PaymentRequest,
    ) -> Result<LedgerReceipt, LedgerError> {
        let receiver_id = request.payment_receiver.trim();
        if receiver_id.is_empty() {
            return Err(LedgerError::MissingPaymentReceiver);
        }
        if receiver_id == request.owner_act_no {
            return Err(LedgerError::SameAccount);
        }

        let mut unit = self.store.begin().await?;

        let (owner, receiver) = lock_pair(&mut unit, &request.owner_act_no, receiver_id).await?;
        let mut owner = existing(owner, &request.owner_act_no)?;
        let mut receiver = receiver.filter(|a| !a.status.is_deleted());

        self.authorize(caller, &owner)?;
        if let Some(receiver) = &receiver {
            ensure_active(receiver)?;
        }
        ensure_debitable(&owner, request.amount)?;

        owner.balance -= request.amount;
        if let Some(receiver) = receiver.as_mut() {
            receiver.balance = credit(receiver.balance, request.amount)?;
        }

        let record = TransactionRecord::settled(
            &owner.act_no,
            receiver.as_ref().map(|r| r.act_no.as_str()),
            Some(receiver_id.to_string()),
            request.amount,
            TransactionType::Payment,
            clean_remark(request.remark),
        );

        unit.save_balance(&owner).await?;
        if let Some(receiver) = &receiver {
            unit.save_balance(receiver).await?;
        }
        unit.append(&record).await?;
        unit.commit().await?;

        Ok(LedgerReceipt {
            record,
            owner,
            receiver,
        })
    }

    /// Returns one page of transaction history, newest first.
    ///
    /// Page 0 is read as page 1 and the page size is capped. A page past the
    /// end is empty, not an error.
    ///
    /// # Errors
    ///
    /// `InvalidPageSize` for a zero page size, `AccountNotFound` when an
    /// account scope names an unknown account.
    pub async fn history(
        &self,
        query: HistoryQuery,
    ) -> Result<PageResponse<TransactionRecord>, LedgerError> {
        let page: PageRequest = query.page.normalized(self.max_page_size);
        if page.per_page == 0 {
            return Err(LedgerError::InvalidPageSize);
        }

        if let HistoryScope::Account(act_no) = &query.scope {
            existing(self.store.find_account(act_no).await?, act_no)?;
        }

        let query = HistoryQuery { page, ..query };
        let (records, total) = self.store.history(&query).await?;

        Ok(PageResponse::new(records, page.page, page.per_page, total))
    }

    fn authorize(&self, caller: &Caller, account: &AccountState) -> Result<(), LedgerError> {
        if !self.gate.owns_account(caller, account) {
            return Err(LedgerError::NotAccountOwner(account.act_no.clone()));
        }
        ensure_active(account)
    }
}

/// Locks two accounts in ascending account-number order so that opposite
/// concurrent transfers cannot deadlock. Results come back as `(a, b)`.
async fn lock_pair<U: LedgerUnit>(
    unit: &mut U,
    a: &str,
    b: &str,
) -> Result<(Option<AccountState>, Option<AccountState>), LedgerError> {
    if a <= b {
        let first = unit.lock_account(a).await?;
        let second = unit.lock_account(b).await?;
        Ok((first, second))
    } else {
        let second = unit.lock_account(b).await?;
        let first = unit.lock_account(a).await?;
        Ok((first, second))
    }
}

fn existing(account: Option<AccountState>, act_no: &str) -> Result<AccountState, LedgerError> {
    account
        .filter(|a| !a.status.is_deleted())
        .ok_or_else(|| LedgerError::AccountNotFound(act_no.to_string()))
}

fn ensure_active(account: &AccountState) -> Result<(), LedgerError> {
    if account.status.is_active() {
        Ok(())
    } else {
        Err(LedgerError::AccountDisabled(account.act_no.clone()))
    }
}

fn ensure_amount(amount: Decimal) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::NonPositiveAmount(amount));
    }
    check_money(amount)?;
    Ok(())
}

/// A credited balance must still fit the money column.
fn credit(balance: Decimal, amount: Decimal) -> Result<Decimal, LedgerError> {
    balance
        .checked_add(amount)
        .filter(|total| *total <= MAX_MONEY)
        .ok_or(LedgerError::AmountOverflow)
}

fn ensure_covered(account: &AccountState, amount: Decimal) -> Result<(), LedgerError> {
    if amount > account.balance {
        return Err(LedgerError::InsufficientFunds {
            act_no: account.act_no.clone(),
            balance: account.balance,
            requested: amount,
        });
    }
    Ok(())
}

fn ensure_debitable(account: &AccountState, amount: Decimal) -> Result<(), LedgerError> {
    ensure_amount(amount)?;
    ensure_covered(account, amount)?;
    if amount > account.transfer_limit {
        return Err(LedgerError::LimitExceeded {
            act_no: account.act_no.clone(),
            limit: account.transfer_limit,
            requested: amount,
        });
    }
    Ok(())
}

fn clean_remark(remark: Option<String>) -> Option<String> {
    remark
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
}

fn remark_or(remark: Option<String>, default: &str) -> String {
    clean_remark(remark).unwrap_or_else(|| default.to_string())
}
