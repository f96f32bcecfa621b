//! Storage and authorization collaborators of the ledger engine.
//!
//! These traits are implemented by the db crate. The engine never touches
//! a connection directly.

use std::future::Future;

use super::error::LedgerError;
use super::types::{AccountState, HistoryQuery, TransactionRecord};
use crate::auth::Caller;

/// Durable store for accounts and the transaction log.
pub trait LedgerStore: Send + Sync {
    /// Unit of work type returned by `begin`.
    type Unit: LedgerUnit;

    /// Starts an isolated unit of work.
    fn begin(&self) -> impl Future<Output = Result<Self::Unit, LedgerError>> + Send;

    /// Reads an account outside any unit of work. Soft-deleted rows are
    /// returned so that callers can decide how to treat them.
    fn find_account(
        &self,
        act_no: &str,
    ) -> impl Future<Output = Result<Option<AccountState>, LedgerError>> + Send;

    /// Returns one page of records plus the total count for the query.
    ///
    /// The query page is already normalized (page ≥ 1, size ≥ 1).
    /// Implementations exclude soft-deleted records and order by
    /// `transaction_at` descending.
    fn history(
        &self,
        query: &HistoryQuery,
    ) -> impl Future<Output = Result<(Vec<TransactionRecord>, u64), LedgerError>> + Send;
}

/// One atomic unit of work.
///
/// Dropping a unit without calling `commit` discards every write made
/// through it.
pub trait LedgerUnit: Send {
    /// Reads an account and holds a write lock on it until the unit ends.
    fn lock_account(
        &mut self,
        act_no: &str,
    ) -> impl Future<Output = Result<Option<AccountState>, LedgerError>> + Send;

    /// Persists the balance of a previously locked account.
    fn save_balance(
        &mut self,
        account: &AccountState,
    ) -> impl Future<Output = Result<(), LedgerError>> + Send;

    /// Appends a record to the transaction log.
    fn append(
        &mut self,
        record: &TransactionRecord,
    ) -> impl Future<Output = Result<(), LedgerError>> + Send;

    /// Makes every write of this unit durable.
    fn commit(self) -> impl Future<Output = Result<(), LedgerError>> + Send;
}

/// Ownership policy consulted before any mutation.
pub trait AccessGate: Send + Sync {
    /// Returns true if `caller` may operate `account`.
    fn owns_account(&self, caller: &Caller, account: &AccountState) -> bool;
}

/// Only the holder of an account may operate it.
#[derive(Debug, Clone, Copy, Default)]
pub struct HolderGate;

impl AccessGate for HolderGate {
    fn owns_account(&self, caller: &Caller, account: &AccountState) -> bool {
        account.owner_id == Some(caller.user_id)
    }
}
