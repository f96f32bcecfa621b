//! Account ledger.
//!
//! This module implements the balance-affecting operations:
//! - Deposit and withdraw on a single account
//! - Transfer between internal accounts
//! - Payment to an internal or external receiver
//! - Paginated transaction history
//!
//! Storage and ownership checks are collaborators injected into
//! `LedgerEngine`; see `store`.

pub mod error;
pub mod service;
pub mod store;
pub mod types;

#[cfg(test)]
mod memory;
#[cfg(test)]
mod service_props;

pub use error::{ErrorKind, LedgerError};
pub use service::{DEFAULT_MAX_PAGE_SIZE, LedgerEngine};
pub use store::{AccessGate, HolderGate, LedgerStore, LedgerUnit};
pub use types::{
    AccountState, CashRequest, HistoryQuery, HistoryScope, LedgerReceipt, PaymentRequest,
    TransactionRecord, TransactionType, TransferRequest,
};
