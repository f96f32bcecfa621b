//! In-memory `LedgerStore` for engine tests.
//!
//! A unit of work holds the store-wide lock for its whole lifetime and
//! writes to a private copy that only replaces the shared state on commit.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, OwnedMutexGuard};

use super::error::LedgerError;
use super::store::{LedgerStore, LedgerUnit};
use super::types::{AccountState, HistoryQuery, HistoryScope, TransactionRecord};
use crate::lifecycle::LifecycleStatus;

#[derive(Debug, Clone, Default)]
pub(crate) struct MemoryState {
    accounts: BTreeMap<String, AccountState>,
    records: Vec<TransactionRecord>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    fail_next_commit: Arc<AtomicBool>,
}

impl MemoryStore {
    pub(crate) fn with_accounts(accounts: impl IntoIterator<Item = AccountState>) -> Self {
        let state = MemoryState {
            accounts: accounts
                .into_iter()
                .map(|a| (a.act_no.clone(), a))
                .collect(),
            records: Vec::new(),
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            fail_next_commit: Arc::default(),
        }
    }

    pub(crate) async fn account(&self, act_no: &str) -> Option<AccountState> {
        self.state.lock().await.accounts.get(act_no).cloned()
    }

    pub(crate) async fn records(&self) -> Vec<TransactionRecord> {
        self.state.lock().await.records.clone()
    }

    pub(crate) async fn set_status(&self, act_no: &str, status: LifecycleStatus) {
        if let Some(account) = self.state.lock().await.accounts.get_mut(act_no) {
            account.status = status;
        }
    }

    pub(crate) fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }
}

pub(crate) struct MemoryUnit {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    fail_commit: bool,
}

impl LedgerStore for MemoryStore {
    type Unit = MemoryUnit;

    async fn begin(&self) -> Result<MemoryUnit, LedgerError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(MemoryUnit {
            guard,
            working,
            fail_commit: self.fail_next_commit.swap(false, Ordering::SeqCst),
        })
    }

    async fn find_account(&self, act_no: &str) -> Result<Option<AccountState>, LedgerError> {
        Ok(self.account(act_no).await)
    }

    async fn history(
        &self,
        query: &HistoryQuery,
    ) -> Result<(Vec<TransactionRecord>, u64), LedgerError> {
        let state = self.state.lock().await;

        let user_accounts: HashSet<&str> = match &query.scope {
            HistoryScope::User(user_id) => state
                .accounts
                .values()
                .filter(|a| a.owner_id == Some(*user_id))
                .map(|a| a.act_no.as_str())
                .collect(),
            _ => HashSet::new(),
        };

        let mut matching: Vec<TransactionRecord> = state
            .records
            .iter()
            .rev()
            .filter(|r| match &query.scope {
                HistoryScope::Account(act_no) => r.involves(act_no),
                HistoryScope::All => true,
                HistoryScope::User(_) => user_accounts.iter().any(|act_no| r.involves(act_no)),
            })
            .filter(|r| query.transaction_type.is_none_or(|t| r.transaction_type == t))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.transaction_at.cmp(&a.transaction_at));

        let total = matching.len() as u64;
        let offset = usize::try_from(query.page.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.page.limit()).unwrap_or(usize::MAX);
        let page = matching.into_iter().skip(offset).take(limit).collect();

        Ok((page, total))
    }
}

impl LedgerUnit for MemoryUnit {
    async fn lock_account(&mut self, act_no: &str) -> Result<Option<AccountState>, LedgerError> {
        Ok(self.working.accounts.get(act_no).cloned())
    }

    async fn save_balance(&mut self, account: &AccountState) -> Result<(), LedgerError> {
        let row = self
            .working
            .accounts
            .get_mut(&account.act_no)
            .ok_or_else(|| LedgerError::Storage(format!("no row for {}", account.act_no)))?;
        row.balance = account.balance;
        Ok(())
    }

    async fn append(&mut self, record: &TransactionRecord) -> Result<(), LedgerError> {
        self.working.records.push(record.clone());
        Ok(())
    }

    async fn commit(mut self) -> Result<(), LedgerError> {
        if self.fail_commit {
            return Err(LedgerError::Storage("simulated commit failure".to_string()));
        }
        *self.guard = self.working;
        Ok(())
    }
}
