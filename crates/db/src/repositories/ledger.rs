//! SeaORM-backed storage for the ledger engine.
//!
//! Each unit of work is one `DatabaseTransaction`. Account rows are read with
//! `SELECT ... FOR UPDATE` so concurrent operations on the same account
//! serialize at the row lock; the engine acquires locks in ascending
//! account-number order.

use chrono::Utc;
use mbank_core::ledger::{
    AccountState, HistoryQuery, HistoryScope, LedgerError, LedgerStore, LedgerUnit,
    TransactionRecord,
};
use mbank_shared::types::{AccountId, TransactionId, UserId};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    Select, Set, TransactionTrait, sea_query::Expr,
};
use tracing::{debug, error};

use crate::entities::{
    accounts,
    sea_orm_active_enums::{LifecycleStatus, TransactionType},
    transactions, user_accounts,
};

/// Ledger store over a Postgres connection pool.
#[derive(Debug, Clone)]
pub struct SeaLedgerStore {
    db: DatabaseConnection,
}

impl SeaLedgerStore {
    /// Creates a new ledger store.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// One open database transaction.
#[derive(Debug)]
pub struct SeaLedgerUnit {
    txn: DatabaseTransaction,
}

fn storage(err: DbErr) -> LedgerError {
    error!(error = %err, "ledger storage failure");
    LedgerError::Storage(err.to_string())
}

async fn load_account<C: ConnectionTrait>(
    conn: &C,
    act_no: &str,
    lock: bool,
) -> Result<Option<AccountState>, DbErr> {
    let mut query = accounts::Entity::find().filter(accounts::Column::ActNo.eq(act_no));
    if lock {
        query = query.lock_exclusive();
    }

    let Some(account) = query.one(conn).await? else {
        return Ok(None);
    };

    let owner = user_accounts::Entity::find()
        .filter(user_accounts::Column::AccountId.eq(account.id))
        .one(conn)
        .await?;

    Ok(Some(to_state(account, owner.map(|link| link.user_id))))
}

fn to_state(account: accounts::Model, owner: Option<uuid::Uuid>) -> AccountState {
    AccountState {
        id: AccountId::from_uuid(account.id),
        act_no: account.act_no,
        balance: account.balance,
        transfer_limit: account.transfer_limit,
        owner_id: owner.map(UserId::from_uuid),
        status: account.status.into(),
    }
}

fn to_record(model: transactions::Model) -> TransactionRecord {
    TransactionRecord {
        id: TransactionId::from_uuid(model.id),
        owner_act_no: model.owner_act_no,
        receiver_act_no: model.receiver_act_no,
        payment_receiver: model.payment_receiver,
        amount: model.amount,
        transaction_type: model.transaction_type.into(),
        remark: model.remark,
        transaction_at: model.transaction_at.with_timezone(&Utc),
        status: model.status,
    }
}

impl SeaLedgerStore {
    /// Builds the filtered history query. `None` means the scope cannot
    /// match any record.
    async fn scoped(
        &self,
        query: &HistoryQuery,
    ) -> Result<Option<Select<transactions::Entity>>, DbErr> {
        let mut select = transactions::Entity::find()
            .filter(transactions::Column::Lifecycle.ne(LifecycleStatus::Deleted));

        match &query.scope {
            HistoryScope::All => {}
            HistoryScope::Account(act_no) => {
                select = select.filter(
                    Condition::any()
                        .add(transactions::Column::OwnerActNo.eq(act_no.as_str()))
                        .add(transactions::Column::ReceiverActNo.eq(act_no.as_str())),
                );
            }
            HistoryScope::User(user_id) => {
                let act_nos: Vec<String> = user_accounts::Entity::find()
                    .filter(user_accounts::Column::UserId.eq(user_id.into_inner()))
                    .find_also_related(accounts::Entity)
                    .all(&self.db)
                    .await?
                    .into_iter()
                    .filter_map(|(_, account)| account.map(|a| a.act_no))
                    .collect();

                if act_nos.is_empty() {
                    return Ok(None);
                }

                select = select.filter(
                    Condition::any()
                        .add(transactions::Column::OwnerActNo.is_in(act_nos.clone()))
                        .add(transactions::Column::ReceiverActNo.is_in(act_nos)),
                );
            }
        }

        if let Some(kind) = query.transaction_type {
            select = select.filter(
                transactions::Column::TransactionType.eq(TransactionType::from(kind)),
            );
        }

        Ok(Some(select))
    }
}

impl LedgerStore for SeaLedgerStore {
    type Unit = SeaLedgerUnit;

    async fn begin(&self) -> Result<SeaLedgerUnit, LedgerError> {
        let txn = self.db.begin().await.map_err(storage)?;
        Ok(SeaLedgerUnit { txn })
    }

    async fn find_account(&self, act_no: &str) -> Result<Option<AccountState>, LedgerError> {
        load_account(&self.db, act_no, false).await.map_err(storage)
    }

    async fn history(
        &self,
        query: &HistoryQuery,
    ) -> Result<(Vec<TransactionRecord>, u64), LedgerError> {
        let Some(select) = self.scoped(query).await.map_err(storage)? else {
            return Ok((Vec::new(), 0));
        };

        let total = select.clone().count(&self.db).await.map_err(storage)?;

        let records = select
            .order_by_desc(transactions::Column::TransactionAt)
            .order_by_desc(transactions::Column::Id)
            .offset(query.page.offset())
            .limit(query.page.limit())
            .all(&self.db)
            .await
            .map_err(storage)?
            .into_iter()
            .map(to_record)
            .collect();

        Ok((records, total))
    }
}

impl LedgerUnit for SeaLedgerUnit {
    async fn lock_account(&mut self, act_no: &str) -> Result<Option<AccountState>, LedgerError> {
        load_account(&self.txn, act_no, true).await.map_err(storage)
    }

    async fn save_balance(&mut self, account: &AccountState) -> Result<(), LedgerError> {
        let result = accounts::Entity::update_many()
            .col_expr(accounts::Column::Balance, Expr::value(account.balance))
            .col_expr(accounts::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(accounts::Column::Id.eq(account.id.into_inner()))
            .exec(&self.txn)
            .await
            .map_err(storage)?;

        if result.rows_affected != 1 {
            return Err(LedgerError::Storage(format!(
                "balance update touched {} rows for account {}",
                result.rows_affected, account.act_no
            )));
        }
        Ok(())
    }

    async fn append(&mut self, record: &TransactionRecord) -> Result<(), LedgerError> {
        transactions::ActiveModel {
            id: Set(record.id.into_inner()),
            owner_act_no: Set(record.owner_act_no.clone()),
            receiver_act_no: Set(record.receiver_act_no.clone()),
            payment_receiver: Set(record.payment_receiver.clone()),
            amount: Set(record.amount),
            transaction_type: Set(record.transaction_type.into()),
            remark: Set(record.remark.clone()),
            transaction_at: Set(record.transaction_at.into()),
            status: Set(record.status),
            lifecycle: Set(LifecycleStatus::Active),
        }
        .insert(&self.txn)
        .await
        .map_err(storage)?;

        debug!(
            transaction_id = %record.id,
            owner = %record.owner_act_no,
            kind = %record.transaction_type,
            amount = %record.amount,
            "ledger record appended"
        );
        Ok(())
    }

    async fn commit(self) -> Result<(), LedgerError> {
        self.txn.commit().await.map_err(storage)
    }
}
