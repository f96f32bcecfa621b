//! Bank account repository.
//!
//! Opening, lookup, listing and maintenance of accounts. Balances are only
//! read here; every balance change goes through the ledger store.

use std::collections::HashMap;

use chrono::Utc;
use mbank_core::account::{AccountPatch, AccountRuleError, NewAccount, transition};
use mbank_core::lifecycle::LifecycleAction;
use mbank_shared::AppError;
use mbank_shared::types::{PageRequest, PageResponse};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use tracing::info;
use uuid::Uuid;

use crate::entities::{
    account_types, accounts, sea_orm_active_enums::LifecycleStatus, user_accounts, users,
};

/// Error types for account operations.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    /// No active account type with this alias.
    #[error("Account type not found: {0}")]
    AccountTypeNotFound(String),

    /// Account number already taken.
    #[error("Account number {0} already exists")]
    DuplicateAccount(String),

    /// No active user with this phone number.
    #[error("User not found with phone number: {0}")]
    HolderNotFound(String),

    /// Account missing or soft-deleted.
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Account rule violation.
    #[error(transparent)]
    Rule(#[from] AccountRuleError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        let message = err.to_string();
        match err {
            AccountError::AccountTypeNotFound(_)
            | AccountError::HolderNotFound(_)
            | AccountError::AccountNotFound(_) => Self::NotFound(message),
            AccountError::DuplicateAccount(_) => Self::Conflict(message),
            AccountError::Rule(rule) if rule.status_code() == 404 => Self::NotFound(message),
            AccountError::Rule(_) => Self::Validation(message),
            AccountError::Database(_) => Self::Database(message),
        }
    }
}

/// Input for opening an account.
#[derive(Debug, Clone)]
pub struct OpenAccountInput {
    /// Validated account fields.
    pub account: NewAccount,
    /// Alias of the account type.
    pub account_type_alias: String,
    /// Phone number of the holding user.
    pub holder_phone: String,
}

/// Account with its type and holder.
#[derive(Debug, Clone)]
pub struct AccountDetails {
    /// The account row.
    pub account: accounts::Model,
    /// Its account type.
    pub account_type: Option<account_types::Model>,
    /// Holding user.
    pub owner_id: Option<Uuid>,
}

/// A concurrent open can pass the number check and still lose the insert
/// to the unique index.
fn duplicate_or_db(err: DbErr, act_no: String) -> AccountError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AccountError::DuplicateAccount(act_no),
        _ => AccountError::Database(err),
    }
}

/// Bank account repository.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Opens an account and links it to its holder in one transaction.
    ///
    /// Checks run in order: account type, account number, holder.
    ///
    /// # Errors
    ///
    /// `AccountTypeNotFound`, `DuplicateAccount`, `HolderNotFound`, or a
    /// database error.
    pub async fn open(&self, input: OpenAccountInput) -> Result<AccountDetails, AccountError> {
        let txn = self.db.begin().await?;

        let account_type = account_types::Entity::find()
            .filter(account_types::Column::Alias.eq(input.account_type_alias.as_str()))
            .filter(account_types::Column::Status.eq(LifecycleStatus::Active))
            .one(&txn)
            .await?
            .ok_or_else(|| AccountError::AccountTypeNotFound(input.account_type_alias.clone()))?;

        let taken = accounts::Entity::find()
            .filter(accounts::Column::ActNo.eq(input.account.act_no.as_str()))
            .count(&txn)
            .await?;
        if taken > 0 {
            return Err(AccountError::DuplicateAccount(input.account.act_no));
        }

        let holder = users::Entity::find()
            .filter(users::Column::PhoneNumber.eq(input.holder_phone.as_str()))
            .filter(users::Column::Status.ne(LifecycleStatus::Deleted))
            .one(&txn)
            .await?
            .ok_or_else(|| AccountError::HolderNotFound(input.holder_phone.clone()))?;

        let act_no = input.account.act_no;
        let now = Utc::now().into();
        let account = accounts::ActiveModel {
            id: Set(Uuid::now_v7()),
            act_no: Set(act_no.clone()),
            alias_name: Set(input.account.alias_name),
            balance: Set(input.account.balance),
            transfer_limit: Set(input.account.transfer_limit),
            account_type_id: Set(account_type.id),
            is_hidden: Set(false),
            status: Set(LifecycleStatus::Active),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|err| duplicate_or_db(err, act_no))?;

        user_accounts::ActiveModel {
            id: Set(Uuid::now_v7()),
            user_id: Set(holder.id),
            account_id: Set(account.id),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        info!(act_no = %account.act_no, holder = %holder.id, "account opened");

        Ok(AccountDetails {
            account,
            account_type: Some(account_type),
            owner_id: Some(holder.id),
        })
    }

    /// Finds a non-deleted account by number.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_act_no(&self, act_no: &str) -> Result<Option<AccountDetails>, DbErr> {
        let found = accounts::Entity::find()
            .filter(accounts::Column::ActNo.eq(act_no))
            .filter(accounts::Column::Status.ne(LifecycleStatus::Deleted))
            .find_also_related(account_types::Entity)
            .one(&self.db)
            .await?;

        let Some((account, account_type)) = found else {
            return Ok(None);
        };

        let owner_id = user_accounts::Entity::find()
            .filter(user_accounts::Column::AccountId.eq(account.id))
            .one(&self.db)
            .await?
            .map(|link| link.user_id);

        Ok(Some(AccountDetails {
            account,
            account_type,
            owner_id,
        }))
    }

    /// Lists the visible, non-deleted accounts held by a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<AccountDetails>, DbErr> {
        let account_ids: Vec<Uuid> = user_accounts::Entity::find()
            .filter(user_accounts::Column::UserId.eq(user_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|link| link.account_id)
            .collect();

        if account_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = accounts::Entity::find()
            .filter(accounts::Column::Id.is_in(account_ids))
            .filter(accounts::Column::Status.ne(LifecycleStatus::Deleted))
            .filter(accounts::Column::IsHidden.eq(false))
            .order_by_desc(accounts::Column::CreatedAt)
            .find_also_related(account_types::Entity)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(account, account_type)| AccountDetails {
                account,
                account_type,
                owner_id: Some(user_id),
            })
            .collect())
    }

    /// Lists every non-deleted account, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_all(&self, page: PageRequest) -> Result<PageResponse<AccountDetails>, DbErr> {
        let base = accounts::Entity::find()
            .filter(accounts::Column::Status.ne(LifecycleStatus::Deleted));

        let total = base.clone().count(&self.db).await?;

        let rows = base
            .order_by_desc(accounts::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.limit())
            .find_also_related(account_types::Entity)
            .all(&self.db)
            .await?;

        let ids: Vec<Uuid> = rows.iter().map(|(a, _)| a.id).collect();
        let owners: HashMap<Uuid, Uuid> = user_accounts::Entity::find()
            .filter(user_accounts::Column::AccountId.is_in(ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|link| (link.account_id, link.user_id))
            .collect();

        let data = rows
            .into_iter()
            .map(|(account, account_type)| AccountDetails {
                owner_id: owners.get(&account.id).copied(),
                account,
                account_type,
            })
            .collect();

        Ok(PageResponse::new(data, page.page, page.per_page, total))
    }

    /// Applies a validated patch. Absent fields are left unchanged.
    ///
    /// # Errors
    ///
    /// `AccountNotFound`, a rule violation, or a database error.
    pub async fn update(
        &self,
        act_no: &str,
        patch: AccountPatch,
    ) -> Result<AccountDetails, AccountError> {
        let patch = patch.validated()?;
        let current = self.require(act_no).await?;

        if patch.is_empty() {
            return Ok(current);
        }

        let mut active: accounts::ActiveModel = current.account.into();
        if let Some(alias_name) = patch.alias_name {
            active.alias_name = Set(alias_name);
        }
        if let Some(type_id) = patch.account_type_id {
            active.account_type_id = Set(type_id.into_inner());
        }
        if let Some(limit) = patch.transfer_limit {
            active.transfer_limit = Set(limit);
        }
        if let Some(hidden) = patch.is_hidden {
            active.is_hidden = Set(hidden);
        }
        active.updated_at = Set(Utc::now().into());
        active.update(&self.db).await?;

        self.require(act_no).await
    }

    /// Enables, disables or soft-deletes an account.
    ///
    /// # Errors
    ///
    /// `AccountNotFound` (deleted accounts are not found), or a database error.
    pub async fn apply_lifecycle(
        &self,
        act_no: &str,
        action: LifecycleAction,
    ) -> Result<AccountDetails, AccountError> {
        let current = self.require(act_no).await?;
        let next = transition(current.account.status.into(), action)?;

        let mut active: accounts::ActiveModel = current.account.clone().into();
        active.status = Set(next.into());
        active.updated_at = Set(Utc::now().into());
        let account = active.update(&self.db).await?;

        info!(act_no, status = %next, "account lifecycle changed");

        Ok(AccountDetails {
            account,
            ..current
        })
    }

    async fn require(&self, act_no: &str) -> Result<AccountDetails, AccountError> {
        self.find_by_act_no(act_no)
            .await?
            .ok_or_else(|| AccountError::AccountNotFound(act_no.to_string()))
    }
}
