//! Account type and card type repositories.
//!
//! Both are small reference tables keyed by a unique alias.

use chrono::Utc;
use mbank_core::lifecycle::{LifecycleAction, LifecycleStatus as Status};
use mbank_shared::AppError;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::entities::{account_types, card_types, sea_orm_active_enums::LifecycleStatus};

/// Error types for reference data operations.
#[derive(Debug, thiserror::Error)]
pub enum ReferenceError {
    /// No non-deleted row with this alias.
    #[error("{kind} not found: {alias}")]
    NotFound {
        /// Table description.
        kind: &'static str,
        /// Requested alias.
        alias: String,
    },

    /// Alias already taken.
    #[error("{kind} alias already exists: {alias}")]
    DuplicateAlias {
        /// Table description.
        kind: &'static str,
        /// Requested alias.
        alias: String,
    },

    /// A required field is blank.
    #[error("{0} is required")]
    Blank(&'static str),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<ReferenceError> for AppError {
    fn from(err: ReferenceError) -> Self {
        let message = err.to_string();
        match err {
            ReferenceError::NotFound { .. } => Self::NotFound(message),
            ReferenceError::DuplicateAlias { .. } => Self::Conflict(message),
            ReferenceError::Blank(_) => Self::Validation(message),
            ReferenceError::Database(_) => Self::Database(message),
        }
    }
}

/// `kind` of account type errors.
pub const ACCOUNT_TYPE: &str = "Account type";
/// `kind` of card type errors.
pub const CARD_TYPE: &str = "Card type";

fn not_found(kind: &'static str, alias: &str) -> ReferenceError {
    ReferenceError::NotFound {
        kind,
        alias: alias.to_string(),
    }
}

fn required(field: &'static str, value: &str) -> Result<String, ReferenceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ReferenceError::Blank(field));
    }
    Ok(trimmed.to_string())
}

/// Input for creating an account type.
#[derive(Debug, Clone)]
pub struct CreateAccountTypeInput {
    /// Display name.
    pub name: String,
    /// Unique alias, e.g. `saving-account`.
    pub alias: String,
    /// Optional description.
    pub description: Option<String>,
}

/// Partial update of an account type.
#[derive(Debug, Clone, Default)]
pub struct UpdateAccountTypeInput {
    /// New display name.
    pub name: Option<String>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
}

/// Account type repository.
#[derive(Debug, Clone)]
pub struct AccountTypeRepository {
    db: DatabaseConnection,
}

impl AccountTypeRepository {
    /// Creates a new account type repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Lists non-deleted account types by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self) -> Result<Vec<account_types::Model>, DbErr> {
        account_types::Entity::find()
            .filter(account_types::Column::Status.ne(LifecycleStatus::Deleted))
            .order_by_asc(account_types::Column::Name)
            .all(&self.db)
            .await
    }

    /// Finds a non-deleted account type by alias.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_alias(&self, alias: &str) -> Result<Option<account_types::Model>, DbErr> {
        account_types::Entity::find()
            .filter(account_types::Column::Alias.eq(alias))
            .filter(account_types::Column::Status.ne(LifecycleStatus::Deleted))
            .one(&self.db)
            .await
    }

    /// Creates an account type.
    ///
    /// # Errors
    ///
    /// `DuplicateAlias` if the alias is taken (including by deleted rows),
    /// `Blank` for a blank name or alias.
    pub async fn create(
        &self,
        input: CreateAccountTypeInput,
    ) -> Result<account_types::Model, ReferenceError> {
        let name = required("name", &input.name)?;
        let alias = required("alias", &input.alias)?;

        let taken = account_types::Entity::find()
            .filter(account_types::Column::Alias.eq(alias.as_str()))
            .count(&self.db)
            .await?;
        if taken > 0 {
            return Err(ReferenceError::DuplicateAlias {
                kind: ACCOUNT_TYPE,
                alias,
            });
        }

        let now = Utc::now().into();
        let model = account_types::ActiveModel {
            id: Set(Uuid::now_v7()),
            name: Set(name),
            alias: Set(alias),
            description: Set(input.description.filter(|d| !d.trim().is_empty())),
            status: Set(LifecycleStatus::Active),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Ok(model.insert(&self.db).await?)
    }

    /// Applies a partial update.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Blank`, or a database error.
    pub async fn update(
        &self,
        alias: &str,
        input: UpdateAccountTypeInput,
    ) -> Result<account_types::Model, ReferenceError> {
        let current = self.require(alias).await?;

        let mut active: account_types::ActiveModel = current.into();
        if let Some(name) = input.name {
            active.name = Set(required("name", &name)?);
        }
        if let Some(description) = input.description {
            active.description = Set(description.filter(|d| !d.trim().is_empty()));
        }
        active.updated_at = Set(Utc::now().into());

        Ok(active.update(&self.db).await?)
    }

    /// Soft-deletes an account type.
    ///
    /// # Errors
    ///
    /// `NotFound` or a database error.
    pub async fn delete(&self, alias: &str) -> Result<(), ReferenceError> {
        let current = self.require(alias).await?;
        let next = Status::from(current.status)
            .apply(LifecycleAction::Delete)
            .map_err(|_| not_found(ACCOUNT_TYPE, alias))?;

        let mut active: account_types::ActiveModel = current.into();
        active.status = Set(next.into());
        active.updated_at = Set(Utc::now().into());
        active.update(&self.db).await?;
        Ok(())
    }

    async fn require(&self, alias: &str) -> Result<account_types::Model, ReferenceError> {
        self.find_by_alias(alias)
            .await?
            .ok_or_else(|| not_found(ACCOUNT_TYPE, alias))
    }
}

/// Card type repository.
#[derive(Debug, Clone)]
pub struct CardTypeRepository {
    db: DatabaseConnection,
}

impl CardTypeRepository {
    /// Creates a new card type repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Lists non-deleted card types by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self) -> Result<Vec<card_types::Model>, DbErr> {
        card_types::Entity::find()
            .filter(card_types::Column::Status.ne(LifecycleStatus::Deleted))
            .order_by_asc(card_types::Column::Name)
            .all(&self.db)
            .await
    }

    /// Finds a non-deleted card type by alias.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_alias(&self, alias: &str) -> Result<Option<card_types::Model>, DbErr> {
        card_types::Entity::find()
            .filter(card_types::Column::Alias.eq(alias))
            .filter(card_types::Column::Status.ne(LifecycleStatus::Deleted))
            .one(&self.db)
            .await
    }

    /// Creates a card type.
    ///
    /// # Errors
    ///
    /// `DuplicateAlias`, `Blank`, or a database error.
    pub async fn create(
        &self,
        name: &str,
        alias: &str,
    ) -> Result<card_types::Model, ReferenceError> {
        let name = required("name", name)?;
        let alias = required("alias", alias)?;

        let taken = card_types::Entity::find()
            .filter(card_types::Column::Alias.eq(alias.as_str()))
            .count(&self.db)
            .await?;
        if taken > 0 {
            return Err(ReferenceError::DuplicateAlias {
                kind: CARD_TYPE,
                alias,
            });
        }

        let model = card_types::ActiveModel {
            id: Set(Uuid::now_v7()),
            name: Set(name),
            alias: Set(alias),
            status: Set(LifecycleStatus::Active),
            created_at: Set(Utc::now().into()),
        };

        Ok(model.insert(&self.db).await?)
    }

    /// Soft-deletes a card type.
    ///
    /// # Errors
    ///
    /// `NotFound` or a database error.
    pub async fn delete(&self, alias: &str) -> Result<(), ReferenceError> {
        let current = self
            .find_by_alias(alias)
            .await?
            .ok_or_else(|| not_found(CARD_TYPE, alias))?;
        let next = Status::from(current.status)
            .apply(LifecycleAction::Delete)
            .map_err(|_| not_found(CARD_TYPE, alias))?;

        let mut active: card_types::ActiveModel = current.into();
        active.status = Set(next.into());
        active.update(&self.db).await?;
        Ok(())
    }
}
