//! Branch directory repository.

use chrono::{NaiveTime, Utc};
use mbank_core::branch::{BranchPatch, BranchRuleError, Coordinates, check_hours, required};
use mbank_shared::AppError;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use uuid::Uuid;

use crate::entities::{branches, sea_orm_active_enums::LifecycleStatus};

/// Error types for branch operations.
#[derive(Debug, thiserror::Error)]
pub enum BranchError {
    /// Branch missing or soft-deleted.
    #[error("Branch not found: {0}")]
    NotFound(Uuid),

    /// Branch rule violation.
    #[error(transparent)]
    Rule(#[from] BranchRuleError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<BranchError> for AppError {
    fn from(err: BranchError) -> Self {
        let message = err.to_string();
        match err {
            BranchError::NotFound(_) => Self::NotFound(message),
            BranchError::Rule(_) => Self::Validation(message),
            BranchError::Database(_) => Self::Database(message),
        }
    }
}

/// Input for creating a branch.
#[derive(Debug, Clone)]
pub struct CreateBranchInput {
    /// Branch name.
    pub name: String,
    /// Street address.
    pub address: String,
    /// City.
    pub city: Option<String>,
    /// Province.
    pub province: Option<String>,
    /// Position.
    pub coordinates: Option<Coordinates>,
    /// Contact phone.
    pub phone_number: Option<String>,
    /// Contact email.
    pub email: Option<String>,
    /// Opening time.
    pub open_time: NaiveTime,
    /// Closing time.
    pub close_time: NaiveTime,
    /// Working days, e.g. "Mon-Fri".
    pub work_days: Option<String>,
}

/// Branch repository.
#[derive(Debug, Clone)]
pub struct BranchRepository {
    db: DatabaseConnection,
}

impl BranchRepository {
    /// Creates a new branch repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Lists non-deleted branches by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self) -> Result<Vec<branches::Model>, DbErr> {
        branches::Entity::find()
            .filter(branches::Column::Status.ne(LifecycleStatus::Deleted))
            .order_by_asc(branches::Column::Name)
            .all(&self.db)
            .await
    }

    /// Finds a non-deleted branch.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<branches::Model>, DbErr> {
        branches::Entity::find_by_id(id)
            .filter(branches::Column::Status.ne(LifecycleStatus::Deleted))
            .one(&self.db)
            .await
    }

    /// Creates a branch.
    ///
    /// # Errors
    ///
    /// A rule violation or a database error.
    pub async fn create(&self, input: CreateBranchInput) -> Result<branches::Model, BranchError> {
        let name = required("name", &input.name)?;
        let address = required("address", &input.address)?;
        check_hours(input.open_time, input.close_time)?;

        let now = Utc::now().into();
        let model = branches::ActiveModel {
            id: Set(Uuid::now_v7()),
            name: Set(name),
            address: Set(address),
            city: Set(input.city),
            province: Set(input.province),
            latitude: Set(input.coordinates.map(|c| c.latitude)),
            longitude: Set(input.coordinates.map(|c| c.longitude)),
            phone_number: Set(input.phone_number),
            email: Set(input.email),
            open_time: Set(input.open_time),
            close_time: Set(input.close_time),
            work_days: Set(input.work_days),
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
    /// `NotFound`, a rule violation, or a database error.
    pub async fn update(
        &self,
        id: Uuid,
        patch: BranchPatch,
    ) -> Result<branches::Model, BranchError> {
        let current = self.require(id).await?;
        let patch = patch.validated(current.open_time, current.close_time)?;

        let mut active: branches::ActiveModel = current.into();
        if let Some(name) = patch.name {
            active.name = Set(name);
        }
        if let Some(address) = patch.address {
            active.address = Set(address);
        }
        if let Some(city) = patch.city {
            active.city = Set(city);
        }
        if let Some(province) = patch.province {
            active.province = Set(province);
        }
        if let Some(coordinates) = patch.coordinates {
            active.latitude = Set(coordinates.map(|c| c.latitude));
            active.longitude = Set(coordinates.map(|c| c.longitude));
        }
        if let Some(phone_number) = patch.phone_number {
            active.phone_number = Set(phone_number);
        }
        if let Some(email) = patch.email {
            active.email = Set(email);
        }
        if let Some(open_time) = patch.open_time {
            active.open_time = Set(open_time);
        }
        if let Some(close_time) = patch.close_time {
            active.close_time = Set(close_time);
        }
        if let Some(work_days) = patch.work_days {
            active.work_days = Set(work_days);
        }
        active.updated_at = Set(Utc::now().into());

        Ok(active.update(&self.db).await?)
    }

    /// Soft-deletes a branch.
    ///
    /// # Errors
    ///
    /// `NotFound` or a database error.
    pub async fn delete(&self, id: Uuid) -> Result<(), BranchError> {
        let current = self.require(id).await?;

        let mut active: branches::ActiveModel = current.into();
        active.status = Set(LifecycleStatus::Deleted);
        active.updated_at = Set(Utc::now().into());
        active.update(&self.db).await?;
        Ok(())
    }

    async fn require(&self, id: Uuid) -> Result<branches::Model, BranchError> {
        self.find_by_id(id).await?.ok_or(BranchError::NotFound(id))
    }
}
