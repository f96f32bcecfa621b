//! User repository for database operations.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use mbank_core::auth::Role;
use mbank_core::lifecycle::{LifecycleAction, LifecycleStatus as Status};
use mbank_core::user::{Gender, UserPatch, UserRuleError, grant_role, set_blocked};
use mbank_shared::AppError;
use mbank_shared::types::{PageRequest, PageResponse};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::info;
use uuid::Uuid;

use crate::entities::{sea_orm_active_enums::LifecycleStatus, user_roles, users};

/// Error types for user operations.
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    /// User missing or soft-deleted.
    #[error("User not found: {0}")]
    NotFound(String),

    /// A unique field is already registered.
    #[error("User already exists with {field}: {value}")]
    Duplicate {
        /// Column name.
        field: &'static str,
        /// Offending value.
        value: String,
    },

    /// User rule violation.
    #[error(transparent)]
    Rule(#[from] UserRuleError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        let message = err.to_string();
        match err {
            UserError::NotFound(_) => Self::NotFound(message),
            UserError::Duplicate { .. } => Self::Conflict(message),
            UserError::Rule(rule) => match rule.status_code() {
                404 => Self::NotFound(message),
                409 => Self::Conflict(message),
                _ => Self::Validation(message),
            },
            UserError::Database(_) => Self::Database(message),
        }
    }
}

/// Input for creating a user.
#[derive(Debug, Clone)]
pub struct CreateUserInput {
    /// Display name.
    pub name: String,
    /// Gender.
    pub gender: Gender,
    /// Unique phone number.
    pub phone_number: String,
    /// Unique email.
    pub email: String,
    /// Unique national identity card number.
    pub national_card_id: String,
    /// Optional student card number.
    pub student_card_id: Option<String>,
    /// Date of birth.
    pub dob: Option<NaiveDate>,
    /// Profile image URL.
    pub profile_image: String,
    /// Argon2 PHC hash.
    pub password_hash: String,
    /// Initial roles.
    pub roles: Vec<Role>,
    /// Seeded and staff-created users skip email verification.
    pub is_verified: bool,
}

/// A user with the roles it holds.
#[derive(Debug, Clone)]
pub struct UserWithRoles {
    /// The user row.
    pub user: users::Model,
    /// Held roles, sorted.
    pub roles: Vec<Role>,
}

/// User repository for CRUD operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    /// Creates a new user repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a user and its roles in one transaction.
    ///
    /// Uniqueness is checked in order: national card, phone number, email.
    ///
    /// # Errors
    ///
    /// `Duplicate` for the first taken field, or a database error.
    pub async fn create(&self, input: CreateUserInput) -> Result<UserWithRoles, UserError> {
        let txn = self.db.begin().await?;

        let unique = [
            (
                "national card id",
                users::Column::NationalCardId,
                &input.national_card_id,
            ),
            ("phone number", users::Column::PhoneNumber, &input.phone_number),
            ("email", users::Column::Email, &input.email),
        ];
        for (field, column, value) in unique {
            let taken = users::Entity::find()
                .filter(column.eq(value.as_str()))
                .count(&txn)
                .await?;
            if taken > 0 {
                return Err(UserError::Duplicate {
                    field,
                    value: value.clone(),
                });
            }
        }

        let now = Utc::now().into();
        let user = users::ActiveModel {
            id: Set(Uuid::now_v7()),
            name: Set(input.name),
            gender: Set(input.gender.into()),
            phone_number: Set(input.phone_number),
            email: Set(input.email),
            national_card_id: Set(input.national_card_id),
            student_card_id: Set(input.student_card_id),
            dob: Set(input.dob),
            profile_image: Set(Some(input.profile_image)),
            password_hash: Set(input.password_hash),
            status: Set(LifecycleStatus::Active),
            is_verified: Set(input.is_verified),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let mut roles = input.roles;
        roles.sort();
        roles.dedup();
        for role in &roles {
            user_roles::ActiveModel {
                id: Set(Uuid::now_v7()),
                user_id: Set(user.id),
                role: Set((*role).into()),
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;

        info!(user_id = %user.id, "user created");

        Ok(UserWithRoles { user, roles })
    }

    /// Finds a non-deleted user by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<UserWithRoles>, DbErr> {
        let user = users::Entity::find_by_id(id)
            .filter(users::Column::Status.ne(LifecycleStatus::Deleted))
            .one(&self.db)
            .await?;
        self.with_roles(user).await
    }

    /// Finds a non-deleted user by email.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserWithRoles>, DbErr> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .filter(users::Column::Status.ne(LifecycleStatus::Deleted))
            .one(&self.db)
            .await?;
        self.with_roles(user).await
    }

    /// Lists non-deleted users, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self, page: PageRequest) -> Result<PageResponse<UserWithRoles>, DbErr> {
        let base =
            users::Entity::find().filter(users::Column::Status.ne(LifecycleStatus::Deleted));

        let total = base.clone().count(&self.db).await?;
        let rows = base
            .order_by_desc(users::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        let ids: Vec<Uuid> = rows.iter().map(|u| u.id).collect();
        let mut roles: HashMap<Uuid, Vec<Role>> = HashMap::new();
        for link in user_roles::Entity::find()
            .filter(user_roles::Column::UserId.is_in(ids))
            .all(&self.db)
            .await?
        {
            roles.entry(link.user_id).or_default().push(link.role.into());
        }

        let data = rows
            .into_iter()
            .map(|user| {
                let mut held = roles.remove(&user.id).unwrap_or_default();
                held.sort();
                UserWithRoles { user, roles: held }
            })
            .collect();

        Ok(PageResponse::new(data, page.page, page.per_page, total))
    }

    /// Applies a validated profile patch.
    ///
    /// # Errors
    ///
    /// `NotFound`, a rule violation, or a database error.
    pub async fn update(&self, id: Uuid, patch: UserPatch) -> Result<UserWithRoles, UserError> {
        let patch = patch.validated()?;
        let current = self.require(id).await?;
        if patch.is_empty() {
            return Ok(current);
        }

        let mut active: users::ActiveModel = current.user.into();
        if let Some(name) = patch.name {
            active.name = Set(name);
        }
        if let Some(gender) = patch.gender {
            active.gender = Set(gender.into());
        }
        if let Some(dob) = patch.dob {
            active.dob = Set(dob);
        }
        if let Some(student_card_id) = patch.student_card_id {
            active.student_card_id = Set(student_card_id);
        }
        active.updated_at = Set(Utc::now().into());
        let user = active.update(&self.db).await?;

        Ok(UserWithRoles {
            user,
            roles: current.roles,
        })
    }

    /// Blocks (`true`) or unblocks a user.
    ///
    /// # Errors
    ///
    /// `NotFound` or a database error.
    pub async fn set_blocked(&self, id: Uuid, blocked: bool) -> Result<UserWithRoles, UserError> {
        let current = self.require(id).await?;
        let next = set_blocked(current.user.status.into(), blocked)?;
        self.set_status(current, next).await
    }

    /// Soft-deletes a user.
    ///
    /// # Errors
    ///
    /// `NotFound` or a database error.
    pub async fn delete(&self, id: Uuid) -> Result<(), UserError> {
        let current = self.require(id).await?;
        let next = Status::from(current.user.status)
            .apply(LifecycleAction::Delete)
            .map_err(UserRuleError::from)?;
        self.set_status(current, next).await?;
        Ok(())
    }

    /// Replaces the stored password hash.
    ///
    /// # Errors
    ///
    /// `NotFound` or a database error.
    pub async fn update_password(&self, id: Uuid, password_hash: String) -> Result<(), UserError> {
        let current = self.require(id).await?;

        let mut active: users::ActiveModel = current.user.into();
        active.password_hash = Set(password_hash);
        active.updated_at = Set(Utc::now().into());
        active.update(&self.db).await?;
        Ok(())
    }

    /// Sets the profile image URL.
    ///
    /// # Errors
    ///
    /// `NotFound` or a database error.
    pub async fn update_profile_image(
        &self,
        id: Uuid,
        url: String,
    ) -> Result<UserWithRoles, UserError> {
        let current = self.require(id).await?;

        let mut active: users::ActiveModel = current.user.into();
        active.profile_image = Set(Some(url));
        active.updated_at = Set(Utc::now().into());
        let user = active.update(&self.db).await?;

        Ok(UserWithRoles {
            user,
            roles: current.roles,
        })
    }

    /// Adds a role to a user.
    ///
    /// # Errors
    ///
    /// `NotFound`, `RoleAlreadyGranted`, or a database error.
    pub async fn grant_role(&self, id: Uuid, role: Role) -> Result<UserWithRoles, UserError> {
        let current = self.require(id).await?;
        let roles = grant_role(&current.roles, role)?;

        user_roles::ActiveModel {
            id: Set(Uuid::now_v7()),
            user_id: Set(id),
            role: Set(role.into()),
        }
        .insert(&self.db)
        .await?;

        info!(user_id = %id, %role, "role granted");

        Ok(UserWithRoles {
            user: current.user,
            roles,
        })
    }

    async fn set_status(
        &self,
        current: UserWithRoles,
        next: Status,
    ) -> Result<UserWithRoles, UserError> {
        let mut active: users::ActiveModel = current.user.into();
        active.status = Set(next.into());
        active.updated_at = Set(Utc::now().into());
        let user = active.update(&self.db).await?;

        info!(user_id = %user.id, status = %next, "user status changed");

        Ok(UserWithRoles {
            user,
            roles: current.roles,
        })
    }

    async fn require(&self, id: Uuid) -> Result<UserWithRoles, UserError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| UserError::NotFound(id.to_string()))
    }

    async fn with_roles(
        &self,
        user: Option<users::Model>,
    ) -> Result<Option<UserWithRoles>, DbErr> {
        let Some(user) = user else {
            return Ok(None);
        };

        let mut roles: Vec<Role> = user_roles::Entity::find()
            .filter(user_roles::Column::UserId.eq(user.id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|link| link.role.into())
            .collect();
        roles.sort();

        Ok(Some(UserWithRoles { user, roles }))
    }
}
