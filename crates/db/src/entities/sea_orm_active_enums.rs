//! Postgres enum types.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// `lifecycle_status` enum shared by every soft-deletable table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "lifecycle_status")]
pub enum LifecycleStatus {
    /// Usable.
    #[sea_orm(string_value = "active")]
    Active,
    /// Blocked or frozen.
    #[sea_orm(string_value = "disabled")]
    Disabled,
    /// Soft deleted.
    #[sea_orm(string_value = "deleted")]
    Deleted,
}

/// `transaction_type` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "transaction_type")]
pub enum TransactionType {
    /// Cash in.
    #[sea_orm(string_value = "deposit")]
    Deposit,
    /// Cash out.
    #[sea_orm(string_value = "withdraw")]
    Withdraw,
    /// Internal transfer.
    #[sea_orm(string_value = "transfer")]
    Transfer,
    /// Bill payment.
    #[sea_orm(string_value = "payment")]
    Payment,
}

/// `user_role` enum.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "user_role")]
pub enum UserRole {
    /// Online banking.
    #[sea_orm(string_value = "user")]
    User,
    /// Account holder.
    #[sea_orm(string_value = "customer")]
    Customer,
    /// Branch staff.
    #[sea_orm(string_value = "staff")]
    Staff,
    /// Branch manager.
    #[sea_orm(string_value = "manager")]
    Manager,
    /// Administrator.
    #[sea_orm(string_value = "admin")]
    Admin,
}

/// `gender` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "gender")]
pub enum Gender {
    /// Male.
    #[sea_orm(string_value = "male")]
    Male,
    /// Female.
    #[sea_orm(string_value = "female")]
    Female,
    /// Other.
    #[sea_orm(string_value = "other")]
    Other,
}

impl From<mbank_core::lifecycle::LifecycleStatus> for LifecycleStatus {
    fn from(status: mbank_core::lifecycle::LifecycleStatus) -> Self {
        use mbank_core::lifecycle::LifecycleStatus as Core;
        match status {
            Core::Active => Self::Active,
            Core::Disabled => Self::Disabled,
            Core::Deleted => Self::Deleted,
        }
    }
}

impl From<LifecycleStatus> for mbank_core::lifecycle::LifecycleStatus {
    fn from(status: LifecycleStatus) -> Self {
        match status {
            LifecycleStatus::Active => Self::Active,
            LifecycleStatus::Disabled => Self::Disabled,
            LifecycleStatus::Deleted => Self::Deleted,
        }
    }
}

impl From<mbank_core::ledger::TransactionType> for TransactionType {
    fn from(kind: mbank_core::ledger::TransactionType) -> Self {
        use mbank_core::ledger::TransactionType as Core;
        match kind {
            Core::Deposit => Self::Deposit,
            Core::Withdraw => Self::Withdraw,
            Core::Transfer => Self::Transfer,
            Core::Payment => Self::Payment,
        }
    }
}

impl From<TransactionType> for mbank_core::ledger::TransactionType {
    fn from(kind: TransactionType) -> Self {
        match kind {
            TransactionType::Deposit => Self::Deposit,
            TransactionType::Withdraw => Self::Withdraw,
            TransactionType::Transfer => Self::Transfer,
            TransactionType::Payment => Self::Payment,
        }
    }
}

impl From<mbank_core::auth::Role> for UserRole {
    fn from(role: mbank_core::auth::Role) -> Self {
        use mbank_core::auth::Role;
        match role {
            Role::User => Self::User,
            Role::Customer => Self::Customer,
            Role::Staff => Self::Staff,
            Role::Manager => Self::Manager,
            Role::Admin => Self::Admin,
        }
    }
}

impl From<UserRole> for mbank_core::auth::Role {
    fn from(role: UserRole) -> Self {
        match role {
            UserRole::User => Self::User,
            UserRole::Customer => Self::Customer,
            UserRole::Staff => Self::Staff,
            UserRole::Manager => Self::Manager,
            UserRole::Admin => Self::Admin,
        }
    }
}

impl From<mbank_core::user::Gender> for Gender {
    fn from(gender: mbank_core::user::Gender) -> Self {
        use mbank_core::user::Gender as Core;
        match gender {
            Core::Male => Self::Male,
            Core::Female => Self::Female,
            Core::Other => Self::Other,
        }
    }
}

impl From<Gender> for mbank_core::user::Gender {
    fn from(gender: Gender) -> Self {
        match gender {
            Gender::Male => Self::Male,
            Gender::Female => Self::Female,
            Gender::Other => Self::Other,
        }
    }
}
