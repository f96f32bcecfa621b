//! `SeaORM` entity definitions.

pub mod prelude;

pub mod account_types;
pub mod accounts;
pub mod branches;
pub mod card_types;
pub mod cards;
pub mod email_verifications;
pub mod sea_orm_active_enums;
pub mod transactions;
pub mod user_accounts;
pub mod user_roles;
pub mod users;
