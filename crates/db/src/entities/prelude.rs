//! Entity re-exports.

pub use super::account_types::Entity as AccountTypes;
pub use super::accounts::Entity as Accounts;
pub use super::branches::Entity as Branches;
pub use super::card_types::Entity as CardTypes;
pub use super::cards::Entity as Cards;
pub use super::email_verifications::Entity as EmailVerifications;
pub use super::transactions::Entity as Transactions;
pub use super::user_accounts::Entity as UserAccounts;
pub use super::user_roles::Entity as UserRoles;
pub use super::users::Entity as Users;
