//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod account;
pub mod branch;
pub mod card;
pub mod email_verification;
pub mod ledger;
pub mod reference;
pub mod user;

pub use account::{AccountDetails, AccountError, AccountRepository, OpenAccountInput};
pub use branch::{BranchError, BranchRepository, CreateBranchInput};
pub use card::{CardDetails, CardError, CardRepository, RegenerateCardInput};
pub use email_verification::{CODE_TTL_MINUTES, EmailVerificationRepository};
pub use ledger::{SeaLedgerStore, SeaLedgerUnit};
pub use reference::{
    AccountTypeRepository, CardTypeRepository, CreateAccountTypeInput, ReferenceError,
    UpdateAccountTypeInput,
};
pub use user::{CreateUserInput, UserError, UserRepository, UserWithRoles};
