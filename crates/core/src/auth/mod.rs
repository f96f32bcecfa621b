//! Authentication and authorization.
//!
//! This module provides:
//! - Password hashing with Argon2id
//! - One-time secrets (verification codes, temporary passwords)
//! - Bank roles and the capabilities each role grants
//! - The resolved `Caller` that operations are checked against

mod password;
mod secrets;

pub use password::{
    MIN_PASSWORD_LEN, PasswordError, check_password_policy, hash_password, verify_password,
};
pub use secrets::{generate_temporary_password, generate_verification_code};

use mbank_shared::types::UserId;
use serde::{Deserialize, Serialize};

/// Roles a bank user can hold. A user usually holds several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Online banking: transfers, payments, own cards.
    User,
    /// Account holder: deposits, withdrawals, account opening.
    Customer,
    /// Branch staff: customer service and ledger audit.
    Staff,
    /// Branch manager: account administration and user blocking.
    Manager,
    /// System administrator: reference data.
    Admin,
}

/// A permission checked by the authorization middleware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Deposit into an owned account.
    Deposit,
    /// Withdraw from an owned account.
    Withdraw,
    /// Transfer between accounts.
    Transfer,
    /// Pay an internal or external receiver.
    Payment,
    /// Read the history of a single account.
    ViewAccountHistory,
    /// Read the history of the caller's own accounts.
    ViewOwnHistory,
    /// Read the history of every account.
    ViewAllHistory,
    /// Open, rename, update and look up accounts.
    OperateAccounts,
    /// Change limits and lifecycle of any account, list all accounts.
    ManageAccounts,
    /// Create, list and look up users.
    ManageUsers,
    /// Block, unblock and delete users.
    BlockUsers,
    /// Update one's own profile.
    UpdateProfile,
    /// Issue and regenerate one's own cards.
    ManageOwnCards,
    /// Look up cards.
    ReadCards,
    /// Delete and list every card.
    ManageAllCards,
    /// Read account types, card types, branches and roles.
    ReadReference,
    /// Create and update reference data.
    ManageReference,
    /// Delete reference data.
    DeleteReference,
}

impl Role {
    /// Every role, lowest privilege first.
    pub const ALL: [Self; 5] = [
        Self::User,
        Self::Customer,
        Self::Staff,
        Self::Manager,
        Self::Admin,
    ];

    /// Upper-case role name used in tokens and the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Customer => "CUSTOMER",
            Self::Staff => "STAFF",
            Self::Manager => "MANAGER",
            Self::Admin => "ADMIN",
        }
    }

    /// Capabilities granted by this role.
    #[must_use]
    pub const fn capabilities(self) -> &'static [Capability] {
        use Capability as C;
        match self {
            Self::User => &[
                C::Transfer,
                C::Payment,
                C::ViewAccountHistory,
                C::ViewOwnHistory,
                C::UpdateProfile,
                C::ManageOwnCards,
                C::ReadCards,
                C::ReadReference,
            ],
            Self::Customer => &[
                C::Deposit,
                C::Withdraw,
                C::ViewAccountHistory,
                C::ViewOwnHistory,
                C::OperateAccounts,
                C::UpdateProfile,
                C::ManageOwnCards,
                C::ReadReference,
            ],
            Self::Staff => &[
                C::Deposit,
                C::Withdraw,
                C::ViewAccountHistory,
                C::ViewOwnHistory,
                C::ViewAllHistory,
                C::OperateAccounts,
                C::ManageUsers,
                C::UpdateProfile,
                C::ReadReference,
            ],
            Self::Manager => &[
                C::Deposit,
                C::Withdraw,
                C::ViewAccountHistory,
                C::ViewOwnHistory,
                C::ViewAllHistory,
                C::OperateAccounts,
                C::ManageAccounts,
                C::ManageUsers,
                C::BlockUsers,
                C::UpdateProfile,
                C::ManageAllCards,
                C::ReadReference,
                C::ManageReference,
            ],
            Self::Admin => &[
                C::Deposit,
                C::Withdraw,
                C::ViewAccountHistory,
                C::ViewOwnHistory,
                C::ViewAllHistory,
                C::OperateAccounts,
                C::ManageAccounts,
                C::UpdateProfile,
                C::ManageAllCards,
                C::ReadReference,
                C::ManageReference,
                C::DeleteReference,
            ],
        }
    }

    /// Returns true if this role grants `capability`.
    #[must_use]
    pub fn grants(self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// Roles given to self-registered users.
    #[must_use]
    pub const fn registration_defaults() -> [Self; 2] {
        [Self::User, Self::Customer]
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown role name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl std::str::FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().trim_start_matches("ROLE_");
        Self::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// The authenticated principal behind a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    /// The user's ID.
    pub user_id: UserId,
    /// Roles held by the user.
    pub roles: Vec<Role>,
}

impl Caller {
    /// Creates a caller.
    #[must_use]
    pub const fn new(user_id: UserId, roles: Vec<Role>) -> Self {
        Self { user_id, roles }
    }

    /// Builds a caller from role names carried in a token. Unknown names are
    /// dropped.
    #[must_use]
    pub fn from_role_names<S: AsRef<str>>(user_id: UserId, names: &[S]) -> Self {
        let roles = names
            .iter()
            .filter_map(|n| n.as_ref().parse().ok())
            .collect();
        Self { user_id, roles }
    }

    /// Returns true if any of the caller's roles grants `capability`.
    #[must_use]
    pub fn has(&self, capability: Capability) -> bool {
        self.roles.iter().any(|r| r.grants(capability))
    }

    /// Returns true if the caller holds `role`.
    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Role::User, Capability::Transfer, true)]
    #[case(Role::User, Capability::Payment, true)]
    #[case(Role::User, Capability::Deposit, false)]
    #[case(Role::Customer, Capability::Deposit, true)]
    #[case(Role::Customer, Capability::Withdraw, true)]
    #[case(Role::Customer, Capability::Transfer, false)]
    #[case(Role::Customer, Capability::ViewAllHistory, false)]
    #[case(Role::Staff, Capability::ViewAllHistory, true)]
    #[case(Role::Staff, Capability::ManageAccounts, false)]
    #[case(Role::Manager, Capability::ManageAccounts, true)]
    #[case(Role::Manager, Capability::BlockUsers, true)]
    #[case(Role::Admin, Capability::BlockUsers, false)]
    #[case(Role::Admin, Capability::DeleteReference, true)]
    #[case(Role::Manager, Capability::DeleteReference, false)]
    fn test_role_grants(#[case] role: Role, #[case] cap: Capability, #[case] expected: bool) {
        assert_eq!(role.grants(cap), expected);
    }

    #[test]
    fn test_every_role_reads_own_history() {
        for role in Role::ALL {
            assert!(role.grants(Capability::ViewOwnHistory), "{role}");
            assert!(role.grants(Capability::ViewAccountHistory), "{role}");
        }
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("customer".parse::<Role>(), Ok(Role::Customer));
        assert_eq!("ROLE_ADMIN".parse::<Role>(), Ok(Role::Admin));
        assert!("teller".parse::<Role>().is_err());
    }

    #[test]
    fn test_caller_combines_roles() {
        let caller = Caller::from_role_names(UserId::new(), &["USER", "CUSTOMER", "bogus"]);
        assert_eq!(caller.roles, vec![Role::User, Role::Customer]);
        assert!(caller.has(Capability::Transfer));
        assert!(caller.has(Capability::Deposit));
        assert!(!caller.has(Capability::ManageAccounts));
    }
}
