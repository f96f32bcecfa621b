//! Uniform soft lifecycle for persisted entities.
//!
//! Accounts, users, cards, branches and reference data share one status
//! column instead of separate `is_deleted` / `is_enabled` / `is_blocked`
//! flags. Rows are never physically removed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Soft lifecycle state of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleStatus {
    /// Visible and usable.
    Active,
    /// Visible but rejects mutating operations (a blocked user, a frozen account).
    Disabled,
    /// Hidden from every query. Terminal.
    Deleted,
}

/// A requested lifecycle change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    /// Move to `Active`.
    Enable,
    /// Move to `Disabled`.
    Disable,
    /// Move to `Deleted`.
    Delete,
}

/// Invalid lifecycle transition.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LifecycleError {
    /// Deleted entities cannot change state again.
    #[error("entity has been deleted")]
    AlreadyDeleted,
}

impl LifecycleStatus {
    /// True only for `Active`.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    /// True only for `Deleted`.
    #[must_use]
    pub const fn is_deleted(self) -> bool {
        matches!(self, Self::Deleted)
    }

    /// Applies a transition. Enabling an active entity or disabling a
    /// disabled one is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `LifecycleError::AlreadyDeleted` for any action on a deleted entity.
    pub const fn apply(self, action: LifecycleAction) -> Result<Self, LifecycleError> {
        if self.is_deleted() {
            return Err(LifecycleError::AlreadyDeleted);
        }
        Ok(match action {
            LifecycleAction::Enable => Self::Active,
            LifecycleAction::Disable => Self::Disabled,
            LifecycleAction::Delete => Self::Deleted,
        })
    }

    /// Lower-case name, as stored in the database enum.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Disabled => "disabled",
            Self::Deleted => "deleted",
        }
    }
}

impl std::fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(LifecycleStatus::Active, LifecycleAction::Disable, LifecycleStatus::Disabled)]
    #[case(LifecycleStatus::Disabled, LifecycleAction::Enable, LifecycleStatus::Active)]
    #[case(LifecycleStatus::Active, LifecycleAction::Enable, LifecycleStatus::Active)]
    #[case(LifecycleStatus::Disabled, LifecycleAction::Disable, LifecycleStatus::Disabled)]
    #[case(LifecycleStatus::Active, LifecycleAction::Delete, LifecycleStatus::Deleted)]
    #[case(LifecycleStatus::Disabled, LifecycleAction::Delete, LifecycleStatus::Deleted)]
    fn test_transitions(
        #[case] from: LifecycleStatus,
        #[case] action: LifecycleAction,
        #[case] to: LifecycleStatus,
    ) {
        assert_eq!(from.apply(action), Ok(to));
    }

    #[rstest]
    #[case(LifecycleAction::Enable)]
    #[case(LifecycleAction::Disable)]
    #[case(LifecycleAction::Delete)]
    fn test_deleted_is_terminal(#[case] action: LifecycleAction) {
        assert_eq!(
            LifecycleStatus::Deleted.apply(action),
            Err(LifecycleError::AlreadyDeleted)
        );
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&LifecycleStatus::Disabled).unwrap();
        assert_eq!(json, "\"DISABLED\"");
    }
}
