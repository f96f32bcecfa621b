//! User registration and profile rules.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::{PasswordError, Role, check_password_policy};
use crate::lifecycle::{LifecycleAction, LifecycleError, LifecycleStatus};

/// Profile image given to users who never uploaded one.
pub const DEFAULT_PROFILE_IMAGE: &str = "user-avatar.png";

/// Errors raised by user rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserRuleError {
    /// Password and confirmation differ.
    #[error("Passwords do not match")]
    PasswordMismatch,

    /// The old password did not verify.
    #[error("Old password is incorrect")]
    IncorrectOldPassword,

    /// Password policy violation.
    #[error(transparent)]
    WeakPassword(#[from] PasswordError),

    /// A required text field is blank.
    #[error("{0} must not be blank")]
    Blank(&'static str),

    /// The user already holds the role.
    #[error("User already has role: {0}")]
    RoleAlreadyGranted(Role),

    /// Deleted users cannot change state.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

impl UserRuleError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::RoleAlreadyGranted(_) => 409,
            Self::Lifecycle(_) => 404,
            _ => 400,
        }
    }

    /// Snake-case error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::PasswordMismatch => "password_mismatch",
            Self::IncorrectOldPassword => "incorrect_password",
            Self::WeakPassword(_) => "weak_password",
            Self::Blank(_) => "validation_error",
            Self::RoleAlreadyGranted(_) => "conflict",
            Self::Lifecycle(_) => "not_found",
        }
    }
}

/// Self-declared gender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    /// Male.
    Male,
    /// Female.
    Female,
    /// Other or undisclosed.
    Other,
}

impl Gender {
    /// Upper-case name, as stored.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Male => "MALE",
            Self::Female => "FEMALE",
            Self::Other => "OTHER",
        }
    }
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MALE" | "M" => Ok(Self::Male),
            "FEMALE" | "F" => Ok(Self::Female),
            "OTHER" => Ok(Self::Other),
            other => Err(format!("unknown gender: {other}")),
        }
    }
}

/// Checks a new password and its confirmation.
///
/// # Errors
///
/// `PasswordMismatch` first, then `WeakPassword`.
pub fn check_new_password(password: &str, confirmed: &str) -> Result<(), UserRuleError> {
    if password != confirmed {
        return Err(UserRuleError::PasswordMismatch);
    }
    check_password_policy(password)?;
    Ok(())
}

/// Trims a required text field.
///
/// # Errors
///
/// Returns `Blank(field)` for blank input.
pub fn required(field: &'static str, value: &str) -> Result<String, UserRuleError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(UserRuleError::Blank(field));
    }
    Ok(trimmed.to_string())
}

/// Roles after granting `role`.
///
/// # Errors
///
/// Returns `RoleAlreadyGranted` when the user holds it already.
pub fn grant_role(current: &[Role], role: Role) -> Result<Vec<Role>, UserRuleError> {
    if current.contains(&role) {
        return Err(UserRuleError::RoleAlreadyGranted(role));
    }
    let mut roles = current.to_vec();
    roles.push(role);
    roles.sort();
    Ok(roles)
}

/// Status after blocking (`blocked = true`) or unblocking a user.
///
/// # Errors
///
/// Deleted users cannot be blocked or unblocked.
pub fn set_blocked(
    current: LifecycleStatus,
    blocked: bool,
) -> Result<LifecycleStatus, UserRuleError> {
    let action = if blocked {
        LifecycleAction::Disable
    } else {
        LifecycleAction::Enable
    };
    Ok(current.apply(action)?)
}

/// Partial update of a user profile. Only present fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    /// Display name.
    pub name: Option<String>,
    /// Gender.
    pub gender: Option<Gender>,
    /// `Some(None)` clears the date of birth.
    pub dob: Option<Option<NaiveDate>>,
    /// `Some(None)` clears the student card.
    pub student_card_id: Option<Option<String>>,
}

impl UserPatch {
    /// Returns true when no field would change.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.gender.is_none()
            && self.dob.is_none()
            && self.student_card_id.is_none()
    }

    /// Normalizes present fields. A blank student card clears it.
    ///
    /// # Errors
    ///
    /// Returns `Blank("name")` for a blank name.
    pub fn validated(self) -> Result<Self, UserRuleError> {
        let name = self.name.as_deref().map(|n| required("name", n)).transpose()?;
        let student_card_id = self.student_card_id.map(|card| {
            card.map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
        });

        Ok(Self {
            name,
            student_card_id,
            ..self
        })
    }
}
