//! Password hashing with Argon2id and the password policy.

use argon2::{
    Argon2, PasswordHash,
    password_hash::{PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use thiserror::Error;

/// Minimum password length accepted by the policy.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Errors that can occur during password operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PasswordError {
    /// Failed to hash password.
    #[error("failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify password.
    #[error("failed to verify password: {0}")]
    VerifyError(String),

    /// Invalid password hash format.
    #[error("invalid password hash format")]
    InvalidHash,

    /// Password does not satisfy the policy.
    #[error("password must be at least 8 characters and contain upper case, lower case, digit and symbol characters")]
    TooWeak,
}

/// Hashes a password using Argon2id, returning a PHC string.
///
/// ```
/// use mbank_core::auth::hash_password;
///
/// let hash = hash_password("Qwer123@#$").unwrap();
/// assert!(hash.starts_with("$argon2id$"));
/// ```
///
/// # Errors
///
/// Returns `PasswordError::HashError` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::HashError(e.to_string()))
}

/// Verifies a password against a stored PHC hash.
///
/// # Errors
///
/// Returns `PasswordError::InvalidHash` if the hash format is invalid.
/// Returns `PasswordError::VerifyError` if verification fails unexpectedly.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHash)?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(e.to_string())),
    }
}

/// Checks a new password against the policy.
///
/// # Errors
///
/// Returns `PasswordError::TooWeak` when any rule fails.
pub fn check_password_policy(password: &str) -> Result<(), PasswordError> {
    let long_enough = password.chars().count() >= MIN_PASSWORD_LEN;
    let upper = password.chars().any(|c| c.is_ascii_uppercase());
    let lower = password.chars().any(|c| c.is_ascii_lowercase());
    let digit = password.chars().any(|c| c.is_ascii_digit());
    let symbol = password.chars().any(|c| !c.is_alphanumeric() && !c.is_whitespace());

    if long_enough && upper && lower && digit && symbol {
        Ok(())
    } else {
        Err(PasswordError::TooWeak)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct_password").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct_password", &hash).unwrap());
        assert!(!verify_password("wrong_password", &hash).unwrap());
    }

    #[test]
    fn test_same_password_different_salts() {
        let hash1 = hash_password("password1").unwrap();
        let hash2 = hash_password("password1").unwrap();
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_invalid_hash_format() {
        let result = verify_password("password", "invalid_hash");
        assert_eq!(result, Err(PasswordError::InvalidHash));
    }

    #[rstest]
    #[case("Qwer123@#$", true)]
    #[case("Sh0rt!", false)]
    #[case("alllowercase1!", false)]
    #[case("ALLUPPERCASE1!", false)]
    #[case("NoDigitsHere!", false)]
    #[case("NoSymbols123", false)]
    fn test_password_policy(#[case] password: &str, #[case] ok: bool) {
        assert_eq!(check_password_policy(password).is_ok(), ok);
    }
}
