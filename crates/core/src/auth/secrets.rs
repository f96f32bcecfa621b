//! One-time secrets sent to users by email.

use rand::{Rng, distr::Alphanumeric};

/// Length of a generated temporary password.
const TEMPORARY_PASSWORD_LEN: usize = 10;

/// Generates a six digit numeric verification code, zero padded.
#[must_use]
pub fn generate_verification_code() -> String {
    let code: u32 = rand::rng().random_range(0..1_000_000);
    format!("{code:06}")
}

/// Generates a random alphanumeric temporary password.
#[must_use]
pub fn generate_temporary_password() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TEMPORARY_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_code_is_six_digits() {
        for _ in 0..100 {
            let code = generate_verification_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_temporary_password_shape() {
        let password = generate_temporary_password();
        assert_eq!(password.len(), TEMPORARY_PASSWORD_LEN);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(password, generate_temporary_password());
    }
}
