//! Payment card issuing rules.

use chrono::{Months, NaiveDate};
use rand::Rng;
use thiserror::Error;

/// Digits in a card number.
pub const CARD_NUMBER_LEN: usize = 16;

/// Digits in a CVV.
pub const CVV_LEN: usize = 3;

/// Issuer prefix of every generated card number.
pub const CARD_NUMBER_PREFIX: char = '4';

/// Cards expire this many months after issue.
pub const CARD_VALIDITY_MONTHS: u32 = 48;

/// Errors raised by card rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CardRuleError {
    /// Card holder names cannot be blank.
    #[error("Card holder must not be blank")]
    BlankHolder,

    /// No unique card number could be generated.
    #[error("Could not generate a unique card number after {0} attempts")]
    NumberSpaceExhausted(u32),
}

/// Freshly generated card secrets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCard {
    /// Sixteen digits, starting with the issuer prefix.
    pub number: String,
    /// Three digits.
    pub cvv: String,
    /// Day of issue.
    pub issued_at: NaiveDate,
    /// Issue day plus the validity period.
    pub expires_at: NaiveDate,
}

impl IssuedCard {
    /// Generates a number, a CVV and the validity window starting `today`.
    #[must_use]
    pub fn generate(today: NaiveDate) -> Self {
        Self {
            number: generate_card_number(),
            cvv: generate_cvv(),
            issued_at: today,
            expires_at: expiry_for(today),
        }
    }
}

/// Generates a random card number with the issuer prefix.
#[must_use]
pub fn generate_card_number() -> String {
    let mut rng = rand::rng();
    std::iter::once(CARD_NUMBER_PREFIX)
        .chain((1..CARD_NUMBER_LEN).map(|_| random_digit(&mut rng)))
        .collect()
}

/// Generates a random CVV.
#[must_use]
pub fn generate_cvv() -> String {
    let mut rng = rand::rng();
    (0..CVV_LEN).map(|_| random_digit(&mut rng)).collect()
}

/// Expiry date for a card issued on `issued_at`.
#[must_use]
pub fn expiry_for(issued_at: NaiveDate) -> NaiveDate {
    issued_at
        .checked_add_months(Months::new(CARD_VALIDITY_MONTHS))
        .unwrap_or(NaiveDate::MAX)
}

/// Returns true if `number` has the shape of a generated card number.
#[must_use]
pub fn is_card_number(number: &str) -> bool {
    number.len() == CARD_NUMBER_LEN
        && number.starts_with(CARD_NUMBER_PREFIX)
        && number.bytes().all(|b| b.is_ascii_digit())
}

/// Trims a holder name.
///
/// # Errors
///
/// Returns `BlankHolder` for blank names.
pub fn normalize_holder(holder: &str) -> Result<String, CardRuleError> {
    let trimmed = holder.trim();
    if trimmed.is_empty() {
        return Err(CardRuleError::BlankHolder);
    }
    Ok(trimmed.to_string())
}

fn random_digit(rng: &mut impl Rng) -> char {
    char::from(b'0' + rng.random_range(0..10u8))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_generated_number_shape() {
        for _ in 0..200 {
            let number = generate_card_number();
            assert!(is_card_number(&number), "{number}");
        }
    }

    #[test]
    fn test_generated_cvv_shape() {
        let cvv = generate_cvv();
        assert_eq!(cvv.len(), CVV_LEN);
        assert!(cvv.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_expiry_is_four_years_out() {
        assert_eq!(expiry_for(date(2026, 10, 19)), date(2030, 10, 19));
        assert_eq!(expiry_for(date(2028, 2, 29)), date(2032, 2, 29));
    }

    #[test]
    fn test_issue() {
        let today = date(2026, 1, 31);
        let card = IssuedCard::generate(today);
        assert_eq!(card.issued_at, today);
        assert_eq!(card.expires_at, date(2030, 1, 31));
        assert!(is_card_number(&card.number));
    }

    #[test]
    fn test_is_card_number_rejects() {
        assert!(!is_card_number("5123456789012345"));
        assert!(!is_card_number("412345678901234"));
        assert!(!is_card_number("41234567890123a5"));
    }

    #[test]
    fn test_normalize_holder() {
        assert_eq!(normalize_holder("  Dara  ").unwrap(), "Dara");
        assert_eq!(normalize_holder(" "), Err(CardRuleError::BlankHolder));
    }
}
