//! Monetary amount rules.
//!
//! Balances, amounts and limits are stored as `NUMERIC(20,2)`. Any value the
//! column would round or reject is refused here, before it reaches storage.

use rust_decimal::Decimal;
use thiserror::Error;

/// Decimal places a stored amount may carry.
pub const MONEY_SCALE: u32 = 2;

/// Largest magnitude a `NUMERIC(20,2)` column holds: 999,999,999,999,999,999.99.
pub const MAX_MONEY: Decimal = Decimal::from_parts(0x630F_FFFF, 0x6BC7_5E2D, 0x5, false, 2);

/// An amount the money columns cannot represent exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoneyError {
    /// More than two significant decimal places.
    #[error("Amount {0} has more than 2 decimal places")]
    TooPrecise(Decimal),

    /// Beyond the column's magnitude.
    #[error("Amount {0} is out of range")]
    OutOfRange(Decimal),
}

/// Checks that `amount` is stored without rounding.
///
/// Trailing zeros are ignored, so `1.500` passes while `1.005` does not.
///
/// # Errors
///
/// Returns `TooPrecise` or `OutOfRange`.
pub fn check_money(amount: Decimal) -> Result<Decimal, MoneyError> {
    if amount.normalize().scale() > MONEY_SCALE {
        return Err(MoneyError::TooPrecise(amount));
    }
    if amount.abs() > MAX_MONEY {
        return Err(MoneyError::OutOfRange(amount));
    }
    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[test]
    fn test_max_money_matches_column() {
        assert_eq!(MAX_MONEY, dec!(999999999999999999.99));
    }

    #[rstest]
    #[case(dec!(0.01))]
    #[case(dec!(10.00))]
    #[case(dec!(1.500))]
    #[case(dec!(-42.10))]
    #[case(dec!(999999999999999999.99))]
    fn test_representable(#[case] amount: Decimal) {
        assert_eq!(check_money(amount), Ok(amount));
    }

    #[rstest]
    #[case(dec!(0.005))]
    #[case(dec!(0.004))]
    #[case(dec!(10.001))]
    fn test_sub_cent_rejected(#[case] amount: Decimal) {
        assert_eq!(check_money(amount), Err(MoneyError::TooPrecise(amount)));
    }

    #[rstest]
    #[case(dec!(1000000000000000000))]
    #[case(dec!(-1000000000000000000))]
    fn test_out_of_range_rejected(#[case] amount: Decimal) {
        assert_eq!(check_money(amount), Err(MoneyError::OutOfRange(amount)));
    }
}
