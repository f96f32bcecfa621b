//! Branch directory rules.

use chrono::NaiveTime;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised by branch rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BranchRuleError {
    /// A required text field is blank.
    #[error("{0} is required")]
    Blank(&'static str),

    /// Opening time is not before closing time.
    #[error("Opening time {open} must be before closing time {close}")]
    InvalidHours {
        /// Opening time.
        open: NaiveTime,
        /// Closing time.
        close: NaiveTime,
    },

    /// Coordinate outside its valid range.
    #[error("{axis} {value} is out of range")]
    InvalidCoordinate {
        /// `latitude` or `longitude`.
        axis: &'static str,
        /// Offending value.
        value: Decimal,
    },
}

/// Geographic position of a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coordinates {
    /// Degrees north, -90 to 90.
    pub latitude: Decimal,
    /// Degrees east, -180 to 180.
    pub longitude: Decimal,
}

impl Coordinates {
    /// # Errors
    ///
    /// Returns `InvalidCoordinate` for the first axis out of range.
    pub fn new(latitude: Decimal, longitude: Decimal) -> Result<Self, BranchRuleError> {
        check_axis("latitude", latitude, Decimal::from(90))?;
        check_axis("longitude", longitude, Decimal::from(180))?;
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

fn check_axis(axis: &'static str, value: Decimal, bound: Decimal) -> Result<(), BranchRuleError> {
    if value < -bound || value > bound {
        return Err(BranchRuleError::InvalidCoordinate { axis, value });
    }
    Ok(())
}

/// Checks that a branch opens before it closes.
///
/// # Errors
///
/// Returns `InvalidHours` otherwise.
pub fn check_hours(open: NaiveTime, close: NaiveTime) -> Result<(), BranchRuleError> {
    if open >= close {
        return Err(BranchRuleError::InvalidHours { open, close });
    }
    Ok(())
}

/// Trims a required text field.
///
/// # Errors
///
/// Returns `Blank(field)` for blank input.
pub fn required(field: &'static str, value: &str) -> Result<String, BranchRuleError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(BranchRuleError::Blank(field));
    }
    Ok(trimmed.to_string())
}

/// Partial update of a branch. Only present fields are applied;
/// `Some(None)` clears an optional column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchPatch {
    /// Branch name.
    pub name: Option<String>,
    /// Street address.
    pub address: Option<String>,
    /// City.
    pub city: Option<Option<String>>,
    /// Province.
    pub province: Option<Option<String>>,
    /// Position.
    pub coordinates: Option<Option<Coordinates>>,
    /// Contact phone.
    pub phone_number: Option<Option<String>>,
    /// Contact email.
    pub email: Option<Option<String>>,
    /// Opening time.
    pub open_time: Option<NaiveTime>,
    /// Closing time.
    pub close_time: Option<NaiveTime>,
    /// Free-form working days, e.g. "Mon-Fri".
    pub work_days: Option<Option<String>>,
}

impl BranchPatch {
    /// Normalizes present fields and checks the resulting hours against the
    /// current ones.
    ///
    /// # Errors
    ///
    /// `Blank` for a blank name or address, `InvalidHours` when the patched
    /// hours would not form a valid window.
    pub fn validated(
        self,
        current_open: NaiveTime,
        current_close: NaiveTime,
    ) -> Result<Self, BranchRuleError> {
        let name = self.name.as_deref().map(|v| required("name", v)).transpose()?;
        let address = self
            .address
            .as_deref()
            .map(|v| required("address", v))
            .transpose()?;

        check_hours(
            self.open_time.unwrap_or(current_open),
            self.close_time.unwrap_or(current_close),
        )?;

        Ok(Self {
            name,
            address,
            ..self
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_hours() {
        assert!(check_hours(time(8, 0), time(17, 0)).is_ok());
        assert!(check_hours(time(17, 0), time(8, 0)).is_err());
        assert!(check_hours(time(8, 0), time(8, 0)).is_err());
    }

    #[test]
    fn test_coordinates() {
        assert!(Coordinates::new(dec!(11.5564), dec!(104.9282)).is_ok());
        assert_eq!(
            Coordinates::new(dec!(91), dec!(0)),
            Err(BranchRuleError::InvalidCoordinate {
                axis: "latitude",
                value: dec!(91)
            })
        );
        assert!(Coordinates::new(dec!(0), dec!(-180.5)).is_err());
    }

    #[test]
    fn test_patch_checks_combined_hours() {
        let patch = BranchPatch {
            close_time: Some(time(7, 0)),
            ..BranchPatch::default()
        };
        assert!(matches!(
            patch.validated(time(8, 0), time(17, 0)),
            Err(BranchRuleError::InvalidHours { .. })
        ));

        let patch = BranchPatch {
            name: Some("  Toul Kork ".to_string()),
            open_time: Some(time(7, 30)),
            ..BranchPatch::default()
        }
        .validated(time(8, 0), time(17, 0))
        .unwrap();
        assert_eq!(patch.name.as_deref(), Some("Toul Kork"));
    }

    #[test]
    fn test_blank_address() {
        let patch = BranchPatch {
            address: Some(" ".to_string()),
            ..BranchPatch::default()
        };
        assert_eq!(
            patch.validated(time(8, 0), time(17, 0)),
            Err(BranchRuleError::Blank("address"))
        );
    }
}
