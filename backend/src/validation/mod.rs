//! Field rules for member rows and the register form.
//!
//! # Import rows
//!
//! [`validate_row`] checks every rule (no short-circuit) and appends
//! messages in a fixed order so error lists are deterministic:
//!
//! 1. each required field must be non-empty after trimming:
//!    `"<Column> is required"`
//! 2. a non-empty Family Member Count must parse as an integer >= 0:
//!    `"Family Member Count must be a non-negative number"`
//! 3. with [`ValidationRules::require_phone_digits`], phone numbers need at
//!    least [`MIN_PHONE_DIGITS`] digits
//!
//! Year flags are derived from text and can never fail (see
//! [`crate::models::flag_from_text`]).
//!
//! # Register form
//!
//! [`validate_form`] returns one message per invalid field, worded for
//! inline display next to the input.
//!
//! # Example
//!
//! ```rust,ignore
//! use memberreg::models::RawMember;
//! use memberreg::validation::{validate_row, ValidationRules};
//!
//! let raw = RawMember { name: "Asha".into(), ..Default::default() };
//! let errors = validate_row(&raw, &ValidationRules::default()).unwrap_err();
//! assert_eq!(errors[0], "Membership Number is required");
//! ```

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::MIN_PHONE_DIGITS;
use crate::models::{Field, RawMember};

/// Message for an unusable Family Member Count on an import row.
pub const FAMILY_COUNT_ERROR: &str = "Family Member Count must be a non-negative number";

/// Per-field form errors, in schema order.
pub type FormErrors = BTreeMap<Field, String>;

/// Optional rules for import rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRules {
    /// Require at least [`MIN_PHONE_DIGITS`] digits in Mobile No and a
    /// non-empty Alternate Mobile.
    pub require_phone_digits: bool,
}

static LEADING_INT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([+-]?)(\d+)").expect("static regex"));

/// Lenient integer parse: leading sign and digits are read, trailing
/// characters ignored (`"12abc"` is 12, `"1.5"` is 1).
///
/// Returns `None` when there are no leading digits or the magnitude does not
/// fit in a `u64`.
pub fn parse_leading_int(value: &str) -> Option<i128> {
    let caps = LEADING_INT.captures(value)?;
    let magnitude: u64 = caps[2].parse().ok()?;
    let magnitude = i128::from(magnitude);
    if &caps[1] == "-" {
        Some(-magnitude)
    } else {
        Some(magnitude)
    }
}

/// Parse a family member count, accepting only values >= 0.
pub fn parse_family_count(value: &str) -> Option<u64> {
    parse_leading_int(value).and_then(|n| u64::try_from(n).ok())
}

/// Number of ASCII digits in a string.
pub fn count_digits(value: &str) -> usize {
    value.chars().filter(char::is_ascii_digit).count()
}

/// Check one import row.
///
/// # Returns
/// * `Ok(())` if the row is valid
/// * `Err(Vec<String>)` with every failed rule, in rule order
pub fn validate_row(raw: &RawMember, rules: &ValidationRules) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    for field in Field::REQUIRED {
        if raw.text(field).trim().is_empty() {
            errors.push(format!("{} is required", field.column()));
        }
    }

    let count = raw.family_member_count.trim();
    if !count.is_empty() && parse_family_count(count).is_none() {
        errors.push(FAMILY_COUNT_ERROR.to_string());
    }

    if rules.require_phone_digits {
        for field in [Field::MobileNo, Field::AlternateMobile] {
            let value = raw.text(field).trim();
            if !value.is_empty() && count_digits(value) < MIN_PHONE_DIGITS {
                errors.push(format!(
                    "{} must contain at least {} digits",
                    field.column(),
                    MIN_PHONE_DIGITS
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Quick check: true if the row passes every rule.
pub fn is_valid_row(raw: &RawMember, rules: &ValidationRules) -> bool {
    validate_row(raw, rules).is_ok()
}

/// Check the register form. Phone numbers always need
/// [`MIN_PHONE_DIGITS`] digits here.
pub fn validate_form(raw: &RawMember) -> Result<(), FormErrors> {
    let mut errors = FormErrors::new();

    let required = [
        (Field::MembershipNumber, "Membership Number is required."),
        (Field::Name, "Full name is required."),
        (Field::MobileNo, "Mobile number is required."),
        (Field::Address, "Address is required."),
        (Field::Area, "Area is required."),
        (Field::SpouseName, "Spouse name is required."),
    ];
    for (field, message) in required {
        if raw.text(field).trim().is_empty() {
            errors.insert(field, message.to_string());
        }
    }

    if !errors.contains_key(&Field::MobileNo) && count_digits(&raw.mobile_no) < MIN_PHONE_DIGITS {
        errors.insert(Field::MobileNo, "Enter a valid mobile number.".to_string());
    }

    let alternate = raw.alternate_mobile.trim();
    if !alternate.is_empty() && count_digits(alternate) < MIN_PHONE_DIGITS {
        errors.insert(
            Field::AlternateMobile,
            "Enter a valid alternate mobile number.".to_string(),
        );
    }

    let count = raw.family_member_count.trim();
    if !count.is_empty() && parse_family_count(count).is_none() {
        errors.insert(
            Field::FamilyMemberCount,
            "Family member count must be a non-negative whole number.".to_string(),
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
