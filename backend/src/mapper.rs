//! Raw member → store record mapping.
//!
//! - text fields are trimmed
//! - an empty Alternate Mobile becomes `None`, otherwise it keeps digits only
//! - Family Member Count becomes `Some(u64)` when it parses as an integer >= 0
//! - year flags follow the configured [`FlagPolicy`]
//! - empty receipts become `None`

use serde::{Deserialize, Serialize};

use crate::models::{MemberRecord, MembershipYear, RawMember, YearEntry};
use crate::validation::parse_family_count;

/// How an inactive year flag is represented in the store's record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlagPolicy {
    /// `false` is sent as "not set" (the key is omitted).
    #[default]
    OmitFalse,
    /// `false` is sent explicitly.
    ExplicitFalse,
}

impl FlagPolicy {
    /// Parse `omit-false` / `explicit-false` (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "omit-false" => Some(Self::OmitFalse),
            "explicit-false" => Some(Self::ExplicitFalse),
            _ => None,
        }
    }

    /// Store representation of a flag.
    pub fn apply(self, active: bool) -> Option<bool> {
        match (self, active) {
            (_, true) => Some(true),
            (Self::OmitFalse, false) => None,
            (Self::ExplicitFalse, false) => Some(false),
        }
    }
}

/// Trimmed text, `None` when empty.
pub fn optional_text(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Keep ASCII digits only.
pub fn digits_only(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

/// Map a raw member (import row or form) to the store record shape.
pub fn to_record(raw: &RawMember, policy: FlagPolicy) -> MemberRecord {
    let mut record = MemberRecord {
        membership_number: raw.membership_number.trim().to_string(),
        name: raw.name.trim().to_string(),
        mobile_no: raw.mobile_no.trim().to_string(),
        address: raw.address.trim().to_string(),
        area: raw.area.trim().to_string(),
        spouse_name: raw.spouse_name.trim().to_string(),
        alternate_mobile: optional_text(&raw.alternate_mobile)
            .map(|alternate| digits_only(&alternate))
            .filter(|digits| !digits.is_empty()),
        family_member_count: parse_family_count(raw.family_member_count.trim()),
        ..Default::default()
    };

    for year in MembershipYear::ALL {
        let source = raw.years.get(year);
        *record.years.get_mut(year) = YearEntry {
            active: policy.apply(source.active),
            receipt: optional_text(&source.receipt),
        };
    }

    record
}

/// Map many raw members with the same policy.
pub fn to_records<'a, I>(raws: I, policy: FlagPolicy) -> Vec<MemberRecord>
where
    I: IntoIterator<Item = &'a RawMember>,
{
    raws.into_iter().map(|raw| to_record(raw, policy)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> RawMember {
        RawMember {
            membership_number: " MEM001 ".into(),
            name: "John Doe ".into(),
            mobile_no: "98765 43210".into(),
            address: "123 Main St, City".into(),
            area: "Downtown".into(),
            spouse_name: "Jane Doe".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_text_fields_trimmed() {
        let record = to_record(&raw(), FlagPolicy::default());
        assert_eq!(record.membership_number, "MEM001");
        assert_eq!(record.name, "John Doe");
        // Mobile No passes through as entered.
        assert_eq!(record.mobile_no, "98765 43210");
    }

    #[test]
    fn test_empty_optionals_are_absent() {
        let record = to_record(&raw(), FlagPolicy::default());
        assert_eq!(record.alternate_mobile, None);
        assert_eq!(record.family_member_count, None);
        for year in MembershipYear::ALL {
            assert_eq!(record.years.get(year), &YearEntry::default());
        }
    }

    #[test]
    fn test_alternate_mobile_digits() {
        let mut raw = raw();
        raw.alternate_mobile = " +91-98765 43211 ".into();
        let record = to_record(&raw, FlagPolicy::default());
        assert_eq!(record.alternate_mobile.as_deref(), Some("919876543211"));

        raw.alternate_mobile = "n/a".into();
        assert_eq!(to_record(&raw, FlagPolicy::default()).alternate_mobile, None);
    }

    #[test]
    fn test_family_count_coercion() {
        let mut raw = raw();
        for (input, expected) in [
            ("4", Some(4)),
            ("0", Some(0)),
            ("12abc", Some(12)),
            ("-1", None),
            ("abc", None),
            ("9007199254740993", Some(9_007_199_254_740_993)),
        ] {
            raw.family_member_count = input.into();
            assert_eq!(to_record(&raw, FlagPolicy::default()).family_member_count, expected, "{input}");
        }
    }

    #[test]
    fn test_flag_policy_omit_false() {
        let mut raw = raw();
        raw.set_flag(MembershipYear::Y2024, true);
        raw.years.get_mut(MembershipYear::Y2024).receipt = "R-2024-7".into();
        let record = to_record(&raw, FlagPolicy::OmitFalse);

        let entry = record.years.get(MembershipYear::Y2024);
        assert_eq!(entry.active, Some(true));
        assert_eq!(entry.receipt.as_deref(), Some("R-2024-7"));
        assert_eq!(record.years.get(MembershipYear::Y2023).active, None);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["year2024"], true);
        assert!(json.get("year2023").is_none());
    }

    #[test]
    fn test_flag_policy_explicit_false() {
        let mut raw = raw();
        raw.set_flag(MembershipYear::PriorTo2021, true);
        let record = to_record(&raw, FlagPolicy::ExplicitFalse);

        assert_eq!(record.years.get(MembershipYear::PriorTo2021).active, Some(true));
        assert_eq!(record.years.get(MembershipYear::Y2030).active, Some(false));

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["year2030"], false);
        assert!(json.get("receipt2030").is_none());
    }

    #[test]
    fn test_receipt_without_flag_is_kept() {
        let mut raw = raw();
        raw.years.get_mut(MembershipYear::Y2022).receipt = "R-1".into();
        let record = to_record(&raw, FlagPolicy::OmitFalse);
        let entry = record.years.get(MembershipYear::Y2022);
        assert_eq!(entry.active, None);
        assert_eq!(entry.receipt.as_deref(), Some("R-1"));
    }

    #[test]
    fn test_policy_names() {
        assert_eq!(FlagPolicy::from_name("Explicit-False"), Some(FlagPolicy::ExplicitFalse));
        assert_eq!(FlagPolicy::from_name("omit-false"), Some(FlagPolicy::OmitFalse));
        assert_eq!(FlagPolicy::from_name("false"), None);
    }
}
