//! Membership years and the field descriptor table.
//!
//! Every column the registry knows about is a [`Field`]. The ordered list
//! returned by [`Field::all`] drives CSV headers, template rows, export rows,
//! row resolution and record mapping, so the ten year flag/receipt pairs are
//! handled by one loop instead of twenty hand-written attributes.

use serde::{Serialize, Serializer};

// =============================================================================
// Membership Year
// =============================================================================

/// A year a member may have been active (paid) in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MembershipYear {
    /// Any year before 2021, tracked as a single bucket.
    PriorTo2021,
    Y2022,
    Y2023,
    Y2024,
    Y2025,
    Y2026,
    Y2027,
    Y2028,
    Y2029,
    Y2030,
}

impl MembershipYear {
    /// Number of tracked years.
    pub const COUNT: usize = 10;

    /// All years in column order.
    pub const ALL: [MembershipYear; Self::COUNT] = [
        Self::PriorTo2021,
        Self::Y2022,
        Self::Y2023,
        Self::Y2024,
        Self::Y2025,
        Self::Y2026,
        Self::Y2027,
        Self::Y2028,
        Self::Y2029,
        Self::Y2030,
    ];

    /// Position of this year in [`Self::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Human label, also the flag column header.
    pub fn label(self) -> &'static str {
        match self {
            Self::PriorTo2021 => "Prior to 2021",
            Self::Y2022 => "2022",
            Self::Y2023 => "2023",
            Self::Y2024 => "2024",
            Self::Y2025 => "2025",
            Self::Y2026 => "2026",
            Self::Y2027 => "2027",
            Self::Y2028 => "2028",
            Self::Y2029 => "2029",
            Self::Y2030 => "2030",
        }
    }

    /// Header of the receipt column paired with this year.
    pub fn receipt_column(self) -> &'static str {
        match self {
            Self::PriorTo2021 => "Receipt Prior to 2021",
            Self::Y2022 => "Receipt 2022",
            Self::Y2023 => "Receipt 2023",
            Self::Y2024 => "Receipt 2024",
            Self::Y2025 => "Receipt 2025",
            Self::Y2026 => "Receipt 2026",
            Self::Y2027 => "Receipt 2027",
            Self::Y2028 => "Receipt 2028",
            Self::Y2029 => "Receipt 2029",
            Self::Y2030 => "Receipt 2030",
        }
    }

    /// Key of the flag in the store's record shape.
    pub fn flag_key(self) -> &'static str {
        match self {
            Self::PriorTo2021 => "priorTo2021",
            Self::Y2022 => "year2022",
            Self::Y2023 => "year2023",
            Self::Y2024 => "year2024",
            Self::Y2025 => "year2025",
            Self::Y2026 => "year2026",
            Self::Y2027 => "year2027",
            Self::Y2028 => "year2028",
            Self::Y2029 => "year2029",
            Self::Y2030 => "year2030",
        }
    }

    /// Key of the receipt in the store's record shape.
    pub fn receipt_key(self) -> &'static str {
        match self {
            Self::PriorTo2021 => "receiptPriorTo2021",
            Self::Y2022 => "receipt2022",
            Self::Y2023 => "receipt2023",
            Self::Y2024 => "receipt2024",
            Self::Y2025 => "receipt2025",
            Self::Y2026 => "receipt2026",
            Self::Y2027 => "receipt2027",
            Self::Y2028 => "receipt2028",
            Self::Y2029 => "receipt2029",
            Self::Y2030 => "receipt2030",
        }
    }

    /// Look a year up by its label (`"Prior to 2021"`, `"2024"`), ignoring case.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|year| year.label().eq_ignore_ascii_case(label))
    }
}

/// Derive a year flag from free text.
///
/// `true`, `1` and `yes` (any case) mean active, anything else means not
/// active. Never fails.
pub fn flag_from_text(value: &str) -> bool {
    let value = value.trim();
    ["true", "1", "yes"]
        .iter()
        .any(|token| value.eq_ignore_ascii_case(token))
}

// =============================================================================
// Field Descriptors
// =============================================================================

/// Symbolic identifier for every member field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    MembershipNumber,
    Name,
    MobileNo,
    Address,
    Area,
    SpouseName,
    AlternateMobile,
    FamilyMemberCount,
    YearFlag(MembershipYear),
    Receipt(MembershipYear),
}

impl Field {
    /// Fields that must be non-empty.
    pub const REQUIRED: [Field; 6] = [
        Field::MembershipNumber,
        Field::Name,
        Field::MobileNo,
        Field::Address,
        Field::Area,
        Field::SpouseName,
    ];

    /// Optional personal fields.
    pub const OPTIONAL: [Field; 2] = [Field::AlternateMobile, Field::FamilyMemberCount];

    /// Every field in schema order: required, optional, then one
    /// flag/receipt pair per year.
    pub fn all() -> impl Iterator<Item = Field> {
        Self::REQUIRED
            .into_iter()
            .chain(Self::OPTIONAL)
            .chain(
                MembershipYear::ALL
                    .into_iter()
                    .flat_map(|year| [Field::YearFlag(year), Field::Receipt(year)]),
            )
    }

    /// CSV column header.
    pub fn column(self) -> &'static str {
        match self {
            Field::MembershipNumber => "Membership Number",
            Field::Name => "Name",
            Field::MobileNo => "Mobile No",
            Field::Address => "Address",
            Field::Area => "Area",
            Field::SpouseName => "Spouse Name",
            Field::AlternateMobile => "Alternate Mobile",
            Field::FamilyMemberCount => "Family Member Count",
            Field::YearFlag(year) => year.label(),
            Field::Receipt(year) => year.receipt_column(),
        }
    }

    /// camelCase key used by the store and the JSON API.
    pub fn key(self) -> &'static str {
        match self {
            Field::MembershipNumber => "membershipNumber",
            Field::Name => "name",
            Field::MobileNo => "mobileNo",
            Field::Address => "address",
            Field::Area => "area",
            Field::SpouseName => "spouseName",
            Field::AlternateMobile => "alternateMobile",
            Field::FamilyMemberCount => "familyMemberCount",
            Field::YearFlag(year) => year.flag_key(),
            Field::Receipt(year) => year.receipt_key(),
        }
    }

    /// Phone fields keep digits only when typed into the register form.
    pub fn is_phone(self) -> bool {
        matches!(self, Field::MobileNo | Field::AlternateMobile)
    }

    /// Find a field by its camelCase key.
    pub fn from_key(key: &str) -> Option<Field> {
        Field::all().find(|field| field.key() == key)
    }
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_order() {
        let columns: Vec<&str> = Field::all().map(Field::column).collect();
        assert_eq!(columns.len(), 8 + 2 * MembershipYear::COUNT);
        assert_eq!(&columns[..8], &[
            "Membership Number",
            "Name",
            "Mobile No",
            "Address",
            "Area",
            "Spouse Name",
            "Alternate Mobile",
            "Family Member Count",
        ]);
        assert_eq!(columns[8], "Prior to 2021");
        assert_eq!(columns[9], "Receipt Prior to 2021");
        assert_eq!(columns[10], "2022");
        assert_eq!(columns[27], "Receipt 2030");
    }

    #[test]
    fn test_year_index_matches_position() {
        for (i, year) in MembershipYear::ALL.into_iter().enumerate() {
            assert_eq!(year.index(), i);
        }
    }

    #[test]
    fn test_year_from_label() {
        assert_eq!(MembershipYear::from_label("prior TO 2021"), Some(MembershipYear::PriorTo2021));
        assert_eq!(MembershipYear::from_label(" 2026 "), Some(MembershipYear::Y2026));
        assert_eq!(MembershipYear::from_label("2021"), None);
    }

    #[test]
    fn test_flag_tokens() {
        for token in ["true", "TRUE", "1", "yes", "Yes", " yes "] {
            assert!(flag_from_text(token), "{token} should be active");
        }
        for token in ["", "No", "false", "0", "y", "2", "on"] {
            assert!(!flag_from_text(token), "{token} should be inactive");
        }
    }

    #[test]
    fn test_keys_are_unique() {
        let mut keys: Vec<&str> = Field::all().map(Field::key).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), 28);
        assert_eq!(Field::from_key("receipt2024"), Some(Field::Receipt(MembershipYear::Y2024)));
        assert_eq!(Field::from_key("nope"), None);
    }
}
