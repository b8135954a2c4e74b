//! Domain models for the member registry.
//!
//! - [`RawMember`] - untyped field values, shared by CSV rows and the register form
//! - [`MemberRecord`] - canonical record shape sent to and read from the store
//! - [`StoredMember`] - a record plus the id the store assigned
//! - [`Field`] / [`MembershipYear`] - the descriptor table (see [`years`])

pub mod years;

use std::collections::BTreeMap;

use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use years::{flag_from_text, Field, MembershipYear};

/// Identifier assigned by the store.
pub type MemberId = String;

// =============================================================================
// Raw (untyped) member
// =============================================================================

/// Raw state of one year: the flag and the receipt text as entered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawYear {
    pub active: bool,
    pub receipt: String,
}

/// Raw year pairs, indexed by [`MembershipYear`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawYears([RawYear; MembershipYear::COUNT]);

impl RawYears {
    pub fn get(&self, year: MembershipYear) -> &RawYear {
        &self.0[year.index()]
    }

    pub fn get_mut(&mut self, year: MembershipYear) -> &mut RawYear {
        &mut self.0[year.index()]
    }
}

impl Serialize for RawYears {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(MembershipYear::COUNT * 2))?;
        for year in MembershipYear::ALL {
            let entry = self.get(year);
            map.serialize_entry(year.flag_key(), &entry.active)?;
            map.serialize_entry(year.receipt_key(), &entry.receipt)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RawYears {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let values = BTreeMap::<String, Value>::deserialize(deserializer)?;
        let mut years = RawYears::default();
        for year in MembershipYear::ALL {
            let slot = years.get_mut(year);
            if let Some(value) = values.get(year.flag_key()) {
                slot.active = flag_from_value(value);
            }
            if let Some(Value::String(receipt)) = values.get(year.receipt_key()) {
                slot.receipt = receipt.trim().to_string();
            }
        }
        Ok(years)
    }
}

fn flag_from_value(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => flag_from_text(s),
        Value::Number(n) => n.as_u64() == Some(1),
        _ => false,
    }
}

/// Borrowed value of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Flag(bool),
}

/// Member fields as strings/booleans, before validation and coercion.
///
/// This is the common shape of a parsed CSV row and of the register form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMember {
    #[serde(default)]
    pub membership_number: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mobile_no: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub area: String,
    #[serde(default)]
    pub spouse_name: String,
    #[serde(default)]
    pub alternate_mobile: String,
    #[serde(default)]
    pub family_member_count: String,
    #[serde(flatten)]
    pub years: RawYears,
}

impl RawMember {
    /// Read any field through the descriptor table.
    pub fn get(&self, field: Field) -> FieldValue<'_> {
        match field {
            Field::MembershipNumber => FieldValue::Text(&self.membership_number),
            Field::Name => FieldValue::Text(&self.name),
            Field::MobileNo => FieldValue::Text(&self.mobile_no),
            Field::Address => FieldValue::Text(&self.address),
            Field::Area => FieldValue::Text(&self.area),
            Field::SpouseName => FieldValue::Text(&self.spouse_name),
            Field::AlternateMobile => FieldValue::Text(&self.alternate_mobile),
            Field::FamilyMemberCount => FieldValue::Text(&self.family_member_count),
            Field::YearFlag(year) => FieldValue::Flag(self.years.get(year).active),
            Field::Receipt(year) => FieldValue::Text(&self.years.get(year).receipt),
        }
    }

    /// Text of a field; flags read as `"true"` / `""`.
    pub fn text(&self, field: Field) -> &str {
        match self.get(field) {
            FieldValue::Text(text) => text,
            FieldValue::Flag(true) => "true",
            FieldValue::Flag(false) => "",
        }
    }

    /// Write any field from text. Flags are derived with [`flag_from_text`].
    pub fn set(&mut self, field: Field, value: &str) {
        match field {
            Field::YearFlag(year) => self.years.get_mut(year).active = flag_from_text(value),
            _ => {
                if let Some(slot) = self.text_slot_mut(field) {
                    *slot = value.to_string();
                }
            }
        }
    }

    pub fn set_flag(&mut self, year: MembershipYear, active: bool) {
        self.years.get_mut(year).active = active;
    }

    fn text_slot_mut(&mut self, field: Field) -> Option<&mut String> {
        let slot = match field {
            Field::MembershipNumber => &mut self.membership_number,
            Field::Name => &mut self.name,
            Field::MobileNo => &mut self.mobile_no,
            Field::Address => &mut self.address,
            Field::Area => &mut self.area,
            Field::SpouseName => &mut self.spouse_name,
            Field::AlternateMobile => &mut self.alternate_mobile,
            Field::FamilyMemberCount => &mut self.family_member_count,
            Field::Receipt(year) => &mut self.years.get_mut(year).receipt,
            Field::YearFlag(_) => return None,
        };
        Some(slot)
    }
}

impl From<&MemberRecord> for RawMember {
    fn from(record: &MemberRecord) -> Self {
        let mut raw = RawMember {
            membership_number: record.membership_number.clone(),
            name: record.name.clone(),
            mobile_no: record.mobile_no.clone(),
            address: record.address.clone(),
            area: record.area.clone(),
            spouse_name: record.spouse_name.clone(),
            alternate_mobile: record.alternate_mobile.clone().unwrap_or_default(),
            family_member_count: record
                .family_member_count
                .map(|count| count.to_string())
                .unwrap_or_default(),
            years: RawYears::default(),
        };
        for year in MembershipYear::ALL {
            let entry = record.years.get(year);
            let slot = raw.years.get_mut(year);
            slot.active = entry.active.unwrap_or(false);
            slot.receipt = entry.receipt.clone().unwrap_or_default();
        }
        raw
    }
}

// =============================================================================
// Canonical record
// =============================================================================

/// One year as stored: `None` means "not set".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct YearEntry {
    pub active: Option<bool>,
    pub receipt: Option<String>,
}

/// Year entries of a record, indexed by [`MembershipYear`].
///
/// Serialized flat (`year2024`, `receipt2024`, ...) and only for entries
/// that are set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct YearEntries([YearEntry; MembershipYear::COUNT]);

impl YearEntries {
    pub fn get(&self, year: MembershipYear) -> &YearEntry {
        &self.0[year.index()]
    }

    pub fn get_mut(&mut self, year: MembershipYear) -> &mut YearEntry {
        &mut self.0[year.index()]
    }

    /// Years explicitly flagged active.
    pub fn active_years(&self) -> impl Iterator<Item = MembershipYear> + '_ {
        MembershipYear::ALL
            .into_iter()
            .filter(|year| self.get(*year).active == Some(true))
    }
}

impl Serialize for YearEntries {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for year in MembershipYear::ALL {
            let entry = self.get(year);
            if let Some(active) = entry.active {
                map.serialize_entry(year.flag_key(), &active)?;
            }
            if let Some(receipt) = &entry.receipt {
                map.serialize_entry(year.receipt_key(), receipt)?;
            }
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for YearEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let values = BTreeMap::<String, Value>::deserialize(deserializer)?;
        let mut years = YearEntries::default();
        for year in MembershipYear::ALL {
            let slot = years.get_mut(year);
            slot.active = match values.get(year.flag_key()) {
                None | Some(Value::Null) => None,
                Some(value) => Some(flag_from_value(value)),
            };
            slot.receipt = match values.get(year.receipt_key()) {
                Some(Value::String(receipt)) if !receipt.trim().is_empty() => {
                    Some(receipt.trim().to_string())
                }
                _ => None,
            };
        }
        Ok(years)
    }
}

/// A member as submitted to the store.
///
/// Optional fields are `None` when absent, never an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRecord {
    pub membership_number: String,
    pub name: String,
    pub mobile_no: String,
    pub address: String,
    pub area: String,
    pub spouse_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternate_mobile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_member_count: Option<u64>,
    #[serde(flatten)]
    pub years: YearEntries,
}

/// A record as returned by the store, with its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMember {
    pub id: MemberId,
    #[serde(flatten)]
    pub record: MemberRecord,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_descriptor_access_roundtrip() {
        let mut raw = RawMember::default();
        for field in Field::all() {
            raw.set(field, "yes");
        }
        assert_eq!(raw.get(Field::Name), FieldValue::Text("yes"));
        assert_eq!(raw.get(Field::Receipt(MembershipYear::Y2030)), FieldValue::Text("yes"));
        assert_eq!(raw.get(Field::YearFlag(MembershipYear::PriorTo2021)), FieldValue::Flag(true));

        raw.set(Field::YearFlag(MembershipYear::Y2022), "No");
        assert_eq!(raw.text(Field::YearFlag(MembershipYear::Y2022)), "");
    }

    #[test]
    fn test_record_skips_absent_fields() {
        let mut record = MemberRecord {
            membership_number: "MEM001".into(),
            name: "John Doe".into(),
            mobile_no: "9876543210".into(),
            address: "123 Main St".into(),
            area: "Downtown".into(),
            spouse_name: "Jane Doe".into(),
            ..Default::default()
        };
        record.years.get_mut(MembershipYear::Y2024).active = Some(true);
        record.years.get_mut(MembershipYear::Y2024).receipt = Some("R-88".into());

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["membershipNumber"], "MEM001");
        assert_eq!(value["year2024"], true);
        assert_eq!(value["receipt2024"], "R-88");
        assert!(value.get("alternateMobile").is_none());
        assert!(value.get("familyMemberCount").is_none());
        assert!(value.get("year2023").is_none());
    }

    #[test]
    fn test_stored_member_deserialization() {
        let value = json!({
            "id": "m-1",
            "membershipNumber": "MEM002",
            "name": "Alice Smith",
            "mobileNo": "8765432109",
            "address": "456 Oak Ave",
            "area": "Uptown",
            "spouseName": "Bob Smith",
            "familyMemberCount": 9007199254740993u64,
            "priorTo2021": true,
            "year2025": false,
            "receipt2025": ""
        });
        let member: StoredMember = serde_json::from_value(value).unwrap();
        assert_eq!(member.id, "m-1");
        assert_eq!(member.record.family_member_count, Some(9_007_199_254_740_993));
        assert_eq!(member.record.alternate_mobile, None);
        let years = &member.record.years;
        assert_eq!(years.get(MembershipYear::PriorTo2021).active, Some(true));
        assert_eq!(years.get(MembershipYear::Y2025).active, Some(false));
        assert_eq!(years.get(MembershipYear::Y2025).receipt, None);
        assert_eq!(years.get(MembershipYear::Y2026).active, None);
        assert_eq!(years.active_years().collect::<Vec<_>>(), vec![MembershipYear::PriorTo2021]);
    }

    #[test]
    fn test_raw_from_record() {
        let mut record = MemberRecord {
            membership_number: "MEM003".into(),
            family_member_count: Some(4),
            alternate_mobile: Some("9876543211".into()),
            ..Default::default()
        };
        record.years.get_mut(MembershipYear::Y2023).active = Some(true);
        let raw = RawMember::from(&record);
        assert_eq!(raw.family_member_count, "4");
        assert_eq!(raw.alternate_mobile, "9876543211");
        assert!(raw.years.get(MembershipYear::Y2023).active);
        assert!(!raw.years.get(MembershipYear::Y2024).active);
    }

    #[test]
    fn test_raw_member_from_form_json() {
        let value = json!({
            "membershipNumber": "MEM004",
            "name": "Ravi",
            "year2022": "yes",
            "receipt2022": " R-1 "
        });
        let raw: RawMember = serde_json::from_value(value).unwrap();
        assert_eq!(raw.membership_number, "MEM004");
        assert_eq!(raw.mobile_no, "");
        assert!(raw.years.get(MembershipYear::Y2022).active);
        assert_eq!(raw.years.get(MembershipYear::Y2022).receipt, "R-1");
    }
}
