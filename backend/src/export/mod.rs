//! CSV template and export generation.
//!
//! One header line with every column in schema order, then one line per
//! member. Flags render as `Yes`/`No`; the importer reads them back through
//! its case-insensitive `yes` token.

use chrono::{NaiveDate, Utc};

use crate::config::EXPORT_FILE_PREFIX;
use crate::models::{Field, FieldValue, MemberRecord, RawMember};

/// Quote a value containing a comma, double quote or newline.
pub fn escape_field(value: &str) -> String {
    if value.contains(|c| matches!(c, ',' | '"' | '\n')) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn render_flag(active: bool) -> &'static str {
    if active {
        "Yes"
    } else {
        "No"
    }
}

/// Header line: every column name in schema order.
pub fn header_line() -> String {
    Field::all().map(Field::column).collect::<Vec<_>>().join(",")
}

fn render_row(raw: &RawMember) -> String {
    Field::all()
        .map(|field| match raw.get(field) {
            FieldValue::Text(text) => escape_field(text),
            FieldValue::Flag(active) => render_flag(active).to_string(),
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Render records as CSV text. Lines are joined with `\n`, no trailing newline.
pub fn render_members(records: &[MemberRecord]) -> String {
    std::iter::once(header_line())
        .chain(records.iter().map(|record| render_row(&RawMember::from(record))))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Header-only template.
pub fn blank_template() -> String {
    header_line()
}

/// The two example members shipped with the template download.
pub fn sample_records() -> Vec<MemberRecord> {
    vec![
        MemberRecord {
            membership_number: "MEM001".into(),
            name: "John Doe".into(),
            mobile_no: "9876543210".into(),
            address: "123 Main St, City".into(),
            area: "Downtown".into(),
            spouse_name: "Jane Doe".into(),
            alternate_mobile: Some("9876543211".into()),
            family_member_count: Some(4),
            ..Default::default()
        },
        MemberRecord {
            membership_number: "MEM002".into(),
            name: "Alice Smith".into(),
            mobile_no: "8765432109".into(),
            address: "456 Oak Ave, Town".into(),
            area: "Uptown".into(),
            spouse_name: "Bob Smith".into(),
            family_member_count: Some(2),
            ..Default::default()
        },
    ]
}

/// Template with the sample rows.
pub fn sample_template() -> String {
    render_members(&sample_records())
}

/// `members_database_<YYYY-MM-DD>.csv`
pub fn export_file_name(date: NaiveDate) -> String {
    format!("{}{}.csv", EXPORT_FILE_PREFIX, date.format("%Y-%m-%d"))
}

/// Export name for the current UTC date.
pub fn export_file_name_today() -> String {
    export_file_name(Utc::now().date_naive())
}
