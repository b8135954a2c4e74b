//! Member list filtering.

use crate::models::StoredMember;

/// True if `member` contains `needle` (already lower-cased) in any searchable field.
fn matches(member: &StoredMember, needle: &str) -> bool {
    let record = &member.record;
    [
        record.membership_number.as_str(),
        record.name.as_str(),
        record.mobile_no.as_str(),
        record.alternate_mobile.as_deref().unwrap_or_default(),
        record.area.as_str(),
        record.spouse_name.as_str(),
        record.address.as_str(),
    ]
    .iter()
    .any(|value| value.to_lowercase().contains(needle))
}

/// Case-insensitive substring search. An empty query keeps everything, in
/// the order given.
pub fn filter_members<'a>(members: &'a [StoredMember], query: &str) -> Vec<&'a StoredMember> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return members.iter().collect();
    }
    members.iter().filter(|member| matches(member, &needle)).collect()
}

/// "Showing 1 member", "Showing 12 members".
pub fn member_count_label(count: usize) -> String {
    let noun = if count == 1 { "member" } else { "members" };
    format!("Showing {count} {noun}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MemberRecord;

    fn member(id: &str, number: &str, name: &str, area: &str) -> StoredMember {
        StoredMember {
            id: id.into(),
            record: MemberRecord {
                membership_number: number.into(),
                name: name.into(),
                mobile_no: "9876543210".into(),
                address: "1 Main St".into(),
                area: area.into(),
                spouse_name: "Spouse".into(),
                alternate_mobile: Some("5550001111".into()),
                ..Default::default()
            },
        }
    }

    fn members() -> Vec<StoredMember> {
        vec![
            member("a", "MEM001", "John Doe", "Downtown"),
            member("b", "MEM002", "Alice Smith", "Uptown"),
            member("c", "MEM003", "Bob Jones", "Downtown"),
        ]
    }

    #[test]
    fn test_empty_query_keeps_order() {
        let all = members();
        let ids: Vec<&str> = filter_members(&all, "  ").iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_case_insensitive_match() {
        let all = members();
        let found = filter_members(&all, "DOWNtown");
        assert_eq!(found.len(), 2);
        assert_eq!(filter_members(&all, "mem002")[0].record.name, "Alice Smith");
        assert_eq!(filter_members(&all, "555000").len(), 3);
        assert!(filter_members(&all, "nobody").is_empty());
    }

    #[test]
    fn test_count_label() {
        assert_eq!(member_count_label(1), "Showing 1 member");
        assert_eq!(member_count_label(0), "Showing 0 members");
        assert_eq!(member_count_label(12), "Showing 12 members");
    }
}
