//! Member string layout.
//!
//! Every live entry is stored in the sorted collection as
//! `<key>:<coord0>:...:<coordN-1>:<id>`. The hex key gives the sort order,
//! the decimal coordinates allow exact filtering without decoding the key,
//! and the id keeps members of co-located entities distinct.
//!
//! Range scans address members by key prefix: `[<key>:` is the inclusive
//! lower bound of everything stored under `key`, and `[<key>:\u{ff}` is an
//! inclusive upper bound above any decimal/id suffix.

use crate::types::IndexEntry;

/// Field separator inside a member string
pub const SEPARATOR: char = ':';

/// Sentinel that sorts after every suffix a member can carry
pub const UPPER_SENTINEL: char = '\u{ff}';

/// Builds the member string for an already encoded key
pub fn format_member(key: &str, coordinates: &[u64], id: &str) -> String {
    let mut member = String::with_capacity(key.len() + coordinates.len() * 8 + id.len() + 2);
    member.push_str(key);
    for value in coordinates {
        member.push(SEPARATOR);
        member.push_str(&value.to_string());
    }
    member.push(SEPARATOR);
    member.push_str(id);
    member
}

/// Splits a member string back into its entry.
///
/// The id is everything after the last coordinate, so ids containing the
/// separator survive. Returns `None` for members that do not carry
/// `dimensions` decimal coordinates.
pub fn parse_member(member: &str, dimensions: usize) -> Option<IndexEntry> {
    let mut fields = member.splitn(dimensions + 2, SEPARATOR);
    fields.next()?;

    let mut coordinates = Vec::with_capacity(dimensions);
    for _ in 0..dimensions {
        coordinates.push(fields.next()?.parse::<u64>().ok()?);
    }
    let id = fields.next()?;

    Some(IndexEntry::new(id, coordinates))
}

/// Inclusive lower bound value covering every member stored under `key`
pub fn key_floor(key: &str) -> String {
    format!("{key}{SEPARATOR}")
}

/// Inclusive upper bound value covering every member stored under `key`
pub fn key_ceiling(key: &str) -> String {
    format!("{key}{SEPARATOR}{UPPER_SENTINEL}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        assert_eq!(format_member("001b", &[3, 5], "a"), "001b:3:5:a");
    }

    #[test]
    fn test_parse() {
        let entry = parse_member("001b:3:5:a", 2).unwrap();
        assert_eq!(entry, IndexEntry::new("a", vec![3, 5]));
    }

    #[test]
    fn test_id_with_separator() {
        let member = format_member("00ff", &[15, 15], "zone:7:ship");
        let entry = parse_member(&member, 2).unwrap();
        assert_eq!(entry.id, "zone:7:ship");
        assert_eq!(entry.coordinates, vec![15, 15]);
    }

    #[test]
    fn test_corrupt_members() {
        assert!(parse_member("001b:3:a", 2).is_none());
        assert!(parse_member("001b:3:x:a", 2).is_none());
        assert!(parse_member("", 2).is_none());
    }

    #[test]
    fn test_bounds_bracket_members() {
        let member = format_member("0a0a", &[10, 10], "b");
        assert!(key_floor("0a0a").as_str() <= member.as_str());
        assert!(member.as_str() <= key_ceiling("0a0a").as_str());
        assert!(format_member("0a0b", &[11, 10], "b").as_str() > key_ceiling("0a0a").as_str());
    }
}
