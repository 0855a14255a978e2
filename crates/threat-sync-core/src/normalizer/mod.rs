// # Normalizer
//
// Produces a duplicate-free, deterministically ordered view of any sequence
// of network entries.
//
// Deduplication and ordering are both by canonical string. The sort is
// lexicographic, not numeric (`10.0.0.0/8` sorts before `9.0.0.0/8`), and
// overlapping CIDRs are kept as distinct entries: `10.0.0.0/8` does not
// absorb `10.1.0.0/16`.

pub mod fingerprint;

pub use fingerprint::Fingerprint;

use crate::entry::NetworkEntry;
use std::collections::BTreeMap;

/// Unique network entries sorted ascending by canonical string
///
/// Rebuilt from scratch on every cycle; never mutated in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedSet {
    entries: Vec<NetworkEntry>,
}

impl NormalizedSet {
    /// An empty set
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of unique entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the set holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in canonical order
    pub fn iter(&self) -> std::slice::Iter<'_, NetworkEntry> {
        self.entries.iter()
    }

    /// Entries in canonical order
    pub fn as_slice(&self) -> &[NetworkEntry] {
        &self.entries
    }

    /// Canonical strings in canonical order
    pub fn to_strings(&self) -> Vec<String> {
        to_strings(&self.entries)
    }

    /// Fingerprint of this set
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(self)
    }

    /// Consume the set, returning the ordered entries
    pub fn into_vec(self) -> Vec<NetworkEntry> {
        self.entries
    }
}

impl<'a> IntoIterator for &'a NormalizedSet {
    type Item = &'a NetworkEntry;
    type IntoIter = std::slice::Iter<'a, NetworkEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Deduplicate by canonical string and sort ascending
///
/// Empty input yields an empty set.
pub fn normalize<I>(entries: I) -> NormalizedSet
where
    I: IntoIterator<Item = NetworkEntry>,
{
    let unique: BTreeMap<String, NetworkEntry> = entries
        .into_iter()
        .map(|entry| (entry.canonical(), entry))
        .collect();

    NormalizedSet {
        entries: unique.into_values().collect(),
    }
}

/// Project entries to canonical strings, preserving order
pub fn to_strings(entries: &[NetworkEntry]) -> Vec<String> {
    entries.iter().map(NetworkEntry::canonical).collect()
}

/// Concatenate several entry lists and normalize the result
pub fn merge<I, L>(lists: I) -> NormalizedSet
where
    I: IntoIterator<Item = L>,
    L: IntoIterator<Item = NetworkEntry>,
{
    normalize(lists.into_iter().flatten())
}

/// True if an entry with the same canonical string is present
pub fn contains(entries: &[NetworkEntry], target: &NetworkEntry) -> bool {
    let target = target.canonical();
    entries.iter().any(|entry| entry.canonical() == target)
}

/// Parse strings back into entries, skipping anything unparseable
pub fn from_strings<I, S>(strings: I) -> Vec<NetworkEntry>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    strings
        .into_iter()
        .filter_map(|s| NetworkEntry::parse(s.as_ref()).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(items: &[&str]) -> Vec<NetworkEntry> {
        items
            .iter()
            .map(|s| NetworkEntry::parse(s).unwrap())
            .collect()
    }

    #[test]
    fn test_normalize_dedups_and_sorts() {
        let input = entries(&[
            "192.168.1.1",
            "10.0.0.0/8",
            "192.168.1.1/32",
            "2001:db8::/32",
            "10.0.0.0/8",
            "9.9.9.9",
        ]);

        let set = normalize(input);
        assert_eq!(
            set.to_strings(),
            vec![
                "10.0.0.0/8",
                "192.168.1.1/32",
                "2001:db8::/32",
                "9.9.9.9/32",
            ]
        );
    }

    #[test]
    fn test_normalize_empty() {
        let set = normalize(Vec::new());
        assert!(set.is_empty());
        assert_eq!(set, NormalizedSet::empty());
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize(entries(&["5.5.5.5", "1.1.1.0/24", "5.5.5.5/32", "::1"]));
        let twice = normalize(once.clone().into_vec());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_overlapping_networks_are_kept() {
        let set = normalize(entries(&["10.0.0.0/8", "10.1.0.0/16", "10.1.2.3"]));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_sorted_and_unique_invariants_hold_for_shuffled_input() {
        let base = [
            "203.0.113.0/24",
            "198.51.100.7",
            "2001:db8:1::/48",
            "198.51.100.7/32",
            "100.64.0.0/10",
            "fe80::1",
            "203.0.113.9/24",
        ];

        // Every rotation of the input produces the same set
        let expected = normalize(entries(&base));
        for shift in 0..base.len() {
            let mut rotated = base.to_vec();
            rotated.rotate_left(shift);
            let set = normalize(entries(&rotated));

            let strings = set.to_strings();
            assert!(strings.windows(2).all(|w| w[0] < w[1]), "sorted and unique");
            assert_eq!(set, expected);
        }
    }

    #[test]
    fn test_merge_multiple_lists() {
        let a = entries(&["1.1.1.1", "2.2.2.2"]);
        let b = entries(&["2.2.2.2/32", "3.3.3.0/24"]);
        let c: Vec<NetworkEntry> = Vec::new();

        let merged = merge(vec![a, b, c]);
        assert_eq!(
            merged.to_strings(),
            vec!["1.1.1.1/32", "2.2.2.2/32", "3.3.3.0/24"]
        );
    }

    #[test]
    fn test_to_strings_preserves_order() {
        let list = entries(&["9.9.9.9", "1.1.1.1"]);
        assert_eq!(to_strings(&list), vec!["9.9.9.9/32", "1.1.1.1/32"]);
    }

    #[test]
    fn test_contains_by_canonical_form() {
        let list = entries(&["10.0.0.0/8", "192.0.2.1"]);
        assert!(contains(&list, &NetworkEntry::parse("10.9.9.9/8").unwrap()));
        assert!(contains(&list, &NetworkEntry::parse("192.0.2.1/32").unwrap()));
        assert!(!contains(&list, &NetworkEntry::parse("10.0.0.0/16").unwrap()));
    }

    #[test]
    fn test_from_strings_skips_invalid() {
        let parsed = from_strings(["10.0.0.0/8", "garbage", "192.0.2.1", ""]);
        assert_eq!(to_strings(&parsed), vec!["10.0.0.0/8", "192.0.2.1/32"]);
    }
}
