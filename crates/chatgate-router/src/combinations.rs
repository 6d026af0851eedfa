// SPDX-FileCopyrightText: 2026 Chatgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capability sets known to require multi-step coordination.
//!
//! Loaded once at startup and never mutated afterwards, so a table can be
//! shared between request tasks behind an `Arc` without locking.

use std::collections::BTreeSet;

/// Static, data-driven table of "complex combination" capability sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombinationTable {
    sets: Vec<BTreeSet<String>>,
}

impl CombinationTable {
    /// Build a table from configured capability lists.
    ///
    /// Names are trimmed. Empty names and empty sets are dropped, since an
    /// empty set would be a subset of every request.
    pub fn new<I, S>(sets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: IntoIterator,
        S::Item: AsRef<str>,
    {
        let sets = sets
            .into_iter()
            .map(normalize_capabilities)
            .filter(|set| !set.is_empty())
            .collect();
        Self { sets }
    }

    /// True when any registered set is a subset of `requested`.
    pub fn matches(&self, requested: &BTreeSet<String>) -> bool {
        self.find(requested).is_some()
    }

    /// The first registered set contained in `requested`, if any.
    pub fn find(&self, requested: &BTreeSet<String>) -> Option<&BTreeSet<String>> {
        self.sets.iter().find(|set| set.is_subset(requested))
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

/// Trim capability names and drop blank ones.
///
/// Applied to both registered sets and requested capabilities so the
/// subset test compares like with like.
pub fn normalize_capabilities<I>(names: I) -> BTreeSet<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    names
        .into_iter()
        .map(|name| name.as_ref().trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn superset_matches() {
        let table = CombinationTable::new([["a", "b"]]);
        assert!(table.matches(&caps(&["a", "b", "c"])));
        assert!(table.matches(&caps(&["a", "b"])));
    }

    #[test]
    fn partial_overlap_does_not_match() {
        let table = CombinationTable::new([["a", "b"]]);
        assert!(!table.matches(&caps(&["a", "c"])));
        assert!(!table.matches(&BTreeSet::new()));
    }

    #[test]
    fn empty_sets_are_dropped() {
        let table = CombinationTable::new(vec![vec![], vec!["  ", ""], vec!["x"]]);
        assert_eq!(table.len(), 1);
        assert!(!table.matches(&caps(&["y"])));
    }

    #[test]
    fn names_are_trimmed() {
        let table = CombinationTable::new([[" calendar ", "email"]]);
        assert!(table.matches(&caps(&["calendar", "email"])));
    }

    #[test]
    fn normalize_trims_and_drops_blanks() {
        let set = normalize_capabilities([" toolA", "toolA ", "  ", "toolB"]);
        assert_eq!(set, caps(&["toolA", "toolB"]));
    }
}
