//! Byte-position selection.
//!
//! The first search stage picks a small set of byte positions such that the
//! tuple of bytes read at those positions differs between every pair of
//! keywords. Later stages only refine how those bytes are combined; if two
//! keywords already read identically here, nothing downstream can separate
//! them.
//!
//! Selection runs four phases over the position domain
//! `{-1} ∪ [0, min(max_len − 1, 254)]`:
//!
//! 1. collect mandatory positions, forced by keyword pairs that differ in a
//!    single non-final byte;
//! 2. greedily add the position that removes the most duplicates, until no
//!    addition improves;
//! 3. greedily drop non-mandatory positions while the duplicate count does
//!    not rise;
//! 4. try replacing any two non-mandatory positions with one fresh index.
//!
//! Every phase either strictly improves a finite measure or strictly shrinks
//! the set, so the whole selector terminates.

use std::collections::{BTreeSet, HashSet};

use log::debug;

use crate::keywords::KeywordSet;
use crate::selchars::SelChars;

/// Position sentinel selecting the last byte of each keyword.
///
/// Variable-length keyword sets usually need it: it is the only position that
/// tracks every keyword's own length.
pub const LAST_CHAR: i32 = -1;

/// Largest byte index the selector will ever examine.
pub const MAX_KEY_POS: i32 = 254;

/// An ordered set of byte positions, possibly including [`LAST_CHAR`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionSet {
    positions: BTreeSet<i32>,
}

impl PositionSet {
    /// Creates an empty position set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a position. Returns `true` if it was not present.
    pub fn insert(&mut self, pos: i32) -> bool {
        self.positions.insert(pos)
    }

    /// Removes a position. Returns `true` if it was present.
    pub fn remove(&mut self, pos: i32) -> bool {
        self.positions.remove(&pos)
    }

    /// Whether `pos` is in the set.
    pub fn contains(&self, pos: i32) -> bool {
        self.positions.contains(&pos)
    }

    /// Number of positions.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Iterates positions in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        self.positions.iter().copied()
    }

    /// Iterates positions from largest to smallest, the projection read order.
    pub fn iter_desc(&self) -> impl Iterator<Item = i32> + '_ {
        self.positions.iter().rev().copied()
    }

    /// The positions as an ascending vector.
    pub fn to_vec(&self) -> Vec<i32> {
        self.positions.iter().copied().collect()
    }
}

impl FromIterator<i32> for PositionSet {
    fn from_iter<I: IntoIterator<Item = i32>>(iter: I) -> Self {
        Self {
            positions: iter.into_iter().collect(),
        }
    }
}

/// Counts keywords whose positional tuples coincide with an earlier keyword.
///
/// Projects every keyword under `positions` with no increments and returns
/// `|keywords| − |distinct projections|`. Zero means the tuples are pairwise
/// distinct.
pub fn count_duplicates(keywords: &KeywordSet, positions: &PositionSet) -> usize {
    let mut representatives = HashSet::with_capacity(keywords.len());
    for word in keywords.iter() {
        representatives.insert(SelChars::select(word, positions, &[]));
    }
    keywords.len() - representatives.len()
}

/// The single position where two equal-length words differ, if there is
/// exactly one.
fn unique_diff_position(a: &str, b: &str) -> Option<usize> {
    if a.len() != b.len() {
        return None;
    }

    let mut found = None;
    for (i, (x, y)) in a.bytes().zip(b.bytes()).enumerate() {
        if x == y {
            continue;
        }
        if found.is_some() {
            return None;
        }
        found = Some(i);
    }
    found
}

/// Selects byte positions that make every keyword's positional tuple unique.
///
/// The result is heuristic: small and effective, not provably minimal.
pub fn find_positions(keywords: &KeywordSet) -> PositionSet {
    let imax = (keywords.max_len() - 1).min(MAX_KEY_POS as usize) as i32;

    // 1. Mandatory positions. If two keywords of equal length differ in
    //    exactly one byte, that position must be read, unless it is the final
    //    byte, which LAST_CHAR can stand in for.
    let mut mandatory = PositionSet::new();
    for i in 0..keywords.len() {
        for j in i + 1..keywords.len() {
            let a = keywords.get(i);
            let b = keywords.get(j);
            if let Some(diff) = unique_diff_position(a, b) {
                if diff != a.len() - 1 {
                    mandatory.insert(diff as i32);
                }
            }
        }
    }

    // 2. Add positions while doing so lowers the duplicate count.
    let mut current = mandatory.clone();
    let mut current_duplicates = count_duplicates(keywords, &current);
    loop {
        let mut best = PositionSet::new();
        let mut best_duplicates = usize::MAX;

        for i in (LAST_CHAR..=imax).rev() {
            if current.contains(i) {
                continue;
            }
            let mut trial = current.clone();
            trial.insert(i);
            let trial_duplicates = count_duplicates(keywords, &trial);

            // On ties prefer a real index over LAST_CHAR: a fixed index makes
            // a cheaper hash than chasing each keyword's final byte.
            if trial_duplicates < best_duplicates || (trial_duplicates == best_duplicates && i >= 0)
            {
                best = trial;
                best_duplicates = trial_duplicates;
            }
        }

        if best_duplicates >= current_duplicates {
            break;
        }
        current = best;
        current_duplicates = best_duplicates;
    }

    // 3. Drop non-mandatory positions while the duplicate count holds.
    loop {
        let mut best = PositionSet::new();
        let mut best_duplicates = usize::MAX;
        let mut found = false;

        for i in (LAST_CHAR..=imax).rev() {
            if !current.contains(i) || mandatory.contains(i) {
                continue;
            }
            let mut trial = current.clone();
            trial.remove(i);
            let trial_duplicates = count_duplicates(keywords, &trial);

            if trial_duplicates < best_duplicates
                || (trial_duplicates == best_duplicates && i == LAST_CHAR)
            {
                best = trial;
                best_duplicates = trial_duplicates;
                found = true;
            }
        }

        if !found || best_duplicates > current_duplicates {
            break;
        }
        current = best;
        current_duplicates = best_duplicates;
    }

    // 4. Replace two positions with one while the duplicate count holds.
    loop {
        let mut best = PositionSet::new();
        let mut best_duplicates = usize::MAX;
        let mut found = false;

        for i1 in (LAST_CHAR..=imax).rev() {
            if !current.contains(i1) || mandatory.contains(i1) {
                continue;
            }
            for i2 in (LAST_CHAR..=imax).rev() {
                if i2 == i1 || !current.contains(i2) || mandatory.contains(i2) {
                    continue;
                }
                for i3 in (0..=imax).rev() {
                    if current.contains(i3) {
                        continue;
                    }
                    let mut trial = current.clone();
                    trial.remove(i1);
                    trial.remove(i2);
                    trial.insert(i3);
                    let trial_duplicates = count_duplicates(keywords, &trial);

                    if trial_duplicates <= best_duplicates {
                        best = trial;
                        best_duplicates = trial_duplicates;
                        found = true;
                    }
                }
            }
        }

        if !found || best_duplicates > current_duplicates {
            break;
        }
        current = best;
        current_duplicates = best_duplicates;
    }

    debug!(
        "selected positions {:?} with {} duplicate tuple(s)",
        current.to_vec(),
        current_duplicates
    );
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(words: &[&str]) -> KeywordSet {
        KeywordSet::new(words.iter().map(|w| w.to_string()).collect()).unwrap()
    }

    #[test]
    fn unique_diff_detects_single_difference() {
        assert_eq!(unique_diff_position("abc", "axc"), Some(1));
        assert_eq!(unique_diff_position("abc", "axy"), None);
        assert_eq!(unique_diff_position("abc", "abc"), None);
        assert_eq!(unique_diff_position("ab", "abc"), None);
    }

    #[test]
    fn duplicate_count_over_first_byte() {
        let keywords = set(&["ax", "ay", "bz"]);
        let positions: PositionSet = [0].into_iter().collect();
        // "ax" and "ay" coincide on byte 0.
        assert_eq!(count_duplicates(&keywords, &positions), 1);
    }

    #[test]
    fn duplicate_count_with_empty_positions_groups_by_length() {
        let keywords = set(&["ab", "cd", "xyz"]);
        assert_eq!(count_duplicates(&keywords, &PositionSet::new()), 1);
    }

    #[test]
    fn mandatory_position_forced_by_single_interior_difference() {
        // "abc" vs "adc" differ only at position 1, which is not final.
        let keywords = set(&["abc", "adc"]);
        let positions = find_positions(&keywords);
        assert!(positions.contains(1));
        assert_eq!(count_duplicates(&keywords, &positions), 0);
    }

    #[test]
    fn final_byte_difference_is_not_mandatory() {
        // "ab" vs "ac" differ only at the final byte; the selector must not
        // force position 1 and can cover the pair with LAST_CHAR instead.
        let keywords = set(&["ab", "ac"]);
        let positions = find_positions(&keywords);
        assert_eq!(count_duplicates(&keywords, &positions), 0);
        // Recompute phase 1 in isolation: position 1 may appear in the final
        // set, but never because it was mandatory.
        let mut mandatory = PositionSet::new();
        for i in 0..keywords.len() {
            for j in i + 1..keywords.len() {
                if let Some(diff) = unique_diff_position(keywords.get(i), keywords.get(j)) {
                    if diff != keywords.get(i).len() - 1 {
                        mandatory.insert(diff as i32);
                    }
                }
            }
        }
        assert!(mandatory.is_empty());
    }

    #[test]
    fn selector_distinguishes_permuted_pairs() {
        let keywords = set(&["xy", "yx", "xz", "zx"]);
        let positions = find_positions(&keywords);
        assert_eq!(count_duplicates(&keywords, &positions), 0);
    }

    #[test]
    fn single_keyword_needs_no_positions() {
        let keywords = set(&["lonely"]);
        let positions = find_positions(&keywords);
        assert!(positions.is_empty());
    }

    #[test]
    fn descending_iteration_order() {
        let positions: PositionSet = [2, LAST_CHAR, 0].into_iter().collect();
        let desc: Vec<i32> = positions.iter_desc().collect();
        assert_eq!(desc, vec![2, 0, LAST_CHAR]);
    }
}
