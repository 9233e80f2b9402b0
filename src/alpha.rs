//! Alpha-increment resolution.
//!
//! Once the byte positions are fixed, the table search stops caring about the
//! order bytes were read in: a keyword's hash is a plain sum over its
//! projection, so only the multiset of codes matters. Discarding the order can
//! merge keywords that the ordered tuples kept apart ("ab" and "ba" read at
//! positions 0 and 1, say). The fix is to nudge byte codes at individual
//! positions by small nonnegative increments until the multiset view
//! distinguishes exactly as much as the tuple view did.

use std::collections::HashSet;

use log::debug;

use crate::error::{Error, Result};
use crate::keywords::KeywordSet;
use crate::positions::{count_duplicates, PositionSet, LAST_CHAR};
use crate::selchars::SelChars;

/// Counts keywords whose adjusted-code multisets coincide with an earlier
/// keyword's.
fn count_multiset_duplicates(
    keywords: &KeywordSet,
    positions: &PositionSet,
    alpha_inc: &[u32],
) -> usize {
    let mut representatives = HashSet::with_capacity(keywords.len());
    for word in keywords.iter() {
        representatives.insert(SelChars::select(word, positions, alpha_inc));
    }
    keywords.len() - representatives.len()
}

/// Finds per-position increments that keep the multiset projection as
/// distinguishing as the ordered tuple projection.
///
/// Starts from all-zero increments, which suffice for most keyword sets.
/// While the multiset view shows more duplicates than the tuple view, trial
/// magnitudes escalate from 1 and each round commits the single-position
/// increment that removes the most duplicates. [`LAST_CHAR`] is never
/// adjusted.
///
/// `limit` caps the trial magnitude; pathological inputs where no single
/// increment ever helps would otherwise escalate forever. Exceeding the cap
/// returns [`Error::AlphaSearchExhausted`].
pub fn find_alpha_inc(
    keywords: &KeywordSet,
    positions: &PositionSet,
    limit: u32,
) -> Result<Vec<u32>> {
    let duplicates_goal = count_duplicates(keywords, positions);

    let mut current = vec![0u32; keywords.max_len()];
    let mut current_duplicates = count_multiset_duplicates(keywords, positions, &current);

    if current_duplicates <= duplicates_goal {
        return Ok(current);
    }

    // Positions we are free to adjust, largest first. LAST_CHAR sorts lowest
    // so it lands at the tail when present.
    let indices: Vec<usize> = positions
        .iter_desc()
        .filter(|&p| p != LAST_CHAR)
        .map(|p| p as usize)
        .collect();

    // Each round commits one increment and lowers the duplicate count, so the
    // outer loop runs at most `current_duplicates - duplicates_goal` times.
    while current_duplicates > duplicates_goal {
        let mut inc = 1u32;
        loop {
            if inc > limit {
                return Err(Error::AlphaSearchExhausted { limit });
            }

            let mut best = Vec::new();
            let mut best_duplicates = usize::MAX;

            for &idx in &indices {
                let mut trial = current.clone();
                trial[idx] += inc;
                let trial_duplicates = count_multiset_duplicates(keywords, positions, &trial);
                if trial_duplicates < best_duplicates {
                    best = trial;
                    best_duplicates = trial_duplicates;
                }
            }

            if best_duplicates < current_duplicates {
                current = best;
                current_duplicates = best_duplicates;
                break;
            }
            inc += 1;
        }
    }

    debug!("alpha increments {:?}", current);
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::positions::find_positions;

    fn set(words: &[&str]) -> KeywordSet {
        KeywordSet::new(words.iter().map(|w| w.to_string()).collect()).unwrap()
    }

    #[test]
    fn zero_increments_when_multisets_already_distinct() {
        let keywords = set(&["ab", "cd"]);
        let positions = find_positions(&keywords);
        let inc = find_alpha_inc(&keywords, &positions, 16).unwrap();
        assert!(inc.iter().all(|&i| i == 0));
    }

    #[test]
    fn breaks_permutation_ties() {
        // Tuples (x,y)/(y,x) differ but the multisets coincide; an increment
        // on one position must separate them.
        let keywords = set(&["xy", "yx", "xz", "zx"]);
        let positions = find_positions(&keywords);
        let goal = count_duplicates(&keywords, &positions);
        let inc = find_alpha_inc(&keywords, &positions, 16).unwrap();

        assert!(inc.iter().any(|&i| i > 0));
        assert_eq!(
            count_multiset_duplicates(&keywords, &positions, &inc),
            goal
        );
    }

    #[test]
    fn increment_vector_spans_max_len() {
        let keywords = set(&["ab", "wide!"]);
        let positions = find_positions(&keywords);
        let inc = find_alpha_inc(&keywords, &positions, 16).unwrap();
        assert_eq!(inc.len(), 5);
    }

    #[test]
    fn cap_zero_surfaces_exhaustion() {
        // This set needs an increment, but magnitude 1 is already over the cap.
        let keywords = set(&["xy", "yx", "xz", "zx"]);
        let positions = find_positions(&keywords);
        let err = find_alpha_inc(&keywords, &positions, 0).unwrap_err();
        assert_eq!(err, Error::AlphaSearchExhausted { limit: 0 });
    }
}
