//! Projection of a keyword onto the selected byte positions.
//!
//! The hash of a keyword only ever looks at the bytes sitting at the selected
//! positions, adjusted by the per-position alpha increments. [`SelChars`]
//! captures exactly that view: the multiset of adjusted byte codes a keyword
//! contributes to its hash, tagged with the keyword length. It is the unit of
//! comparison for every duplicate check in the search, so it is a plain value
//! with structural equality and hashing.
//!
//! Two projections compare equal iff they carry the same keyword length and
//! the same code sequence. Without increments the codes keep the fixed
//! (descending-position) read order, which is already a stable, discriminating
//! tuple. Once increments are in play the codes are sorted ascending, turning
//! the sequence into a canonical multiset: increments exist precisely to keep
//! that order-free view injective.

use crate::positions::{PositionSet, LAST_CHAR};

/// The adjusted byte codes one keyword yields under a position set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelChars {
    keyword_len: usize,
    codes: Vec<u32>,
}

impl SelChars {
    /// Projects `word` onto `positions`.
    ///
    /// Positions are read from largest to smallest. [`LAST_CHAR`] reads the
    /// final byte of the keyword and is never adjusted. Positions past the end
    /// of a shorter keyword are skipped, so short keywords naturally yield
    /// short projections. When `alpha_inc` is non-empty, `alpha_inc[p]` is
    /// added to the byte read at position `p` and the result is sorted.
    ///
    /// # Example
    /// ```
    /// use phgen::positions::{PositionSet, LAST_CHAR};
    /// use phgen::selchars::SelChars;
    ///
    /// let mut positions = PositionSet::new();
    /// positions.insert(0);
    /// positions.insert(LAST_CHAR);
    ///
    /// let a = SelChars::select("ab", &positions, &[]);
    /// let b = SelChars::select("ab", &positions, &[]);
    /// assert_eq!(a, b);
    /// assert_eq!(a.codes(), &[b'a' as u32, b'b' as u32]);
    /// ```
    pub fn select(word: &str, positions: &PositionSet, alpha_inc: &[u32]) -> Self {
        let bytes = word.as_bytes();
        if bytes.is_empty() {
            return Self {
                keyword_len: 0,
                codes: Vec::new(),
            };
        }

        let mut codes = Vec::with_capacity(positions.len());
        for pos in positions.iter_desc() {
            if pos >= bytes.len() as i32 {
                // Out of range for this keyword.
                continue;
            }

            let code = if pos == LAST_CHAR {
                u32::from(bytes[bytes.len() - 1])
            } else {
                let mut code = u32::from(bytes[pos as usize]);
                if !alpha_inc.is_empty() {
                    code += alpha_inc[pos as usize];
                }
                code
            };
            codes.push(code);
        }

        if !alpha_inc.is_empty() {
            codes.sort_unstable();
        }

        Self {
            keyword_len: bytes.len(),
            codes,
        }
    }

    /// The adjusted byte codes, in projection order.
    pub fn codes(&self) -> &[u32] {
        &self.codes
    }

    /// Length of the originating keyword.
    pub fn keyword_len(&self) -> usize {
        self.keyword_len
    }

    /// How many times `code` occurs in this projection.
    pub fn count(&self, code: u32) -> usize {
        self.codes.iter().filter(|&&c| c == code).count()
    }
}
