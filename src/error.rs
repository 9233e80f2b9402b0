//! Error types for the hash search.
//!
//! Construction and search failures are fatal: there is no recoverable error
//! in this crate. Either the input is rejected before any search work starts,
//! or an internal search phase reports that it cannot uphold its invariant.

use thiserror::Error;

/// Errors produced while building a minimal perfect hash.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The keyword list was empty.
    #[error("keyword list is empty")]
    EmptyKeywordList,

    /// A keyword with zero length was supplied.
    #[error("keyword at index {index} is empty")]
    EmptyKeyword {
        /// Position of the offending keyword in the input list.
        index: usize,
    },

    /// Two keywords produced identical projections under the selected
    /// positions and increments, so no associative-value table can separate
    /// them. Reports one of the two offenders.
    #[error("keyword {keyword:?} is indistinguishable from another keyword under the selected byte positions")]
    DuplicateProjection {
        /// One keyword of the colliding pair.
        keyword: String,
    },

    /// The alpha-increment search hit its magnitude cap without removing all
    /// artificial multiset collisions.
    #[error("alpha increment search exhausted (magnitude cap {limit})")]
    AlphaSearchExhausted {
        /// The configured magnitude cap that was exceeded.
        limit: u32,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
