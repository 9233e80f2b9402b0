//! Minimal perfect hash function search for fixed keyword sets.
//!
//! Given a fixed list of distinct strings, [`generate`] derives the
//! parameters of a collision-free hash of the form
//! `len(word) + Σ asso_values[byte(word, p) + alpha_inc[p]]` over a small set
//! of byte positions `p`, suitable for O(1) keyword dispatch. See
//! [`solution::Solution`] for the output contract and the [`asso`] module for
//! the search itself.

pub mod alpha;
pub mod asso;
pub mod error;
pub mod keywords;
mod odometer;
pub mod positions;
pub mod selchars;
pub mod solution;

pub use error::{Error, Result};
pub use keywords::KeywordSet;
pub use positions::{PositionSet, LAST_CHAR};
pub use selchars::SelChars;
pub use solution::{generate, Config, Solution};
