//! Associative-value table search.
//!
//! This is the heart of the hash construction. With positions and increments
//! fixed, every keyword is reduced to a multiset of adjusted byte codes, and
//! the problem becomes: assign an integer to every code so that
//! `length + Σ table[code]` is unique per keyword.
//!
//! The construction rests on three injectivity steps. Distinct keywords admit
//! a position set whose byte tuples are distinct; distinct tuples admit
//! increments whose multisets are distinct; and distinct multisets admit
//! table values whose sums are distinct. The earlier stages delivered the
//! first two; this module delivers the third, and verifies its precondition
//! outright, because a duplicated multiset here can never be repaired.
//!
//! # Partition refinement
//!
//! Table values are chosen a few codes at a time, in a way that never needs
//! undoing. Group keywords by the multiset of their codes whose values are
//! still undetermined: values already chosen separate any two keywords in
//! different groups permanently, so each step only has to keep keywords
//! *within* a group from colliding. Steps are derived back to front. Starting
//! from "every occurring code undetermined is the end state", repeatedly pick
//! the code whose fixation splits the current partition with the fewest
//! possible collisions, and fold in every code that provably cannot split it
//! further. Solving then walks the steps front to back, trying bounded trial
//! values per step until the step's groups are collision-free.
//!
//! Trial values come from one of two enumerations: a stride-based mixed-radix
//! counter that visits small values first, or a randomized single-variable
//! perturbation with no ordering guarantee. When the stride counter exhausts
//! a step's power-of-two bound the bound doubles, growing the global bound
//! and the derived maximum hash value if necessary, which is what guarantees
//! termination.
//!
//! The whole search runs once per `(initial, jump)` pair from the classic
//! ladder `(0,1), (1,1), (2,1), (0,3), (3,1), (1,3), …` and the best run
//! wins: fewest collisions, then smallest maximum hash value.

use std::collections::{HashMap, HashSet};

use bitvec::prelude::*;
use log::{debug, trace};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::{Error, Result};
use crate::keywords::KeywordSet;
use crate::odometer::{Advance, StrideOdometer};
use crate::positions::PositionSet;
use crate::selchars::SelChars;
use crate::solution::Config;

/// The accepted associative-value table, plus the per-code occurrence counts
/// the finalizer needs to place the unused-entry sentinel.
#[derive(Debug, Clone)]
pub struct AssoTable {
    /// Value associated with each possible adjusted byte code.
    pub values: Vec<u32>,
    /// How often each code occurs across all keyword projections.
    pub occurrences: Vec<u32>,
}

/// Ranking of candidate tables across runs. Lexicographic: fewer collisions
/// first, then a smaller maximum hash value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Quality {
    collisions: u32,
    max_hash_value: u32,
}

/// One unit of the table search.
struct Step {
    /// Codes whose table values this step decides, ascending.
    changing: Vec<usize>,
    /// Exclusive power-of-two bound on this step's trial values.
    asso_value_max: u32,
    /// Codes still undetermined after this step (decided by later steps).
    undetermined: BitVec,
    /// Keyword groups that must stay collision-free, restricted to groups of
    /// two or more (a singleton cannot collide with itself).
    partition: Vec<Vec<usize>>,
    /// Expected iteration estimates, kept for diagnostics.
    expected_lower: f64,
    expected_upper: f64,
}

/// Scratch set of occupied hash values with O(1) reset between probes.
///
/// A generation stamp per slot avoids refilling the buffer on every group
/// check; bumping the generation invalidates all previous marks at once.
struct CollisionDetector {
    stamps: Vec<u32>,
    generation: u32,
}

impl CollisionDetector {
    fn new() -> Self {
        Self {
            stamps: Vec::new(),
            generation: 0,
        }
    }

    /// Empties the set and ensures it can hold hashes in `0..span`.
    fn reset(&mut self, span: usize) {
        if self.stamps.len() < span {
            self.stamps.resize(span, 0);
        }
        self.generation += 1;
        if self.generation == u32::MAX {
            self.stamps.fill(0);
            self.generation = 1;
        }
    }

    /// Marks `value` as occupied. Returns `false` if it already was.
    fn insert(&mut self, value: u32) -> bool {
        let slot = &mut self.stamps[value as usize];
        if *slot == self.generation {
            return false;
        }
        *slot = self.generation;
        true
    }
}

/// Smallest power of two strictly greater than `n`, at least 2.
///
/// Trial values are masked rather than range-checked, and an odd jump walks
/// all residues of a power-of-two modulus, so bounds are kept in this form.
fn next_power_of_two_above(n: u32) -> u32 {
    let mut result = 2;
    while result <= n {
        result *= 2;
    }
    result
}

/// Groups keyword indices by the multiset of their still-undetermined codes,
/// in first-encounter order.
fn compute_partition(projections: &[SelChars], undetermined: &BitSlice) -> Vec<Vec<usize>> {
    let mut index: HashMap<Vec<u32>, usize> = HashMap::new();
    let mut classes: Vec<Vec<usize>> = Vec::new();

    for (kw, projection) in projections.iter().enumerate() {
        let signature: Vec<u32> = projection
            .codes()
            .iter()
            .copied()
            .filter(|&code| undetermined[code as usize])
            .collect();
        let class = *index.entry(signature).or_insert_with(|| {
            classes.push(Vec::new());
            classes.len() - 1
        });
        classes[class].push(kw);
    }
    classes
}

/// Possible collisions if `code`'s value were chosen against `partition`.
///
/// Fixing `code` splits every class by the keywords' occurrence count of
/// `code`; a class of size `n` splitting into sizes `n₁, n₂, …` contributes
/// `n² − Σnᵢ²`.
fn possible_collisions(
    partition: &[Vec<usize>],
    projections: &[SelChars],
    code: u32,
    positions_len: usize,
) -> u64 {
    let mut sum = 0u64;
    let mut split = vec![0u64; positions_len + 1];

    for class in partition {
        split.fill(0);
        for &kw in class {
            split[projections[kw].count(code)] += 1;
        }
        sum += (class.len() as u64) * (class.len() as u64);
        for &cardinality in &split {
            sum -= cardinality * cardinality;
        }
    }
    sum
}

/// Whether treating `code` as undetermined would leave `partition` as is,
/// i.e. every keyword in every class carries `code` equally often.
fn unchanged_partition(partition: &[Vec<usize>], projections: &[SelChars], code: u32) -> bool {
    for class in partition {
        let mut first = None;
        for &kw in class {
            let count = projections[kw].count(code);
            match first {
                None => first = Some(count),
                Some(f) if f != count => return false,
                Some(_) => {}
            }
        }
    }
    true
}

/// Derives the ordered step sequence, back to front.
fn build_steps(
    projections: &[SelChars],
    occurrences: &[u32],
    positions_len: usize,
    asso_value_max: u32,
    max_hash_value: u32,
) -> Vec<Step> {
    let alpha_size = occurrences.len();
    let mut undetermined = bitvec![0; alpha_size];
    let mut determined = bitvec![1; alpha_size];
    let mut steps: Vec<Step> = Vec::new();

    loop {
        let partition = compute_partition(projections, &undetermined);

        // Pick the determined code whose fixation risks the fewest
        // collisions; risky codes are thereby handled early in the solve.
        let mut chosen: Option<(usize, u64)> = None;
        for code in 0..alpha_size {
            if occurrences[code] > 0 && determined[code] {
                let risk = possible_collisions(&partition, projections, code as u32, positions_len);
                if chosen.map_or(true, |(_, best)| risk < best) {
                    chosen = Some((code, risk));
                }
            }
        }
        let Some((chosen_code, chosen_risk)) = chosen else {
            // Every occurring code is undetermined: the derivation has
            // reached the starting situation of the solve.
            break;
        };

        let step_undetermined = undetermined.clone();
        let step_partition: Vec<Vec<usize>> = partition
            .into_iter()
            .filter(|class| class.len() >= 2)
            .collect();

        undetermined.set(chosen_code, true);
        let refined = compute_partition(projections, &undetermined);

        // Fold in every code that cannot refine the new partition; deciding
        // it in a separate step would only add useless backtracking.
        for code in 0..alpha_size {
            if occurrences[code] > 0
                && determined[code]
                && unchanged_partition(&refined, projections, code as u32)
            {
                undetermined.set(code, true);
                determined.set(code, false);
            }
        }
        debug_assert!(!determined[chosen_code]);

        let changing: Vec<usize> = (0..alpha_size)
            .filter(|&code| undetermined[code] && !step_undetermined[code])
            .collect();

        steps.insert(
            0,
            Step {
                changing,
                asso_value_max,
                undetermined: step_undetermined,
                partition: step_partition,
                expected_lower: (chosen_risk as f64 / f64::from(max_hash_value)).exp(),
                expected_upper: (chosen_risk as f64 / f64::from(asso_value_max)).exp(),
            },
        );
    }
    steps
}

/// Whether the current table values collide inside any of the step's groups.
///
/// Hashes are partial: only values of codes already determined at this step
/// contribute, plus the keyword length.
fn has_collision(
    step: &Step,
    projections: &[SelChars],
    asso_values: &[u32],
    max_hash_value: u32,
    detector: &mut CollisionDetector,
) -> bool {
    for class in &step.partition {
        detector.reset(max_hash_value as usize + 1);
        for &kw in class {
            let projection = &projections[kw];
            let mut hash = projection.keyword_len() as u32;
            for &code in projection.codes() {
                if !step.undetermined[code as usize] {
                    hash += asso_values[code as usize];
                }
            }
            if !detector.insert(hash) {
                return true;
            }
        }
    }
    false
}

/// Full hash of one projection under the current table.
fn full_hash(projection: &SelChars, asso_values: &[u32]) -> u32 {
    let mut hash = projection.keyword_len() as u32;
    for &code in projection.codes() {
        hash += asso_values[code as usize];
    }
    hash
}

/// Trial enumeration driving one step.
enum Enumeration {
    Stride(StrideOdometer),
    Random {
        /// Index into the changing set of the entry perturbed next.
        next: usize,
    },
}

/// One complete solve over freshly derived steps. Returns the table together
/// with the (possibly grown) global bound and maximum hash value.
#[allow(clippy::too_many_arguments)]
fn solve(
    projections: &[SelChars],
    occurrences: &[u32],
    positions_len: usize,
    max_len: u32,
    mut asso_value_max: u32,
    mut max_hash_value: u32,
    initial_value: Option<u32>,
    jump: u32,
    rng: &mut ChaCha8Rng,
    detector: &mut CollisionDetector,
) -> (Vec<u32>, u32, u32) {
    let alpha_size = occurrences.len();
    let mut steps = build_steps(
        projections,
        occurrences,
        positions_len,
        asso_value_max,
        max_hash_value,
    );
    debug!("solving {} step(s)", steps.len());

    let mut asso_values = vec![0u32; alpha_size];

    for (stepno, step) in steps.iter_mut().enumerate() {
        let count = step.changing.len();
        for &code in &step.changing {
            let base = initial_value.unwrap_or_else(|| rng.gen::<u32>());
            asso_values[code] = base & (step.asso_value_max - 1);
        }

        let mut enumeration = if jump != 0 {
            Enumeration::Stride(StrideOdometer::new(count, jump, step.asso_value_max))
        } else {
            Enumeration::Random { next: 0 }
        };

        let mut iterations: u64 = 0;
        loop {
            iterations += 1;
            if !has_collision(step, projections, &asso_values, max_hash_value, detector) {
                break;
            }

            match &mut enumeration {
                Enumeration::Stride(odometer) => {
                    if let Advance::Widened(limit) = odometer.advance(&mut asso_values, &step.changing)
                    {
                        // Out of search space. Rather than backtrack into
                        // earlier steps, widen this step's bound.
                        step.asso_value_max = limit;
                        if limit > asso_value_max {
                            asso_value_max = limit;
                            max_hash_value = max_len + (asso_value_max - 1) * positions_len as u32;
                            debug!(
                                "step {stepno}: widened global bound to {asso_value_max}, max hash {max_hash_value}"
                            );
                        }
                    }
                }
                Enumeration::Random { next } => {
                    let code = step.changing[*next];
                    asso_values[code] =
                        asso_values[code].wrapping_add(rng.gen::<u32>()) & (step.asso_value_max - 1);
                    *next = (*next + 1) % count;
                }
            }
        }

        trace!(
            "step {stepno}: {count} value(s) fixed after {iterations} iteration(s), expected {:.2}..{:.2}",
            step.expected_lower,
            step.expected_upper
        );
    }

    (asso_values, asso_value_max, max_hash_value)
}

/// Searches for an associative-value table making all keyword hashes unique.
///
/// Precondition: the full projections must already be pairwise distinct;
/// otherwise [`Error::DuplicateProjection`] names one offender and the whole
/// computation aborts, since no table can separate identical multisets.
pub fn find_asso_values(
    keywords: &KeywordSet,
    positions: &PositionSet,
    alpha_inc: &[u32],
    config: &Config,
) -> Result<AssoTable> {
    let projections: Vec<SelChars> = keywords
        .iter()
        .map(|word| SelChars::select(word, positions, alpha_inc))
        .collect();

    let mut seen = HashSet::with_capacity(projections.len());
    for (kw, projection) in projections.iter().enumerate() {
        if !seen.insert(projection) {
            return Err(Error::DuplicateProjection {
                keyword: keywords.get(kw).to_string(),
            });
        }
    }

    let alpha_size = 256 + alpha_inc.iter().copied().max().unwrap_or(0) as usize;
    let mut occurrences = vec![0u32; alpha_size];
    for projection in &projections {
        for &code in projection.codes() {
            occurrences[code as usize] += 1;
        }
    }

    let positions_len = positions.len();
    let max_len = keywords.max_len() as u32;
    let mut asso_value_max = next_power_of_two_above(keywords.len() as u32);
    let mut max_hash_value = max_len + (asso_value_max - 1) * positions_len as u32;

    let mut rng = ChaCha8Rng::seed_from_u64(config.rng_seed);
    let mut detector = CollisionDetector::new();

    let iterations = config.asso_iterations.max(1);
    let random_initial = config.initial_value.is_none();
    let mut initial = config.initial_value.unwrap_or(0);
    let mut jump = config.jump;

    let mut best_quality: Option<Quality> = None;
    let mut best_values = Vec::new();

    for iteration in 0..iterations {
        let (asso_values, new_max, new_hash) = solve(
            &projections,
            &occurrences,
            positions_len,
            max_len,
            asso_value_max,
            max_hash_value,
            if random_initial { None } else { Some(initial) },
            jump,
            &mut rng,
            &mut detector,
        );
        asso_value_max = new_max;
        max_hash_value = new_hash;

        // Rank this run: collision count, then realized maximum hash.
        let mut collisions = 0;
        let mut realized_max = 0;
        detector.reset(max_hash_value as usize + 1);
        for projection in &projections {
            let hash = full_hash(projection, &asso_values);
            realized_max = realized_max.max(hash);
            if !detector.insert(hash) {
                collisions += 1;
            }
        }
        let quality = Quality {
            collisions,
            max_hash_value: realized_max,
        };
        debug!(
            "run {iteration} (initial {initial}, jump {jump}): {collisions} collision(s), max hash {realized_max}"
        );

        if best_quality.map_or(true, |best| quality < best) {
            best_quality = Some(quality);
            best_values = asso_values;
        }

        // Next (initial, jump) pair of the ladder.
        if initial >= 2 {
            initial -= 2;
            jump += 2;
        } else {
            initial += jump;
            jump = 1;
        }
    }

    Ok(AssoTable {
        values: best_values,
        occurrences,
    })
}
