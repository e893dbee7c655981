//! Nearest-mean assignment for an arbitrary sorted set of means.
//!
//! This is the O(log k) per-sample path. It copes with duplicate means by
//! spreading tied samples uniformly over the duplicates, so that no cluster
//! index is systematically favoured. It bootstraps the solver, drives every
//! pass in naive-only mode, and classifies grid cells against final means.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::stats::ClusterStats;
use crate::KmNum;

/// Source of the uniform choices used to break assignment ties.
pub trait TieBreaker {
    /// Pick an index uniformly from `low..=high`. Only called with `low < high`.
    fn pick(&mut self, low: usize, high: usize) -> usize;
}

/// A [`TieBreaker`] backed by any [`rand::Rng`].
///
/// Each clustering task owns one, so parallel tasks never share random state.
#[derive(Debug, Clone)]
pub struct RngTieBreaker<R>(R);

impl<R: Rng> RngTieBreaker<R> {
    pub fn new(rng: R) -> Self {
        Self(rng)
    }
}

impl RngTieBreaker<StdRng> {
    /// Reproducible tie-breaking
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self(StdRng::from_os_rng())
    }

    /// Seeded when `seed` is given, otherwise from OS entropy.
    pub fn from_seed_option(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_entropy, Self::seeded)
    }
}

impl<R: Rng> TieBreaker for RngTieBreaker<R> {
    fn pick(&mut self, low: usize, high: usize) -> usize {
        self.0.random_range(low..=high)
    }
}

#[inline]
fn choose<B: TieBreaker + ?Sized>(low: usize, high: usize, ties: &mut B) -> usize {
    if low == high { low } else { ties.pick(low, high) }
}

/// `index` or any of the equal means directly above it
fn pick_upward<T: KmNum, B: TieBreaker + ?Sized>(means: &[T], index: usize, ties: &mut B) -> usize {
    let target = means[index];
    let last = index + means[index + 1..].iter().take_while(|&&m| m == target).count();
    choose(index, last, ties)
}

/// `index` or any of the equal means directly below it
fn pick_downward<T: KmNum, B: TieBreaker + ?Sized>(means: &[T], index: usize, ties: &mut B) -> usize {
    let target = means[index];
    let first = index - means[..index].iter().rev().take_while(|&&m| m == target).count();
    choose(first, index, ties)
}

/// Index of the mean nearest to `value`. `means` must be sorted ascending and
/// non-empty; duplicates are allowed.
///
/// Ties are broken uniformly: among a block of equal means, and between the
/// two neighbouring means when `value` sits exactly halfway.
pub fn nearest_mean<T: KmNum, B: TieBreaker + ?Sized>(value: T, means: &[T], ties: &mut B) -> usize {
    debug_assert!(!means.is_empty());
    // lowest index such that value <= means[index]
    let index = means.partition_point(|&m| m < value);
    if index == 0 {
        return pick_upward(means, 0, ties);
    }
    if index == means.len() {
        return pick_downward(means, index - 1, ties);
    }
    let above = (means[index] - value).abs();
    let below = (means[index - 1] - value).abs();
    if above == below {
        ties.pick(index - 1, index)
    } else if above < below {
        pick_upward(means, index, ties)
    } else {
        pick_downward(means, index - 1, ties)
    }
}

/// Assign every sample to its nearest mean from scratch.
pub fn assign_all<T: KmNum, B: TieBreaker + ?Sized>(
    samples: &[T],
    means: &[T],
    ties: &mut B,
) -> ClusterStats<T> {
    let mut stats = ClusterStats::zeroed(means.len());
    for &value in samples {
        stats.add(nearest_mean(value, means, ties), value);
    }
    stats
}
