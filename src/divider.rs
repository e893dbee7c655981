//! Incremental reassignment for strictly increasing means.
//!
//! With distinct, sorted means every cluster is a contiguous run of the sorted
//! samples, so a clustering is fully described by the `k - 1` boundaries
//! ("dividers") between neighbouring runs. When the means move, each divider
//! only has to slide to the midpoint of its two new means, and every sample it
//! slides over changes cluster in O(1). After the first couple of iterations
//! dividers move very little, which is what makes this cheaper than a full
//! O(n log k) reassignment.

use crate::stats::ClusterStats;
use crate::KmNum;

/// Positions of the boundaries between adjacent clusters in the sorted
/// samples. Divider `i` is the index of the first sample of cluster `i + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DividerTracker {
    positions: Vec<usize>,
}

impl DividerTracker {
    /// Recover the divider positions from per-cluster counts over sorted data.
    pub fn from_counts(counts: &[usize]) -> Self {
        let positions = counts
            .iter()
            .take(counts.len().saturating_sub(1))
            .scan(0, |acc, &count| {
                *acc += count;
                Some(*acc)
            })
            .collect();
        Self { positions }
    }

    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    /// Slide every divider to the midpoint of its neighbouring `means` and move
    /// the samples it passes over between the two clusters' running sums.
    ///
    /// `means` must be strictly increasing and line up with `stats`, which must
    /// describe the current divider positions over `samples`. A sample lying
    /// exactly on a midpoint goes to the upper cluster. Returns the number of
    /// single-sample moves.
    pub fn advance<T: KmNum>(
        &mut self,
        samples: &[T],
        means: &[T],
        stats: &mut ClusterStats<T>,
    ) -> usize {
        debug_assert_eq!(self.positions.len() + 1, means.len());
        debug_assert_eq!(means.len(), stats.len());
        let n = samples.len();
        let two = T::one() + T::one();
        let mut moves = 0;

        for (i, pair) in means.windows(2).enumerate() {
            // halved first so means near T::MAX don't overflow
            let mid = pair[0] / two + pair[1] / two;
            let mut pos = self.positions[i];

            // already between the last sample below mid and the first at or above it
            if pos > 0 && pos < n && samples[pos - 1] < mid && samples[pos] >= mid {
                continue;
            }

            if pos > 0 && samples[pos - 1] >= mid {
                while pos > 0 && samples[pos - 1] >= mid {
                    let value = samples[pos - 1];
                    stats.sums[i] = stats.sums[i] - value;
                    stats.sums[i + 1] = stats.sums[i + 1] + value;
                    pos -= 1;
                    moves += 1;
                }
            } else {
                while pos < n && samples[pos] < mid {
                    let value = samples[pos];
                    stats.sums[i] = stats.sums[i] + value;
                    stats.sums[i + 1] = stats.sums[i + 1] - value;
                    pos += 1;
                    moves += 1;
                }
            }
            self.positions[i] = pos;
        }

        // a right-moving divider may pass its neighbour's stale position, so
        // counts are only rebuilt once every divider has settled
        let mut start = 0;
        let ends = self.positions.iter().copied().chain(std::iter::once(n));
        for (count, end) in stats.counts.iter_mut().zip(ends) {
            *count = end - start;
            start = end;
        }
        moves
    }
}
