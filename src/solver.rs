//! Fixed-point iteration of one-dimensional k-means.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::assign::{assign_all, nearest_mean, TieBreaker};
use crate::divider::DividerTracker;
use crate::samples::SortedSamples;
use crate::stats::ClusterStats;
use crate::{KMeansErr, KmNum};

/// Cluster count used when none is configured
pub const DEFAULT_CLUSTERS: usize = 25;

/// How clusters are reassigned on each iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignMode {
    /// Slide dividers while the means are distinct, reassign from scratch
    /// otherwise.
    #[default]
    Adaptive,
    /// Reassign every sample from scratch on every iteration.
    NaiveOnly,
}

/// Parameters of one clustering run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KMeansConfig {
    /// Requested number of clusters. Fewer may survive.
    pub clusters: usize,
    pub mode: AssignMode,
    /// Seed for tie-breaking. `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            clusters: DEFAULT_CLUSTERS,
            mode: AssignMode::Adaptive,
            seed: None,
        }
    }
}

impl KMeansConfig {
    pub fn with_clusters(clusters: usize) -> Self {
        Self {
            clusters,
            ..Self::default()
        }
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn mode(mut self, mode: AssignMode) -> Self {
        self.mode = mode;
        self
    }
}

/// The reassignment used for a single iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// [`DividerTracker`]: valid only when the means are strictly increasing.
    Fast,
    /// Full nearest-mean pass.
    Slow,
}

impl Step {
    fn select<T: KmNum>(means: &[T], mode: AssignMode) -> Self {
        match mode {
            AssignMode::NaiveOnly => Step::Slow,
            AssignMode::Adaptive if strictly_increasing(means) => Step::Fast,
            AssignMode::Adaptive => Step::Slow,
        }
    }
}

fn strictly_increasing<T: KmNum>(means: &[T]) -> bool {
    means.windows(2).all(|pair| pair[0] < pair[1])
}

/// Outcome of a clustering run.
#[derive(Debug, Clone, PartialEq)]
pub struct Clustering<T> {
    /// Final cluster means, ascending.
    pub means: Vec<T>,
    /// Members per cluster, aligned with `means`.
    pub counts: Vec<usize>,
    /// Iterations after the initial assignment.
    pub iterations: usize,
    /// How many of those used divider tracking.
    pub fast_iterations: usize,
    /// Average single-sample moves per divider over the fast iterations.
    pub avg_divider_moves: f64,
    pub requested_clusters: usize,
}

impl<T: KmNum> Clustering<T> {
    /// Clusters that survived. Can be lower than requested when the data has
    /// fewer distinct values or clusters were emptied.
    pub fn effective_clusters(&self) -> usize {
        self.means.len()
    }

    /// Index of the final cluster `value` belongs to.
    pub fn classify<B: TieBreaker + ?Sized>(&self, value: T, ties: &mut B) -> usize {
        nearest_mean(value, &self.means, ties)
    }

    /// Mean of the final cluster `value` belongs to.
    pub fn representative<B: TieBreaker + ?Sized>(&self, value: T, ties: &mut B) -> T {
        self.means[self.classify(value, ties)]
    }

    /// Cluster labels for a run of optional samples; missing and NaN samples
    /// get `None`.
    pub fn labels<B: TieBreaker + ?Sized>(
        &self,
        values: &[Option<T>],
        ties: &mut B,
    ) -> Vec<Option<usize>> {
        values
            .iter()
            .map(|value| match value {
                Some(v) if !v.is_nan() => Some(self.classify(*v, ties)),
                _ => None,
            })
            .collect()
    }
}

/// Evenly spaced starting means from `min` up to (but excluding) `max`.
fn bootstrap_means<T: KmNum>(min: T, max: T, clusters: usize) -> Result<Vec<T>, KMeansErr> {
    let k = T::from_usize(clusters).ok_or(KMeansErr::ConversionError)?;
    (0..clusters)
        .map(|i| {
            let frac = T::from_usize(i).ok_or(KMeansErr::ConversionError)? / k;
            Ok(frac * max + (T::one() - frac) * min)
        })
        .collect()
}

/// Means of the current clusters. Clusters that share a mean, such as a tied
/// value split over two neighbours, are merged so the means stay strictly
/// increasing.
fn settle<T: KmNum>(stats: &mut ClusterStats<T>, iteration: usize) -> Result<Vec<T>, KMeansErr> {
    let mut means = stats.means()?;
    let merged = stats.merge_coincident(&mut means);
    if merged > 0 {
        debug!("iteration {}: merged {} clusters sharing a mean", iteration, merged);
    }
    Ok(means)
}

/// Runs k-means over sorted samples until the means stop changing.
#[derive(Debug, Clone, Default)]
pub struct ClusterSolver {
    config: KMeansConfig,
}

impl ClusterSolver {
    pub fn new(config: KMeansConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &KMeansConfig {
        &self.config
    }

    /// Cluster `samples`, breaking assignment ties with `ties`.
    ///
    /// The means start evenly spaced over the sample range. Clusters that end
    /// up empty are dropped, clusters that end up with the same mean are
    /// merged, and the iteration stops at the first exact fixed point of the
    /// means.
    pub fn solve<T: KmNum, B: TieBreaker + ?Sized>(
        &self,
        samples: &SortedSamples<T>,
        ties: &mut B,
    ) -> Result<Clustering<T>, KMeansErr> {
        let requested = self.config.clusters;
        if requested == 0 {
            return Err(KMeansErr::InvalidK);
        }
        let values = samples.as_slice();
        // more clusters than distinct values can only produce duplicates
        let k = requested.min(samples.distinct_count());
        if k < requested {
            debug!("only {} distinct values, reducing {} requested clusters", k, requested);
        }

        let mut means = bootstrap_means(samples.min(), samples.max(), k)?;
        let mut stats = assign_all(values, &means, ties);
        stats.eliminate_empty(&mut means);
        let mut current = settle(&mut stats, 0)?;

        let mut iterations = 0;
        let mut fast_iterations = 0;
        let mut moves_per_divider = 0.0;
        loop {
            let mut previous = current;
            iterations += 1;
            match Step::select(&previous, self.config.mode) {
                Step::Fast => {
                    let mut tracker = DividerTracker::from_counts(&stats.counts);
                    let moves = tracker.advance(values, &previous, &mut stats);
                    let dividers = tracker.positions().len();
                    if dividers > 0 {
                        moves_per_divider += moves as f64 / dividers as f64;
                    }
                    fast_iterations += 1;
                }
                Step::Slow => stats = assign_all(values, &previous, ties),
            }
            let dropped = stats.eliminate_empty(&mut previous);
            if dropped > 0 {
                debug!("iteration {}: dropped {} empty clusters", iterations, dropped);
            }
            current = settle(&mut stats, iterations)?;
            if current == previous {
                break;
            }
        }

        let avg_divider_moves = if fast_iterations > 0 {
            moves_per_divider / fast_iterations as f64
        } else {
            0.0
        };
        debug!(
            "converged to {} clusters after {} iterations ({} fast)",
            current.len(),
            iterations,
            fast_iterations
        );
        Ok(Clustering {
            means: current,
            counts: stats.counts,
            iterations,
            fast_iterations,
            avg_divider_moves,
            requested_clusters: requested,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assign::RngTieBreaker;
    use crate::assign::tests::{Alternating, Lowest};
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rand_distr::{Distribution, Normal};

    fn solve(values: &[f64], config: KMeansConfig) -> Result<Clustering<f64>, KMeansErr> {
        let samples = SortedSamples::from_values(values)?;
        let mut ties = RngTieBreaker::from_seed_option(config.seed);
        ClusterSolver::new(config).solve(&samples, &mut ties)
    }

    fn integer_data(seed: u64, len: usize, range: u32) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..len)
            .map(|_| rng.random_range(0..range) as f64)
            .collect()
    }

    #[test]
    fn bootstrap_interpolates_from_min() {
        let means = bootstrap_means(1.0f64, 9.0, 4).unwrap();
        assert_eq!(means, vec![1.0, 3.0, 5.0, 7.0]);
    }

    #[test]
    fn two_clear_groups() {
        let res = solve(&[1., 1., 2., 8., 9., 9.], KMeansConfig::with_clusters(2)).unwrap();
        assert_eq!(res.means.len(), 2);
        assert_relative_eq!(res.means[0], 4.0 / 3.0);
        assert_relative_eq!(res.means[1], 26.0 / 3.0);
        assert_eq!(res.counts, vec![3, 3]);
        assert_eq!(res.iterations, 1);
        assert_eq!(res.fast_iterations, 1);
        assert_eq!(res.avg_divider_moves, 0.0);
    }

    #[test]
    fn divider_moves_across_iterations() {
        let data = [1., 2., 3., 10., 11., 12., 20., 21., 22.];
        let res = solve(&data, KMeansConfig::with_clusters(3)).unwrap();
        assert_eq!(res.means, vec![2.0, 11.0, 21.0]);
        assert_eq!(res.counts, vec![3, 3, 3]);
        // 12 starts nearer the top bootstrap mean and is moved down once
        assert_eq!(res.iterations, 2);
        assert_eq!(res.avg_divider_moves, 0.25);
    }

    #[test]
    fn single_sample_collapses_to_one_cluster() {
        let res = solve(&[5.0], KMeansConfig::with_clusters(3)).unwrap();
        assert_eq!(res.means, vec![5.0]);
        assert_eq!(res.counts, vec![1]);
        assert_eq!(res.requested_clusters, 3);
        assert_eq!(res.effective_clusters(), 1);
    }

    #[test]
    fn identical_values_give_one_mean_for_any_k() {
        for k in 1..10 {
            let res = solve(&[4.5; 64], KMeansConfig::with_clusters(k)).unwrap();
            assert_eq!(res.means, vec![4.5]);
            assert_eq!(res.counts, vec![64]);
        }
    }

    #[test]
    fn zero_clusters_is_rejected() {
        assert_eq!(
            solve(&[1.0, 2.0], KMeansConfig::with_clusters(0)),
            Err(KMeansErr::InvalidK)
        );
    }

    #[test]
    fn terminates_with_at_most_k_ascending_means() {
        for seed in 0..4 {
            let data = integer_data(seed, 500, 60);
            for k in 1..=12 {
                let res = solve(&data, KMeansConfig::with_clusters(k).seed(seed)).unwrap();
                assert!(res.means.len() <= k);
                assert!(!res.means.is_empty());
                assert!(res.means.windows(2).all(|w| w[0] < w[1]));
                assert_eq!(res.counts.iter().sum::<usize>(), data.len());
                assert!(res.counts.iter().all(|&c| c > 0));
            }
        }
    }

    #[test]
    fn fixed_seed_is_reproducible() {
        let data = integer_data(11, 2_000, 40);
        let config = KMeansConfig::with_clusters(9).seed(42);
        let first = solve(&data, config.clone()).unwrap();
        let second = solve(&data, config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn naive_only_matches_divider_tracking_exactly() {
        let data = [1., 2., 3., 10., 11., 12., 20., 21., 22.];
        let fast = solve(&data, KMeansConfig::with_clusters(3)).unwrap();
        let slow = solve(
            &data,
            KMeansConfig::with_clusters(3).mode(AssignMode::NaiveOnly),
        )
        .unwrap();
        assert_eq!(fast.means, slow.means);
        assert_eq!(fast.counts, slow.counts);
        assert_eq!(slow.fast_iterations, 0);
        assert_eq!(slow.avg_divider_moves, 0.0);
    }

    #[test]
    fn naive_only_matches_divider_tracking_on_continuous_data() {
        let mut rng = StdRng::seed_from_u64(3);
        let normal = Normal::new(280.0, 12.0).unwrap();
        let data: Vec<f64> = (0..5_000).map(|_| normal.sample(&mut rng)).collect();
        for k in [2, 5, 9, 16] {
            let fast = solve(&data, KMeansConfig::with_clusters(k).seed(1)).unwrap();
            let slow = solve(
                &data,
                KMeansConfig::with_clusters(k)
                    .seed(1)
                    .mode(AssignMode::NaiveOnly),
            )
            .unwrap();
            assert_eq!(fast.counts, slow.counts);
            assert_eq!(fast.iterations, slow.iterations);
            for (f, s) in fast.means.iter().zip(&slow.means) {
                assert_relative_eq!(*f, *s, max_relative = 1e-9);
            }
            assert!(fast.fast_iterations > 0);
        }
    }

    #[test]
    fn reclustering_the_means_is_a_fixed_point() {
        let data = [1., 2., 3., 10., 11., 12., 20., 21., 22.];
        let first = solve(&data, KMeansConfig::with_clusters(3)).unwrap();
        let again = solve(&first.means, KMeansConfig::with_clusters(3)).unwrap();
        assert_eq!(again.means, first.means);

        let first = solve(&[1., 1., 2., 8., 9., 9.], KMeansConfig::with_clusters(2)).unwrap();
        let again = solve(&first.means, KMeansConfig::with_clusters(2)).unwrap();
        assert_eq!(again.means, first.means);
    }

    #[test]
    fn empty_bootstrap_clusters_are_eliminated() {
        // nothing lands near the middle starting mean
        let res = solve(&[0.0, 1.0, 20.0], KMeansConfig::with_clusters(3)).unwrap();
        assert_eq!(res.means, vec![0.5, 20.0]);
        assert_eq!(res.counts, vec![2, 1]);
        assert_eq!(res.requested_clusters, 3);
        assert_eq!(res.effective_clusters(), 2);
    }

    #[test]
    fn step_selection() {
        let distinct = [1.0f64, 2.0, 3.0];
        let duplicated = [1.0f64, 2.0, 2.0];
        assert_eq!(Step::select(&distinct, AssignMode::Adaptive), Step::Fast);
        assert_eq!(Step::select(&[7.0f64], AssignMode::Adaptive), Step::Fast);
        assert_eq!(Step::select(&duplicated, AssignMode::Adaptive), Step::Slow);
        assert_eq!(Step::select(&distinct, AssignMode::NaiveOnly), Step::Slow);
    }

    #[test]
    fn tied_midpoint_values_never_leave_duplicate_means() {
        // the 3s sit exactly between the bootstrap means 2 and 4
        let data = [0., 3., 3., 3., 3., 7., 8.];
        for seed in 0..50 {
            let res = solve(&data, KMeansConfig::with_clusters(4).seed(seed)).unwrap();
            assert_eq!(res.means, vec![0.0, 3.0, 7.5], "seed {seed}");
            assert_eq!(res.counts, vec![1, 4, 2], "seed {seed}");
            assert_eq!(res.effective_clusters(), 3);
        }
    }

    #[test]
    fn split_ties_merge_before_divider_tracking() {
        // alternating picks split the 3s over two clusters with the same mean
        let data = [0., 3., 3., 5.1, 8., 8., 8.];
        let adaptive = ClusterSolver::new(KMeansConfig::with_clusters(4));
        let samples = SortedSamples::from_values(&data).unwrap();
        let fast = adaptive.solve(&samples, &mut Alternating::default()).unwrap();

        // 5.1 moves down once the merged cluster's mean is known
        assert_eq!(fast.iterations, 2);
        assert_eq!(fast.fast_iterations, 2);
        assert_eq!(fast.avg_divider_moves, 0.25);
        assert_eq!(fast.counts, vec![1, 3, 3]);
        assert_eq!(fast.means[0], 0.0);
        assert_relative_eq!(fast.means[1], 3.7, max_relative = 1e-12);
        assert_relative_eq!(fast.means[2], 8.0, max_relative = 1e-12);

        let naive = ClusterSolver::new(KMeansConfig::with_clusters(4).mode(AssignMode::NaiveOnly));
        let slow = naive.solve(&samples, &mut Alternating::default()).unwrap();
        assert_eq!(slow.iterations, 2);
        assert_eq!(slow.fast_iterations, 0);
        assert_eq!(slow.counts, fast.counts);
        for (f, s) in fast.means.iter().zip(&slow.means) {
            assert_relative_eq!(*f, *s, max_relative = 1e-12);
        }
    }

    #[test]
    fn classify_and_label_against_final_means() {
        let res = solve(&[1., 2., 3., 10., 11., 12., 20., 21., 22.], KMeansConfig::with_clusters(3))
            .unwrap();
        let mut ties = Lowest::default();
        assert_eq!(res.classify(14.0, &mut ties), 1);
        assert_eq!(res.representative(17.0, &mut ties), 21.0);
        assert_eq!(
            res.labels(&[Some(0.0), None, Some(f64::NAN), Some(30.0)], &mut ties),
            vec![Some(0), None, None, Some(2)]
        );
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = KMeansConfig::with_clusters(7)
            .seed(99)
            .mode(AssignMode::NaiveOnly);
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"naive_only\""));
        let parsed: KMeansConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);

        let defaults: KMeansConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(defaults, KMeansConfig::default());
        assert_eq!(defaults.clusters, DEFAULT_CLUSTERS);
    }
}
