//! Fast one-dimensional k-means clustering, built for reducing gridded
//! geophysical variables (sea-surface temperature, pressure, cloud cover…) to
//! a handful of representative levels that can be drawn as discrete colour
//! bands.
//!
//! In one dimension, k-means clusters are contiguous runs of the sorted
//! samples. After a single O(n log n) sort, each iteration only has to slide
//! the `k - 1` boundaries between neighbouring runs towards the midpoints of
//! the updated means, moving the samples they pass over from one running sum
//! to the next. This reaches the same fixed point as classic nearest-mean
//! assignment, usually at a fraction of the O(n·k) cost per iteration. Clusters
//! whose means coincide, as when a tied value is split over two neighbours,
//! are merged so the boundaries stay well defined. A full O(n log k)
//! nearest-mean pass remains available through [`AssignMode::NaiveOnly`].
//!
//! Missing cells (`None`, or NaN) never take part in clustering, and clusters
//! that end up empty are dropped, so fewer than `k` means may be returned.
//!
//! # Example
//!
//! ```
//! use fkmeans::cluster_1d_seeded;
//!
//! let input = vec![1.0f64, 12.0, 13.0, 2.0, 2.0, 3.0, 1.0, 14.0, 78.0, 82.0];
//! let result = cluster_1d_seeded(&input, 3, 42).unwrap();
//!
//! // nothing is nearest to the middle starting mean, so only two clusters survive
//! assert_eq!(result.means, vec![6.0, 80.0]);
//! assert_eq!(result.counts, vec![8, 2]);
//! assert_eq!(result.requested_clusters, 3);
//! ```

use num_traits::cast::FromPrimitive;
use num_traits::Float;
use std::fmt::Debug;

mod assign;
pub use crate::assign::{assign_all, nearest_mean, RngTieBreaker, TieBreaker};

#[cfg(not(target_arch = "wasm32"))]
mod batch;
#[cfg(not(target_arch = "wasm32"))]
pub use crate::batch::{cluster_datasets, BatchReport, Dataset, DatasetOutcome, VariableRange};

mod divider;
pub use crate::divider::DividerTracker;

mod errors;
pub use crate::errors::KMeansErr;

#[cfg(not(target_arch = "wasm32"))]
mod ffi;
#[cfg(not(target_arch = "wasm32"))]
pub use crate::ffi::{cluster_1d_ffi, drop_cluster_result, ClusterResult, ExternalArray};

mod grid;
pub use crate::grid::{cluster_grid, cluster_grid_with, ClusteredGrid, Grid, EARTH_LAT, EARTH_LON};

mod samples;
pub use crate::samples::SortedSamples;

mod solver;
pub use crate::solver::{AssignMode, ClusterSolver, Clustering, KMeansConfig, DEFAULT_CLUSTERS};

mod stats;
pub use crate::stats::ClusterStats;

#[cfg(target_arch = "wasm32")]
mod wasm;

/// The floating point types samples can be clustered as (`f32` and `f64`)
pub trait KmNum: Float + FromPrimitive + Debug + Send + Sync {}
impl<T: Float + FromPrimitive + Debug + Send + Sync> KmNum for T {}

/// Cluster `values` into at most `k` groups, breaking ties with OS entropy.
///
/// NaN entries are treated as missing. Returns the ascending cluster means
/// along with the iteration diagnostics.
pub fn cluster_1d<T: KmNum>(values: &[T], k: usize) -> Result<Clustering<T>, KMeansErr> {
    cluster_1d_with(
        values,
        &KMeansConfig::with_clusters(k),
        &mut RngTieBreaker::from_entropy(),
    )
}

/// Like [`cluster_1d`], but reproducible: ties are broken by a generator
/// seeded with `seed`.
pub fn cluster_1d_seeded<T: KmNum>(
    values: &[T],
    k: usize,
    seed: u64,
) -> Result<Clustering<T>, KMeansErr> {
    cluster_1d_with(
        values,
        &KMeansConfig::with_clusters(k).seed(seed),
        &mut RngTieBreaker::seeded(seed),
    )
}

/// Cluster `values` with an explicit configuration and tie-breaker. The
/// configured seed is ignored in favour of `ties`.
pub fn cluster_1d_with<T: KmNum, B: TieBreaker + ?Sized>(
    values: &[T],
    config: &KMeansConfig,
    ties: &mut B,
) -> Result<Clustering<T>, KMeansErr> {
    let samples = SortedSamples::from_values(values)?;
    ClusterSolver::new(config.clone()).solve(&samples, ties)
}
