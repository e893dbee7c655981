//! Clustering every variable of many datasets in parallel.
//!
//! Each (dataset, variable) pair is an independent unit of work with its own
//! tie-breaking generator. A unit that fails is logged and reported without
//! affecting the others.

use std::collections::BTreeMap;

use log::{debug, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::assign::RngTieBreaker;
use crate::grid::{cluster_grid_with, ClusteredGrid, Grid};
use crate::solver::KMeansConfig;
use crate::{KMeansErr, KmNum};

/// One file's (typically one day's) worth of gridded variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset<T> {
    pub name: String,
    pub variables: BTreeMap<String, Grid<T>>,
}

/// Value range of a clustered variable, for a colour scale shared by every
/// dataset in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VariableRange<T> {
    pub min: T,
    pub max: T,
}

impl<T: KmNum> VariableRange<T> {
    fn widen(self, other: Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

/// Per-variable results for one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetOutcome<T> {
    pub name: String,
    pub variables: BTreeMap<String, Result<ClusteredGrid<T>, KMeansErr>>,
}

impl<T: KmNum> DatasetOutcome<T> {
    /// The clustered dataset. Variables that failed to cluster are copied from
    /// `original` unchanged.
    pub fn into_dataset(self, original: &Dataset<T>) -> Dataset<T> {
        let mut variables = original.variables.clone();
        for (name, result) in self.variables {
            if let Ok(clustered) = result {
                variables.insert(name, clustered.grid);
            }
        }
        Dataset {
            name: self.name,
            variables,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport<T> {
    /// Outcomes in the order the datasets were given.
    pub datasets: Vec<DatasetOutcome<T>>,
    /// Range of each variable over every dataset it was clustered in.
    pub ranges: BTreeMap<String, VariableRange<T>>,
}

impl<T> BatchReport<T> {
    /// `(dataset, variable, error)` for every unit that failed.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &str, &KMeansErr)> {
        self.datasets.iter().flat_map(|outcome| {
            outcome.variables.iter().filter_map(move |(variable, result)| {
                result
                    .as_ref()
                    .err()
                    .map(|e| (outcome.name.as_str(), variable.as_str(), e))
            })
        })
    }
}

/// Seed for the `index`th unit, so a seeded batch is reproducible regardless
/// of scheduling.
fn unit_seed(seed: u64, index: usize) -> u64 {
    seed ^ (index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Cluster every variable of every dataset on the rayon pool.
pub fn cluster_datasets<T: KmNum>(
    datasets: &[Dataset<T>],
    config: &KMeansConfig,
) -> BatchReport<T> {
    let units: Vec<(usize, &str, &Grid<T>)> = datasets
        .iter()
        .enumerate()
        .flat_map(|(d, dataset)| {
            dataset
                .variables
                .iter()
                .map(move |(variable, grid)| (d, variable.as_str(), grid))
        })
        .collect();
    debug!(
        "clustering {} variables across {} datasets",
        units.len(),
        datasets.len()
    );

    let results: Vec<Result<ClusteredGrid<T>, KMeansErr>> = units
        .par_iter()
        .enumerate()
        .map(|(index, &(_, _, grid))| {
            let mut ties = match config.seed {
                Some(seed) => RngTieBreaker::seeded(unit_seed(seed, index)),
                None => RngTieBreaker::from_entropy(),
            };
            cluster_grid_with(grid, config, &mut ties)
        })
        .collect();

    let mut outcomes: Vec<DatasetOutcome<T>> = datasets
        .iter()
        .map(|dataset| DatasetOutcome {
            name: dataset.name.clone(),
            variables: BTreeMap::new(),
        })
        .collect();
    let mut ranges: BTreeMap<String, VariableRange<T>> = BTreeMap::new();
    let mut skipped = 0usize;
    for ((d, variable, _), result) in units.into_iter().zip(results) {
        match &result {
            Ok(clustered) => {
                let range = VariableRange {
                    min: clustered.min,
                    max: clustered.max,
                };
                ranges
                    .entry(variable.to_string())
                    .and_modify(|r| *r = r.widen(range))
                    .or_insert(range);
            }
            Err(e) => {
                warn!("skipping {} in {}: {}", variable, datasets[d].name, e);
                skipped += 1;
            }
        }
        outcomes[d].variables.insert(variable.to_string(), result);
    }
    if skipped > 0 {
        warn!("{} variables skipped due to errors", skipped);
    }

    BatchReport {
        datasets: outcomes,
        ranges,
    }
}
