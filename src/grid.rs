//! Clustering a latitude/longitude grid with missing cells.

use serde::{Deserialize, Serialize};

use crate::assign::{RngTieBreaker, TieBreaker};
use crate::samples::SortedSamples;
use crate::solver::{ClusterSolver, Clustering, KMeansConfig};
use crate::{KMeansErr, KmNum};

/// Latitude rows on a one-degree global grid
pub const EARTH_LAT: usize = 180;
/// Longitude columns on a one-degree global grid
pub const EARTH_LON: usize = 360;

/// A latitude × longitude grid of optional samples, row-major.
/// `None` marks a cell without an observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGrid<T>")]
pub struct Grid<T> {
    lat: usize,
    lon: usize,
    cells: Vec<Option<T>>,
}

/// Unchecked serialized form, validated on the way in.
#[derive(Deserialize)]
struct RawGrid<T> {
    lat: usize,
    lon: usize,
    cells: Vec<Option<T>>,
}

impl<T> TryFrom<RawGrid<T>> for Grid<T> {
    type Error = KMeansErr;

    fn try_from(raw: RawGrid<T>) -> Result<Self, Self::Error> {
        Grid::new(raw.lat, raw.lon, raw.cells)
    }
}

impl<T> Grid<T> {
    pub fn new(lat: usize, lon: usize, cells: Vec<Option<T>>) -> Result<Self, KMeansErr> {
        if lat.checked_mul(lon) != Some(cells.len()) {
            return Err(KMeansErr::GridShape {
                lat,
                lon,
                cells: cells.len(),
            });
        }
        Ok(Self { lat, lon, cells })
    }

    pub fn lat(&self) -> usize {
        self.lat
    }

    pub fn lon(&self) -> usize {
        self.lon
    }

    pub fn cells(&self) -> &[Option<T>] {
        &self.cells
    }
}

impl<T: KmNum> Grid<T> {
    /// A grid with every cell missing.
    pub fn missing(lat: usize, lon: usize) -> Result<Self, KMeansErr> {
        let cells = lat.checked_mul(lon).ok_or(KMeansErr::GridShape {
            lat,
            lon,
            cells: 0,
        })?;
        Ok(Self {
            lat,
            lon,
            cells: vec![None; cells],
        })
    }

    /// An all-missing one-degree global grid.
    pub fn earth() -> Self {
        Self {
            lat: EARTH_LAT,
            lon: EARTH_LON,
            cells: vec![None; EARTH_LAT * EARTH_LON],
        }
    }

    /// Build from nested rows, one per latitude, as gridded JSON exports
    /// store them. Every row must have the same length.
    pub fn from_rows(rows: Vec<Vec<Option<T>>>) -> Result<Self, KMeansErr> {
        let lat = rows.len();
        let lon = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|row| row.len() != lon) {
            return Err(KMeansErr::GridShape {
                lat,
                lon,
                cells: rows.iter().map(Vec::len).sum(),
            });
        }
        let cells: Vec<Option<T>> = rows.into_iter().flatten().collect();
        Self::new(lat, lon, cells)
    }

    /// Build from a dense array in which `fill` (for example a NetCDF
    /// `_FillValue` such as `-32767`) or NaN marks missing cells.
    pub fn from_filled(lat: usize, lon: usize, values: &[T], fill: T) -> Result<Self, KMeansErr> {
        let cells = values
            .iter()
            .map(|&v| if v == fill || v.is_nan() { None } else { Some(v) })
            .collect();
        Self::new(lat, lon, cells)
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        self.cells[row * self.lon + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, val: Option<T>) {
        self.cells[row * self.lon + col] = val;
    }

    pub fn to_rows(&self) -> Vec<Vec<Option<T>>> {
        if self.lon == 0 {
            return vec![Vec::new(); self.lat];
        }
        self.cells.chunks(self.lon).map(<[_]>::to_vec).collect()
    }

    /// Number of cells holding a usable sample.
    pub fn present(&self) -> usize {
        self.cells
            .iter()
            .filter(|c| matches!(c, Some(v) if !v.is_nan()))
            .count()
    }

    /// Smallest and largest present value, or `None` if every cell is missing.
    pub fn min_max(&self) -> Option<(T, T)> {
        self.cells
            .iter()
            .flatten()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

/// A grid whose present cells were replaced by their cluster means.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusteredGrid<T> {
    pub grid: Grid<T>,
    /// Smallest value in the clustered grid
    pub min: T,
    /// Largest value in the clustered grid
    pub max: T,
    pub clustering: Clustering<T>,
}

/// Cluster the present cells of `grid`, with tie-breaking seeded from
/// `config.seed` (or OS entropy).
pub fn cluster_grid<T: KmNum>(
    grid: &Grid<T>,
    config: &KMeansConfig,
) -> Result<ClusteredGrid<T>, KMeansErr> {
    let mut ties = RngTieBreaker::from_seed_option(config.seed);
    cluster_grid_with(grid, config, &mut ties)
}

/// Cluster the present cells of `grid` and replace each by the mean of the
/// cluster it is nearest to. Missing cells stay missing.
pub fn cluster_grid_with<T: KmNum, B: TieBreaker + ?Sized>(
    grid: &Grid<T>,
    config: &KMeansConfig,
    ties: &mut B,
) -> Result<ClusteredGrid<T>, KMeansErr> {
    let samples = SortedSamples::from_options(grid.cells.iter().copied())?;
    let clustering = ClusterSolver::new(config.clone()).solve(&samples, ties)?;

    let cells = grid
        .cells
        .iter()
        .map(|cell| match cell {
            Some(v) if !v.is_nan() => Some(clustering.representative(*v, ties)),
            _ => None,
        })
        .collect();
    let clustered = Grid {
        lat: grid.lat,
        lon: grid.lon,
        cells,
    };
    let (min, max) = clustered.min_max().ok_or(KMeansErr::EmptyDataset)?;
    Ok(ClusteredGrid {
        grid: clustered,
        min,
        max,
        clustering,
    })
}
