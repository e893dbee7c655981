use crate::{KMeansErr, KmNum};

/// Running `(sum, count)` per cluster. Index `i` always lines up with the
/// `i`th entry of the means the clusters were assigned against.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterStats<T> {
    pub sums: Vec<T>,
    pub counts: Vec<usize>,
}

impl<T: KmNum> ClusterStats<T> {
    pub fn zeroed(clusters: usize) -> Self {
        Self {
            sums: vec![T::zero(); clusters],
            counts: vec![0; clusters],
        }
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Add a single sample to cluster `cluster`.
    #[inline]
    pub fn add(&mut self, cluster: usize, value: T) {
        self.sums[cluster] = self.sums[cluster] + value;
        self.counts[cluster] += 1;
    }

    /// Drop every cluster with no members, along with its entry in `means`.
    /// Returns how many were dropped.
    ///
    /// Empty clusters are removed rather than re-seeded, which is the usual
    /// practical fallback for k-means.
    pub fn eliminate_empty(&mut self, means: &mut Vec<T>) -> usize {
        debug_assert_eq!(means.len(), self.len());
        let before = self.len();
        let mut keep = self.counts.iter().map(|&c| c > 0);
        means.retain(|_| keep.next().unwrap_or(false));
        let mut keep = self.counts.iter().map(|&c| c > 0);
        self.sums.retain(|_| keep.next().unwrap_or(false));
        self.counts.retain(|&c| c > 0);
        before - self.len()
    }

    /// Fold every run of equal `means` into its first cluster by adding the
    /// sums and counts. `means` must be sorted and aligned with the clusters.
    /// Returns how many clusters were folded away.
    pub fn merge_coincident(&mut self, means: &mut Vec<T>) -> usize {
        debug_assert_eq!(means.len(), self.len());
        let before = self.len();
        let mut kept = 0;
        for i in 0..means.len() {
            if kept > 0 && means[i] == means[kept - 1] {
                self.sums[kept - 1] = self.sums[kept - 1] + self.sums[i];
                self.counts[kept - 1] += self.counts[i];
            } else {
                means[kept] = means[i];
                self.sums[kept] = self.sums[i];
                self.counts[kept] = self.counts[i];
                kept += 1;
            }
        }
        means.truncate(kept);
        self.sums.truncate(kept);
        self.counts.truncate(kept);
        before - kept
    }

    /// `sum / count` for every cluster. Callers eliminate empty clusters first.
    pub fn means(&self) -> Result<Vec<T>, KMeansErr> {
        self.sums
            .iter()
            .zip(&self.counts)
            .map(|(&sum, &count)| {
                let count = T::from_usize(count).ok_or(KMeansErr::ConversionError)?;
                Ok(sum / count)
            })
            .collect()
    }
}
