//! The sorted view of the present samples that every clustering pass works on.

use std::cmp::Ordering;

use crate::{KMeansErr, KmNum};

/// The present (non-missing) samples of a dataset, sorted ascending.
///
/// NaN is the conventional "no data" marker of gridded products, so it is
/// dropped along with `None`. Infinite values can't take part in a mean and
/// are rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct SortedSamples<T> {
    values: Vec<T>,
}

impl<T: KmNum> SortedSamples<T> {
    /// Build a sorted view of a plain slice. NaN entries count as missing.
    pub fn from_values(values: &[T]) -> Result<Self, KMeansErr> {
        Self::from_options(values.iter().map(|&v| Some(v)))
    }

    /// Build a sorted view from optional samples, skipping the missing ones.
    ///
    /// `index` in [`KMeansErr::NonFiniteSample`] refers to the position in
    /// `samples`, missing entries included.
    pub fn from_options<I>(samples: I) -> Result<Self, KMeansErr>
    where
        I: IntoIterator<Item = Option<T>>,
    {
        let mut values = Vec::new();
        for (index, sample) in samples.into_iter().enumerate() {
            match sample {
                Some(v) if v.is_nan() => {}
                Some(v) if v.is_infinite() => {
                    return Err(KMeansErr::NonFiniteSample { index });
                }
                Some(v) => values.push(v),
                None => {}
            }
        }
        if values.is_empty() {
            return Err(KMeansErr::EmptyDataset);
        }
        // NaN has been filtered out, so every pair is comparable
        values.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        Ok(Self { values })
    }

    pub fn as_slice(&self) -> &[T] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false: construction fails on an empty dataset.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.values.get(index).copied()
    }

    pub fn min(&self) -> T {
        self.values[0]
    }

    pub fn max(&self) -> T {
        self.values[self.values.len() - 1]
    }

    /// Number of distinct values, which bounds the useful cluster count.
    pub fn distinct_count(&self) -> usize {
        1 + self.values.windows(2).filter(|win| win[0] != win[1]).count()
    }
}
