//! Weighted sampler: pick one item with probability proportional to weight.
//!
//! A draw `r` uniform in `[0, total)` is mapped through the running sum of
//! weights. Item `i` owns the half-open interval `[cum[i-1], cum[i])`, so it
//! is selected with probability `weight / total` and a zero-weight item (an
//! empty interval) is never selected. A draw equal to a boundary belongs to
//! the next item.

use thiserror::Error;

use crate::domain::{InputViolation, WeightedItem};
use crate::rng::DrawSource;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SampleError {
    #[error("invalid input: {reason}")]
    InvalidInput { reason: InputViolation },
}

impl From<InputViolation> for SampleError {
    fn from(reason: InputViolation) -> Self {
        Self::InvalidInput { reason }
    }
}

/// Prefix sums of a working set's weights. Built per draw and discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CumulativeWeightTable {
    cumulative: Vec<u64>,
}

impl CumulativeWeightTable {
    /// Fails on an empty set or a zero total weight.
    pub fn new(items: &[WeightedItem]) -> Result<Self, SampleError> {
        if items.is_empty() {
            return Err(InputViolation::EmptySet.into());
        }
        let cumulative: Vec<u64> = items
            .iter()
            .scan(0u64, |running, item| {
                *running += u64::from(item.weight);
                Some(*running)
            })
            .collect();
        if cumulative.last().copied().unwrap_or(0) == 0 {
            return Err(InputViolation::ZeroTotalWeight.into());
        }
        Ok(Self { cumulative })
    }

    pub fn total(&self) -> u64 {
        self.cumulative.last().copied().unwrap_or(0)
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.cumulative
    }

    /// Index of the first entry whose cumulative sum exceeds `r`.
    ///
    /// `r` must be below `total()`; larger values clamp to the last index.
    pub fn locate(&self, r: u64) -> usize {
        let idx = self.cumulative.partition_point(|&sum| sum <= r);
        idx.min(self.cumulative.len() - 1)
    }
}

/// Index of the selected item.
pub fn pick_index<D>(items: &[WeightedItem], source: &mut D) -> Result<usize, SampleError>
where
    D: DrawSource + ?Sized,
{
    let table = CumulativeWeightTable::new(items)?;
    let r = source.below(table.total());
    Ok(table.locate(r))
}

/// Identifier of the selected item.
pub fn pick<'a, D>(items: &'a [WeightedItem], source: &mut D) -> Result<&'a str, SampleError>
where
    D: DrawSource + ?Sized,
{
    let idx = pick_index(items, source)?;
    Ok(items[idx].id.as_str())
}
