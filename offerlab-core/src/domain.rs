//! Domain types: weighted items, target ratios, click counters.
//!
//! Items are identified by a string id that must be unique within a working
//! set. Maps are `BTreeMap`-backed so iteration (and serialization) order is
//! deterministic.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

/// An offer with an integer selection weight.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeightedItem {
    pub id: String,
    pub weight: u32,
}

impl WeightedItem {
    pub fn new(id: impl Into<String>, weight: u32) -> Self {
        Self {
            id: id.into(),
            weight,
        }
    }
}

/// Why a set of items (or targets) was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputViolation {
    #[error("working set is empty")]
    EmptySet,
    #[error("total weight is zero")]
    ZeroTotalWeight,
    #[error("item '{0}' has zero weight")]
    ZeroWeight(String),
    #[error("identifier '{0}' appears more than once")]
    DuplicateId(String),
    #[error("no target ratio for item '{0}'")]
    MissingTarget(String),
    #[error("target ratio for '{id}' is {value}, expected a value in [0, 1]")]
    TargetOutOfRange { id: String, value: f64 },
}

/// Check a persistent item list before a simulation starts.
///
/// Rejects empty lists, duplicate ids and zero weights. Zero weights are
/// refused here because the adaptation step never lowers a weight below 1,
/// so a zero weight could only come from the caller.
pub fn validate_items(items: &[WeightedItem]) -> Result<(), InputViolation> {
    if items.is_empty() {
        return Err(InputViolation::EmptySet);
    }
    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        if !seen.insert(item.id.as_str()) {
            return Err(InputViolation::DuplicateId(item.id.clone()));
        }
        if item.weight == 0 {
            return Err(InputViolation::ZeroWeight(item.id.clone()));
        }
    }
    Ok(())
}

/// Desired long-run click share per item.
///
/// Values need not sum to 1; each must lie in `[0, 1]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetRatios(BTreeMap<String, f64>);

impl TargetRatios {
    pub fn new() -> Self {
        Self::default()
    }

    /// Targets equal to each item's share of the total weight.
    ///
    /// Returns an empty table when the total weight is zero.
    pub fn proportional_to(items: &[WeightedItem]) -> Self {
        let total: u64 = items.iter().map(|i| u64::from(i.weight)).sum();
        if total == 0 {
            return Self::new();
        }
        items
            .iter()
            .map(|i| (i.id.clone(), f64::from(i.weight) / total as f64))
            .collect()
    }

    pub fn insert(&mut self, id: impl Into<String>, ratio: f64) {
        self.0.insert(id.into(), ratio);
    }

    pub fn get(&self, id: &str) -> Option<f64> {
        self.0.get(id).copied()
    }

    pub fn sum(&self) -> f64 {
        self.0.values().sum()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Every item has a target and every target is a finite value in `[0, 1]`.
    pub fn validate_for(&self, items: &[WeightedItem]) -> Result<(), InputViolation> {
        for item in items {
            match self.get(&item.id) {
                None => return Err(InputViolation::MissingTarget(item.id.clone())),
                Some(value) if !(0.0..=1.0).contains(&value) => {
                    return Err(InputViolation::TargetOutOfRange {
                        id: item.id.clone(),
                        value,
                    })
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Identifiers with a target that no item carries.
    pub fn unknown_ids<'a>(&'a self, items: &[WeightedItem]) -> Vec<&'a str> {
        self.0
            .keys()
            .filter(|k| !items.iter().any(|i| &i.id == *k))
            .map(String::as_str)
            .collect()
    }
}

impl FromIterator<(String, f64)> for TargetRatios {
    fn from_iter<T: IntoIterator<Item = (String, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Per-item click accumulator for one simulation run.
///
/// Counts only ever grow; a fresh accumulator is created per run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickCounters(BTreeMap<String, u64>);

impl ClickCounters {
    /// One zero counter per item.
    pub fn tracking(items: &[WeightedItem]) -> Self {
        Self(items.iter().map(|i| (i.id.clone(), 0)).collect())
    }

    pub fn record(&mut self, id: &str) {
        *self.0.entry(id.to_string()).or_insert(0) += 1;
    }

    pub fn get(&self, id: &str) -> u64 {
        self.0.get(id).copied().unwrap_or(0)
    }

    /// Sum over all tracked identifiers.
    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    /// Click share of `id`, or `None` while no clicks have been recorded.
    pub fn ratio(&self, id: &str) -> Option<f64> {
        match self.total() {
            0 => None,
            total => Some(self.get(id) as f64 / total as f64),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}
