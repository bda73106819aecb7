use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use serde::Serialize;

use super::model::{FundingDataset, FundingRecord};

// ---------------------------------------------------------------------------
// Filter predicate: which values are selected per dimension
// ---------------------------------------------------------------------------

/// Selected values per dimension. An empty set means "no filter" (show all).
///
/// Rows must match every dimension; within a dimension any selected value
/// matches. `year_range`, when set, further restricts the year dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterConfig {
    pub years: BTreeSet<i32>,
    /// Inclusive bounds, kept as a predicate rather than expanded.
    pub year_range: Option<RangeInclusive<i32>>,
    pub industries: BTreeSet<String>,
    pub funding_types: BTreeSet<String>,
}

impl FilterConfig {
    /// Every value the dataset offers selected, i.e. the full table.
    pub fn select_all(dataset: &FundingDataset) -> Self {
        FilterConfig {
            years: dataset.years.clone(),
            year_range: None,
            industries: dataset.industries.clone(),
            funding_types: dataset.funding_types.clone(),
        }
    }

    /// Restrict years to an inclusive range. Reversed bounds are swapped.
    pub fn with_year_range(mut self, from: i32, to: i32) -> Self {
        let (lo, hi) = if from <= to { (from, to) } else { (to, from) };
        self.year_range = Some(lo..=hi);
        self
    }

    pub fn matches(&self, rec: &FundingRecord) -> bool {
        let year = rec.year();
        (self.years.is_empty() || self.years.contains(&year))
            && self.year_range.as_ref().map_or(true, |r| r.contains(&year))
            && (self.industries.is_empty() || self.industries.contains(&rec.industry))
            && (self.funding_types.is_empty() || self.funding_types.contains(&rec.funding_type))
    }
}

/// Return indices of records that pass all active filters, in table order.
pub fn filtered_indices(dataset: &FundingDataset, config: &FilterConfig) -> Vec<usize> {
    dataset
        .records
        .iter()
        .enumerate()
        .filter(|(_, rec)| config.matches(rec))
        .map(|(i, _)| i)
        .collect()
}

// ---------------------------------------------------------------------------
// FilteredView – borrowed subset of the table
// ---------------------------------------------------------------------------

/// The records matching the current filters. Borrowed from the dataset.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    pub records: Vec<&'a FundingRecord>,
}

impl<'a> FilteredView<'a> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a FundingRecord> + '_ {
        self.records.iter().copied()
    }
}

/// Apply `config` to `dataset`. Pure; an empty result is valid.
pub fn apply<'a>(dataset: &'a FundingDataset, config: &FilterConfig) -> FilteredView<'a> {
    FilteredView {
        records: filtered_indices(dataset, config)
            .into_iter()
            .map(|i| &dataset.records[i])
            .collect(),
    }
}
