// 🎛️ Record Filter & Aggregator
// Pure filtering over the resolved record set plus per-region counts.
// The UI layers only ever supply FilterParams and consume the views.

use crate::record::{CollateralRecord, KNOWN_REGIONS};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

// ============================================================================
// FILTER PARAMETERS
// ============================================================================

/// Closed interval over record values, both ends inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ValueRange {
    pub min: i64,
    pub max: i64,
}

impl ValueRange {
    pub fn new(min: i64, max: i64) -> Self {
        ValueRange { min, max }
    }

    pub fn contains(&self, value: i64) -> bool {
        value >= self.min && value <= self.max
    }

    /// A degenerate range means the interval control is not offered;
    /// the UI states the single value directly
    pub fn is_degenerate(&self) -> bool {
        self.min == self.max
    }
}

/// Explicit filter configuration, passed in by whichever surface re-invokes
/// the pipeline. No ambient UI state.
#[derive(Debug, Clone)]
pub struct FilterParams {
    pub value_range: ValueRange,
    pub selected_regions: HashSet<String>,
}

impl FilterParams {
    pub fn new(value_range: ValueRange, selected_regions: HashSet<String>) -> Self {
        FilterParams {
            value_range,
            selected_regions,
        }
    }

    /// The default filter: given value range, every known region selected
    pub fn all_regions(value_range: ValueRange) -> Self {
        FilterParams {
            value_range,
            selected_regions: KNOWN_REGIONS.iter().map(|r| r.to_string()).collect(),
        }
    }
}

/// Min/max value over the full record set; None for an empty set
pub fn full_value_range(records: &[CollateralRecord]) -> Option<ValueRange> {
    let min = records.iter().map(|r| r.value).min()?;
    let max = records.iter().map(|r| r.value).max()?;
    Some(ValueRange::new(min, max))
}

// ============================================================================
// FILTERING
// ============================================================================

/// Value predicate only. The region-count table is computed from this set.
pub fn value_filtered<'a>(
    records: &'a [CollateralRecord],
    range: ValueRange,
) -> Vec<&'a CollateralRecord> {
    records.iter().filter(|r| range.contains(r.value)).collect()
}

/// Both predicates: value in the closed interval and region a member of the
/// selected set. Records with an absent region never pass.
pub fn filter_records<'a>(
    records: &'a [CollateralRecord],
    params: &FilterParams,
) -> Vec<&'a CollateralRecord> {
    records
        .iter()
        .filter(|r| params.value_range.contains(r.value))
        .filter(|r| match &r.region {
            Some(region) => params.selected_regions.contains(region),
            None => false,
        })
        .collect()
}

// ============================================================================
// AGGREGATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionCount {
    pub region: String,
    pub count: usize,
}

/// Group records by region, count per group, sort descending by count.
/// Ties keep first-encounter order (stable sort). Records without a region
/// are excluded, not bucketed.
pub fn region_counts(records: &[&CollateralRecord]) -> Vec<RegionCount> {
    let mut counts: Vec<RegionCount> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in records {
        let region = match &record.region {
            Some(r) => r,
            None => continue,
        };

        match index.get(region) {
            Some(&i) => counts[i].count += 1,
            None => {
                index.insert(region.clone(), counts.len());
                counts.push(RegionCount {
                    region: region.clone(),
                    count: 1,
                });
            }
        }
    }

    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

// ============================================================================
// DASHBOARD VIEW
// ============================================================================

/// Everything the presentation surfaces consume for one filter setting.
///
/// The count table is deliberately computed from the value-filtered set
/// before region selection is applied (how many sit in each region
/// regardless of which regions are displayed), while the map uses the set
/// filtered by both predicates.
#[derive(Debug, Clone)]
pub struct DashboardView<'a> {
    /// Both predicates applied; only records with a coordinate render
    pub map_records: Vec<&'a CollateralRecord>,
    /// Counts over the value-filtered, region-unfiltered set
    pub region_counts: Vec<RegionCount>,
    /// Min/max over the full unfiltered set (drives the interval control)
    pub full_range: Option<ValueRange>,
}

impl<'a> DashboardView<'a> {
    /// Headline: the region with the most records
    pub fn most_populated(&self) -> Option<&RegionCount> {
        self.region_counts.first()
    }

    /// Headline: the region with the fewest records
    pub fn least_populated(&self) -> Option<&RegionCount> {
        self.region_counts.last()
    }
}

/// Build the dashboard view for one filter setting
pub fn build_view<'a>(
    records: &'a [CollateralRecord],
    params: &FilterParams,
) -> DashboardView<'a> {
    let by_value = value_filtered(records, params.value_range);
    let counts = region_counts(&by_value);

    let map_records = filter_records(records, params)
        .into_iter()
        .filter(|r| r.on_map())
        .collect();

    DashboardView {
        map_records,
        region_counts: counts,
        full_range: full_value_range(records),
    }
}

// ============================================================================
// TESTS
// ============================================================================
