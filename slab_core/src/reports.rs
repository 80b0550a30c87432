//! # Report Breakdowns
//!
//! Typed aggregation over slab records for the register views: totals by
//! party, material, supervisor, or day. Each breakdown is one deterministic
//! fold producing an ordered map from a stable key to a [`GroupStats`]
//! aggregate, so call sites never do their own keyed accumulation.
//!
//! ## Example
//!
//! ```rust
//! use slab_core::reports::party_breakdown;
//!
//! let records = Vec::new();
//! for (party, group) in party_breakdown(&records) {
//!     println!("{}: {} slabs, {} sq ft", party, group.slab_count, group.total_net_area.value());
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dispatch::normalize_dispatch_id;
use crate::measure::SlabMeasurement;
use crate::units::SqFt;

/// Aggregate totals for one report group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    /// Number of slabs in the group
    pub slab_count: usize,

    /// Number of distinct dispatches the group's slabs belong to
    pub dispatch_count: usize,

    pub total_gross_area: SqFt,
    pub total_deduction_area: SqFt,
    pub total_net_area: SqFt,
}

#[derive(Default)]
struct Accumulator {
    slab_count: usize,
    dispatch_ids: BTreeSet<String>,
    gross: f64,
    deduction: f64,
    net: f64,
}

impl Accumulator {
    fn push(&mut self, record: &SlabMeasurement) {
        self.slab_count += 1;
        self.dispatch_ids
            .insert(normalize_dispatch_id(&record.dispatch_id).to_string());
        self.gross += record.gross_area.value();
        self.deduction += record.total_deduction_area.value();
        self.net += record.net_area.value();
    }

    fn into_stats(self) -> GroupStats {
        GroupStats {
            slab_count: self.slab_count,
            dispatch_count: self.dispatch_ids.len(),
            total_gross_area: SqFt(self.gross),
            total_deduction_area: SqFt(self.deduction),
            total_net_area: SqFt(self.net),
        }
    }
}

/// Fold records into per-key aggregates.
///
/// The output map is ordered by key, so iteration (and any report built
/// from it) is deterministic for a fixed input list.
pub fn breakdown_by<K, F>(records: &[SlabMeasurement], key: F) -> BTreeMap<K, GroupStats>
where
    K: Ord,
    F: Fn(&SlabMeasurement) -> K,
{
    let mut groups: BTreeMap<K, Accumulator> = BTreeMap::new();
    for record in records {
        groups.entry(key(record)).or_default().push(record);
    }
    groups
        .into_iter()
        .map(|(k, acc)| (k, acc.into_stats()))
        .collect()
}

/// Totals per receiving party.
pub fn party_breakdown(records: &[SlabMeasurement]) -> BTreeMap<String, GroupStats> {
    breakdown_by(records, |r| r.party_name.clone())
}

/// Totals per material.
pub fn material_breakdown(records: &[SlabMeasurement]) -> BTreeMap<String, GroupStats> {
    breakdown_by(records, |r| r.material.clone())
}

/// Totals per supervisor.
pub fn supervisor_breakdown(records: &[SlabMeasurement]) -> BTreeMap<String, GroupStats> {
    breakdown_by(records, |r| r.supervisor.clone())
}

/// Totals per calendar day (UTC), keyed by the record's effective timestamp.
pub fn daily_breakdown(records: &[SlabMeasurement]) -> BTreeMap<NaiveDate, GroupStats> {
    breakdown_by(records, |r| r.effective_timestamp().date_naive())
}
