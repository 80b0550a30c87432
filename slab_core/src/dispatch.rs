//! # Dispatch Aggregation
//!
//! Groups persisted slab records into per-dispatch summaries and derives
//! the bookkeeping values a new entry session needs: the next slab number
//! and a fresh dispatch identifier.
//!
//! Aggregation is a single deterministic fold over an already-fetched,
//! immutable record list. Batches are transient: rebuilt on every report
//! or document request, never stored.
//!
//! ## Example
//!
//! ```rust
//! use slab_core::dispatch::{next_slab_number, NumberDirection};
//!
//! assert_eq!(next_slab_number(&[], NumberDirection::Ascending), 1);
//! assert_eq!(next_slab_number(&[3, 5, 1], NumberDirection::Ascending), 6);
//! assert_eq!(next_slab_number(&[3, 5, 1], NumberDirection::Descending), 0);
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::measure::SlabMeasurement;
use crate::units::SqFt;

/// Bucket for records whose dispatch identifier is missing or empty.
///
/// Such records are grouped here rather than discarded, so a dispatch note
/// can still be produced for them and the gap is visible in reports.
pub const UNKNOWN_DISPATCH_ID: &str = "unknown";

/// Effective grouping key for a record's dispatch id.
pub(crate) fn normalize_dispatch_id(id: &str) -> &str {
    if id.trim().is_empty() {
        UNKNOWN_DISPATCH_ID
    } else {
        id
    }
}

// ============================================================================
// Slab Numbering
// ============================================================================

/// Direction slab numbers run within a dispatch session.
///
/// Descending numbering supports lots measured from a known count downward
/// (e.g. 40 slabs on the gantry, numbered 40, 39, 38, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NumberDirection {
    #[default]
    Ascending,
    Descending,
}

impl NumberDirection {
    /// All available directions
    pub const ALL: [NumberDirection; 2] = [NumberDirection::Ascending, NumberDirection::Descending];

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            NumberDirection::Ascending => "Ascending",
            NumberDirection::Descending => "Descending",
        }
    }

    /// Parse from a user-supplied string (case-insensitive, accepts
    /// "asc"/"desc" shorthands). Unrecognized input falls back to ascending.
    pub fn parse(s: &str) -> NumberDirection {
        match s.trim().to_lowercase().as_str() {
            "desc" | "descending" | "down" => NumberDirection::Descending,
            _ => NumberDirection::Ascending,
        }
    }
}

impl fmt::Display for NumberDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Next slab number for an in-progress session.
///
/// Ascending continues past the highest number used so far; descending
/// continues below the lowest. An empty working set starts at 1 either way.
///
/// No floor is applied on the descending side; numbers may reach zero or
/// go negative mid-session. Persistence validates the final numbers; this
/// function only proposes the next one.
pub fn next_slab_number(existing: &[i32], direction: NumberDirection) -> i32 {
    match direction {
        NumberDirection::Ascending => existing.iter().max().map_or(1, |max| max + 1),
        NumberDirection::Descending => existing.iter().min().map_or(1, |min| min - 1),
    }
}

// ============================================================================
// Dispatch Identifiers
// ============================================================================

/// Highest identifier suffix handed out by this process.
static LAST_ID_STAMP: Lazy<Mutex<i64>> = Lazy::new(|| Mutex::new(0));

/// Generate a new dispatch identifier, e.g. `202608-1755944712034991`.
///
/// The token is a year-month prefix plus a microsecond-resolution timestamp
/// suffix, bumped past the previous suffix if the clock has not advanced,
/// so consecutive calls within one process always produce distinct,
/// strictly increasing suffixes. Collision-freedom across machines is not
/// guaranteed; dispatch entry is a single-writer workflow.
pub fn generate_dispatch_id() -> String {
    let now = Utc::now();
    let mut last = match LAST_ID_STAMP.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    let stamp = now.timestamp_micros().max(*last + 1);
    *last = stamp;
    format!("{}-{}", now.format("%Y%m"), stamp)
}

// ============================================================================
// Grouping
// ============================================================================

/// Per-dispatch summary derived from persisted slab records.
///
/// Constructed transiently by [`group_by_dispatch`]; never stored. The
/// shared metadata fields (party, material, lot, vehicle, supervisor) are
/// taken from the lowest-numbered slab, since constituents of one dispatch
/// share them by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchBatch {
    /// The shared dispatch identifier (or [`UNKNOWN_DISPATCH_ID`])
    pub dispatch_id: String,

    /// Earliest effective timestamp among constituent slabs
    pub timestamp: DateTime<Utc>,

    pub party_name: String,
    pub material: String,
    pub lot_number: String,
    pub vehicle_number: String,
    pub supervisor: String,

    /// Constituent slabs, sorted ascending by slab number
    pub slabs: Vec<SlabMeasurement>,

    /// Sum of constituent net areas (no further rounding)
    pub total_net_area: SqFt,
}

impl DispatchBatch {
    fn from_slabs(dispatch_id: String, mut slabs: Vec<SlabMeasurement>) -> DispatchBatch {
        slabs.sort_by_key(|slab| slab.slab_number);

        let timestamp = slabs
            .iter()
            .map(|slab| slab.effective_timestamp())
            .min()
            .unwrap_or_default();

        let total_net_area = slabs
            .iter()
            .fold(SqFt(0.0), |acc, slab| acc + slab.net_area);

        let first = &slabs[0];
        DispatchBatch {
            dispatch_id,
            timestamp,
            party_name: first.party_name.clone(),
            material: first.material.clone(),
            lot_number: first.lot_number.clone(),
            vehicle_number: first.vehicle_number.clone(),
            supervisor: first.supervisor.clone(),
            slabs,
            total_net_area,
        }
    }

    /// Number of slabs in this dispatch
    pub fn slab_count(&self) -> usize {
        self.slabs.len()
    }

    /// Sum of constituent gross areas
    pub fn total_gross_area(&self) -> SqFt {
        self.slabs
            .iter()
            .fold(SqFt(0.0), |acc, slab| acc + slab.gross_area)
    }

    /// Sum of constituent deduction areas
    pub fn total_deduction_area(&self) -> SqFt {
        self.slabs
            .iter()
            .fold(SqFt(0.0), |acc, slab| acc + slab.total_deduction_area)
    }
}

/// Group slab records by dispatch identifier into display-ordered batches.
///
/// - Records with an empty dispatch id land in the [`UNKNOWN_DISPATCH_ID`]
///   bucket instead of being dropped.
/// - Within a batch, slabs are sorted ascending by slab number.
/// - Batches are sorted by timestamp descending (most recent dispatch
///   first), with identifier order breaking ties.
///
/// The fold is deterministic: the same input list always produces the same
/// aggregates in the same order.
pub fn group_by_dispatch(records: &[SlabMeasurement]) -> Vec<DispatchBatch> {
    let mut buckets: BTreeMap<String, Vec<SlabMeasurement>> = BTreeMap::new();
    for record in records {
        let key = normalize_dispatch_id(&record.dispatch_id).to_string();
        buckets.entry(key).or_default().push(record.clone());
    }

    let mut batches: Vec<DispatchBatch> = buckets
        .into_iter()
        .map(|(dispatch_id, slabs)| DispatchBatch::from_slabs(dispatch_id, slabs))
        .collect();

    batches.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| a.dispatch_id.cmp(&b.dispatch_id))
    });
    batches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::MeasurementUnit;
    use chrono::TimeZone;

    fn slab(dispatch_id: &str, slab_number: i32, net: f64, hour: u32) -> SlabMeasurement {
        let created = Utc.with_ymd_and_hms(2026, 2, 13, hour, 0, 0).unwrap();
        SlabMeasurement {
            slab_number,
            length: 0.0,
            height: 0.0,
            thickness: 0.0,
            unit: MeasurementUnit::Inches,
            deductions: Vec::new(),
            gross_area: SqFt(net),
            total_deduction_area: SqFt(0.0),
            net_area: SqFt(net),
            material: "Steel Grey Granite".to_string(),
            lot_number: "LOT-88".to_string(),
            party_name: "Sharma Marbles".to_string(),
            supervisor: "R. Patel".to_string(),
            vehicle_number: "GJ-12-AX-4521".to_string(),
            dispatch_id: dispatch_id.to_string(),
            dispatch_timestamp: Some(created),
            created_at: created,
        }
    }

    #[test]
    fn test_next_slab_number_ascending() {
        assert_eq!(next_slab_number(&[], NumberDirection::Ascending), 1);
        assert_eq!(next_slab_number(&[3, 5, 1], NumberDirection::Ascending), 6);
        assert_eq!(next_slab_number(&[7], NumberDirection::Ascending), 8);
    }

    #[test]
    fn test_next_slab_number_descending() {
        assert_eq!(next_slab_number(&[], NumberDirection::Descending), 1);
        assert_eq!(next_slab_number(&[3, 5, 1], NumberDirection::Descending), 0);
        // No floor: descending continues below zero.
        assert_eq!(next_slab_number(&[0], NumberDirection::Descending), -1);
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!(NumberDirection::parse("desc"), NumberDirection::Descending);
        assert_eq!(NumberDirection::parse("Descending"), NumberDirection::Descending);
        assert_eq!(NumberDirection::parse("asc"), NumberDirection::Ascending);
        assert_eq!(NumberDirection::parse("nonsense"), NumberDirection::Ascending);

        for direction in NumberDirection::ALL {
            assert_eq!(NumberDirection::parse(direction.display_name()), direction);
        }
    }

    #[test]
    fn test_generate_dispatch_id_format() {
        let id = generate_dispatch_id();
        let (prefix, suffix) = id.split_once('-').expect("id has a dash");
        assert_eq!(prefix, Utc::now().format("%Y%m").to_string());
        assert!(suffix.parse::<i64>().is_ok());
    }

    #[test]
    fn test_generate_dispatch_id_monotonic() {
        let a = generate_dispatch_id();
        let b = generate_dispatch_id();
        assert_ne!(a, b);

        let suffix = |id: &str| id.split_once('-').unwrap().1.parse::<i64>().unwrap();
        assert!(suffix(&b) > suffix(&a));
    }

    #[test]
    fn test_group_by_dispatch_totals() {
        let records = vec![
            slab("D1", 2, 20.0, 9),
            slab("D1", 1, 10.0, 9),
            slab("D2", 1, 5.0, 11),
            slab("D1", 3, 30.0, 9),
        ];
        let batches = group_by_dispatch(&records);
        assert_eq!(batches.len(), 2);

        // Most recent dispatch first.
        assert_eq!(batches[0].dispatch_id, "D2");
        assert_eq!(batches[0].slab_count(), 1);
        assert_eq!(batches[0].total_net_area.value(), 5.0);

        assert_eq!(batches[1].dispatch_id, "D1");
        assert_eq!(batches[1].slab_count(), 3);
        assert_eq!(batches[1].total_net_area.value(), 60.0);
    }

    #[test]
    fn test_slabs_sorted_by_number_within_batch() {
        let records = vec![
            slab("D1", 3, 30.0, 9),
            slab("D1", 1, 10.0, 9),
            slab("D1", 2, 20.0, 9),
        ];
        let batches = group_by_dispatch(&records);
        let numbers: Vec<i32> = batches[0].slabs.iter().map(|s| s.slab_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn test_batch_timestamp_is_earliest() {
        let mut late = slab("D1", 2, 20.0, 15);
        late.dispatch_timestamp = Some(Utc.with_ymd_and_hms(2026, 2, 13, 15, 0, 0).unwrap());
        let records = vec![slab("D1", 1, 10.0, 9), late];

        let batches = group_by_dispatch(&records);
        assert_eq!(
            batches[0].timestamp,
            Utc.with_ymd_and_hms(2026, 2, 13, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_missing_dispatch_timestamp_falls_back_to_created_at() {
        let mut record = slab("D1", 1, 10.0, 9);
        record.dispatch_timestamp = None;
        let batches = group_by_dispatch(&[record]);
        assert_eq!(
            batches[0].timestamp,
            Utc.with_ymd_and_hms(2026, 2, 13, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_empty_dispatch_id_goes_to_unknown_bucket() {
        let records = vec![slab("", 1, 10.0, 9), slab("  ", 2, 20.0, 9)];
        let batches = group_by_dispatch(&records);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].dispatch_id, UNKNOWN_DISPATCH_ID);
        assert_eq!(batches[0].slab_count(), 2);
    }

    #[test]
    fn test_grouping_is_idempotent() {
        let records = vec![
            slab("D1", 2, 20.0, 9),
            slab("D2", 1, 5.0, 11),
            slab("D1", 1, 10.0, 9),
        ];
        let first = group_by_dispatch(&records);
        let second = group_by_dispatch(&records);
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_input_yields_no_batches() {
        assert!(group_by_dispatch(&[]).is_empty());
    }

    #[test]
    fn test_batch_area_totals() {
        let mut a = slab("D1", 1, 10.0, 9);
        a.gross_area = SqFt(12.0);
        a.total_deduction_area = SqFt(2.0);
        let mut b = slab("D1", 2, 20.0, 9);
        b.gross_area = SqFt(21.5);
        b.total_deduction_area = SqFt(1.5);

        let batches = group_by_dispatch(&[a, b]);
        assert_eq!(batches[0].total_gross_area().value(), 33.5);
        assert_eq!(batches[0].total_deduction_area().value(), 3.5);
        assert_eq!(batches[0].total_net_area.value(), 30.0);
    }
}
