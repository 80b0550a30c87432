//! # Dispatch Ledger
//!
//! The `DispatchLedger` struct is the root container for all persisted slab
//! records. Ledgers serialize to `.slt` (SlabTally) files as human-readable
//! JSON.
//!
//! ## Structure
//!
//! ```text
//! DispatchLedger
//! ├── meta: LedgerMetadata (version, company, timestamps)
//! ├── settings: LedgerSettings (default unit, numbering direction)
//! └── records: HashMap<Uuid, SlabMeasurement> (all persisted slabs)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use slab_core::ledger::DispatchLedger;
//!
//! let mut ledger = DispatchLedger::new("Shree Ganesh Granites");
//!
//! // Serialize to JSON
//! let json = serde_json::to_string_pretty(&ledger).unwrap();
//!
//! // Save to file (see store module for atomic saves)
//! # let _ = json;
//! ```

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dispatch::{normalize_dispatch_id, NumberDirection};
use crate::errors::{DispatchError, DispatchResult};
use crate::measure::SlabMeasurement;
use crate::units::MeasurementUnit;

/// Current schema version for .slt files
pub const SCHEMA_VERSION: &str = "0.1.0";

/// Root ledger container.
///
/// This is the top-level struct that gets serialized to `.slt` files.
/// Records are stored in a flat UUID-keyed map; all ordering is applied
/// at query time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchLedger {
    /// Ledger metadata (version, company, timestamps)
    pub meta: LedgerMetadata,

    /// Defaults for new entry sessions
    pub settings: LedgerSettings,

    /// All persisted slab records, keyed by UUID
    pub records: HashMap<Uuid, SlabMeasurement>,
}

impl DispatchLedger {
    /// Create a new empty ledger for a company/yard.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slab_core::ledger::{DispatchLedger, SCHEMA_VERSION};
    ///
    /// let ledger = DispatchLedger::new("Shree Ganesh Granites");
    /// assert_eq!(ledger.meta.company, "Shree Ganesh Granites");
    /// assert_eq!(ledger.meta.version, SCHEMA_VERSION);
    /// ```
    pub fn new(company: impl Into<String>) -> Self {
        let now = Utc::now();
        DispatchLedger {
            meta: LedgerMetadata {
                version: SCHEMA_VERSION.to_string(),
                company: company.into(),
                created: now,
                modified: now,
            },
            settings: LedgerSettings::default(),
            records: HashMap::new(),
        }
    }

    /// Add a slab record to the ledger.
    ///
    /// Returns the UUID assigned to the record.
    pub fn add_record(&mut self, record: SlabMeasurement) -> Uuid {
        let id = Uuid::new_v4();
        self.records.insert(id, record);
        self.touch();
        id
    }

    /// Add a finalized dispatch's slabs in one call.
    ///
    /// Returns the assigned UUIDs in the same order as the input.
    pub fn add_records(&mut self, records: Vec<SlabMeasurement>) -> Vec<Uuid> {
        records.into_iter().map(|r| self.add_record(r)).collect()
    }

    /// Get a record by UUID.
    pub fn get_record(&self, id: &Uuid) -> Option<&SlabMeasurement> {
        self.records.get(id)
    }

    /// Remove a record by UUID.
    ///
    /// Returns the removed record if it existed.
    pub fn remove_record(&mut self, id: &Uuid) -> Option<SlabMeasurement> {
        let record = self.records.remove(id);
        if record.is_some() {
            self.touch();
        }
        record
    }

    /// Update the modified timestamp.
    pub fn touch(&mut self) {
        self.meta.modified = Utc::now();
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Fetch records matching a filter, most recent first.
    ///
    /// Ordering is total (timestamp, then dispatch id, then slab number,
    /// then UUID), so the same ledger content always lists identically.
    pub fn query(&self, filter: &RecordFilter) -> Vec<SlabMeasurement> {
        self.query_entries(filter)
            .into_iter()
            .map(|(_, record)| record)
            .collect()
    }

    /// Like [`DispatchLedger::query`], but keeps each record's UUID so
    /// callers can reference entries for corrections.
    pub fn query_entries(&self, filter: &RecordFilter) -> Vec<(Uuid, SlabMeasurement)> {
        let mut matches: Vec<(&Uuid, &SlabMeasurement)> = self
            .records
            .iter()
            .filter(|(_, record)| filter.matches(record))
            .collect();

        matches.sort_by(|(a_id, a), (b_id, b)| {
            b.effective_timestamp()
                .cmp(&a.effective_timestamp())
                .then_with(|| a.dispatch_id.cmp(&b.dispatch_id))
                .then_with(|| a.slab_number.cmp(&b.slab_number))
                .then_with(|| a_id.cmp(b_id))
        });

        matches
            .into_iter()
            .map(|(id, record)| (*id, record.clone()))
            .collect()
    }

    /// All records, most recent first.
    pub fn all_records(&self) -> Vec<SlabMeasurement> {
        self.query(&RecordFilter::default())
    }

    /// The most recently dispatched record for a lot, if any.
    ///
    /// Used to continue a lot across sessions: its metadata pre-fills the
    /// next session and its slab numbers seed the duplicate check.
    pub fn find_last_by_lot(&self, lot_number: &str) -> Option<&SlabMeasurement> {
        self.records
            .values()
            .filter(|r| r.lot_number == lot_number)
            .max_by_key(|r| (r.effective_timestamp(), r.slab_number))
    }

    /// Every slab number already persisted for a lot.
    pub fn slab_numbers_for_lot(&self, lot_number: &str) -> Vec<i32> {
        let mut numbers: Vec<i32> = self
            .records
            .values()
            .filter(|r| r.lot_number == lot_number)
            .map(|r| r.slab_number)
            .collect();
        numbers.sort_unstable();
        numbers
    }

    /// Apply the permitted post-persistence correction to a record: new
    /// length/height, with a full recomputation of all derived areas under
    /// the record's stored unit.
    pub fn correct_record(&mut self, id: &Uuid, length: f64, height: f64) -> DispatchResult<()> {
        let record = self
            .records
            .get_mut(id)
            .ok_or_else(|| DispatchError::record_not_found(id.to_string()))?;
        record.correct_dimensions(length, height);
        self.touch();
        Ok(())
    }
}

impl Default for DispatchLedger {
    fn default() -> Self {
        DispatchLedger::new("")
    }
}

/// Ledger metadata stored in the file header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerMetadata {
    /// Schema version (for migration compatibility)
    pub version: String,

    /// Company/yard the ledger belongs to
    pub company: String,

    /// When the ledger was created
    pub created: DateTime<Utc>,

    /// When the ledger was last modified
    pub modified: DateTime<Utc>,
}

/// Defaults for new entry sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSettings {
    /// Unit offered when a session starts
    pub default_unit: MeasurementUnit,

    /// Numbering direction offered when a session starts
    pub default_direction: NumberDirection,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        LedgerSettings {
            default_unit: MeasurementUnit::Inches,
            default_direction: NumberDirection::Ascending,
        }
    }
}

/// Record query filter. Empty fields match everything.
///
/// Date bounds are inclusive and compare against the record's effective
/// timestamp (dispatch time, falling back to entry time).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordFilter {
    pub dispatch_id: Option<String>,
    pub lot_number: Option<String>,
    pub party_name: Option<String>,
    pub material: Option<String>,
    pub supervisor: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl RecordFilter {
    pub fn matches(&self, record: &SlabMeasurement) -> bool {
        if let Some(id) = &self.dispatch_id {
            if normalize_dispatch_id(&record.dispatch_id) != normalize_dispatch_id(id) {
                return false;
            }
        }
        if let Some(lot) = &self.lot_number {
            if &record.lot_number != lot {
                return false;
            }
        }
        if let Some(party) = &self.party_name {
            if &record.party_name != party {
                return false;
            }
        }
        if let Some(material) = &self.material {
            if &record.material != material {
                return false;
            }
        }
        if let Some(supervisor) = &self.supervisor {
            if &record.supervisor != supervisor {
                return false;
            }
        }
        let date = record.effective_timestamp().date_naive();
        if let Some(from) = self.from {
            if date < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if date > to {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::UNKNOWN_DISPATCH_ID;
    use crate::units::SqFt;
    use chrono::TimeZone;

    fn record(lot: &str, dispatch_id: &str, slab_number: i32, day: u32) -> SlabMeasurement {
        let stamped = Utc.with_ymd_and_hms(2026, 2, day, 9, 0, 0).unwrap();
        SlabMeasurement {
            slab_number,
            length: 120.0,
            height: 60.0,
            thickness: 0.75,
            unit: MeasurementUnit::Inches,
            deductions: Vec::new(),
            gross_area: SqFt(50.0),
            total_deduction_area: SqFt(0.0),
            net_area: SqFt(50.0),
            material: "Steel Grey Granite".to_string(),
            lot_number: lot.to_string(),
            party_name: "Sharma Marbles".to_string(),
            supervisor: "R. Patel".to_string(),
            vehicle_number: String::new(),
            dispatch_id: dispatch_id.to_string(),
            dispatch_timestamp: Some(stamped),
            created_at: stamped,
        }
    }

    #[test]
    fn test_ledger_creation() {
        let ledger = DispatchLedger::new("Shree Ganesh Granites");
        assert_eq!(ledger.meta.company, "Shree Ganesh Granites");
        assert_eq!(ledger.meta.version, SCHEMA_VERSION);
        assert_eq!(ledger.record_count(), 0);
        assert_eq!(ledger.settings.default_unit, MeasurementUnit::Inches);
    }

    #[test]
    fn test_add_get_remove_record() {
        let mut ledger = DispatchLedger::new("Test Yard");
        let id = ledger.add_record(record("LOT-88", "D1", 1, 13));
        assert_eq!(ledger.record_count(), 1);
        assert!(ledger.get_record(&id).is_some());

        let removed = ledger.remove_record(&id);
        assert!(removed.is_some());
        assert_eq!(ledger.record_count(), 0);
    }

    #[test]
    fn test_query_is_most_recent_first() {
        let mut ledger = DispatchLedger::new("Test Yard");
        ledger.add_record(record("LOT-88", "D1", 1, 13));
        ledger.add_record(record("LOT-88", "D2", 1, 15));
        ledger.add_record(record("LOT-88", "D1", 2, 13));

        let all = ledger.all_records();
        assert_eq!(all[0].dispatch_id, "D2");
        assert_eq!(all[1].dispatch_id, "D1");
        assert_eq!(all[1].slab_number, 1);
        assert_eq!(all[2].slab_number, 2);
    }

    #[test]
    fn test_query_filters() {
        let mut ledger = DispatchLedger::new("Test Yard");
        ledger.add_record(record("LOT-88", "D1", 1, 13));
        ledger.add_record(record("LOT-99", "D2", 1, 15));

        let by_lot = ledger.query(&RecordFilter {
            lot_number: Some("LOT-88".to_string()),
            ..Default::default()
        });
        assert_eq!(by_lot.len(), 1);
        assert_eq!(by_lot[0].dispatch_id, "D1");

        let by_dispatch = ledger.query(&RecordFilter {
            dispatch_id: Some("D2".to_string()),
            ..Default::default()
        });
        assert_eq!(by_dispatch.len(), 1);

        let by_date = ledger.query(&RecordFilter {
            from: Some(NaiveDate::from_ymd_opt(2026, 2, 14).unwrap()),
            to: Some(NaiveDate::from_ymd_opt(2026, 2, 15).unwrap()),
            ..Default::default()
        });
        assert_eq!(by_date.len(), 1);
        assert_eq!(by_date[0].lot_number, "LOT-99");

        let by_supervisor = ledger.query(&RecordFilter {
            supervisor: Some("R. Patel".to_string()),
            ..Default::default()
        });
        assert_eq!(by_supervisor.len(), 2);
        assert!(ledger
            .query(&RecordFilter {
                supervisor: Some("S. Mehta".to_string()),
                ..Default::default()
            })
            .is_empty());
    }

    #[test]
    fn test_query_entries_keeps_ids() {
        let mut ledger = DispatchLedger::new("Test Yard");
        let id = ledger.add_record(record("LOT-88", "D1", 1, 13));

        let entries = ledger.query_entries(&RecordFilter::default());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, id);
        assert_eq!(ledger.get_record(&id), Some(&entries[0].1));
    }

    #[test]
    fn test_unknown_filter_matches_empty_ids() {
        let mut ledger = DispatchLedger::new("Test Yard");
        ledger.add_record(record("LOT-88", "", 1, 13));

        let results = ledger.query(&RecordFilter {
            dispatch_id: Some(UNKNOWN_DISPATCH_ID.to_string()),
            ..Default::default()
        });
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_find_last_by_lot() {
        let mut ledger = DispatchLedger::new("Test Yard");
        ledger.add_record(record("LOT-88", "D1", 5, 13));
        ledger.add_record(record("LOT-88", "D2", 8, 15));
        ledger.add_record(record("LOT-99", "D3", 2, 16));

        let last = ledger.find_last_by_lot("LOT-88").unwrap();
        assert_eq!(last.dispatch_id, "D2");
        assert_eq!(last.slab_number, 8);
        assert!(ledger.find_last_by_lot("LOT-00").is_none());
    }

    #[test]
    fn test_slab_numbers_for_lot() {
        let mut ledger = DispatchLedger::new("Test Yard");
        ledger.add_record(record("LOT-88", "D1", 5, 13));
        ledger.add_record(record("LOT-88", "D1", 3, 13));
        ledger.add_record(record("LOT-99", "D2", 7, 15));

        assert_eq!(ledger.slab_numbers_for_lot("LOT-88"), vec![3, 5]);
        assert!(ledger.slab_numbers_for_lot("LOT-00").is_empty());
    }

    #[test]
    fn test_correct_record_recomputes_areas() {
        let mut ledger = DispatchLedger::new("Test Yard");
        let mut slab = record("LOT-88", "D1", 1, 13);
        slab.deductions.push(crate::deductions::CornerDeduction::new(12.0, 12.0));
        slab.recompute_areas();
        let id = ledger.add_record(slab);

        ledger.correct_record(&id, 240.0, 60.0).unwrap();
        let corrected = ledger.get_record(&id).unwrap();
        assert_eq!(corrected.gross_area.value(), 100.0);
        assert_eq!(corrected.total_deduction_area.value(), 1.0);
        assert_eq!(corrected.net_area.value(), 99.0);

        let missing = Uuid::new_v4();
        let err = ledger.correct_record(&missing, 1.0, 1.0).unwrap_err();
        assert_eq!(err.error_code(), "RECORD_NOT_FOUND");
    }

    #[test]
    fn test_ledger_serialization() {
        let mut ledger = DispatchLedger::new("Shree Ganesh Granites");
        ledger.add_record(record("LOT-88", "D1", 1, 13));

        let json = serde_json::to_string_pretty(&ledger).unwrap();
        assert!(json.contains("Shree Ganesh Granites"));
        assert!(json.contains("LOT-88"));

        let roundtrip: DispatchLedger = serde_json::from_str(&json).unwrap();
        assert_eq!(roundtrip.meta.company, "Shree Ganesh Granites");
        assert_eq!(roundtrip.record_count(), 1);
    }
}
