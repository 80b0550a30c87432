//! # Dispatch Session
//!
//! The in-progress working batch for one dispatch: shared metadata plus the
//! slabs measured so far. The session is an explicit, passable value; any
//! caller (CLI, service, test) can construct one, mutate it, and finalize
//! it into records ready for the ledger. No hidden global state.
//!
//! ## Structure
//!
//! ```text
//! DispatchSession
//! ├── meta: DispatchMeta (party, material, lot, vehicle, supervisor)
//! ├── unit + numbering direction
//! └── slabs: Vec<SlabMeasurement> (the working batch)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use slab_core::session::{DispatchMeta, DispatchSession, SlabDraft};
//! use slab_core::units::MeasurementUnit;
//! use slab_core::dispatch::NumberDirection;
//!
//! let meta = DispatchMeta::new("Sharma Marbles", "Steel Grey Granite", "LOT-88");
//! let mut session = DispatchSession::new(meta, MeasurementUnit::Inches, NumberDirection::Ascending);
//!
//! let number = session.suggest_slab_number();
//! session.add_slab(SlabDraft::new(number, 120.0, 60.0, 0.75)).unwrap();
//!
//! let dispatch = session.finalize().unwrap();
//! assert_eq!(dispatch.slabs.len(), 1);
//! assert_eq!(dispatch.slabs[0].dispatch_id, dispatch.dispatch_id);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::deductions::{CornerDeduction, MAX_CORNER_DEDUCTIONS};
use crate::dispatch::{generate_dispatch_id, next_slab_number, NumberDirection};
use crate::errors::{DispatchError, DispatchResult};
use crate::measure::SlabMeasurement;
use crate::units::{MeasurementUnit, SqFt};

// ============================================================================
// Session Metadata
// ============================================================================

/// Metadata shared by every slab in a dispatch.
///
/// Party and material are required at finalize; vehicle and supervisor may
/// stay empty (not every yard records them).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DispatchMeta {
    pub party_name: String,
    pub material: String,
    pub lot_number: String,
    pub vehicle_number: String,
    pub supervisor: String,
}

impl DispatchMeta {
    pub fn new(
        party_name: impl Into<String>,
        material: impl Into<String>,
        lot_number: impl Into<String>,
    ) -> Self {
        DispatchMeta {
            party_name: party_name.into(),
            material: material.into(),
            lot_number: lot_number.into(),
            vehicle_number: String::new(),
            supervisor: String::new(),
        }
    }

    /// Set the vehicle number (builder style)
    pub fn with_vehicle(mut self, vehicle_number: impl Into<String>) -> Self {
        self.vehicle_number = vehicle_number.into();
        self
    }

    /// Set the supervisor name (builder style)
    pub fn with_supervisor(mut self, supervisor: impl Into<String>) -> Self {
        self.supervisor = supervisor.into();
        self
    }
}

// ============================================================================
// Slab Drafts
// ============================================================================

/// Raw input for one slab, before areas are computed.
///
/// Dimensions are in the session's declared unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlabDraft {
    pub slab_number: i32,
    pub length: f64,
    pub height: f64,
    pub thickness: f64,
    pub deductions: Vec<CornerDeduction>,
}

impl SlabDraft {
    pub fn new(slab_number: i32, length: f64, height: f64, thickness: f64) -> Self {
        SlabDraft {
            slab_number,
            length,
            height,
            thickness,
            deductions: Vec::new(),
        }
    }

    /// Add a corner deduction (builder style)
    pub fn with_deduction(mut self, length: f64, height: f64) -> Self {
        self.deductions.push(CornerDeduction::new(length, height));
        self
    }
}

// ============================================================================
// Dispatch Session
// ============================================================================

/// Records produced by finalizing a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizedDispatch {
    /// Freshly generated dispatch identifier, stamped on every slab
    pub dispatch_id: String,

    /// Finalization time, stamped on every slab
    pub timestamp: DateTime<Utc>,

    /// The measured slabs, ready for the ledger
    pub slabs: Vec<SlabMeasurement>,
}

/// The working batch for one dispatch entry session.
///
/// Slab numbers must be unique within the session; uniqueness against
/// already-persisted records for the same lot is the caller's job. Seed
/// the session with [`DispatchSession::seed_slab_numbers`] before entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchSession {
    /// Metadata applied to every slab at finalize
    pub meta: DispatchMeta,

    /// Direction slab numbering runs
    pub direction: NumberDirection,

    unit: MeasurementUnit,
    slabs: Vec<SlabMeasurement>,
    seeded_numbers: Vec<i32>,
}

impl DispatchSession {
    pub fn new(meta: DispatchMeta, unit: MeasurementUnit, direction: NumberDirection) -> Self {
        DispatchSession {
            meta,
            direction,
            unit,
            slabs: Vec::new(),
            seeded_numbers: Vec::new(),
        }
    }

    /// Reserve slab numbers already used by persisted records (typically the
    /// same lot's earlier dispatches). Seeded numbers count as taken for
    /// both duplicate checks and suggestions.
    pub fn seed_slab_numbers(&mut self, numbers: &[i32]) {
        self.seeded_numbers.extend_from_slice(numbers);
    }

    /// The session's declared measurement unit.
    pub fn unit(&self) -> MeasurementUnit {
        self.unit
    }

    /// Slabs measured so far, in entry order.
    pub fn slabs(&self) -> &[SlabMeasurement] {
        &self.slabs
    }

    /// Look up a working slab by number.
    pub fn slab(&self, slab_number: i32) -> Option<&SlabMeasurement> {
        self.slabs.iter().find(|s| s.slab_number == slab_number)
    }

    pub fn slab_count(&self) -> usize {
        self.slabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slabs.is_empty()
    }

    /// Running net-area total for the working batch.
    pub fn total_net_area(&self) -> SqFt {
        self.slabs
            .iter()
            .fold(SqFt(0.0), |acc, slab| acc + slab.net_area)
    }

    /// Next slab number to offer, derived from seeded plus working numbers.
    pub fn suggest_slab_number(&self) -> i32 {
        next_slab_number(&self.used_numbers(), self.direction)
    }

    fn used_numbers(&self) -> Vec<i32> {
        self.seeded_numbers
            .iter()
            .copied()
            .chain(self.slabs.iter().map(|s| s.slab_number))
            .collect()
    }

    /// Add a measured slab to the working batch.
    ///
    /// Computes all derived areas under the session unit. Fails if the slab
    /// number is already taken (in-session or seeded) or the draft carries
    /// more than [`MAX_CORNER_DEDUCTIONS`] corners.
    ///
    /// Returns the slab number on success.
    pub fn add_slab(&mut self, draft: SlabDraft) -> DispatchResult<i32> {
        if self.used_numbers().contains(&draft.slab_number) {
            return Err(DispatchError::duplicate_slab_number(draft.slab_number));
        }
        if draft.deductions.len() > MAX_CORNER_DEDUCTIONS {
            return Err(DispatchError::TooManyDeductions {
                slab_number: draft.slab_number,
                limit: MAX_CORNER_DEDUCTIONS,
            });
        }

        let mut record = SlabMeasurement {
            slab_number: draft.slab_number,
            length: draft.length,
            height: draft.height,
            thickness: draft.thickness,
            unit: self.unit,
            deductions: draft.deductions,
            gross_area: SqFt(0.0),
            total_deduction_area: SqFt(0.0),
            net_area: SqFt(0.0),
            material: self.meta.material.clone(),
            lot_number: self.meta.lot_number.clone(),
            party_name: self.meta.party_name.clone(),
            supervisor: self.meta.supervisor.clone(),
            vehicle_number: self.meta.vehicle_number.clone(),
            dispatch_id: String::new(),
            dispatch_timestamp: None,
            created_at: Utc::now(),
        };
        record.recompute_areas();

        let number = record.slab_number;
        self.slabs.push(record);
        Ok(number)
    }

    /// Remove a working slab, freeing its number.
    pub fn remove_slab(&mut self, slab_number: i32) -> Option<SlabMeasurement> {
        let index = self.slabs.iter().position(|s| s.slab_number == slab_number)?;
        Some(self.slabs.remove(index))
    }

    /// Correct a working slab's length/height and recompute its areas.
    pub fn correct_dimensions(&mut self, slab_number: i32, length: f64, height: f64) -> DispatchResult<()> {
        let slab = self.slab_mut(slab_number)?;
        slab.correct_dimensions(length, height);
        Ok(())
    }

    /// Add a corner deduction to a working slab.
    pub fn add_corner(&mut self, slab_number: i32, length: f64, height: f64) -> DispatchResult<()> {
        let slab = self.slab_mut(slab_number)?;
        if slab.deductions.len() >= MAX_CORNER_DEDUCTIONS {
            return Err(DispatchError::TooManyDeductions {
                slab_number,
                limit: MAX_CORNER_DEDUCTIONS,
            });
        }
        slab.deductions.push(CornerDeduction::new(length, height));
        slab.recompute_areas();
        Ok(())
    }

    /// Remove a corner deduction from a working slab by position.
    pub fn remove_corner(&mut self, slab_number: i32, index: usize) -> DispatchResult<()> {
        let slab = self.slab_mut(slab_number)?;
        if index >= slab.deductions.len() {
            return Err(DispatchError::invalid_input(
                "corner_index",
                index.to_string(),
                "No corner deduction at this position",
            ));
        }
        slab.deductions.remove(index);
        slab.recompute_areas();
        Ok(())
    }

    /// Switch the session unit, reinterpreting every working slab's raw
    /// dimensions under the new unit. Raw numbers are not converted.
    pub fn set_unit(&mut self, unit: MeasurementUnit) {
        self.unit = unit;
        for slab in &mut self.slabs {
            slab.set_unit(unit);
        }
    }

    fn slab_mut(&mut self, slab_number: i32) -> DispatchResult<&mut SlabMeasurement> {
        self.slabs
            .iter_mut()
            .find(|s| s.slab_number == slab_number)
            .ok_or_else(|| DispatchError::record_not_found(format!("slab {}", slab_number)))
    }

    /// Check the session is ready to finalize without consuming it.
    ///
    /// Required: at least one slab, a party name, a material name, and
    /// positive slab numbers throughout (descending numbering may have run
    /// to zero or below; renumber before saving).
    pub fn validate(&self) -> DispatchResult<()> {
        if self.slabs.is_empty() {
            return Err(DispatchError::invalid_input(
                "slabs",
                "empty",
                "At least one slab is required to finalize a dispatch",
            ));
        }
        if self.meta.party_name.trim().is_empty() {
            return Err(DispatchError::missing_field("party_name"));
        }
        if self.meta.material.trim().is_empty() {
            return Err(DispatchError::missing_field("material"));
        }
        for slab in &self.slabs {
            if slab.slab_number < 1 {
                return Err(DispatchError::invalid_input(
                    "slab_number",
                    slab.slab_number.to_string(),
                    "Slab numbers must be positive before saving",
                ));
            }
        }
        Ok(())
    }

    /// Finalize the session: validate, generate a dispatch identifier, and
    /// stamp it (with the finalization time) on every slab.
    ///
    /// Consumes the session; call [`DispatchSession::validate`] first if the
    /// batch may still need fixing.
    pub fn finalize(self) -> DispatchResult<FinalizedDispatch> {
        self.validate()?;

        let dispatch_id = generate_dispatch_id();
        let timestamp = Utc::now();

        let slabs = self
            .slabs
            .into_iter()
            .map(|mut slab| {
                slab.dispatch_id = dispatch_id.clone();
                slab.dispatch_timestamp = Some(timestamp);
                slab
            })
            .collect();

        Ok(FinalizedDispatch {
            dispatch_id,
            timestamp,
            slabs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_session() -> DispatchSession {
        let meta = DispatchMeta::new("Sharma Marbles", "Steel Grey Granite", "LOT-88")
            .with_vehicle("GJ-12-AX-4521")
            .with_supervisor("R. Patel");
        DispatchSession::new(meta, MeasurementUnit::Inches, NumberDirection::Ascending)
    }

    #[test]
    fn test_suggestions_follow_working_set() {
        let mut session = test_session();
        assert_eq!(session.suggest_slab_number(), 1);

        session.add_slab(SlabDraft::new(1, 120.0, 60.0, 0.75)).unwrap();
        session.add_slab(SlabDraft::new(2, 120.0, 60.0, 0.75)).unwrap();
        assert_eq!(session.suggest_slab_number(), 3);
    }

    #[test]
    fn test_seeded_numbers_count_as_taken() {
        let mut session = test_session();
        session.seed_slab_numbers(&[1, 2, 3, 4, 5]);
        assert_eq!(session.suggest_slab_number(), 6);

        let err = session.add_slab(SlabDraft::new(3, 120.0, 60.0, 0.75)).unwrap_err();
        assert_eq!(err.error_code(), "DUPLICATE_SLAB_NUMBER");
    }

    #[test]
    fn test_descending_numbering() {
        let meta = DispatchMeta::new("Sharma Marbles", "Steel Grey Granite", "LOT-88");
        let mut session =
            DispatchSession::new(meta, MeasurementUnit::Inches, NumberDirection::Descending);
        session.seed_slab_numbers(&[40]);

        assert_eq!(session.suggest_slab_number(), 39);
        session.add_slab(SlabDraft::new(39, 120.0, 60.0, 0.75)).unwrap();
        assert_eq!(session.suggest_slab_number(), 38);
    }

    #[test]
    fn test_duplicate_slab_number_rejected() {
        let mut session = test_session();
        session.add_slab(SlabDraft::new(1, 120.0, 60.0, 0.75)).unwrap();

        let err = session.add_slab(SlabDraft::new(1, 96.0, 48.0, 0.75)).unwrap_err();
        assert_eq!(err, DispatchError::duplicate_slab_number(1));
    }

    #[test]
    fn test_removing_slab_frees_its_number() {
        let mut session = test_session();
        session.add_slab(SlabDraft::new(1, 120.0, 60.0, 0.75)).unwrap();
        session.remove_slab(1).unwrap();
        assert!(session.add_slab(SlabDraft::new(1, 96.0, 48.0, 0.75)).is_ok());
    }

    #[test]
    fn test_areas_computed_on_add() {
        let mut session = test_session();
        let draft = SlabDraft::new(1, 120.0, 60.0, 0.75).with_deduction(12.0, 12.0);
        session.add_slab(draft).unwrap();

        let slab = session.slab(1).unwrap();
        assert_eq!(slab.gross_area.value(), 50.0);
        assert_eq!(slab.net_area.value(), 49.0);
        assert_eq!(session.total_net_area().value(), 49.0);
    }

    #[test]
    fn test_corner_cap_enforced() {
        let mut session = test_session();
        let draft = SlabDraft::new(1, 120.0, 60.0, 0.75)
            .with_deduction(1.0, 1.0)
            .with_deduction(1.0, 1.0)
            .with_deduction(1.0, 1.0)
            .with_deduction(1.0, 1.0);
        session.add_slab(draft).unwrap();

        let err = session.add_corner(1, 1.0, 1.0).unwrap_err();
        assert_eq!(err.error_code(), "TOO_MANY_DEDUCTIONS");

        let overfull = SlabDraft::new(2, 120.0, 60.0, 0.75)
            .with_deduction(1.0, 1.0)
            .with_deduction(1.0, 1.0)
            .with_deduction(1.0, 1.0)
            .with_deduction(1.0, 1.0)
            .with_deduction(1.0, 1.0);
        assert!(session.add_slab(overfull).is_err());
    }

    #[test]
    fn test_corner_edits_recompute() {
        let mut session = test_session();
        session.add_slab(SlabDraft::new(1, 120.0, 60.0, 0.75)).unwrap();

        session.add_corner(1, 12.0, 12.0).unwrap();
        assert_eq!(session.slab(1).unwrap().net_area.value(), 49.0);

        session.remove_corner(1, 0).unwrap();
        assert_eq!(session.slab(1).unwrap().net_area.value(), 50.0);
        assert!(session.remove_corner(1, 0).is_err());
    }

    #[test]
    fn test_unit_switch_reinterprets_whole_batch() {
        let mut session = test_session();
        session.add_slab(SlabDraft::new(1, 120.0, 60.0, 0.75)).unwrap();
        let original_net = session.slab(1).unwrap().net_area;

        session.set_unit(MeasurementUnit::Cm);
        assert_eq!(session.unit(), MeasurementUnit::Cm);
        assert_eq!(session.slab(1).unwrap().length, 120.0);
        assert_ne!(session.slab(1).unwrap().net_area, original_net);

        session.set_unit(MeasurementUnit::Inches);
        assert_eq!(session.slab(1).unwrap().net_area, original_net);
    }

    #[test]
    fn test_finalize_stamps_every_slab() {
        let mut session = test_session();
        session.add_slab(SlabDraft::new(1, 120.0, 60.0, 0.75)).unwrap();
        session.add_slab(SlabDraft::new(2, 96.0, 48.0, 0.75)).unwrap();

        let dispatch = session.finalize().unwrap();
        assert!(!dispatch.dispatch_id.is_empty());
        assert_eq!(dispatch.slabs.len(), 2);
        for slab in &dispatch.slabs {
            assert_eq!(slab.dispatch_id, dispatch.dispatch_id);
            assert_eq!(slab.dispatch_timestamp, Some(dispatch.timestamp));
        }
    }

    #[test]
    fn test_finalize_requires_slabs_and_meta() {
        let empty = test_session();
        assert!(empty.validate().is_err());

        let mut no_party = DispatchSession::new(
            DispatchMeta::new("", "Steel Grey Granite", "LOT-88"),
            MeasurementUnit::Inches,
            NumberDirection::Ascending,
        );
        no_party.add_slab(SlabDraft::new(1, 120.0, 60.0, 0.75)).unwrap();
        assert_eq!(
            no_party.validate().unwrap_err(),
            DispatchError::missing_field("party_name")
        );
    }

    #[test]
    fn test_finalize_rejects_non_positive_numbers() {
        let meta = DispatchMeta::new("Sharma Marbles", "Steel Grey Granite", "LOT-88");
        let mut session =
            DispatchSession::new(meta, MeasurementUnit::Inches, NumberDirection::Descending);
        session.seed_slab_numbers(&[1]);

        // Descending past 1 is allowed in-session...
        let number = session.suggest_slab_number();
        assert_eq!(number, 0);
        session.add_slab(SlabDraft::new(number, 120.0, 60.0, 0.75)).unwrap();

        // ...but not past validation.
        let err = session.validate().unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
    }
}
