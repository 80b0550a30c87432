//! # Slab Measurement Engine
//!
//! Converts raw user-entered dimensions into consistent square-feet areas
//! under a declared measurement unit, and keeps derived quantities in step
//! as inputs change.
//!
//! ## Computation Model
//!
//! - `gross_area = convert(length) × convert(height)`, rounded to 4 decimals
//! - `total_deduction_area = Σ corner areas` (each rounded to 4 decimals)
//! - `net_area = max(0, gross_area − total_deduction_area)`
//!
//! Every function here is total: NaN dimensions coerce to zero, deductions
//! exceeding gross are absorbed by the clamp (flagged, never an error), and
//! recomputation is synchronous, so areas are consistent with raw inputs at
//! every observable point after an edit completes.
//!
//! ## Example
//!
//! ```rust
//! use slab_core::deductions::CornerDeduction;
//! use slab_core::measure::compute_slab_areas;
//! use slab_core::units::MeasurementUnit;
//!
//! let corners = vec![CornerDeduction::new(12.0, 12.0)];
//! let areas = compute_slab_areas(120.0, 60.0, &corners, MeasurementUnit::Inches);
//!
//! assert_eq!(areas.gross_area.value(), 50.0);
//! assert_eq!(areas.total_deduction_area.value(), 1.0);
//! assert_eq!(areas.net_area.value(), 49.0);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::deductions::{corner_area, sanitize_dimension, CornerDeduction};
use crate::units::{convert_to_feet, MeasurementUnit, SqFt};

// ============================================================================
// Area Computation
// ============================================================================

/// Derived areas for one slab, all in square feet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlabAreas {
    /// Full length × height area, rounded to 4 decimals
    pub gross_area: SqFt,

    /// Per-corner deduction areas, in the same order as the input list
    pub corner_areas: Vec<SqFt>,

    /// Sum of all corner deduction areas
    pub total_deduction_area: SqFt,

    /// Gross minus deductions, floored at zero
    pub net_area: SqFt,

    /// Set when nominal deductions exceeded the gross area and the net was
    /// clamped. Informational only, never an error condition.
    pub deductions_exceed_gross: bool,
}

/// Compute a slab's gross area (length × height in feet, rounded to 4 decimals).
pub fn gross_area(length: f64, height: f64, unit: MeasurementUnit) -> SqFt {
    let l = convert_to_feet(sanitize_dimension(length), unit);
    let h = convert_to_feet(sanitize_dimension(height), unit);
    (l * h).round4()
}

/// Compute all derived areas for a slab under the declared unit.
///
/// Corner areas are always recomputed from each deduction's raw dimensions,
/// so switching the unit is a pure reinterpretation handled in one call;
/// stale stored areas on the input list are ignored.
///
/// This is a total function: no input combination representable in the
/// argument types produces an error.
pub fn compute_slab_areas(
    length: f64,
    height: f64,
    deductions: &[CornerDeduction],
    unit: MeasurementUnit,
) -> SlabAreas {
    let gross = gross_area(length, height, unit);

    let corner_areas: Vec<SqFt> = deductions
        .iter()
        .map(|corner| corner_area(corner.length, corner.height, unit))
        .collect();

    // Order-independent sum; a NaN entry counts as zero.
    let total = corner_areas.iter().fold(SqFt(0.0), |acc, a| {
        if a.value().is_nan() {
            acc
        } else {
            acc + *a
        }
    });

    let net = (gross - total).clamp_non_negative();

    SlabAreas {
        gross_area: gross,
        corner_areas,
        total_deduction_area: total,
        net_area: net,
        deductions_exceed_gross: total.value() > gross.value(),
    }
}

// ============================================================================
// Slab Measurement Record
// ============================================================================

/// One measured slab within a dispatch.
///
/// Raw dimensions (`length`, `height`, `thickness`) are stored in the
/// declared `unit`. They are *reinterpreted*, not converted, if the unit
/// changes. The three derived areas are always square feet and are kept
/// consistent by [`SlabMeasurement::recompute_areas`].
///
/// ## JSON Example
///
/// ```json
/// {
///   "slab_number": 14,
///   "length": 120.0,
///   "height": 60.0,
///   "thickness": 0.75,
///   "unit": "Inches",
///   "deductions": [{ "length": 12.0, "height": 12.0, "area": 1.0 }],
///   "gross_area": 50.0,
///   "total_deduction_area": 1.0,
///   "net_area": 49.0,
///   "material": "Steel Grey Granite",
///   "lot_number": "LOT-88",
///   "party_name": "Sharma Marbles",
///   "supervisor": "R. Patel",
///   "vehicle_number": "GJ-12-AX-4521",
///   "dispatch_id": "202602-1770960512034001",
///   "dispatch_timestamp": "2026-02-13T09:15:12Z",
///   "created_at": "2026-02-13T09:02:44Z"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlabMeasurement {
    /// Slab number, unique within its dispatch. Descending numbering can
    /// pass through zero or negative mid-session; persistence requires > 0.
    pub slab_number: i32,

    /// Raw length in the declared unit
    pub length: f64,

    /// Raw height in the declared unit
    pub height: f64,

    /// Raw thickness in the declared unit (recorded, not used in areas)
    pub thickness: f64,

    /// The unit length/height/thickness were entered in
    pub unit: MeasurementUnit,

    /// Ordered corner deductions (at most 4, enforced by the session)
    pub deductions: Vec<CornerDeduction>,

    /// Derived: length × height in square feet
    pub gross_area: SqFt,

    /// Derived: sum of corner deduction areas
    pub total_deduction_area: SqFt,

    /// Derived: gross minus deductions, never negative
    pub net_area: SqFt,

    /// Material name (e.g. "Steel Grey Granite")
    pub material: String,

    /// Production lot this slab belongs to
    pub lot_number: String,

    /// Receiving party
    pub party_name: String,

    /// Supervisor who recorded the measurement
    pub supervisor: String,

    /// Vehicle carrying the dispatch
    pub vehicle_number: String,

    /// Generated dispatch identifier; empty until finalized groups under
    /// the unknown bucket (see [`crate::dispatch::UNKNOWN_DISPATCH_ID`])
    pub dispatch_id: String,

    /// When the dispatch was finalized; absent for never-finalized records
    pub dispatch_timestamp: Option<DateTime<Utc>>,

    /// When this slab entry was recorded
    pub created_at: DateTime<Utc>,
}

impl SlabMeasurement {
    /// Re-run the full area computation under the record's current unit.
    ///
    /// Rewrites every corner's stored area and the three derived fields.
    /// Every mutating path (dimension corrections, unit switches, corner
    /// edits) must call this before the record is observed again.
    pub fn recompute_areas(&mut self) {
        let areas = compute_slab_areas(self.length, self.height, &self.deductions, self.unit);
        for (corner, area) in self.deductions.iter_mut().zip(&areas.corner_areas) {
            corner.area = *area;
        }
        self.gross_area = areas.gross_area;
        self.total_deduction_area = areas.total_deduction_area;
        self.net_area = areas.net_area;
    }

    /// Apply the permitted post-entry correction (length/height only) and
    /// recompute all derived areas under the record's unit.
    pub fn correct_dimensions(&mut self, length: f64, height: f64) {
        self.length = length;
        self.height = height;
        self.recompute_areas();
    }

    /// Reinterpret the raw dimensions under a new unit and recompute.
    ///
    /// The numbers themselves do not change: `120` entered as inches stays
    /// `120` when the unit becomes cm. Switching away and back restores the
    /// original derived areas exactly.
    pub fn set_unit(&mut self, unit: MeasurementUnit) {
        self.unit = unit;
        self.recompute_areas();
    }

    /// Timestamp used for grouping and ordering: the dispatch timestamp,
    /// falling back to the record's creation time.
    pub fn effective_timestamp(&self) -> DateTime<Utc> {
        self.dispatch_timestamp.unwrap_or(self.created_at)
    }

    /// Whether any corner entry actually removes area.
    pub fn has_deductions(&self) -> bool {
        self.total_deduction_area.value() > 0.0
    }

    /// Dimensions as shown in tables, e.g. `120 x 60 x 0.75 in`.
    pub fn dimensions_display(&self) -> String {
        format!(
            "{} x {} x {} {}",
            trim_number(self.length),
            trim_number(self.height),
            trim_number(self.thickness),
            self.unit.abbreviation()
        )
    }
}

/// Format a raw dimension without trailing noise (`120` not `120.000`).
fn trim_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.3}", value)
    }
}
